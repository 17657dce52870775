//! Main transformer implementation
//!
//! Walks the parsed source AST and produces a Python AST with matching
//! runtime behavior, or fails fast with a coded diagnostic. One `Transpiler`
//! handles one transform; it is consumed by the entry points.

use std::collections::BTreeSet;

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use es2py_pyast::{PyBinOp, PyCmpOp, PyExpr, PyModule, PyStmt, PyUnaryOp, build, unparse};

use crate::ancestry::{AncestryTable, AncestryTagger, LoopId};
use crate::error::{ErrorCode, LineIndex, SourceLocation, TranspileError, TranspileResult};
use crate::imports::ImportManager;
use crate::scope::ScopeChain;

/// Maximum AST nesting depth to prevent stack overflow during transformation
const MAX_TRANSFORM_DEPTH: usize = 500;

/// Update statements of a for-loop currently being transformed, so `continue`
/// sites belonging to it can replay them.
struct ForUpdateFrame {
    loop_id: LoopId,
    updates: Vec<PyStmt>,
}

/// The transformer
pub struct Transpiler {
    /// Identifier scopes, innermost last.
    scopes: ScopeChain,
    /// Imports accumulated by rewrites.
    imports: ImportManager,
    /// Side-table produced by the ancestry tagger.
    ancestry: AncestryTable,
    /// Offset → line/column for diagnostics.
    line_index: LineIndex,
    /// Source text, kept for operator-precise diagnostics.
    source: String,
    /// Mints `__js_tmp<n>`; reset on function entry.
    temp_counter: u32,
    /// Mints `__js_switch_disc_<n>`; module-global.
    switch_disc_counter: u32,
    /// Innermost-last stack of for-loop update clauses.
    for_frames: Vec<ForUpdateFrame>,
    /// Current nesting depth (for preventing stack overflow)
    depth: usize,
}

impl Transpiler {
    /// Create a new transpiler
    pub fn new() -> Self {
        Self {
            scopes: ScopeChain::new(),
            imports: ImportManager::new(),
            ancestry: AncestryTable::default(),
            line_index: LineIndex::default(),
            source: String::new(),
            temp_counter: 0,
            switch_disc_counter: 0,
            for_frames: Vec::new(),
            depth: 0,
        }
    }

    /// Transpile source text to Python source text.
    pub fn transpile(self, source: &str, source_url: &str) -> TranspileResult<String> {
        let module = self.transpile_to_module(source, source_url)?;
        Ok(unparse(&module))
    }

    /// Transpile source text to a Python AST.
    pub fn transpile_to_module(
        mut self,
        source: &str,
        source_url: &str,
    ) -> TranspileResult<PyModule> {
        self.line_index = LineIndex::new(source);
        self.source = source.to_string();

        // Parse with oxc
        let allocator = Allocator::default();
        let mut source_type = SourceType::from_path(source_url).unwrap_or_default();
        if !source_type.is_module() {
            source_type = source_type.with_script(true);
        }

        let parser = Parser::new(&allocator, source, source_type);
        let result = parser.parse();
        if !result.errors.is_empty() {
            return Err(TranspileError::Parse(result.errors[0].to_string()));
        }
        tracing::debug!(source_url, "parsed");

        let program = result.program;
        let table = AncestryTagger::new(&self.line_index).tag_program(&program)?;
        self.ancestry = table;
        tracing::debug!("ancestry tagged");

        self.transform_program(&program)
    }

    /// Transform a program
    fn transform_program(&mut self, program: &Program) -> TranspileResult<PyModule> {
        let mut body = Vec::new();
        for stmt in &program.body {
            body.extend(self.transform_statement(stmt)?);
        }
        // Imports are drained after the body so they reflect actual usage.
        let mut module_body = self.imports.emit();
        module_body.extend(body);
        tracing::debug!(statements = module_body.len(), "transformed");
        Ok(PyModule { body: module_body })
    }

    fn loc(&self, span: Span) -> SourceLocation {
        self.line_index.location(span.start)
    }

    // Location of the first token at or after `from`; points diagnostics at
    // an operator instead of the start of the whole expression.
    fn loc_after(&self, from: u32) -> SourceLocation {
        let bytes = self.source.as_bytes();
        let mut i = from as usize;
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        self.line_index.location(i as u32)
    }

    fn enter_depth(&mut self) -> TranspileResult<()> {
        self.depth += 1;
        if self.depth > MAX_TRANSFORM_DEPTH {
            Err(TranspileError::internal("maximum AST nesting depth exceeded"))
        } else {
            Ok(())
        }
    }

    fn exit_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn fresh_temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("__js_tmp{}", self.temp_counter)
    }

    fn runtime_undefined(&mut self) -> PyExpr {
        build::name(self.imports.add_runtime("JSUndefined"))
    }

    fn truthy(&mut self, expr: PyExpr) -> PyExpr {
        build::call_name(self.imports.add_runtime("js_truthy"), vec![expr])
    }

    fn strict_eq(&mut self, a: PyExpr, b: PyExpr) -> PyExpr {
        build::call_name(self.imports.add_runtime("js_strict_eq"), vec![a, b])
    }

    // ===== Statements =====

    fn transform_statement(&mut self, stmt: &Statement) -> TranspileResult<Vec<PyStmt>> {
        self.enter_depth()?;
        let result = self.transform_statement_inner(stmt);
        self.exit_depth();
        result
    }

    fn transform_statement_inner(&mut self, stmt: &Statement) -> TranspileResult<Vec<PyStmt>> {
        match stmt {
            Statement::ExpressionStatement(expr_stmt) => {
                self.transform_expression_statement(&expr_stmt.expression)
            }
            Statement::VariableDeclaration(decl) => self.transform_variable_declaration(decl),
            Statement::FunctionDeclaration(func) => self.transform_function_declaration(func),
            Statement::ReturnStatement(ret) => {
                let value = match &ret.argument {
                    Some(argument) => self.transform_expression(argument)?,
                    // A bare `return` yields undefined, not Python's None.
                    None => self.runtime_undefined(),
                };
                Ok(vec![PyStmt::Return { value }])
            }
            Statement::IfStatement(if_stmt) => self.transform_if_statement(if_stmt),
            Statement::WhileStatement(while_stmt) => self.transform_while_statement(while_stmt),
            Statement::ForStatement(for_stmt) => self.transform_for_statement(for_stmt),
            Statement::ForInStatement(for_in) => self.transform_for_in_statement(for_in),
            Statement::SwitchStatement(switch) => self.transform_switch_statement(switch),
            Statement::BreakStatement(break_stmt) => {
                if let Some(label) = &break_stmt.label {
                    return Err(TranspileError::unsupported_node(
                        format!("`break {}` with a label", label.name),
                        self.loc(break_stmt.span),
                    ));
                }
                Ok(vec![PyStmt::Break])
            }
            Statement::ContinueStatement(continue_stmt) => {
                self.transform_continue_statement(continue_stmt)
            }
            Statement::BlockStatement(block) => {
                // Bare blocks do not open a scope in the source language.
                let mut out = Vec::new();
                for stmt in &block.body {
                    out.extend(self.transform_statement(stmt)?);
                }
                Ok(out)
            }
            Statement::EmptyStatement(_) => Ok(Vec::new()),
            Statement::DoWhileStatement(s) => Err(TranspileError::unsupported_node(
                "do-while statement",
                self.loc(s.span),
            )),
            Statement::ThrowStatement(s) => Err(TranspileError::unsupported_node(
                "throw statement",
                self.loc(s.span),
            )),
            Statement::TryStatement(s) => Err(TranspileError::unsupported_node(
                "try statement",
                self.loc(s.span),
            )),
            Statement::WithStatement(s) => Err(TranspileError::unsupported_node(
                "with statement",
                self.loc(s.span),
            )),
            Statement::LabeledStatement(s) => Err(TranspileError::unsupported_node(
                "labeled statement",
                self.loc(s.span),
            )),
            Statement::ClassDeclaration(s) => Err(TranspileError::unsupported_node(
                "class declaration",
                self.loc(s.span),
            )),
            Statement::DebuggerStatement(s) => Err(TranspileError::unsupported_node(
                "debugger statement",
                self.loc(s.span),
            )),
            other => Err(TranspileError::unsupported_node(
                "statement",
                self.loc(other.span()),
            )),
        }
    }

    // Assignments and updates are statement forms here; anything else becomes
    // a bare expression statement.
    fn transform_expression_statement(
        &mut self,
        expr: &Expression,
    ) -> TranspileResult<Vec<PyStmt>> {
        match expr {
            Expression::AssignmentExpression(assign) => self.transform_assignment_statement(assign),
            Expression::UpdateExpression(update) => self.transform_update_statement(update),
            Expression::SequenceExpression(seq) => Err(TranspileError::feature(
                ErrorCode::SequenceExprContext,
                "comma expression outside for-loop clauses",
                self.loc(seq.span),
            )),
            _ => {
                let value = self.transform_expression(expr)?;
                Ok(vec![build::expr_stmt(value)])
            }
        }
    }

    fn transform_assignment_statement(
        &mut self,
        assign: &AssignmentExpression,
    ) -> TranspileResult<Vec<PyStmt>> {
        match assign.operator {
            AssignmentOperator::Assign => {
                let target = self.transform_assignment_target(&assign.left)?;
                let value = self.transform_expression(&assign.right)?;
                Ok(vec![build::assign(target, value)])
            }
            AssignmentOperator::Addition
            | AssignmentOperator::Subtraction
            | AssignmentOperator::Multiplication
            | AssignmentOperator::Division
            | AssignmentOperator::Remainder => {
                let helper = match assign.operator {
                    AssignmentOperator::Addition => "js_add",
                    AssignmentOperator::Subtraction => "js_sub",
                    AssignmentOperator::Multiplication => "js_mul",
                    AssignmentOperator::Division => "js_div",
                    _ => "js_mod",
                };
                match &assign.left {
                    AssignmentTarget::AssignmentTargetIdentifier(ident) => {
                        let name = self.scopes.lookup(&ident.name);
                        self.imports.add_runtime(helper);
                        let rhs = self.transform_expression(&assign.right)?;
                        let value =
                            build::call_name(helper, vec![build::name(name.clone()), rhs]);
                        Ok(vec![build::assign_name(name, value)])
                    }
                    AssignmentTarget::StaticMemberExpression(_)
                    | AssignmentTarget::ComputedMemberExpression(_) => {
                        Err(TranspileError::feature_hint(
                            ErrorCode::MemberAugAssign,
                            "augmented assignment to a member expression",
                            self.loc_after(assign.left.span().end),
                            "expand to `obj.prop = obj.prop + value`",
                        ))
                    }
                    _ => Err(TranspileError::feature(
                        ErrorCode::VarDestructure,
                        "destructuring assignment target",
                        self.loc(assign.span),
                    )),
                }
            }
            _ => Err(TranspileError::feature(
                ErrorCode::UnsupportedFeature,
                "logical or bitwise assignment operator",
                self.loc(assign.span),
            )),
        }
    }

    fn transform_assignment_target(
        &mut self,
        target: &AssignmentTarget,
    ) -> TranspileResult<PyExpr> {
        match target {
            AssignmentTarget::AssignmentTargetIdentifier(ident) => {
                Ok(build::name(self.scopes.lookup(&ident.name)))
            }
            AssignmentTarget::StaticMemberExpression(member) => {
                if member.property.name == "length" {
                    return Err(TranspileError::feature(
                        ErrorCode::UnsupportedFeature,
                        "assignment to `.length`",
                        self.loc(member.span),
                    ));
                }
                let object = self.transform_expression(&member.object)?;
                Ok(build::subscript(
                    object,
                    build::str_const(member.property.name.as_str()),
                ))
            }
            AssignmentTarget::ComputedMemberExpression(member) => {
                let object = self.transform_expression(&member.object)?;
                let key = self.transform_expression(&member.expression)?;
                Ok(build::subscript(object, key))
            }
            AssignmentTarget::ArrayAssignmentTarget(t) => Err(TranspileError::feature(
                ErrorCode::VarDestructure,
                "array destructuring target",
                self.loc(t.span),
            )),
            AssignmentTarget::ObjectAssignmentTarget(t) => Err(TranspileError::feature(
                ErrorCode::VarDestructure,
                "object destructuring target",
                self.loc(t.span),
            )),
            other => Err(TranspileError::unsupported_node(
                "assignment target",
                self.loc(other.span()),
            )),
        }
    }

    // `x++` as a statement; also reused for for-loop update clauses.
    fn transform_update_statement(
        &mut self,
        update: &UpdateExpression,
    ) -> TranspileResult<Vec<PyStmt>> {
        match &update.argument {
            SimpleAssignmentTarget::AssignmentTargetIdentifier(ident) => {
                let name = self.scopes.lookup(&ident.name);
                let helper = match update.operator {
                    UpdateOperator::Increment => "js_add",
                    UpdateOperator::Decrement => "js_sub",
                };
                self.imports.add_runtime(helper);
                let value =
                    build::call_name(helper, vec![build::name(name.clone()), build::int(1)]);
                Ok(vec![build::assign_name(name, value)])
            }
            _ => Err(TranspileError::feature(
                ErrorCode::UpdateMember,
                "`++`/`--` on a member expression",
                self.loc(update.span),
            )),
        }
    }

    fn transform_continue_statement(
        &mut self,
        continue_stmt: &ContinueStatement,
    ) -> TranspileResult<Vec<PyStmt>> {
        if let Some(label) = &continue_stmt.label {
            return Err(TranspileError::unsupported_node(
                format!("`continue {}` with a label", label.name),
                self.loc(continue_stmt.span),
            ));
        }
        let loop_id = self.ancestry.continue_loop(continue_stmt.span).ok_or_else(|| {
            TranspileError::internal("continue statement missed by the ancestry tagger")
        })?;

        let mut out = Vec::new();
        // A continue whose innermost loop is the for currently on top of the
        // frame stack replays that for's update clause first. A continue
        // belonging to a deeper non-for loop never matches: only its own
        // innermost loop id is recorded.
        if let Some(frame) = self.for_frames.last() {
            if frame.loop_id == loop_id {
                out.extend(frame.updates.iter().cloned());
            }
        }
        out.push(PyStmt::Continue);
        Ok(out)
    }

    fn transform_variable_declaration(
        &mut self,
        decl: &VariableDeclaration,
    ) -> TranspileResult<Vec<PyStmt>> {
        if decl.kind != VariableDeclarationKind::Var {
            return Err(TranspileError::feature_hint(
                ErrorCode::UnsupportedFeature,
                if decl.kind == VariableDeclarationKind::Const {
                    "`const` declaration"
                } else {
                    "`let` declaration"
                },
                self.loc(decl.span),
                "the supported subset has only `var`",
            ));
        }
        let mut out = Vec::new();
        for declarator in &decl.declarations {
            let BindingPattern::BindingIdentifier(ident) = &declarator.id else {
                return Err(TranspileError::feature(
                    ErrorCode::VarDestructure,
                    "destructuring in a variable declaration",
                    self.loc(declarator.span),
                ));
            };
            let name = self.scopes.declare(&ident.name);
            let value = match &declarator.init {
                Some(init) => self.transform_expression(init)?,
                // Uninitialized declarators are undefined, not null.
                None => self.runtime_undefined(),
            };
            out.push(build::assign_name(name, value));
        }
        Ok(out)
    }

    fn transform_function_declaration(
        &mut self,
        func: &Function,
    ) -> TranspileResult<Vec<PyStmt>> {
        if func.r#async || func.generator {
            return Err(TranspileError::unsupported_node(
                if func.generator {
                    "generator function"
                } else {
                    "async function"
                },
                self.loc(func.span),
            ));
        }
        let Some(id) = &func.id else {
            return Err(TranspileError::unsupported_node(
                "anonymous function declaration",
                self.loc(func.span),
            ));
        };
        // Declared in the enclosing scope first so recursion resolves.
        let py_name = self.scopes.declare(&id.name);

        self.scopes.enter();
        let saved_temp = std::mem::replace(&mut self.temp_counter, 0);

        let mut params = Vec::new();
        let mut param_names: BTreeSet<String> = BTreeSet::new();
        for param in &func.params.items {
            if param.initializer.is_some() {
                return Err(TranspileError::feature(
                    ErrorCode::ParamDestructure,
                    "parameter with a default value",
                    self.loc(param.span),
                ));
            }
            match &param.pattern {
                BindingPattern::BindingIdentifier(ident) => {
                    param_names.insert(ident.name.to_string());
                    params.push(self.scopes.declare(&ident.name));
                }
                _ => {
                    return Err(TranspileError::feature(
                        ErrorCode::ParamDestructure,
                        "destructured parameter",
                        self.loc(param.span),
                    ));
                }
            }
        }
        if let Some(rest) = &func.params.rest {
            return Err(TranspileError::feature(
                ErrorCode::ParamDestructure,
                "rest parameter",
                self.loc(rest.span),
            ));
        }

        // var hoisting: every var declared anywhere in this function (not in
        // nested functions), minus the parameters, initializes to undefined
        // at the top, alphabetized.
        let mut hoisted: BTreeSet<String> = BTreeSet::new();
        if let Some(body) = &func.body {
            collect_var_names(&body.statements, &mut hoisted);
        }
        for param in &param_names {
            hoisted.remove(param);
        }

        let mut py_body = Vec::new();
        for raw in &hoisted {
            let name = self.scopes.declare(raw);
            let undefined = self.runtime_undefined();
            py_body.push(build::assign_name(name, undefined));
        }

        if let Some(body) = &func.body {
            for stmt in &body.statements {
                py_body.extend(self.transform_statement(stmt)?);
            }
        }

        self.scopes.exit();
        self.temp_counter = saved_temp;

        Ok(vec![PyStmt::FunctionDef {
            name: py_name,
            args: params,
            body: build::suite(py_body),
        }])
    }

    fn transform_if_statement(&mut self, if_stmt: &IfStatement) -> TranspileResult<Vec<PyStmt>> {
        let test = self.transform_expression(&if_stmt.test)?;
        let test = self.truthy(test);
        let body = build::suite(self.transform_statement(&if_stmt.consequent)?);
        let orelse = match &if_stmt.alternate {
            Some(alternate) => self.transform_statement(alternate)?,
            None => Vec::new(),
        };
        Ok(vec![PyStmt::If { test, body, orelse }])
    }

    fn transform_while_statement(
        &mut self,
        while_stmt: &WhileStatement,
    ) -> TranspileResult<Vec<PyStmt>> {
        let test = self.transform_expression(&while_stmt.test)?;
        let test = self.truthy(test);
        let body = build::suite(self.transform_statement(&while_stmt.body)?);
        Ok(vec![PyStmt::While {
            test,
            body,
            orelse: Vec::new(),
        }])
    }

    // `for (init; test; update) body` desugars to the init statements
    // followed by a while loop. The update clause runs at the end of the
    // body and before every `continue` that targets this loop.
    fn transform_for_statement(&mut self, for_stmt: &ForStatement) -> TranspileResult<Vec<PyStmt>> {
        let mut out = Vec::new();

        if let Some(init) = &for_stmt.init {
            match init {
                ForStatementInit::VariableDeclaration(decl) => {
                    out.extend(self.transform_variable_declaration(decl)?);
                }
                _ => match init.as_expression() {
                    Some(expr) => out.extend(self.transform_for_clause(expr)?),
                    None => {
                        return Err(TranspileError::unsupported_node(
                            "for-statement initializer",
                            self.loc(for_stmt.span),
                        ));
                    }
                },
            }
        }

        let test = match &for_stmt.test {
            Some(test) => {
                let test = self.transform_expression(test)?;
                self.truthy(test)
            }
            None => build::bool_const(true),
        };

        let updates = match &for_stmt.update {
            Some(update) => self.transform_for_clause(update)?,
            None => Vec::new(),
        };

        let loop_id = self.ancestry.loop_id(for_stmt.span).ok_or_else(|| {
            TranspileError::internal("for statement missed by the ancestry tagger")
        })?;

        self.for_frames.push(ForUpdateFrame {
            loop_id,
            updates: updates.clone(),
        });
        let body = self.transform_statement(&for_stmt.body);
        self.for_frames.pop();
        let mut body = body?;

        body.extend(updates);
        out.push(PyStmt::While {
            test,
            body: build::suite(body),
            orelse: Vec::new(),
        });
        Ok(out)
    }

    // An init or update clause: comma expressions expand to one statement
    // per sub-expression, in order.
    fn transform_for_clause(&mut self, expr: &Expression) -> TranspileResult<Vec<PyStmt>> {
        if let Expression::SequenceExpression(seq) = expr {
            let mut out = Vec::new();
            for sub in &seq.expressions {
                out.extend(self.transform_for_clause_single(sub)?);
            }
            return Ok(out);
        }
        self.transform_for_clause_single(expr)
    }

    fn transform_for_clause_single(&mut self, expr: &Expression) -> TranspileResult<Vec<PyStmt>> {
        match expr {
            Expression::AssignmentExpression(assign) => self.transform_assignment_statement(assign),
            Expression::UpdateExpression(update) => self.transform_update_statement(update),
            Expression::SequenceExpression(seq) => Err(TranspileError::feature(
                ErrorCode::SequenceExprContext,
                "nested comma expression",
                self.loc(seq.span),
            )),
            _ => {
                let value = self.transform_expression(expr)?;
                Ok(vec![build::expr_stmt(value)])
            }
        }
    }

    fn transform_for_in_statement(
        &mut self,
        for_in: &ForInStatement,
    ) -> TranspileResult<Vec<PyStmt>> {
        let target = match &for_in.left {
            ForStatementLeft::VariableDeclaration(decl) => {
                if decl.kind != VariableDeclarationKind::Var {
                    return Err(TranspileError::feature_hint(
                        ErrorCode::UnsupportedFeature,
                        if decl.kind == VariableDeclarationKind::Const {
                            "`const` declaration"
                        } else {
                            "`let` declaration"
                        },
                        self.loc(decl.span),
                        "the supported subset has only `var`",
                    ));
                }
                if decl.declarations.len() != 1 {
                    return Err(TranspileError::feature(
                        ErrorCode::VarDestructure,
                        "multiple declarators in a for-in head",
                        self.loc(decl.span),
                    ));
                }
                let declarator = &decl.declarations[0];
                let BindingPattern::BindingIdentifier(ident) = &declarator.id else {
                    return Err(TranspileError::feature(
                        ErrorCode::VarDestructure,
                        "destructuring for-in target",
                        self.loc(declarator.span),
                    ));
                };
                build::name(self.scopes.declare(&ident.name))
            }
            ForStatementLeft::AssignmentTargetIdentifier(ident) => {
                build::name(self.scopes.lookup(&ident.name))
            }
            other => {
                return Err(TranspileError::feature(
                    ErrorCode::VarDestructure,
                    "destructuring for-in target",
                    self.loc(other.span()),
                ));
            }
        };

        let object = self.transform_expression(&for_in.right)?;
        let iter = build::call_name(self.imports.add_runtime("js_for_in_keys"), vec![object]);
        let body = build::suite(self.transform_statement(&for_in.body)?);
        Ok(vec![PyStmt::For {
            target,
            iter,
            body,
            orelse: Vec::new(),
        }])
    }

    // A switch flattens to a cached discriminant plus an if/elif/else
    // cascade inside a one-shot `while True`, so `break` has a target.
    fn transform_switch_statement(
        &mut self,
        switch: &SwitchStatement,
    ) -> TranspileResult<Vec<PyStmt>> {
        self.switch_disc_counter += 1;
        let disc_name = format!("__js_switch_disc_{}", self.switch_disc_counter);
        let disc_value = self.transform_expression(&switch.discriminant)?;
        let mut out = vec![build::assign_name(disc_name.clone(), disc_value)];

        struct Arm {
            tests: Vec<PyExpr>,
            body: Vec<PyStmt>,
        }

        let mut arms: Vec<Arm> = Vec::new();
        let mut default_body: Option<Vec<PyStmt>> = None;
        // Tests of empty cases waiting to alias onto the next non-empty case.
        let mut pending_tests: Vec<PyExpr> = Vec::new();
        // An empty default aliases forward exactly like an empty case.
        let mut pending_default = false;

        for case in &switch.cases {
            if !case.consequent.is_empty() && !block_terminates(&case.consequent) {
                return Err(TranspileError::feature_hint(
                    ErrorCode::SwitchFallthrough,
                    "switch case falls through",
                    self.loc(case.span),
                    "end every non-empty case with break or return",
                ));
            }

            match &case.test {
                Some(test) => {
                    let case_value = self.transform_expression(test)?;
                    let test_expr = self.strict_eq(build::name(disc_name.clone()), case_value);
                    if case.consequent.is_empty() {
                        pending_tests.push(test_expr);
                        continue;
                    }
                    let mut tests = std::mem::take(&mut pending_tests);
                    tests.push(test_expr);
                    let body = self.transform_case_body(&case.consequent)?;
                    if pending_default {
                        default_body = Some(body.clone());
                        pending_default = false;
                    }
                    arms.push(Arm { tests, body });
                }
                None => {
                    if case.consequent.is_empty() {
                        pending_default = true;
                    } else {
                        // Tests aliased into the default body are subsumed by
                        // the else branch.
                        pending_tests.clear();
                        default_body = Some(self.transform_case_body(&case.consequent)?);
                    }
                }
            }
        }
        // Trailing empty cases select a body that does not exist; matching
        // them just falls off the end of the switch.

        let mut cascade = default_body.unwrap_or_default();
        for arm in arms.into_iter().rev() {
            let test = if arm.tests.len() == 1 {
                arm.tests.into_iter().next().expect("one test")
            } else {
                build::bool_or(arm.tests)
            };
            cascade = vec![PyStmt::If {
                test,
                body: build::suite(arm.body),
                orelse: cascade,
            }];
        }

        // Fall-off from the cascade exits the wrapper.
        cascade.push(PyStmt::Break);
        out.push(PyStmt::While {
            test: build::bool_const(true),
            body: cascade,
            orelse: Vec::new(),
        });
        Ok(out)
    }

    fn transform_case_body(&mut self, stmts: &[Statement]) -> TranspileResult<Vec<PyStmt>> {
        let mut out = Vec::new();
        for stmt in stmts {
            out.extend(self.transform_statement(stmt)?);
        }
        Ok(out)
    }

    // ===== Expressions =====

    fn transform_expression(&mut self, expr: &Expression) -> TranspileResult<PyExpr> {
        self.enter_depth()?;
        let result = self.transform_expression_inner(expr);
        self.exit_depth();
        result
    }

    fn transform_expression_inner(&mut self, expr: &Expression) -> TranspileResult<PyExpr> {
        match expr {
            Expression::NullLiteral(_) => Ok(build::none()),
            Expression::BooleanLiteral(lit) => Ok(build::bool_const(lit.value)),
            Expression::NumericLiteral(lit) => Ok(number_constant(lit.value)),
            Expression::StringLiteral(lit) => Ok(build::str_const(lit.value.as_str())),
            Expression::RegExpLiteral(lit) => Err(TranspileError::feature(
                ErrorCode::Regex,
                "regular expression literal",
                self.loc(lit.span),
            )),
            Expression::Identifier(ident) => self.transform_identifier(ident),
            Expression::ArrayExpression(arr) => self.transform_array_expression(arr),
            Expression::ObjectExpression(obj) => self.transform_object_expression(obj),
            Expression::StaticMemberExpression(member) => self.transform_static_member(member),
            Expression::ComputedMemberExpression(member) => self.transform_computed_member(member),
            Expression::BinaryExpression(binary) => self.transform_binary_expression(binary),
            Expression::LogicalExpression(logical) => self.transform_logical_expression(logical),
            Expression::UnaryExpression(unary) => self.transform_unary_expression(unary),
            Expression::ConditionalExpression(cond) => {
                let test = self.transform_expression(&cond.test)?;
                let test = self.truthy(test);
                let body = self.transform_expression(&cond.consequent)?;
                let orelse = self.transform_expression(&cond.alternate)?;
                Ok(build::if_exp(test, body, orelse))
            }
            Expression::CallExpression(call) => self.transform_call_expression(call),
            Expression::NewExpression(new_expr) => self.transform_new_expression(new_expr),
            Expression::ParenthesizedExpression(paren) => {
                self.transform_expression(&paren.expression)
            }
            Expression::SequenceExpression(seq) => Err(TranspileError::feature(
                ErrorCode::SequenceExprContext,
                "comma expression outside for-loop clauses",
                self.loc(seq.span),
            )),
            Expression::AssignmentExpression(assign) => Err(TranspileError::feature(
                ErrorCode::UnsupportedFeature,
                "assignment used as an expression",
                self.loc(assign.span),
            )),
            Expression::UpdateExpression(update) => Err(TranspileError::feature(
                ErrorCode::UpdateExprContext,
                "`++`/`--` used as a value",
                self.loc(update.span),
            )),
            Expression::FunctionExpression(func) => Err(TranspileError::unsupported_node(
                "function expression",
                self.loc(func.span),
            )),
            Expression::ArrowFunctionExpression(arrow) => Err(TranspileError::unsupported_node(
                "arrow function",
                self.loc(arrow.span),
            )),
            Expression::ThisExpression(expr) => Err(TranspileError::unsupported_node(
                "`this`",
                self.loc(expr.span),
            )),
            Expression::TemplateLiteral(template) => Err(TranspileError::unsupported_node(
                "template literal",
                self.loc(template.span),
            )),
            other => Err(TranspileError::unsupported_node(
                "expression",
                self.loc(other.span()),
            )),
        }
    }

    fn transform_identifier(&mut self, ident: &IdentifierReference) -> TranspileResult<PyExpr> {
        match ident.name.as_str() {
            "undefined" => Ok(self.runtime_undefined()),
            "NaN" => Ok(build::call_name("float", vec![build::str_const("nan")])),
            "Infinity" => {
                let alias = self.imports.add_stdlib("math");
                Ok(build::attribute(build::name(alias), "inf"))
            }
            name => Ok(build::name(self.scopes.lookup(name))),
        }
    }

    fn transform_array_expression(&mut self, arr: &ArrayExpression) -> TranspileResult<PyExpr> {
        let mut elements = Vec::with_capacity(arr.elements.len());
        for element in &arr.elements {
            match element {
                ArrayExpressionElement::Elision(_) => elements.push(build::none()),
                ArrayExpressionElement::SpreadElement(spread) => {
                    return Err(TranspileError::unsupported_node(
                        "array spread element",
                        self.loc(spread.span),
                    ));
                }
                _ => elements.push(self.transform_expression(element.to_expression())?),
            }
        }
        Ok(PyExpr::List(elements))
    }

    fn transform_object_expression(&mut self, obj: &ObjectExpression) -> TranspileResult<PyExpr> {
        let mut keys = Vec::with_capacity(obj.properties.len());
        let mut values = Vec::with_capacity(obj.properties.len());
        for prop in &obj.properties {
            match prop {
                ObjectPropertyKind::ObjectProperty(prop) => {
                    if prop.kind != PropertyKind::Init {
                        return Err(TranspileError::unsupported_node(
                            "getter/setter property",
                            self.loc(prop.span),
                        ));
                    }
                    if prop.computed {
                        return Err(TranspileError::feature(
                            ErrorCode::ComputedKey,
                            "computed object key",
                            self.loc(prop.span),
                        ));
                    }
                    let key = match &prop.key {
                        PropertyKey::StaticIdentifier(ident) => {
                            build::str_const(ident.name.as_str())
                        }
                        PropertyKey::StringLiteral(lit) => build::str_const(lit.value.as_str()),
                        // Numeric keys coerce to strings the way the source
                        // language stringifies numbers: 1.0 is "1".
                        PropertyKey::NumericLiteral(lit) => {
                            build::str_const(js_number_string(lit.value))
                        }
                        other => {
                            return Err(TranspileError::feature(
                                ErrorCode::ObjectKey,
                                "object key that is not an identifier, string, or number",
                                self.loc(other.span()),
                            ));
                        }
                    };
                    keys.push(key);
                    values.push(self.transform_expression(&prop.value)?);
                }
                ObjectPropertyKind::SpreadProperty(spread) => {
                    return Err(TranspileError::unsupported_node(
                        "object spread property",
                        self.loc(spread.span),
                    ));
                }
            }
        }
        Ok(PyExpr::Dict { keys, values })
    }

    fn transform_static_member(
        &mut self,
        member: &StaticMemberExpression,
    ) -> TranspileResult<PyExpr> {
        if member.optional {
            return Err(TranspileError::unsupported_node(
                "optional chaining",
                self.loc(member.span),
            ));
        }
        let property = member.property.name.as_str();

        if let Expression::Identifier(object) = &member.object {
            if object.name == "Math" && property == "PI" {
                let alias = self.imports.add_stdlib("math");
                return Ok(build::attribute(build::name(alias), "pi"));
            }
        }

        // `.length` reads become len(); everything else is a subscript, since
        // translated objects are dicts.
        if property == "length" {
            let object = self.transform_expression(&member.object)?;
            return Ok(build::call_name("len", vec![object]));
        }
        let object = self.transform_expression(&member.object)?;
        Ok(build::subscript(object, build::str_const(property)))
    }

    fn transform_computed_member(
        &mut self,
        member: &ComputedMemberExpression,
    ) -> TranspileResult<PyExpr> {
        if member.optional {
            return Err(TranspileError::unsupported_node(
                "optional chaining",
                self.loc(member.span),
            ));
        }
        let object = self.transform_expression(&member.object)?;
        let key = self.transform_expression(&member.expression)?;
        Ok(build::subscript(object, key))
    }

    fn transform_binary_expression(
        &mut self,
        binary: &BinaryExpression,
    ) -> TranspileResult<PyExpr> {
        match binary.operator {
            BinaryOperator::StrictEquality | BinaryOperator::StrictInequality => {
                let helper = if binary.operator == BinaryOperator::StrictEquality {
                    "js_strict_eq"
                } else {
                    "js_strict_neq"
                };
                self.imports.add_runtime(helper);
                let left = self.transform_expression(&binary.left)?;
                let right = self.transform_expression(&binary.right)?;
                Ok(build::call_name(helper, vec![left, right]))
            }
            BinaryOperator::LessThan
            | BinaryOperator::LessEqualThan
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqualThan => {
                let op = match binary.operator {
                    BinaryOperator::LessThan => PyCmpOp::Lt,
                    BinaryOperator::LessEqualThan => PyCmpOp::LtE,
                    BinaryOperator::GreaterThan => PyCmpOp::Gt,
                    _ => PyCmpOp::GtE,
                };
                let left = self.transform_expression(&binary.left)?;
                let right = self.transform_expression(&binary.right)?;
                Ok(build::compare(left, op, right))
            }
            BinaryOperator::Addition
            | BinaryOperator::Subtraction
            | BinaryOperator::Multiplication
            | BinaryOperator::Division
            | BinaryOperator::Remainder => {
                let helper = match binary.operator {
                    BinaryOperator::Addition => "js_add",
                    BinaryOperator::Subtraction => "js_sub",
                    BinaryOperator::Multiplication => "js_mul",
                    BinaryOperator::Division => "js_div",
                    _ => "js_mod",
                };
                self.imports.add_runtime(helper);
                let left = self.transform_expression(&binary.left)?;
                let right = self.transform_expression(&binary.right)?;
                Ok(build::call_name(helper, vec![left, right]))
            }
            BinaryOperator::Equality | BinaryOperator::Inequality => {
                Err(TranspileError::feature_hint(
                    ErrorCode::UnsupportedFeature,
                    "loose equality",
                    self.loc(binary.span),
                    "use === / !== instead",
                ))
            }
            BinaryOperator::In => Err(TranspileError::unsupported_node(
                "`in` operator",
                self.loc(binary.span),
            )),
            BinaryOperator::Instanceof => Err(TranspileError::unsupported_node(
                "`instanceof` operator",
                self.loc(binary.span),
            )),
            _ => Err(TranspileError::feature(
                ErrorCode::UnsupportedFeature,
                "bitwise or shift operator",
                self.loc(binary.span),
            )),
        }
    }

    // `&&`/`||` must evaluate the left operand exactly once while yielding
    // the operand value, not its coerced boolean. The inline assignment
    // inside the ternary's test is what makes single evaluation hold.
    fn transform_logical_expression(
        &mut self,
        logical: &LogicalExpression,
    ) -> TranspileResult<PyExpr> {
        match logical.operator {
            LogicalOperator::And | LogicalOperator::Or => {
                let left = self.transform_expression(&logical.left)?;
                let tmp = self.fresh_temp();
                let test = self.truthy(build::named_expr(tmp.clone(), left));
                let right = self.transform_expression(&logical.right)?;
                Ok(match logical.operator {
                    LogicalOperator::And => build::if_exp(test, right, build::name(tmp)),
                    _ => build::if_exp(test, build::name(tmp), right),
                })
            }
            LogicalOperator::Coalesce => Err(TranspileError::unsupported_node(
                "nullish coalescing",
                self.loc(logical.span),
            )),
        }
    }

    fn transform_unary_expression(&mut self, unary: &UnaryExpression) -> TranspileResult<PyExpr> {
        match unary.operator {
            UnaryOperator::LogicalNot => {
                let argument = self.transform_expression(&unary.argument)?;
                let truthy = self.truthy(argument);
                Ok(build::unary(PyUnaryOp::Not, truthy))
            }
            UnaryOperator::UnaryNegation => {
                let argument = self.transform_expression(&unary.argument)?;
                Ok(build::unary(PyUnaryOp::USub, argument))
            }
            UnaryOperator::UnaryPlus => {
                let argument = self.transform_expression(&unary.argument)?;
                Ok(build::call_name(
                    self.imports.add_runtime("js_to_number"),
                    vec![argument],
                ))
            }
            UnaryOperator::Typeof => {
                let argument = self.transform_expression(&unary.argument)?;
                Ok(build::call_name(
                    self.imports.add_runtime("js_typeof"),
                    vec![argument],
                ))
            }
            UnaryOperator::Delete => Err(TranspileError::feature(
                ErrorCode::UnsupportedFeature,
                "`delete` operator",
                self.loc(unary.span),
            )),
            UnaryOperator::Void => Err(TranspileError::feature(
                ErrorCode::UnsupportedFeature,
                "`void` operator",
                self.loc(unary.span),
            )),
            UnaryOperator::BitwiseNot => Err(TranspileError::feature(
                ErrorCode::UnsupportedFeature,
                "`~` operator",
                self.loc(unary.span),
            )),
        }
    }

    fn transform_new_expression(&mut self, new_expr: &NewExpression) -> TranspileResult<PyExpr> {
        if let Expression::Identifier(callee) = &new_expr.callee {
            if callee.name == "Date" && new_expr.arguments.is_empty() {
                return Ok(build::call_name(
                    self.imports.add_runtime("js_date_now"),
                    vec![],
                ));
            }
        }
        Err(TranspileError::unsupported_node(
            "new expression",
            self.loc(new_expr.span),
        ))
    }

    // ===== Calls =====

    fn transform_call_expression(&mut self, call: &CallExpression) -> TranspileResult<PyExpr> {
        if call.optional {
            return Err(TranspileError::unsupported_node(
                "optional call",
                self.loc(call.span),
            ));
        }
        if let Expression::StaticMemberExpression(member) = &call.callee {
            if !member.optional {
                return self.transform_method_call(call, member);
            }
        }
        let func = self.transform_expression(&call.callee)?;
        let args = self.transform_arguments(call)?;
        Ok(build::call(func, args))
    }

    fn transform_arguments(&mut self, call: &CallExpression) -> TranspileResult<Vec<PyExpr>> {
        let mut args = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            if let Argument::SpreadElement(spread) = argument {
                return Err(TranspileError::unsupported_node(
                    "spread argument",
                    self.loc(spread.span),
                ));
            }
            args.push(self.transform_expression(argument.to_expression())?);
        }
        Ok(args)
    }

    fn expect_args(
        &mut self,
        call: &CallExpression,
        what: &str,
        count: usize,
    ) -> TranspileResult<Vec<PyExpr>> {
        let args = self.transform_arguments(call)?;
        if args.len() != count {
            return Err(TranspileError::feature(
                ErrorCode::UnsupportedFeature,
                format!("{} expects exactly {} argument(s)", what, count),
                self.loc(call.span),
            ));
        }
        Ok(args)
    }

    // Library rewrites dispatch on the callee shape alone; the subset has no
    // type inference.
    fn transform_method_call(
        &mut self,
        call: &CallExpression,
        member: &StaticMemberExpression,
    ) -> TranspileResult<PyExpr> {
        let method = member.property.name.as_str();

        if let Expression::Identifier(object) = &member.object {
            match (object.name.as_str(), method) {
                ("Math", _) => return self.transform_math_call(call, method),
                ("Date", "now") => {
                    self.expect_args(call, "Date.now", 0)?;
                    return Ok(build::call_name(
                        self.imports.add_runtime("js_date_now"),
                        vec![],
                    ));
                }
                ("console", "log") => {
                    let args = self.transform_arguments(call)?;
                    return Ok(build::call_name(
                        self.imports.add_runtime("console_log"),
                        args,
                    ));
                }
                _ => {}
            }
        }

        match method {
            "charAt" => {
                let recv = self.transform_expression(&member.object)?;
                let mut args = self.expect_args(call, "charAt", 1)?;
                let index = args.remove(0);
                let upper = build::binop(index.clone(), PyBinOp::Add, build::int(1));
                Ok(build::subscript(
                    recv,
                    build::slice(Some(index), Some(upper)),
                ))
            }
            "charCodeAt" => {
                let recv = self.transform_expression(&member.object)?;
                let mut args = self.expect_args(call, "charCodeAt", 1)?;
                let helper = self.imports.add_runtime("js_char_code_at");
                Ok(build::call_name(helper, vec![recv, args.remove(0)]))
            }
            "substring" => {
                let recv = self.transform_expression(&member.object)?;
                let mut args = self.transform_arguments(call)?;
                if args.is_empty() || args.len() > 2 {
                    return Err(TranspileError::feature(
                        ErrorCode::UnsupportedFeature,
                        "substring expects one or two arguments",
                        self.loc(call.span),
                    ));
                }
                let helper = self.imports.add_runtime("js_substring");
                let mut helper_args = vec![recv];
                helper_args.append(&mut args);
                Ok(build::call_name(helper, helper_args))
            }
            "toLowerCase" => {
                self.expect_args(call, "toLowerCase", 0)?;
                let recv = self.transform_expression(&member.object)?;
                Ok(build::method_call(recv, "lower", vec![]))
            }
            "toUpperCase" => {
                self.expect_args(call, "toUpperCase", 0)?;
                let recv = self.transform_expression(&member.object)?;
                Ok(build::method_call(recv, "upper", vec![]))
            }
            "indexOf" => {
                let recv = self.transform_expression(&member.object)?;
                let args = self.expect_args(call, "indexOf", 1)?;
                Ok(build::method_call(recv, "find", args))
            }
            "slice" => {
                let recv = self.transform_expression(&member.object)?;
                let mut args = self.transform_arguments(call)?;
                if args.is_empty() || args.len() > 2 {
                    return Err(TranspileError::feature(
                        ErrorCode::UnsupportedFeature,
                        "slice expects one or two arguments",
                        self.loc(call.span),
                    ));
                }
                let lower = args.remove(0);
                let upper = if args.is_empty() {
                    None
                } else {
                    Some(args.remove(0))
                };
                Ok(build::subscript(recv, build::slice(Some(lower), upper)))
            }
            "split" => {
                let recv = self.transform_expression(&member.object)?;
                let args = self.expect_args(call, "split", 1)?;
                Ok(build::method_call(recv, "split", args))
            }
            "trim" => {
                self.expect_args(call, "trim", 0)?;
                let recv = self.transform_expression(&member.object)?;
                Ok(build::method_call(recv, "strip", vec![]))
            }
            "replace" => {
                let recv = self.transform_expression(&member.object)?;
                let mut args = self.expect_args(call, "replace", 2)?;
                // Source semantics replace the first occurrence only.
                args.push(build::int(1));
                Ok(build::method_call(recv, "replace", args))
            }
            "push" => {
                if !matches!(member.object, Expression::ArrayExpression(_)) {
                    return Err(TranspileError::feature_hint(
                        ErrorCode::ArrayMethodAmbiguous,
                        "array method on a receiver that is not an array literal",
                        self.loc(call.span),
                        "there is no type inference; only literal receivers are rewritten",
                    ));
                }
                let args = self.transform_arguments(call)?;
                if args.len() != 1 {
                    return Err(TranspileError::feature(
                        ErrorCode::ArrayPushMultiArg,
                        "push with other than one argument",
                        self.loc(call.span),
                    ));
                }
                let recv = self.transform_expression(&member.object)?;
                Ok(build::method_call(recv, "append", args))
            }
            "pop" => {
                if !matches!(member.object, Expression::ArrayExpression(_)) {
                    return Err(TranspileError::feature_hint(
                        ErrorCode::ArrayMethodAmbiguous,
                        "array method on a receiver that is not an array literal",
                        self.loc(call.span),
                        "there is no type inference; only literal receivers are rewritten",
                    ));
                }
                self.expect_args(call, "pop", 0)?;
                let recv = self.transform_expression(&member.object)?;
                let helper = self.imports.add_runtime("js_array_pop");
                Ok(build::call_name(helper, vec![recv]))
            }
            _ => {
                // User method stored as a property: obj["m"](...).
                let recv = self.transform_expression(&member.object)?;
                let func = build::subscript(recv, build::str_const(method));
                let args = self.transform_arguments(call)?;
                Ok(build::call(func, args))
            }
        }
    }

    fn transform_math_call(
        &mut self,
        call: &CallExpression,
        method: &str,
    ) -> TranspileResult<PyExpr> {
        match method {
            "abs" => {
                let args = self.expect_args(call, "Math.abs", 1)?;
                Ok(build::call_name("abs", args))
            }
            "max" | "min" => {
                let args = self.transform_arguments(call)?;
                if args.len() < 2 {
                    return Err(TranspileError::feature(
                        ErrorCode::UnsupportedFeature,
                        format!("Math.{} with fewer than two arguments", method),
                        self.loc(call.span),
                    ));
                }
                Ok(build::call_name(if method == "max" { "max" } else { "min" }, args))
            }
            "sqrt" | "floor" | "ceil" | "log" | "log10" | "log2" | "sin" | "cos" | "tan" => {
                let args = self.expect_args(call, &format!("Math.{}", method), 1)?;
                let alias = self.imports.add_stdlib("math");
                Ok(build::call(
                    build::attribute(build::name(alias), method),
                    args,
                ))
            }
            // Python's math module has no round; floor(x + 0.5) matches the
            // source language's rounding, including negative halves.
            "round" => {
                let mut args = self.expect_args(call, "Math.round", 1)?;
                let alias = self.imports.add_stdlib("math");
                let shifted = build::binop(args.remove(0), PyBinOp::Add, build::float(0.5));
                Ok(build::call(
                    build::attribute(build::name(alias), "floor"),
                    vec![shifted],
                ))
            }
            "pow" => {
                let mut args = self.expect_args(call, "Math.pow", 2)?;
                let exponent = args.pop().expect("two args");
                let base = args.pop().expect("two args");
                Ok(build::binop(base, PyBinOp::Pow, exponent))
            }
            "random" => {
                self.expect_args(call, "Math.random", 0)?;
                let alias = self.imports.add_stdlib("random");
                Ok(build::call(
                    build::attribute(build::name(alias), "random"),
                    vec![],
                ))
            }
            _ => Err(TranspileError::feature(
                ErrorCode::UnsupportedFeature,
                format!("Math.{}", method),
                self.loc(call.span),
            )),
        }
    }
}

impl Default for Transpiler {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Helpers =====

/// var declarators anywhere under `stmts`, not descending into nested
/// functions. `BTreeSet` keeps the hoist block alphabetized.
fn collect_var_names(stmts: &[Statement], out: &mut BTreeSet<String>) {
    for stmt in stmts {
        collect_var_names_in(stmt, out);
    }
}

fn collect_var_names_in(stmt: &Statement, out: &mut BTreeSet<String>) {
    match stmt {
        Statement::VariableDeclaration(decl) => collect_declarators(decl, out),
        Statement::BlockStatement(block) => collect_var_names(&block.body, out),
        Statement::IfStatement(if_stmt) => {
            collect_var_names_in(&if_stmt.consequent, out);
            if let Some(alternate) = &if_stmt.alternate {
                collect_var_names_in(alternate, out);
            }
        }
        Statement::WhileStatement(while_stmt) => collect_var_names_in(&while_stmt.body, out),
        Statement::ForStatement(for_stmt) => {
            if let Some(ForStatementInit::VariableDeclaration(decl)) = &for_stmt.init {
                collect_declarators(decl, out);
            }
            collect_var_names_in(&for_stmt.body, out);
        }
        Statement::ForInStatement(for_in) => {
            if let ForStatementLeft::VariableDeclaration(decl) = &for_in.left {
                collect_declarators(decl, out);
            }
            collect_var_names_in(&for_in.body, out);
        }
        Statement::SwitchStatement(switch) => {
            for case in &switch.cases {
                collect_var_names(&case.consequent, out);
            }
        }
        Statement::LabeledStatement(labeled) => collect_var_names_in(&labeled.body, out),
        _ => {}
    }
}

fn collect_declarators(decl: &VariableDeclaration, out: &mut BTreeSet<String>) {
    if decl.kind != VariableDeclarationKind::Var {
        return;
    }
    for declarator in &decl.declarations {
        if let BindingPattern::BindingIdentifier(ident) = &declarator.id {
            out.insert(ident.name.to_string());
        }
    }
}

/// Whether every control path through `stmts` ends the enclosing switch case.
fn block_terminates(stmts: &[Statement]) -> bool {
    stmts.iter().any(statement_terminates)
}

fn statement_terminates(stmt: &Statement) -> bool {
    match stmt {
        Statement::ReturnStatement(_)
        | Statement::BreakStatement(_)
        | Statement::ContinueStatement(_)
        | Statement::ThrowStatement(_) => true,
        Statement::BlockStatement(block) => block_terminates(&block.body),
        Statement::IfStatement(if_stmt) => match &if_stmt.alternate {
            Some(alternate) => {
                statement_terminates(&if_stmt.consequent) && statement_terminates(alternate)
            }
            None => false,
        },
        _ => false,
    }
}

/// A source number as a Python constant: integral doubles in the safe range
/// print as integers.
fn number_constant(value: f64) -> PyExpr {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        build::int(value as i64)
    } else {
        build::float(value)
    }
}

/// A source number stringified the way the source language does for object
/// keys: `1.0` is `"1"`.
fn js_number_string(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transpile(source: &str) -> String {
        Transpiler::new()
            .transpile(source, "test.js")
            .expect("transpile failed")
    }

    fn transpile_err(source: &str) -> TranspileError {
        Transpiler::new()
            .transpile(source, "test.js")
            .expect_err("expected failure")
    }

    #[test]
    fn test_var_declaration() {
        assert_eq!(transpile("var x = 1;"), "x = 1\n");
    }

    #[test]
    fn test_uninitialized_var_is_undefined() {
        assert_eq!(
            transpile("var x;"),
            "from js_compat import JSUndefined\nx = JSUndefined\n"
        );
    }

    #[test]
    fn test_multiple_declarators_expand() {
        assert_eq!(transpile("var a = 1, b = 2;"), "a = 1\nb = 2\n");
    }

    #[test]
    fn test_reserved_word_sanitized() {
        assert_eq!(transpile("var from = 1; var x = from;"), "from_js = 1\nx = from_js\n");
    }

    #[test]
    fn test_undefined_nan_infinity() {
        assert_eq!(
            transpile("var u = undefined;"),
            "from js_compat import JSUndefined\nu = JSUndefined\n"
        );
        assert_eq!(transpile("var n = NaN;"), "n = float('nan')\n");
        assert_eq!(
            transpile("var i = Infinity;"),
            "import math as _js_math\ni = _js_math.inf\n"
        );
        assert_eq!(
            transpile("var i = -Infinity;"),
            "import math as _js_math\ni = -_js_math.inf\n"
        );
    }

    #[test]
    fn test_arithmetic_routes_through_runtime() {
        assert_eq!(
            transpile("var x = 1 + 2 * 3;"),
            "from js_compat import js_add, js_mul\nx = js_add(1, js_mul(2, 3))\n"
        );
    }

    #[test]
    fn test_strict_equality_routes_through_runtime() {
        let out = transpile("var b = a === 1; var c = a !== 2;");
        assert!(out.contains("b = js_strict_eq(a, 1)"));
        assert!(out.contains("c = js_strict_neq(a, 2)"));
    }

    #[test]
    fn test_relational_operators_native() {
        assert_eq!(transpile("var b = x < 10;"), "b = x < 10\n");
        assert_eq!(transpile("var b = x >= y;"), "b = x >= y\n");
    }

    #[test]
    fn test_member_length_is_len() {
        assert_eq!(transpile("var n = s.length;"), "n = len(s)\n");
    }

    #[test]
    fn test_member_access_is_subscript() {
        assert_eq!(transpile("var v = obj.field;"), "v = obj['field']\n");
        assert_eq!(transpile("var v = obj[k];"), "v = obj[k]\n");
    }

    #[test]
    fn test_member_assignment() {
        assert_eq!(transpile("obj.field = 1;"), "obj['field'] = 1\n");
        assert_eq!(transpile("obj[k] = 1;"), "obj[k] = 1\n");
    }

    #[test]
    fn test_object_literal_keys() {
        assert_eq!(
            transpile("var o = {a: 1, \"b c\": 2, 3: 4, 1.0: 5};"),
            "o = {'a': 1, 'b c': 2, '3': 4, '1': 5}\n"
        );
    }

    #[test]
    fn test_array_holes_become_none() {
        assert_eq!(transpile("var a = [1, , 3];"), "a = [1, None, 3]\n");
    }

    #[test]
    fn test_augmented_assignment_expands() {
        assert_eq!(
            transpile("x += 2;"),
            "from js_compat import js_add\nx = js_add(x, 2)\n"
        );
        assert_eq!(
            transpile("x %= 2;"),
            "from js_compat import js_mod\nx = js_mod(x, 2)\n"
        );
    }

    #[test]
    fn test_update_statement() {
        assert_eq!(
            transpile("x++;"),
            "from js_compat import js_add\nx = js_add(x, 1)\n"
        );
        assert_eq!(
            transpile("--x;"),
            "from js_compat import js_sub\nx = js_sub(x, 1)\n"
        );
    }

    #[test]
    fn test_if_wraps_truthy() {
        assert_eq!(
            transpile("if (x) { y = 1; } else { y = 2; }"),
            "from js_compat import js_truthy\nif js_truthy(x):\n    y = 1\nelse:\n    y = 2\n"
        );
    }

    #[test]
    fn test_single_statement_bodies_wrap() {
        assert_eq!(
            transpile("if (x) y = 1;"),
            "from js_compat import js_truthy\nif js_truthy(x):\n    y = 1\n"
        );
    }

    #[test]
    fn test_conditional_expression() {
        assert_eq!(
            transpile("var v = t ? a : b;"),
            "from js_compat import js_truthy\nv = a if js_truthy(t) else b\n"
        );
    }

    #[test]
    fn test_logical_and_single_evaluation() {
        assert_eq!(
            transpile("var v = a && b;"),
            "from js_compat import js_truthy\n\
             v = b if js_truthy((__js_tmp1 := a)) else __js_tmp1\n"
        );
    }

    #[test]
    fn test_logical_or_single_evaluation() {
        assert_eq!(
            transpile("var v = a || b;"),
            "from js_compat import js_truthy\n\
             v = __js_tmp1 if js_truthy((__js_tmp1 := a)) else b\n"
        );
    }

    #[test]
    fn test_not_wraps_truthy() {
        assert_eq!(
            transpile("var v = !x;"),
            "from js_compat import js_truthy\nv = not js_truthy(x)\n"
        );
    }

    #[test]
    fn test_unary_plus_is_to_number() {
        assert_eq!(
            transpile("var v = +x;"),
            "from js_compat import js_to_number\nv = js_to_number(x)\n"
        );
    }

    #[test]
    fn test_typeof() {
        assert_eq!(
            transpile("var v = typeof x;"),
            "from js_compat import js_typeof\nv = js_typeof(x)\n"
        );
    }

    #[test]
    fn test_function_declaration_and_return() {
        assert_eq!(
            transpile("function f(a, b) { return a; }"),
            "def f(a, b):\n    return a\n"
        );
    }

    #[test]
    fn test_empty_function_gets_pass() {
        assert_eq!(transpile("function f() {}"), "def f():\n    pass\n");
    }

    #[test]
    fn test_bare_return_is_undefined() {
        assert_eq!(
            transpile("function f() { return; }"),
            "from js_compat import JSUndefined\ndef f():\n    return JSUndefined\n"
        );
    }

    #[test]
    fn test_hoist_block_alphabetized() {
        let out = transpile(
            "function f() { if (c) { var zz = 1; } var aa = 2; while (d) { var mm = 3; } }",
        );
        let aa = out.find("aa = JSUndefined").expect("aa hoisted");
        let mm = out.find("mm = JSUndefined").expect("mm hoisted");
        let zz = out.find("zz = JSUndefined").expect("zz hoisted");
        assert!(aa < mm && mm < zz);
    }

    #[test]
    fn test_hoisting_skips_nested_functions() {
        let out = transpile("function f() { function g() { var inner = 1; } var own = 2; }");
        assert!(out.contains("own = JSUndefined"));
        assert!(!out.contains("inner = JSUndefined"));
    }

    #[test]
    fn test_hoisting_skips_params() {
        let out = transpile("function f(p) { var p; var q; }");
        assert!(!out.contains("p = JSUndefined"));
        assert!(out.contains("q = JSUndefined"));
    }

    #[test]
    fn test_temp_counter_resets_per_function() {
        let out = transpile("function f() { var v = a && b; }\nfunction g() { var w = c && d; }");
        assert_eq!(out.matches("__js_tmp1").count(), 4);
        assert!(!out.contains("__js_tmp2"));
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(
            transpile("while (x) { x = y; }"),
            "from js_compat import js_truthy\nwhile js_truthy(x):\n    x = y\n"
        );
    }

    #[test]
    fn test_for_desugars_to_while() {
        let out = transpile("for (var i = 0; i < 3; i++) { s = i; }");
        assert_eq!(
            out,
            "from js_compat import js_add, js_truthy\n\
             i = 0\n\
             while js_truthy(i < 3):\n    \
             s = i\n    \
             i = js_add(i, 1)\n"
        );
    }

    #[test]
    fn test_for_without_clauses() {
        assert_eq!(
            transpile("for (;;) { break; }"),
            "while True:\n    break\n"
        );
    }

    #[test]
    fn test_for_sequence_init_and_update() {
        let out = transpile("for (i = 0, j = 9; i < j; i++, j--) { s = i; }");
        assert!(out.starts_with("from js_compat import js_add, js_sub, js_truthy\ni = 0\nj = 9\n"));
        assert!(out.contains("    i = js_add(i, 1)\n    j = js_sub(j, 1)\n"));
    }

    #[test]
    fn test_for_in_over_object() {
        assert_eq!(
            transpile("for (var k in obj) { v = k; }"),
            "from js_compat import js_for_in_keys\nfor k in js_for_in_keys(obj):\n    v = k\n"
        );
    }

    #[test]
    fn test_for_in_with_existing_identifier() {
        assert_eq!(
            transpile("for (k in obj) { v = k; }"),
            "from js_compat import js_for_in_keys\nfor k in js_for_in_keys(obj):\n    v = k\n"
        );
    }

    #[test]
    fn test_continue_injection_only_for_own_loop() {
        // The inner while's continue must not replay the outer for's update.
        let out = transpile(
            "for (var i = 0; i < 3; i++) { while (x) { continue; } }",
        );
        let body = out.split("while js_truthy(x):").nth(1).expect("inner loop");
        let (inner_body, _) = body.split_at(body.find("    i = js_add").unwrap_or(body.len()));
        assert!(inner_body.contains("continue"));
        assert!(!inner_body.contains("js_add(i, 1)"));
    }

    #[test]
    fn test_math_builtins() {
        assert_eq!(transpile("var v = Math.abs(x);"), "v = abs(x)\n");
        assert_eq!(transpile("var v = Math.max(a, b);"), "v = max(a, b)\n");
        assert_eq!(
            transpile("var v = Math.sqrt(x);"),
            "import math as _js_math\nv = _js_math.sqrt(x)\n"
        );
        assert_eq!(transpile("var v = Math.pow(a, b);"), "v = a ** b\n");
        assert_eq!(
            transpile("var v = Math.random();"),
            "import random as _js_random\nv = _js_random.random()\n"
        );
        assert_eq!(
            transpile("var v = Math.PI;"),
            "import math as _js_math\nv = _js_math.pi\n"
        );
        assert_eq!(
            transpile("var v = Math.round(x);"),
            "import math as _js_math\nv = _js_math.floor(x + 0.5)\n"
        );
    }

    #[test]
    fn test_date_now() {
        assert_eq!(
            transpile("var t = Date.now();"),
            "from js_compat import js_date_now\nt = js_date_now()\n"
        );
        assert_eq!(
            transpile("var t = new Date();"),
            "from js_compat import js_date_now\nt = js_date_now()\n"
        );
    }

    #[test]
    fn test_console_log() {
        assert_eq!(
            transpile("console.log(1, \"two\");"),
            "from js_compat import console_log\nconsole_log(1, 'two')\n"
        );
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(transpile("var c = s.charAt(i);"), "c = s[i:i + 1]\n");
        assert_eq!(
            transpile("var c = s.charCodeAt(0);"),
            "from js_compat import js_char_code_at\nc = js_char_code_at(s, 0)\n"
        );
        assert_eq!(
            transpile("var t = s.substring(1, 3);"),
            "from js_compat import js_substring\nt = js_substring(s, 1, 3)\n"
        );
        assert_eq!(transpile("var t = s.toLowerCase();"), "t = s.lower()\n");
        assert_eq!(transpile("var t = s.toUpperCase();"), "t = s.upper()\n");
        assert_eq!(transpile("var i = s.indexOf(x);"), "i = s.find(x)\n");
        assert_eq!(transpile("var t = s.slice(1, 3);"), "t = s[1:3]\n");
        assert_eq!(transpile("var t = s.slice(1);"), "t = s[1:]\n");
        assert_eq!(transpile("var p = s.split(d);"), "p = s.split(d)\n");
        assert_eq!(transpile("var t = s.trim();"), "t = s.strip()\n");
        assert_eq!(
            transpile("var t = s.replace(a, b);"),
            "t = s.replace(a, b, 1)\n"
        );
    }

    #[test]
    fn test_array_literal_push_pop() {
        assert_eq!(transpile("[1, 2].push(3);"), "[1, 2].append(3)\n");
        assert_eq!(
            transpile("var v = [1, 2].pop();"),
            "from js_compat import js_array_pop\nv = js_array_pop([1, 2])\n"
        );
    }

    #[test]
    fn test_unknown_method_is_generic_call() {
        assert_eq!(transpile("obj.run(1);"), "obj['run'](1)\n");
    }

    #[test]
    fn test_user_function_call() {
        assert_eq!(transpile("f(1, x);"), "f(1, x)\n");
    }

    #[test]
    fn test_switch_empty_default_aliases_forward() {
        // An empty default falls through into the next non-empty case, so
        // the else branch shares that case's body.
        let out = transpile(
            "function f(k) { switch (k) { default: case 1: return 1; case 2: return 2; } }",
        );
        assert!(out.contains("if js_strict_eq(__js_switch_disc_1, 1):"));
        assert!(out.contains("elif js_strict_eq(__js_switch_disc_1, 2):"));
        let else_branch = out.split("else:").nth(1).expect("else branch");
        assert!(else_branch.contains("return 1"));
    }

    #[test]
    fn test_switch_without_default_falls_off() {
        let out = transpile("function f(k) { switch (k) { case 1: return 1; } }");
        assert!(out.contains("while True:"));
        assert!(out.trim_end().ends_with("break"));
    }

    #[test]
    fn test_switch_disc_counter_is_global() {
        let out = transpile(
            "function f(k) { switch (k) { case 1: return 1; } }\n\
             function g(k) { switch (k) { case 1: return 1; } }",
        );
        assert!(out.contains("__js_switch_disc_1"));
        assert!(out.contains("__js_switch_disc_2"));
    }

    // ===== Rejections =====

    fn err_code(source: &str) -> ErrorCode {
        transpile_err(source).code().expect("coded error")
    }

    #[test]
    fn test_reject_let_const() {
        assert_eq!(err_code("let x = 1;"), ErrorCode::UnsupportedFeature);
        assert_eq!(err_code("const x = 1;"), ErrorCode::UnsupportedFeature);
    }

    #[test]
    fn test_reject_loose_equality() {
        assert_eq!(err_code("var b = a == 1;"), ErrorCode::UnsupportedFeature);
        assert_eq!(err_code("var b = a != 1;"), ErrorCode::UnsupportedFeature);
    }

    #[test]
    fn test_reject_member_augassign() {
        let err = transpile_err("obj.count += 5;");
        assert_eq!(err.code(), Some(ErrorCode::MemberAugAssign));
        let location = err.location().expect("location");
        assert_eq!(location.line, 1);
        assert_eq!(location.column, 10);
    }

    #[test]
    fn test_reject_update_on_member() {
        assert_eq!(err_code("obj.count++;"), ErrorCode::UpdateMember);
    }

    #[test]
    fn test_reject_update_as_value() {
        assert_eq!(err_code("var v = x++;"), ErrorCode::UpdateExprContext);
    }

    #[test]
    fn test_reject_sequence_outside_for() {
        assert_eq!(err_code("a = 1, b = 2;"), ErrorCode::SequenceExprContext);
    }

    #[test]
    fn test_reject_computed_key() {
        assert_eq!(err_code("var o = {[k]: 1};"), ErrorCode::ComputedKey);
    }

    #[test]
    fn test_reject_param_destructure() {
        assert_eq!(
            err_code("function f([a]) { return a; }"),
            ErrorCode::ParamDestructure
        );
        assert_eq!(
            err_code("function f({a}) { return a; }"),
            ErrorCode::ParamDestructure
        );
    }

    #[test]
    fn test_reject_rest_param_and_defaults() {
        assert_eq!(
            err_code("function f(...rest) { return rest; }"),
            ErrorCode::ParamDestructure
        );
        assert_eq!(
            err_code("function f(a = 1) { return a; }"),
            ErrorCode::ParamDestructure
        );
    }

    #[test]
    fn test_reject_var_destructure() {
        assert_eq!(err_code("var [a] = x;"), ErrorCode::VarDestructure);
        assert_eq!(err_code("var {a} = x;"), ErrorCode::VarDestructure);
    }

    #[test]
    fn test_reject_array_method_on_non_literal() {
        assert_eq!(err_code("arr.push(1);"), ErrorCode::ArrayMethodAmbiguous);
        assert_eq!(err_code("arr.pop();"), ErrorCode::ArrayMethodAmbiguous);
    }

    #[test]
    fn test_reject_push_multi_arg() {
        assert_eq!(err_code("[1].push(2, 3);"), ErrorCode::ArrayPushMultiArg);
    }

    #[test]
    fn test_reject_regex_literal() {
        assert_eq!(err_code("var r = /ab+/;"), ErrorCode::Regex);
    }

    #[test]
    fn test_reject_switch_fallthrough() {
        assert_eq!(
            err_code("function f(k) { switch (k) { case 1: x = 1; case 2: return 2; } }"),
            ErrorCode::SwitchFallthrough
        );
    }

    #[test]
    fn test_switch_if_both_branches_terminate_is_ok() {
        let out = transpile(
            "function f(k) { switch (k) { case 1: if (x) { return 1; } else { return 2; } default: return 3; } }",
        );
        assert!(out.contains("while True:"));
    }

    #[test]
    fn test_reject_unsupported_statements() {
        assert_eq!(err_code("throw x;"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("try { f(); } catch (e) {}"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("with (o) { f(); }"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("lbl: while (x) { break lbl; }"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("do { f(); } while (x);"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("function* g() { yield 1; }"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("async function h() { return 1; }"), ErrorCode::UnsupportedNode);
    }

    #[test]
    fn test_reject_unsupported_expressions() {
        assert_eq!(err_code("var v = this;"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("var v = new Thing();"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("var f = function () {};"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("var b = x instanceof y;"), ErrorCode::UnsupportedNode);
        assert_eq!(err_code("var b = k in o;"), ErrorCode::UnsupportedNode);
    }

    #[test]
    fn test_reject_bitwise() {
        assert_eq!(err_code("var v = a & b;"), ErrorCode::UnsupportedFeature);
        assert_eq!(err_code("var v = a << 2;"), ErrorCode::UnsupportedFeature);
        assert_eq!(err_code("var v = ~a;"), ErrorCode::UnsupportedFeature);
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = Transpiler::new()
            .transpile("var = ;", "test.js")
            .expect_err("parse failure");
        assert!(matches!(err, TranspileError::Parse(_)));
    }
}
