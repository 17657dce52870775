//! Ancestry tagging pre-pass
//!
//! Runs before the transformer. Walks the statement tree with a stack of
//! enclosing iteration constructs, assigns a fresh monotonic id to every
//! loop, and validates `break`/`continue` placement. The parser's AST is not
//! ours to mutate, so the annotations live in a side-table keyed by node span
//! (statement spans are unique within one source).

use std::collections::HashMap;

use oxc_ast::ast::{Program, Statement};
use oxc_span::Span;

use crate::error::{ErrorCode, LineIndex, TranspileError, TranspileResult};

/// Identifier of one loop, unique within a transform.
pub type LoopId = u32;

/// What a `break` statement exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakTarget {
    /// Innermost construct is a loop with this id.
    Loop(LoopId),
    /// Innermost construct is a switch.
    Switch,
}

/// Ancestry facts collected by the tagger, keyed by node span start.
#[derive(Debug, Default)]
pub struct AncestryTable {
    loops: HashMap<u32, LoopId>,
    continues: HashMap<u32, LoopId>,
    breaks: HashMap<u32, BreakTarget>,
}

impl AncestryTable {
    /// The id assigned to a loop statement.
    pub fn loop_id(&self, span: Span) -> Option<LoopId> {
        self.loops.get(&span.start).copied()
    }

    /// The innermost enclosing loop of a `continue` statement.
    pub fn continue_loop(&self, span: Span) -> Option<LoopId> {
        self.continues.get(&span.start).copied()
    }

    /// The target of a `break` statement.
    pub fn break_target(&self, span: Span) -> Option<BreakTarget> {
        self.breaks.get(&span.start).copied()
    }
}

#[derive(Debug, Clone, Copy)]
enum Enclosing {
    Loop(LoopId),
    Switch,
}

/// The tagging pass itself.
pub struct AncestryTagger<'a> {
    line_index: &'a LineIndex,
    stack: Vec<Enclosing>,
    next_loop_id: LoopId,
    table: AncestryTable,
}

impl<'a> AncestryTagger<'a> {
    /// A tagger for one source, using `line_index` for error locations.
    pub fn new(line_index: &'a LineIndex) -> Self {
        Self {
            line_index,
            stack: Vec::new(),
            next_loop_id: 0,
            table: AncestryTable::default(),
        }
    }

    /// Tag a whole program, returning the side-table.
    pub fn tag_program(mut self, program: &Program) -> TranspileResult<AncestryTable> {
        for stmt in &program.body {
            self.visit_statement(stmt)?;
        }
        Ok(self.table)
    }

    fn enter_loop(&mut self, span: Span) -> LoopId {
        self.next_loop_id += 1;
        let id = self.next_loop_id;
        self.table.loops.insert(span.start, id);
        self.stack.push(Enclosing::Loop(id));
        id
    }

    fn innermost_loop(&self) -> Option<LoopId> {
        self.stack.iter().rev().find_map(|e| match e {
            Enclosing::Loop(id) => Some(*id),
            Enclosing::Switch => None,
        })
    }

    fn visit_statement(&mut self, stmt: &Statement) -> TranspileResult<()> {
        match stmt {
            Statement::BlockStatement(block) => {
                for stmt in &block.body {
                    self.visit_statement(stmt)?;
                }
            }
            Statement::IfStatement(if_stmt) => {
                self.visit_statement(&if_stmt.consequent)?;
                if let Some(alternate) = &if_stmt.alternate {
                    self.visit_statement(alternate)?;
                }
            }
            Statement::WhileStatement(while_stmt) => {
                self.enter_loop(while_stmt.span);
                self.visit_statement(&while_stmt.body)?;
                self.stack.pop();
            }
            Statement::ForStatement(for_stmt) => {
                self.enter_loop(for_stmt.span);
                self.visit_statement(&for_stmt.body)?;
                self.stack.pop();
            }
            Statement::ForInStatement(for_in) => {
                self.enter_loop(for_in.span);
                self.visit_statement(&for_in.body)?;
                self.stack.pop();
            }
            Statement::SwitchStatement(switch) => {
                self.stack.push(Enclosing::Switch);
                for case in &switch.cases {
                    for stmt in &case.consequent {
                        self.visit_statement(stmt)?;
                    }
                }
                self.stack.pop();
            }
            Statement::LabeledStatement(labeled) => {
                // Rejected by the transformer; still walked so placement
                // errors inside the body surface with their own codes.
                self.visit_statement(&labeled.body)?;
            }
            Statement::FunctionDeclaration(func) => {
                // break/continue never cross a function boundary.
                let saved = std::mem::take(&mut self.stack);
                if let Some(body) = &func.body {
                    for stmt in &body.statements {
                        self.visit_statement(stmt)?;
                    }
                }
                self.stack = saved;
            }
            Statement::BreakStatement(break_stmt) => {
                let target = match self.stack.last() {
                    Some(Enclosing::Loop(id)) => BreakTarget::Loop(*id),
                    Some(Enclosing::Switch) => BreakTarget::Switch,
                    None => {
                        return Err(TranspileError::feature(
                            ErrorCode::BreakOutside,
                            "`break` with no enclosing loop or switch",
                            self.line_index.location(break_stmt.span.start),
                        ));
                    }
                };
                self.table.breaks.insert(break_stmt.span.start, target);
            }
            Statement::ContinueStatement(continue_stmt) => {
                let location = self.line_index.location(continue_stmt.span.start);
                let Some(loop_id) = self.innermost_loop() else {
                    return Err(TranspileError::feature(
                        ErrorCode::ContinueOutside,
                        "`continue` with no enclosing loop",
                        location,
                    ));
                };
                if matches!(self.stack.last(), Some(Enclosing::Switch)) {
                    return Err(TranspileError::feature(
                        ErrorCode::ContinueInSwitch,
                        "`continue` inside a switch case",
                        location,
                    ));
                }
                self.table.continues.insert(continue_stmt.span.start, loop_id);
            }
            // Statements without nested statements, and kinds the transformer
            // rejects outright, need no tagging.
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn tag(source: &str) -> TranspileResult<AncestryTable> {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_script(true);
        let result = Parser::new(&allocator, source, source_type).parse();
        assert!(result.errors.is_empty(), "parse failed: {:?}", result.errors);
        let line_index = LineIndex::new(source);
        AncestryTagger::new(&line_index).tag_program(&result.program)
    }

    fn tag_err(source: &str) -> ErrorCode {
        tag(source).unwrap_err().code().expect("coded error")
    }

    #[test]
    fn test_break_outside_rejected() {
        assert_eq!(tag_err("break;"), ErrorCode::BreakOutside);
    }

    #[test]
    fn test_continue_outside_rejected() {
        assert_eq!(tag_err("continue;"), ErrorCode::ContinueOutside);
        assert_eq!(
            tag_err("switch (x) { case 1: continue; }"),
            ErrorCode::ContinueOutside
        );
    }

    #[test]
    fn test_continue_in_switch_rejected() {
        assert_eq!(
            tag_err("while (a) { switch (x) { case 1: continue; } }"),
            ErrorCode::ContinueInSwitch
        );
    }

    #[test]
    fn test_break_in_switch_allowed() {
        assert!(tag("switch (x) { case 1: break; }").is_ok());
    }

    #[test]
    fn test_function_boundary_resets_stacks() {
        assert_eq!(
            tag_err("while (a) { function f() { break; } }"),
            ErrorCode::BreakOutside
        );
        assert_eq!(
            tag_err("for (;;) { function f() { continue; } }"),
            ErrorCode::ContinueOutside
        );
    }

    #[test]
    fn test_loop_ids_are_monotonic() {
        let source = "while (a) {} while (b) {}";
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_script(true);
        let result = Parser::new(&allocator, source, source_type).parse();
        let line_index = LineIndex::new(source);
        let table = AncestryTagger::new(&line_index)
            .tag_program(&result.program)
            .unwrap();

        let Statement::WhileStatement(first) = &result.program.body[0] else {
            panic!("expected while");
        };
        let Statement::WhileStatement(second) = &result.program.body[1] else {
            panic!("expected while");
        };
        assert_eq!(table.loop_id(first.span), Some(1));
        assert_eq!(table.loop_id(second.span), Some(2));
    }

    #[test]
    fn test_continue_tagged_with_innermost_loop() {
        let source = "for (;;) { while (a) { continue; } continue; }";
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_script(true);
        let result = Parser::new(&allocator, source, source_type).parse();
        let line_index = LineIndex::new(source);
        let table = AncestryTagger::new(&line_index)
            .tag_program(&result.program)
            .unwrap();

        let Statement::ForStatement(for_stmt) = &result.program.body[0] else {
            panic!("expected for");
        };
        let Statement::BlockStatement(for_body) = &for_stmt.body else {
            panic!("expected block");
        };
        let Statement::WhileStatement(while_stmt) = &for_body.body[0] else {
            panic!("expected while");
        };
        let Statement::BlockStatement(while_body) = &while_stmt.body else {
            panic!("expected block");
        };
        let Statement::ContinueStatement(inner) = &while_body.body[0] else {
            panic!("expected continue");
        };
        let Statement::ContinueStatement(outer) = &for_body.body[1] else {
            panic!("expected continue");
        };

        assert_eq!(table.loop_id(for_stmt.span), Some(1));
        assert_eq!(table.loop_id(while_stmt.span), Some(2));
        assert_eq!(table.continue_loop(inner.span), Some(2));
        assert_eq!(table.continue_loop(outer.span), Some(1));
    }

    #[test]
    fn test_break_targets_recorded() {
        let source = "while (a) { break; } switch (x) { case 1: break; }";
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_script(true);
        let result = Parser::new(&allocator, source, source_type).parse();
        let line_index = LineIndex::new(source);
        let table = AncestryTagger::new(&line_index)
            .tag_program(&result.program)
            .unwrap();

        let Statement::WhileStatement(while_stmt) = &result.program.body[0] else {
            panic!("expected while");
        };
        let Statement::BlockStatement(while_body) = &while_stmt.body else {
            panic!("expected block");
        };
        let Statement::BreakStatement(loop_break) = &while_body.body[0] else {
            panic!("expected break");
        };
        assert_eq!(
            table.break_target(loop_break.span),
            Some(BreakTarget::Loop(1))
        );
    }
}
