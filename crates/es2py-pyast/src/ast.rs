//! Python AST node shapes

/// A complete Python module: the import block followed by the translated body.
#[derive(Debug, Clone, PartialEq)]
pub struct PyModule {
    /// Top-level statements, imports first.
    pub body: Vec<PyStmt>,
}

/// A Python statement.
#[derive(Debug, Clone, PartialEq)]
pub enum PyStmt {
    /// `import <module> as <alias>`
    Import {
        /// Module name, e.g. `math`.
        module: String,
        /// Local alias, e.g. `_js_math`.
        alias: String,
    },
    /// `from <module> import <names>`
    ImportFrom {
        /// Module name.
        module: String,
        /// Imported names, emitted in the order given.
        names: Vec<String>,
    },
    /// `def <name>(<args>):`
    FunctionDef {
        /// Function name (already sanitized).
        name: String,
        /// Positional parameter names.
        args: Vec<String>,
        /// Body suite; never empty (a `Pass` is inserted instead).
        body: Vec<PyStmt>,
    },
    /// `<targets> = <value>`
    Assign {
        /// Assignment targets (names or subscripts).
        targets: Vec<PyExpr>,
        /// Assigned value.
        value: PyExpr,
    },
    /// Bare expression statement.
    Expr {
        /// The evaluated expression.
        value: PyExpr,
    },
    /// `return <value>`
    Return {
        /// Returned value; the transformer never emits a bare `return`.
        value: PyExpr,
    },
    /// `if`/`elif`/`else` cascade.
    If {
        /// Condition.
        test: PyExpr,
        /// Then-suite.
        body: Vec<PyStmt>,
        /// Else-suite; a single nested `If` renders as `elif`.
        orelse: Vec<PyStmt>,
    },
    /// `while <test>:`
    While {
        /// Condition.
        test: PyExpr,
        /// Loop suite.
        body: Vec<PyStmt>,
        /// Else-suite (unused by the transformer, kept for vocabulary parity).
        orelse: Vec<PyStmt>,
    },
    /// `for <target> in <iter>:`
    For {
        /// Loop variable.
        target: PyExpr,
        /// Iterated expression.
        iter: PyExpr,
        /// Loop suite.
        body: Vec<PyStmt>,
        /// Else-suite (unused by the transformer, kept for vocabulary parity).
        orelse: Vec<PyStmt>,
    },
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `pass`
    Pass,
}

/// A Python expression.
///
/// Load/store context is implied by position (assignment target vs. operand);
/// the emitter does not need an explicit `ctx` field.
#[derive(Debug, Clone, PartialEq)]
pub enum PyExpr {
    /// An identifier reference.
    Name(String),
    /// A literal constant.
    Constant(PyConst),
    /// `[a, b, ...]`
    List(Vec<PyExpr>),
    /// `(a, b)`
    Tuple(Vec<PyExpr>),
    /// `{k: v, ...}`; `keys` and `values` are parallel.
    Dict {
        /// Literal keys.
        keys: Vec<PyExpr>,
        /// Literal values.
        values: Vec<PyExpr>,
    },
    /// `f(args, k=v)`
    Call {
        /// Callee.
        func: Box<PyExpr>,
        /// Positional arguments.
        args: Vec<PyExpr>,
        /// Keyword arguments.
        keywords: Vec<(String, PyExpr)>,
    },
    /// `value.attr`
    Attribute {
        /// Receiver.
        value: Box<PyExpr>,
        /// Attribute name.
        attr: String,
    },
    /// `value[index]`; `index` may be a `Slice`.
    Subscript {
        /// Subscripted value.
        value: Box<PyExpr>,
        /// Index or slice.
        index: Box<PyExpr>,
    },
    /// `lower:upper`, only valid as a `Subscript` index.
    Slice {
        /// Lower bound; omitted bound renders empty.
        lower: Option<Box<PyExpr>>,
        /// Upper bound; omitted bound renders empty.
        upper: Option<Box<PyExpr>>,
    },
    /// Arithmetic binary operation.
    BinOp {
        /// Left operand.
        left: Box<PyExpr>,
        /// Operator.
        op: PyBinOp,
        /// Right operand.
        right: Box<PyExpr>,
    },
    /// Unary operation.
    UnaryOp {
        /// Operator.
        op: PyUnaryOp,
        /// Operand.
        operand: Box<PyExpr>,
    },
    /// A single comparison (never chained).
    Compare {
        /// Left operand.
        left: Box<PyExpr>,
        /// Operator.
        op: PyCmpOp,
        /// Right operand.
        right: Box<PyExpr>,
    },
    /// `a or b or ...` / `a and b and ...`
    BoolOp {
        /// Operator.
        op: PyBoolOp,
        /// Operands, two or more.
        values: Vec<PyExpr>,
    },
    /// `body if test else orelse`
    IfExp {
        /// Condition.
        test: Box<PyExpr>,
        /// Value when true.
        body: Box<PyExpr>,
        /// Value when false.
        orelse: Box<PyExpr>,
    },
    /// `(target := value)`, always parenthesized on emission.
    NamedExpr {
        /// Bound name.
        target: String,
        /// Bound value.
        value: Box<PyExpr>,
    },
}

/// A literal constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum PyConst {
    /// `None`
    None,
    /// `True` / `False`
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal; never NaN or infinite (those are emitted as calls).
    Float(f64),
    /// String literal.
    Str(String),
}

/// Arithmetic binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyBinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mult,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyUnaryOp {
    /// `not`
    Not,
    /// Unary `-`
    USub,
}

/// Comparison operators.
///
/// Equality members are intentionally absent: translated equality always goes
/// through `js_strict_eq`/`js_strict_neq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyCmpOp {
    /// `<`
    Lt,
    /// `<=`
    LtE,
    /// `>`
    Gt,
    /// `>=`
    GtE,
}

/// Boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyBoolOp {
    /// `and`
    And,
    /// `or`
    Or,
}
