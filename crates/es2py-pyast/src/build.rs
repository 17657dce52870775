//! Thin constructors for the node shapes the transformer emits.
//!
//! These keep the visitor code declarative; none of them allocate beyond the
//! nodes themselves.

use crate::ast::{PyBinOp, PyBoolOp, PyCmpOp, PyConst, PyExpr, PyStmt, PyUnaryOp};

/// A name reference.
pub fn name(id: impl Into<String>) -> PyExpr {
    PyExpr::Name(id.into())
}

/// `None`
pub fn none() -> PyExpr {
    PyExpr::Constant(PyConst::None)
}

/// A boolean constant.
pub fn bool_const(value: bool) -> PyExpr {
    PyExpr::Constant(PyConst::Bool(value))
}

/// An integer constant.
pub fn int(value: i64) -> PyExpr {
    PyExpr::Constant(PyConst::Int(value))
}

/// A float constant. Must be finite.
pub fn float(value: f64) -> PyExpr {
    PyExpr::Constant(PyConst::Float(value))
}

/// A string constant.
pub fn str_const(value: impl Into<String>) -> PyExpr {
    PyExpr::Constant(PyConst::Str(value.into()))
}

/// `func(args...)`
pub fn call(func: PyExpr, args: Vec<PyExpr>) -> PyExpr {
    PyExpr::Call {
        func: Box::new(func),
        args,
        keywords: Vec::new(),
    }
}

/// `name(args...)`
pub fn call_name(func: &str, args: Vec<PyExpr>) -> PyExpr {
    call(name(func), args)
}

/// `recv.method(args...)`
pub fn method_call(recv: PyExpr, method: &str, args: Vec<PyExpr>) -> PyExpr {
    call(attribute(recv, method), args)
}

/// `value.attr`
pub fn attribute(value: PyExpr, attr: impl Into<String>) -> PyExpr {
    PyExpr::Attribute {
        value: Box::new(value),
        attr: attr.into(),
    }
}

/// `value[index]`
pub fn subscript(value: PyExpr, index: PyExpr) -> PyExpr {
    PyExpr::Subscript {
        value: Box::new(value),
        index: Box::new(index),
    }
}

/// `lower:upper`
pub fn slice(lower: Option<PyExpr>, upper: Option<PyExpr>) -> PyExpr {
    PyExpr::Slice {
        lower: lower.map(Box::new),
        upper: upper.map(Box::new),
    }
}

/// Arithmetic binary operation.
pub fn binop(left: PyExpr, op: PyBinOp, right: PyExpr) -> PyExpr {
    PyExpr::BinOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// Unary operation.
pub fn unary(op: PyUnaryOp, operand: PyExpr) -> PyExpr {
    PyExpr::UnaryOp {
        op,
        operand: Box::new(operand),
    }
}

/// A single comparison.
pub fn compare(left: PyExpr, op: PyCmpOp, right: PyExpr) -> PyExpr {
    PyExpr::Compare {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// `a or b or ...`
pub fn bool_or(values: Vec<PyExpr>) -> PyExpr {
    PyExpr::BoolOp {
        op: PyBoolOp::Or,
        values,
    }
}

/// `body if test else orelse`
pub fn if_exp(test: PyExpr, body: PyExpr, orelse: PyExpr) -> PyExpr {
    PyExpr::IfExp {
        test: Box::new(test),
        body: Box::new(body),
        orelse: Box::new(orelse),
    }
}

/// `(target := value)`
pub fn named_expr(target: impl Into<String>, value: PyExpr) -> PyExpr {
    PyExpr::NamedExpr {
        target: target.into(),
        value: Box::new(value),
    }
}

/// `target = value`
pub fn assign(target: PyExpr, value: PyExpr) -> PyStmt {
    PyStmt::Assign {
        targets: vec![target],
        value,
    }
}

/// `name = value`
pub fn assign_name(target: impl Into<String>, value: PyExpr) -> PyStmt {
    assign(name(target), value)
}

/// Bare expression statement.
pub fn expr_stmt(value: PyExpr) -> PyStmt {
    PyStmt::Expr { value }
}

/// Wrap a suite so it is never empty.
pub fn suite(body: Vec<PyStmt>) -> Vec<PyStmt> {
    if body.is_empty() {
        vec![PyStmt::Pass]
    } else {
        body
    }
}
