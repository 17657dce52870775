//! Python source emission.
//!
//! Produces 4-space-indented Python 3.8 source with a single trailing
//! newline. Parenthesization is precedence-driven; `:=` is always wrapped.

use crate::ast::{PyBinOp, PyBoolOp, PyCmpOp, PyConst, PyExpr, PyModule, PyStmt, PyUnaryOp};

const INDENT: &str = "    ";

// Precedence levels, low to high, following the Python expression grammar.
const PREC_TERNARY: u8 = 1;
const PREC_OR: u8 = 2;
const PREC_AND: u8 = 3;
const PREC_NOT: u8 = 4;
const PREC_CMP: u8 = 5;
const PREC_ADD: u8 = 7;
const PREC_MUL: u8 = 8;
const PREC_UNARY: u8 = 9;
const PREC_POW: u8 = 10;
const PREC_POSTFIX: u8 = 12;
const PREC_ATOM: u8 = 13;

/// Emit a module as Python source.
pub fn unparse(module: &PyModule) -> String {
    let mut out = String::new();
    for stmt in &module.body {
        emit_stmt(&mut out, stmt, 0);
    }
    out
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

fn emit_suite(out: &mut String, body: &[PyStmt], level: usize) {
    if body.is_empty() {
        push_indent(out, level);
        out.push_str("pass\n");
        return;
    }
    for stmt in body {
        emit_stmt(out, stmt, level);
    }
}

fn emit_stmt(out: &mut String, stmt: &PyStmt, level: usize) {
    match stmt {
        PyStmt::Import { module, alias } => {
            push_indent(out, level);
            out.push_str("import ");
            out.push_str(module);
            out.push_str(" as ");
            out.push_str(alias);
            out.push('\n');
        }
        PyStmt::ImportFrom { module, names } => {
            push_indent(out, level);
            out.push_str("from ");
            out.push_str(module);
            out.push_str(" import ");
            out.push_str(&names.join(", "));
            out.push('\n');
        }
        PyStmt::FunctionDef { name, args, body } => {
            push_indent(out, level);
            out.push_str("def ");
            out.push_str(name);
            out.push('(');
            out.push_str(&args.join(", "));
            out.push_str("):\n");
            emit_suite(out, body, level + 1);
        }
        PyStmt::Assign { targets, value } => {
            push_indent(out, level);
            for target in targets {
                emit_expr(out, target, 0);
                out.push_str(" = ");
            }
            emit_expr(out, value, 0);
            out.push('\n');
        }
        PyStmt::Expr { value } => {
            push_indent(out, level);
            emit_expr(out, value, 0);
            out.push('\n');
        }
        PyStmt::Return { value } => {
            push_indent(out, level);
            out.push_str("return ");
            emit_expr(out, value, 0);
            out.push('\n');
        }
        PyStmt::If { test, body, orelse } => {
            emit_if(out, test, body, orelse, level, "if");
        }
        PyStmt::While { test, body, orelse } => {
            push_indent(out, level);
            out.push_str("while ");
            emit_expr(out, test, 0);
            out.push_str(":\n");
            emit_suite(out, body, level + 1);
            if !orelse.is_empty() {
                push_indent(out, level);
                out.push_str("else:\n");
                emit_suite(out, orelse, level + 1);
            }
        }
        PyStmt::For {
            target,
            iter,
            body,
            orelse,
        } => {
            push_indent(out, level);
            out.push_str("for ");
            emit_expr(out, target, 0);
            out.push_str(" in ");
            emit_expr(out, iter, 0);
            out.push_str(":\n");
            emit_suite(out, body, level + 1);
            if !orelse.is_empty() {
                push_indent(out, level);
                out.push_str("else:\n");
                emit_suite(out, orelse, level + 1);
            }
        }
        PyStmt::Break => {
            push_indent(out, level);
            out.push_str("break\n");
        }
        PyStmt::Continue => {
            push_indent(out, level);
            out.push_str("continue\n");
        }
        PyStmt::Pass => {
            push_indent(out, level);
            out.push_str("pass\n");
        }
    }
}

// A lone nested `If` in the else-suite folds into `elif`.
fn emit_if(
    out: &mut String,
    test: &PyExpr,
    body: &[PyStmt],
    orelse: &[PyStmt],
    level: usize,
    keyword: &str,
) {
    push_indent(out, level);
    out.push_str(keyword);
    out.push(' ');
    emit_expr(out, test, 0);
    out.push_str(":\n");
    emit_suite(out, body, level + 1);

    match orelse {
        [] => {}
        [PyStmt::If {
            test: elif_test,
            body: elif_body,
            orelse: elif_orelse,
        }] => {
            emit_if(out, elif_test, elif_body, elif_orelse, level, "elif");
        }
        _ => {
            push_indent(out, level);
            out.push_str("else:\n");
            emit_suite(out, orelse, level + 1);
        }
    }
}

fn prec(expr: &PyExpr) -> u8 {
    match expr {
        PyExpr::Name(_)
        | PyExpr::Constant(_)
        | PyExpr::List(_)
        | PyExpr::Tuple(_)
        | PyExpr::Dict { .. }
        // `:=` self-parenthesizes, so it binds like an atom from outside.
        | PyExpr::NamedExpr { .. } => PREC_ATOM,
        PyExpr::Call { .. } | PyExpr::Attribute { .. } | PyExpr::Subscript { .. } => PREC_POSTFIX,
        PyExpr::Slice { .. } => PREC_ATOM,
        PyExpr::BinOp { op, .. } => match op {
            PyBinOp::Add | PyBinOp::Sub => PREC_ADD,
            PyBinOp::Mult | PyBinOp::Div | PyBinOp::Mod => PREC_MUL,
            PyBinOp::Pow => PREC_POW,
        },
        PyExpr::UnaryOp { op, .. } => match op {
            PyUnaryOp::Not => PREC_NOT,
            PyUnaryOp::USub => PREC_UNARY,
        },
        PyExpr::Compare { .. } => PREC_CMP,
        PyExpr::BoolOp { op, .. } => match op {
            PyBoolOp::Or => PREC_OR,
            PyBoolOp::And => PREC_AND,
        },
        PyExpr::IfExp { .. } => PREC_TERNARY,
    }
}

fn emit_expr(out: &mut String, expr: &PyExpr, min_prec: u8) {
    let own = prec(expr);
    let parens = own < min_prec;
    if parens {
        out.push('(');
    }
    match expr {
        PyExpr::Name(id) => out.push_str(id),
        PyExpr::Constant(c) => emit_const(out, c),
        PyExpr::List(elements) => {
            out.push('[');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                emit_expr(out, element, 0);
            }
            out.push(']');
        }
        PyExpr::Tuple(elements) => {
            out.push('(');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                emit_expr(out, element, 0);
            }
            if elements.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        PyExpr::Dict { keys, values } => {
            out.push('{');
            for (i, (k, v)) in keys.iter().zip(values).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                emit_expr(out, k, 0);
                out.push_str(": ");
                emit_expr(out, v, 0);
            }
            out.push('}');
        }
        PyExpr::Call {
            func,
            args,
            keywords,
        } => {
            emit_expr(out, func, PREC_POSTFIX);
            out.push('(');
            let mut first = true;
            for arg in args {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                emit_expr(out, arg, 0);
            }
            for (key, value) in keywords {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                out.push_str(key);
                out.push('=');
                emit_expr(out, value, 0);
            }
            out.push(')');
        }
        PyExpr::Attribute { value, attr } => {
            emit_expr(out, value, PREC_POSTFIX);
            out.push('.');
            out.push_str(attr);
        }
        PyExpr::Subscript { value, index } => {
            emit_expr(out, value, PREC_POSTFIX);
            out.push('[');
            if let PyExpr::Slice { lower, upper } = index.as_ref() {
                if let Some(lower) = lower {
                    emit_expr(out, lower, PREC_TERNARY);
                }
                out.push(':');
                if let Some(upper) = upper {
                    emit_expr(out, upper, PREC_TERNARY);
                }
            } else {
                emit_expr(out, index, 0);
            }
            out.push(']');
        }
        PyExpr::Slice { lower, upper } => {
            // Only meaningful inside a subscript; kept total for robustness.
            if let Some(lower) = lower {
                emit_expr(out, lower, PREC_TERNARY);
            }
            out.push(':');
            if let Some(upper) = upper {
                emit_expr(out, upper, PREC_TERNARY);
            }
        }
        PyExpr::BinOp { left, op, right } => {
            let (text, left_min, right_min) = match op {
                PyBinOp::Add => (" + ", PREC_ADD, PREC_ADD + 1),
                PyBinOp::Sub => (" - ", PREC_ADD, PREC_ADD + 1),
                PyBinOp::Mult => (" * ", PREC_MUL, PREC_MUL + 1),
                PyBinOp::Div => (" / ", PREC_MUL, PREC_MUL + 1),
                PyBinOp::Mod => (" % ", PREC_MUL, PREC_MUL + 1),
                // `**` is right-associative.
                PyBinOp::Pow => (" ** ", PREC_POW + 1, PREC_POW),
            };
            emit_expr(out, left, left_min);
            out.push_str(text);
            emit_expr(out, right, right_min);
        }
        PyExpr::UnaryOp { op, operand } => match op {
            PyUnaryOp::Not => {
                out.push_str("not ");
                emit_expr(out, operand, PREC_NOT);
            }
            PyUnaryOp::USub => {
                out.push('-');
                emit_expr(out, operand, PREC_UNARY);
            }
        },
        PyExpr::Compare { left, op, right } => {
            let text = match op {
                PyCmpOp::Lt => " < ",
                PyCmpOp::LtE => " <= ",
                PyCmpOp::Gt => " > ",
                PyCmpOp::GtE => " >= ",
            };
            // Operands one level up so nested comparisons never chain.
            emit_expr(out, left, PREC_CMP + 1);
            out.push_str(text);
            emit_expr(out, right, PREC_CMP + 1);
        }
        PyExpr::BoolOp { op, values } => {
            let (text, operand_min) = match op {
                PyBoolOp::Or => (" or ", PREC_AND),
                PyBoolOp::And => (" and ", PREC_NOT),
            };
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push_str(text);
                }
                emit_expr(out, value, operand_min);
            }
        }
        PyExpr::IfExp { test, body, orelse } => {
            emit_expr(out, body, PREC_OR);
            out.push_str(" if ");
            emit_expr(out, test, PREC_OR);
            out.push_str(" else ");
            emit_expr(out, orelse, PREC_TERNARY);
        }
        PyExpr::NamedExpr { target, value } => {
            out.push('(');
            out.push_str(target);
            out.push_str(" := ");
            emit_expr(out, value, 0);
            out.push(')');
        }
    }
    if parens {
        out.push(')');
    }
}

fn emit_const(out: &mut String, c: &PyConst) {
    match c {
        PyConst::None => out.push_str("None"),
        PyConst::Bool(true) => out.push_str("True"),
        PyConst::Bool(false) => out.push_str("False"),
        PyConst::Int(v) => out.push_str(&v.to_string()),
        PyConst::Float(v) => {
            if v.fract() == 0.0 {
                // Keep the float-ness visible: `2.0`, not `2`.
                out.push_str(&format!("{:.1}", v));
            } else {
                out.push_str(&format!("{}", v));
            }
        }
        PyConst::Str(s) => emit_str(out, s),
    }
}

fn emit_str(out: &mut String, s: &str) {
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
}
