//! # es2py Python AST
//!
//! This crate defines the Python AST vocabulary produced by the es2py
//! transformer, plus the source emitter that turns it into Python text.
//!
//! ## Design Principles
//!
//! - **Closed vocabulary**: only the node shapes the transformer emits exist,
//!   so the emitter is total and the output is Python 3.8 by construction
//! - **No native equality**: `PyCmpOp` deliberately has no `==`/`!=` members;
//!   equality on translated values always routes through runtime helpers
//! - **Owned trees**: plain owned enums, `Clone` everywhere, no arenas

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod ast;
pub mod build;
pub mod unparse;

pub use ast::{PyBinOp, PyBoolOp, PyCmpOp, PyConst, PyExpr, PyModule, PyStmt, PyUnaryOp};
pub use unparse::unparse;
