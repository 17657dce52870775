//! # es2py transformer
//!
//! Translates a restricted ES5-style subset into Python with matching
//! runtime behavior, or fails fast with a coded diagnostic.
//!
//! ## Pipeline
//!
//! 1. Parse source with oxc
//! 2. Ancestry tagging pre-pass (loop ids, break/continue validation)
//! 3. Walk the AST and build a Python AST, accumulating imports
//! 4. Emit the import block and unparse
//!
//! Semantic mismatches that cannot be papered over syntactically
//! (truthiness, strict equality, `undefined` vs `null`, hoisting, `for`
//! desugaring, switch flattening) route through the fixed runtime
//! companion shipped by `es2py-runtime`.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod ancestry;
pub mod error;
pub mod imports;
pub mod scope;
pub mod transformer;

pub use error::{
    ErrorCode, LineIndex, SourceLocation, TranspileError, TranspileResult, render_diagnostic,
};
pub use transformer::Transpiler;
