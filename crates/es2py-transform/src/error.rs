//! Transform diagnostics
//!
//! Every rejection carries a stable code, a message, and a source location;
//! the rendered form is machine-parseable and part of the tool's contract.

use std::fmt;

use thiserror::Error;

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// AST node kind has no visitor.
    UnsupportedNode,
    /// Visitor exists but the specific form is rejected.
    UnsupportedFeature,
    /// Non-identifier function parameter.
    ParamDestructure,
    /// Non-identifier declarator or destructuring target.
    VarDestructure,
    /// Computed object-literal key.
    ComputedKey,
    /// Object-literal key that is not an identifier, string, or number.
    ObjectKey,
    /// Augmented assignment to a member expression.
    MemberAugAssign,
    /// `++`/`--` on a member expression.
    UpdateMember,
    /// Comma expression outside for-init/update.
    SequenceExprContext,
    /// `++`/`--` used as a value outside a for-update clause.
    UpdateExprContext,
    /// `break` with no enclosing loop or switch.
    BreakOutside,
    /// `continue` with no enclosing loop.
    ContinueOutside,
    /// `continue` whose innermost enclosing iteration is a switch.
    ContinueInSwitch,
    /// Non-empty switch case without a terminator on every path.
    SwitchFallthrough,
    /// `push` with other than one argument.
    ArrayPushMultiArg,
    /// Array method on a receiver that is not an array literal.
    ArrayMethodAmbiguous,
    /// Regex literal (reserved for a later extension).
    Regex,
}

impl ErrorCode {
    /// The stable `E_*` identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnsupportedNode => "E_UNSUPPORTED_NODE",
            ErrorCode::UnsupportedFeature => "E_UNSUPPORTED_FEATURE",
            ErrorCode::ParamDestructure => "E_PARAM_DESTRUCTURE",
            ErrorCode::VarDestructure => "E_VAR_DESTRUCTURE",
            ErrorCode::ComputedKey => "E_COMPUTED_KEY",
            ErrorCode::ObjectKey => "E_OBJECT_KEY",
            ErrorCode::MemberAugAssign => "E_MEMBER_AUGASSIGN",
            ErrorCode::UpdateMember => "E_UPDATE_MEMBER",
            ErrorCode::SequenceExprContext => "E_SEQUENCE_EXPR_CONTEXT",
            ErrorCode::UpdateExprContext => "E_UPDATE_EXPR_CONTEXT",
            ErrorCode::BreakOutside => "E_BREAK_OUTSIDE",
            ErrorCode::ContinueOutside => "E_CONTINUE_OUTSIDE",
            ErrorCode::ContinueInSwitch => "E_CONTINUE_IN_SWITCH",
            ErrorCode::SwitchFallthrough => "E_SWITCH_FALLTHROUGH",
            ErrorCode::ArrayPushMultiArg => "E_ARRAY_PUSH_MULTI_ARG",
            ErrorCode::ArrayMethodAmbiguous => "E_ARRAY_METHOD_AMBIGUOUS",
            ErrorCode::Regex => "E_REGEX",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source position: 1-based line, 0-based column (the ESTree convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-based line.
    pub line: u32,
    /// 0-based column, in bytes.
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte offset to line/column conversion for one source text.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new("")
    }
}

impl LineIndex {
    /// Index `source`.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// Location of a byte offset. Offsets past the end clamp to the last line.
    pub fn location(&self, offset: u32) -> SourceLocation {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        SourceLocation {
            line: line as u32 + 1,
            column: offset - self.line_starts[line],
        }
    }
}

/// Transform errors
#[derive(Debug, Error)]
pub enum TranspileError {
    /// Parse error reported by the source parser.
    #[error("parse error: {0}")]
    Parse(String),

    /// AST node kind with no visitor.
    #[error("{code}: {message} at {location}")]
    UnsupportedNode {
        /// Always [`ErrorCode::UnsupportedNode`].
        code: ErrorCode,
        /// What was encountered.
        message: String,
        /// Where.
        location: SourceLocation,
    },

    /// Node kind implemented, but this form or context is rejected.
    #[error("{code}: {message} at {location}")]
    UnsupportedFeature {
        /// Specific code from the taxonomy.
        code: ErrorCode,
        /// What was rejected.
        message: String,
        /// Where.
        location: SourceLocation,
        /// Optional remediation hint.
        hint: Option<&'static str>,
    },

    /// Internal transformer error
    #[error("internal error: {0}")]
    Internal(String),
}

impl TranspileError {
    /// Create an unsupported-node error.
    pub fn unsupported_node(what: impl Into<String>, location: SourceLocation) -> Self {
        Self::UnsupportedNode {
            code: ErrorCode::UnsupportedNode,
            message: what.into(),
            location,
        }
    }

    /// Create an unsupported-feature error.
    pub fn feature(code: ErrorCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self::UnsupportedFeature {
            code,
            message: message.into(),
            location,
            hint: None,
        }
    }

    /// Create an unsupported-feature error with a remediation hint.
    pub fn feature_hint(
        code: ErrorCode,
        message: impl Into<String>,
        location: SourceLocation,
        hint: &'static str,
    ) -> Self {
        Self::UnsupportedFeature {
            code,
            message: message.into(),
            location,
            hint: Some(hint),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The stable code, if this error carries one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::UnsupportedNode { code, .. } | Self::UnsupportedFeature { code, .. } => {
                Some(*code)
            }
            Self::Parse(_) | Self::Internal(_) => None,
        }
    }

    /// The source location, if this error carries one.
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::UnsupportedNode { location, .. } | Self::UnsupportedFeature { location, .. } => {
                Some(*location)
            }
            Self::Parse(_) | Self::Internal(_) => None,
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedFeature { hint, .. } => *hint,
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Parse(msg) => format!("parse error: {}", msg),
            Self::Internal(msg) => format!("internal error: {}", msg),
            Self::UnsupportedNode { message, .. } | Self::UnsupportedFeature { message, .. } => {
                message.clone()
            }
        }
    }
}

/// Result type for transformation
pub type TranspileResult<T> = Result<T, TranspileError>;

/// Render an error in the diagnostic format downstream tooling parses:
/// code header, `path:line:column`, the offending line with a caret, and an
/// optional help line.
pub fn render_diagnostic(source: &str, path: &str, err: &TranspileError) -> String {
    let mut out = String::new();
    match err.code() {
        Some(code) => out.push_str(&format!("error[{}]: {}\n", code, err.message())),
        None => out.push_str(&format!("error: {}\n", err.message())),
    }
    if let Some(location) = err.location() {
        out.push_str(&format!("  --> {}:{}:{}\n", path, location.line, location.column));
        if let Some(line_text) = source.lines().nth(location.line as usize - 1) {
            out.push_str(&format!("   | {}\n", line_text));
            let pad = " ".repeat(location.column as usize);
            out.push_str(&format!("   | {}^\n", pad));
        }
    }
    if let Some(hint) = err.hint() {
        out.push_str(&format!("   = help: {}\n", hint));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("ab\ncd\n\nx");
        assert_eq!(index.location(0), SourceLocation { line: 1, column: 0 });
        assert_eq!(index.location(1), SourceLocation { line: 1, column: 1 });
        assert_eq!(index.location(3), SourceLocation { line: 2, column: 0 });
        assert_eq!(index.location(6), SourceLocation { line: 3, column: 0 });
        assert_eq!(index.location(7), SourceLocation { line: 4, column: 0 });
    }

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::MemberAugAssign.to_string(), "E_MEMBER_AUGASSIGN");
        assert_eq!(ErrorCode::Regex.to_string(), "E_REGEX");
    }

    #[test]
    fn test_render_diagnostic_with_caret() {
        let source = "var x = 1;\nobj.count += 5;\n";
        let err = TranspileError::feature_hint(
            ErrorCode::MemberAugAssign,
            "augmented assignment to a member expression",
            SourceLocation { line: 2, column: 10 },
            "expand to `obj.count = obj.count + 5`",
        );
        let rendered = render_diagnostic(source, "input.js", &err);
        assert_eq!(
            rendered,
            "error[E_MEMBER_AUGASSIGN]: augmented assignment to a member expression\n  \
             --> input.js:2:10\n   \
             | obj.count += 5;\n   \
             |           ^\n   \
             = help: expand to `obj.count = obj.count + 5`\n"
        );
    }

    #[test]
    fn test_render_parse_error() {
        let err = TranspileError::Parse("unexpected token".into());
        let rendered = render_diagnostic("", "input.js", &err);
        assert_eq!(rendered, "error: parse error: unexpected token\n");
    }
}
