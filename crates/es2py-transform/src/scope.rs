//! Identifier sanitization and scope management

use std::collections::HashMap;

/// Python 3.8 keywords, sorted. `True`/`False`/`None` are keywords too, so
/// the literal names are covered by the same list.
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Rename identifiers that collide with Python keywords; everything else
/// passes through unchanged. Property keys never go through here.
pub fn sanitize(raw: &str) -> String {
    if PYTHON_KEYWORDS.binary_search(&raw).is_ok() {
        format!("{}_js", raw)
    } else {
        raw.to_string()
    }
}

/// A lexical scope: source identifier → emitted identifier.
#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<String, String>,
}

/// Scope chain for identifier resolution, innermost last.
///
/// There is no global map to fall back to: a lookup miss resolves to the pure
/// sanitization of the raw name, which is what free references (globals,
/// runtime names) want.
#[derive(Debug)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    /// A chain holding only the module scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Enter a new innermost scope.
    pub fn enter(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Exit the innermost scope. Exiting the module scope is a bug.
    pub fn exit(&mut self) {
        debug_assert!(self.scopes.len() > 1, "attempted to exit the module scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declare `raw` in the current scope, returning the emitted name.
    pub fn declare(&mut self, raw: &str) -> String {
        let mapped = sanitize(raw);
        self.scopes
            .last_mut()
            .expect("scope chain is never empty")
            .bindings
            .insert(raw.to_string(), mapped.clone());
        mapped
    }

    /// Resolve `raw`, innermost scope first. Misses fall back to
    /// sanitization, which handles free references.
    pub fn lookup(&self, raw: &str) -> String {
        for scope in self.scopes.iter().rev() {
            if let Some(mapped) = scope.bindings.get(raw) {
                return mapped.clone();
            }
        }
        sanitize(raw)
    }

    /// Current nesting depth (1 = module scope only).
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_keywords() {
        assert_eq!(sanitize("class"), "class_js");
        assert_eq!(sanitize("None"), "None_js");
        assert_eq!(sanitize("True"), "True_js");
        assert_eq!(sanitize("lambda"), "lambda_js");
        assert_eq!(sanitize("x"), "x");
        assert_eq!(sanitize("classy"), "classy");
    }

    #[test]
    fn test_keyword_table_is_sorted() {
        let mut sorted = PYTHON_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, PYTHON_KEYWORDS);
    }

    #[test]
    fn test_declare_and_lookup() {
        let mut chain = ScopeChain::new();
        chain.enter();

        assert_eq!(chain.declare("x"), "x");
        assert_eq!(chain.declare("from"), "from_js");

        assert_eq!(chain.lookup("x"), "x");
        assert_eq!(chain.lookup("from"), "from_js");
    }

    #[test]
    fn test_nested_scopes() {
        let mut chain = ScopeChain::new();
        chain.declare("x");

        chain.enter();
        chain.declare("y");

        // Both visible from the inner scope.
        assert_eq!(chain.lookup("y"), "y");
        assert_eq!(chain.lookup("x"), "x");

        chain.exit();

        // y fell out of scope; lookup degrades to plain sanitization.
        assert_eq!(chain.lookup("y"), "y");
        assert_eq!(chain.depth(), 1);
    }

    #[test]
    fn test_free_reference_falls_back_to_sanitization() {
        let chain = ScopeChain::new();
        assert_eq!(chain.lookup("console"), "console");
        assert_eq!(chain.lookup("import"), "import_js");
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut chain = ScopeChain::new();
        chain.declare("x");
        chain.enter();
        chain.declare("x");
        assert_eq!(chain.lookup("x"), "x");
        chain.exit();
        assert_eq!(chain.lookup("x"), "x");
    }

    proptest! {
        #[test]
        fn prop_sanitized_name_is_never_a_keyword(raw in "[A-Za-z_][A-Za-z0-9_]{0,12}") {
            let out = sanitize(&raw);
            prop_assert!(PYTHON_KEYWORDS.binary_search(&out.as_str()).is_err());
        }

        #[test]
        fn prop_sanitize_is_stable(raw in "[A-Za-z_][A-Za-z0-9_]{0,12}") {
            // Sanitization of an already-sanitized name changes nothing.
            let once = sanitize(&raw);
            prop_assert_eq!(sanitize(&once), once.clone());
        }
    }
}
