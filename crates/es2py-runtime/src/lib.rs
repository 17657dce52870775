//! # es2py runtime companion
//!
//! The fixed Python module (`js_compat.py`) shipped alongside transpiled
//! output, embedded here as an asset, plus the registry of helper names the
//! transformer is allowed to import from it.
//!
//! The companion is not generated; it is written once in Python and carried
//! verbatim. This crate only knows its name, its text, and its surface.

#![warn(clippy::all)]
#![warn(missing_docs)]

/// Module name the generated code imports from.
pub const MODULE_NAME: &str = "js_compat";

/// File name the companion is written under, next to the emitted module.
pub const FILE_NAME: &str = "js_compat.py";

/// Full source text of the companion module.
pub const SOURCE: &str = include_str!("../assets/js_compat.py");

/// Every helper the transformer may request, sorted.
///
/// `add_runtime` calls in the transformer are checked against this list in
/// debug builds, so a typo in a rewrite fails tests instead of producing an
/// import of a nonexistent name.
pub const HELPER_NAMES: &[&str] = &[
    "JSUndefined",
    "console_log",
    "js_add",
    "js_array_pop",
    "js_char_code_at",
    "js_date_now",
    "js_div",
    "js_for_in_keys",
    "js_mod",
    "js_mul",
    "js_strict_eq",
    "js_strict_neq",
    "js_sub",
    "js_substring",
    "js_to_number",
    "js_truthy",
    "js_typeof",
];

/// Whether `name` is part of the companion's public surface.
pub fn is_helper(name: &str) -> bool {
    HELPER_NAMES.binary_search(&name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_sorted() {
        let mut sorted = HELPER_NAMES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, HELPER_NAMES);
    }

    #[test]
    fn test_every_helper_defined_in_source() {
        for name in HELPER_NAMES {
            let as_def = format!("def {}(", name);
            let as_const = format!("{} = ", name);
            assert!(
                SOURCE.contains(&as_def) || SOURCE.contains(&as_const),
                "helper {} missing from js_compat.py",
                name
            );
        }
    }

    #[test]
    fn test_is_helper() {
        assert!(is_helper("js_truthy"));
        assert!(is_helper("JSUndefined"));
        assert!(!is_helper("js_nope"));
        assert!(!is_helper("_js_string"));
    }

    #[test]
    fn test_source_has_no_tabs() {
        // The asset is indentation-sensitive; keep it space-only.
        assert!(!SOURCE.contains('\t'));
    }
}
