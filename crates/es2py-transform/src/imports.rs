//! Import accumulation and deterministic emission

use std::collections::BTreeSet;

use es2py_pyast::PyStmt;

/// The closed stdlib alias table: module name → emitted alias.
const STDLIB_ALIASES: &[(&str, &str)] = &[
    ("math", "_js_math"),
    ("random", "_js_random"),
    ("re", "_js_re"),
    ("time", "_js_time"),
];

/// Alias a stdlib module is imported under.
pub fn stdlib_alias(module: &str) -> Option<&'static str> {
    STDLIB_ALIASES
        .iter()
        .find(|(m, _)| *m == module)
        .map(|(_, alias)| *alias)
}

/// Accumulates the imports demanded by rewrites during a transform.
///
/// Emission is a pure function of the accumulated sets: stdlib imports first
/// (alphabetical by module), then a single `from js_compat import …` with
/// sorted names. `BTreeSet` makes the ordering free.
#[derive(Debug, Default)]
pub struct ImportManager {
    stdlib: BTreeSet<&'static str>,
    runtime: BTreeSet<&'static str>,
}

impl ImportManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stdlib module, returning its alias. The module must be in
    /// the closed table.
    pub fn add_stdlib(&mut self, module: &'static str) -> &'static str {
        let alias = stdlib_alias(module)
            .unwrap_or_else(|| panic!("{} is not in the stdlib alias table", module));
        self.stdlib.insert(module);
        alias
    }

    /// Record a runtime helper. The name must be part of the companion's
    /// surface.
    pub fn add_runtime(&mut self, name: &'static str) -> &'static str {
        debug_assert!(
            es2py_runtime::is_helper(name),
            "{} is not a js_compat helper",
            name
        );
        self.runtime.insert(name);
        name
    }

    /// Whether nothing was accumulated.
    pub fn is_empty(&self) -> bool {
        self.stdlib.is_empty() && self.runtime.is_empty()
    }

    /// Emit the import block.
    pub fn emit(&self) -> Vec<PyStmt> {
        let mut out = Vec::new();
        for module in &self.stdlib {
            out.push(PyStmt::Import {
                module: (*module).to_string(),
                alias: stdlib_alias(module).expect("only table modules are inserted").to_string(),
            });
        }
        if !self.runtime.is_empty() {
            out.push(PyStmt::ImportFrom {
                module: es2py_runtime::MODULE_NAME.to_string(),
                names: self.runtime.iter().map(|n| (*n).to_string()).collect(),
            });
        }
        out
    }
}
