//! Import statement recognition
//!
//! Only the two statement shapes used by page sources are understood:
//!
//! - `import { a, b as c } from "path";`
//! - `import name from "path";`
//!
//! Anything else that starts with `import` is left in the residual text untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::types::ImportBinding;

/// Matches either statement shape; group 1/2 are the named list and its path,
/// group 3/4 the default name and its path.
static IMPORT_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\bimport\s*\{([^}]*)\}\s*from\s*['"]([^'"]*)['"][ \t]*;?|\bimport\s+([\w$]+)\s+from\s*['"]([^'"]*)['"][ \t]*;?"#,
    )
    .expect("import statement pattern is valid")
});

/// One recognized import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub bindings: Vec<ImportBinding>,
    /// Module specifier exactly as written in the source
    pub path: String,
}

/// Result of scanning a module for imports
#[derive(Debug, Clone, Default)]
pub struct ParsedModule {
    pub imports: Vec<ImportStatement>,
    /// Source text with every recognized import statement removed
    pub residual: String,
}

/// Extract import statements from comment-free source text
pub fn parse_imports(source: &str) -> ParsedModule {
    let mut imports = Vec::new();
    let mut residual = String::with_capacity(source.len());
    let mut last_end = 0;

    for captures in IMPORT_STATEMENT.captures_iter(source) {
        let Some(statement) = split_statement(&captures) else {
            continue;
        };
        let Some(whole) = captures.get(0) else {
            continue;
        };
        residual.push_str(&source[last_end..whole.start()]);
        last_end = whole.end();
        imports.push(statement);
    }
    residual.push_str(&source[last_end..]);

    ParsedModule { imports, residual }
}

/// Remove recognized import statements and return only the residual text
pub fn strip_imports(source: &str) -> String {
    parse_imports(source).residual
}

fn split_statement(captures: &Captures<'_>) -> Option<ImportStatement> {
    if let (Some(list), Some(path)) = (captures.get(1), captures.get(2)) {
        let bindings = list
            .as_str()
            .split(',')
            .filter_map(parse_named_entry)
            .collect();
        return Some(ImportStatement {
            bindings,
            path: path.as_str().to_owned(),
        });
    }

    if let (Some(name), Some(path)) = (captures.get(3), captures.get(4)) {
        return Some(ImportStatement {
            bindings: vec![ImportBinding::default_import(name.as_str())],
            path: path.as_str().to_owned(),
        });
    }

    None
}

/// Parse `name` or `name as alias`; entries may span lines inside the braces
fn parse_named_entry(entry: &str) -> Option<ImportBinding> {
    let entry = entry.split_whitespace().collect::<Vec<_>>().join(" ");
    if entry.is_empty() {
        return None;
    }

    match entry.split_once(" as ") {
        Some((original, alias)) => Some(ImportBinding::named(original.trim(), alias.trim())),
        None => Some(ImportBinding::named(entry.clone(), entry)),
    }
}
