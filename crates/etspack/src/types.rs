//! Shared type definitions for the etspack crate
//!
//! This module contains the identifiers that flow between the parser, the resolver and
//! the assembler.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Type alias for FxHasher-based IndexMap
pub type FxIndexMap<K, V> = IndexMap<K, V, std::hash::BuildHasherDefault<FxHasher>>;

/// Type alias for FxHasher-based IndexSet
pub type FxIndexSet<T> = IndexSet<T, std::hash::BuildHasherDefault<FxHasher>>;

/// How a symbol was brought into scope by its import statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// `import { name } from "path"` or `import { name as alias } from "path"`
    Named,
    /// `import name from "path"`
    Default,
}

/// A symbol imported from a module, together with the name it is used under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportBinding {
    pub original: String,
    pub alias: String,
    pub kind: BindingKind,
}

impl ImportBinding {
    pub fn named(original: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            alias: alias.into(),
            kind: BindingKind::Named,
        }
    }

    pub fn default_import(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            original: name.clone(),
            alias: name,
            kind: BindingKind::Default,
        }
    }

    /// Whether using this binding requires renaming `original` to `alias`
    pub fn is_renamed(&self) -> bool {
        self.original != self.alias
    }
}

impl fmt::Display for ImportBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_renamed() {
            write!(f, "{} as {}", self.original, self.alias)
        } else {
            f.write_str(&self.original)
        }
    }
}

/// Identity of an imported module
///
/// Local paths are absolute, normalized and carry the source extension; external paths
/// are kept verbatim and never touch the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourcePath {
    Local(PathBuf),
    External(String),
}

impl SourcePath {
    /// Classify a raw import specifier as written by `importer`
    ///
    /// The decision depends only on `external_prefixes`, so the same specifier always
    /// lands in the same class during a run.
    pub fn classify(
        raw: &str,
        importer: &Path,
        external_prefixes: &[String],
        extension: &str,
    ) -> Self {
        if is_external(raw, external_prefixes) {
            return Self::External(raw.to_owned());
        }

        let base = importer.parent().unwrap_or_else(|| Path::new(""));
        let mut joined = normalize_path(&base.join(raw));
        let has_extension = joined
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if !has_extension {
            let mut file_name = joined.file_name().unwrap_or_default().to_os_string();
            file_name.push(".");
            file_name.push(extension);
            joined.set_file_name(file_name);
        }
        Self::Local(joined)
    }

    pub fn as_local(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::External(_) => None,
        }
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::External(name) => f.write_str(name),
        }
    }
}

/// Prefix test deciding whether a specifier names an external (namespaced) module
pub fn is_external(raw: &str, external_prefixes: &[String]) -> bool {
    external_prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && raw.starts_with(prefix.as_str()))
}

/// Make a path absolute and fold `.`/`..` components without touching the filesystem
///
/// The target of an import may not exist yet, so `canonicalize` is not an option here.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Vec<String> {
        vec!["@".to_owned()]
    }

    #[test]
    fn test_external_specifier_is_kept_verbatim() {
        let path = SourcePath::classify(
            "@ohos.router",
            Path::new("/proj/pages/Index.ets"),
            &prefixes(),
            "ets",
        );
        assert_eq!(path, SourcePath::External("@ohos.router".to_owned()));
    }

    #[test]
    fn test_local_specifier_resolves_against_importer_directory() {
        let path = SourcePath::classify(
            "../components/Card",
            Path::new("/proj/pages/Index.ets"),
            &prefixes(),
            "ets",
        );
        assert_eq!(
            path,
            SourcePath::Local(PathBuf::from("/proj/components/Card.ets"))
        );
    }

    #[test]
    fn test_existing_extension_is_not_doubled() {
        let path = SourcePath::classify(
            "./Card.ets",
            Path::new("/proj/pages/Index.ets"),
            &prefixes(),
            "ets",
        );
        assert_eq!(path, SourcePath::Local(PathBuf::from("/proj/pages/Card.ets")));
    }

    #[test]
    fn test_dotted_file_name_gets_extension_appended() {
        let path = SourcePath::classify(
            "./card.view",
            Path::new("/proj/pages/Index.ets"),
            &prefixes(),
            "ets",
        );
        assert_eq!(
            path,
            SourcePath::Local(PathBuf::from("/proj/pages/card.view.ets"))
        );
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(ImportBinding::named("Widget", "W").to_string(), "Widget as W");
        assert_eq!(ImportBinding::named("Widget", "Widget").to_string(), "Widget");
    }
}
