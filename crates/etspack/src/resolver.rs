use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, trace, warn};
use rustc_hash::FxHashSet;

use crate::{
    comments::strip_comments,
    config::Config,
    error::BundleError,
    import_graph::ImportGraph,
    import_parser::{ImportStatement, ParsedModule, parse_imports},
    types::{ImportBinding, SourcePath, normalize_path},
};

/// Outcome of resolving an entry module
#[derive(Debug)]
pub struct Resolution {
    pub graph: ImportGraph,
    /// Entry source with comments and recognized imports removed
    pub entry_residual: String,
}

/// A module whose imports are still being walked
#[derive(Debug)]
struct Frame {
    path: PathBuf,
    imports: std::vec::IntoIter<ImportStatement>,
    /// Bindings to record once the child currently on top of this frame is finished,
    /// which keeps dependencies ahead of their importers in the graph
    pending: Option<(SourcePath, Vec<ImportBinding>)>,
}

impl Frame {
    fn new(path: PathBuf, imports: Vec<ImportStatement>) -> Self {
        Self {
            path,
            imports: imports.into_iter(),
            pending: None,
        }
    }
}

#[derive(Debug)]
pub struct ImportResolver<'a> {
    config: &'a Config,
}

impl<'a> ImportResolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Build the import graph of everything reachable from `entry`
    ///
    /// Each local module is parsed at most once. The walk uses an explicit stack, so
    /// long import chains do not grow the native call stack. Local paths that do not
    /// exist are still recorded; the assembler reports them.
    pub fn resolve(&self, entry: &Path) -> Result<Resolution> {
        let entry = normalize_path(entry);
        if !entry.is_file() {
            return Err(BundleError::FileNotFound { path: entry }.into());
        }

        let parsed = read_module(&entry)?;
        let entry_residual = parsed.residual;

        let mut graph = ImportGraph::new(&entry);
        let mut expanded = FxHashSet::default();
        expanded.insert(entry.clone());
        let mut stack = vec![Frame::new(entry, parsed.imports)];

        loop {
            let depth = stack.len().saturating_sub(1);
            let Some(frame) = stack.last_mut() else {
                break;
            };
            if let Some((target, bindings)) = frame.pending.take() {
                graph.record(target, &frame.path, bindings);
                continue;
            }

            let Some(statement) = frame.imports.next() else {
                stack.pop();
                continue;
            };

            let target = SourcePath::classify(
                &statement.path,
                &frame.path,
                &self.config.external_prefixes,
                &self.config.extension,
            );
            debug!(
                "{}Imports from {}: [{}]",
                "  ".repeat(depth),
                target,
                statement
                    .bindings
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let expand = match &target {
                SourcePath::Local(local) if local.is_file() && !expanded.contains(local) => {
                    Some(local.clone())
                }
                SourcePath::Local(local) if !local.is_file() => {
                    trace!("{} does not exist, recording only", local.display());
                    None
                }
                _ => None,
            };

            match expand {
                Some(child) => {
                    let parsed = read_module(&child)?;
                    frame.pending = Some((target, statement.bindings));
                    expanded.insert(child.clone());
                    stack.push(Frame::new(child, parsed.imports));
                }
                None => graph.record(target, &frame.path, statement.bindings),
            }
        }

        for cycle in graph.cycles() {
            warn!(
                "Circular import between: {}",
                cycle
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" <-> ")
            );
        }

        Ok(Resolution {
            graph,
            entry_residual,
        })
    }
}

/// Read a module and strip its comments
pub fn read_source(path: &Path) -> Result<String> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(strip_comments(&source))
}

fn read_module(path: &Path) -> Result<ParsedModule> {
    Ok(parse_imports(&read_source(path)?))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn create_test_file(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn local_paths(graph: &ImportGraph) -> Vec<PathBuf> {
        graph
            .local_modules()
            .map(|(path, _)| path.to_path_buf())
            .collect()
    }

    #[test]
    fn test_three_level_chain() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("a.ets"), "import { B } from './lib/b';\nB();\n")?;
        create_test_file(&root.join("lib/b.ets"), "import { C } from '../c';\nexport function B() { C(); }\n")?;
        create_test_file(&root.join("c.ets"), "export function C() {}\n")?;

        let config = Config::default();
        let resolution = ImportResolver::new(&config).resolve(&root.join("a.ets"))?;

        let b = normalize_path(&root.join("lib/b.ets"));
        let c = normalize_path(&root.join("c.ets"));
        // Dependencies are recorded before their importers
        assert_eq!(local_paths(&resolution.graph), vec![c.clone(), b.clone()]);
        assert!(
            resolution
                .graph
                .iter()
                .all(|(path, _)| !path.to_string().contains("./"))
        );
        assert_eq!(resolution.graph.importer_of(&c), Some(b.as_path()));
        assert_eq!(resolution.entry_residual, "\nB();\n");
        Ok(())
    }

    #[test]
    fn test_external_paths_skip_filesystem() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        // A file that happens to share the external name must not be picked up
        create_test_file(&root.join("@ohos.router.ets"), "import { X } from './x';\n")?;
        create_test_file(&root.join("index.ets"), "import router from '@ohos.router';\n")?;

        let config = Config::default();
        let resolution = ImportResolver::new(&config).resolve(&root.join("index.ets"))?;

        assert_eq!(resolution.graph.len(), 1);
        assert!(
            resolution
                .graph
                .contains(&SourcePath::External("@ohos.router".to_owned()))
        );
        Ok(())
    }

    #[test]
    fn test_missing_dependency_is_recorded() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("index.ets"), "import { Gone } from './gone';\n")?;

        let config = Config::default();
        let resolution = ImportResolver::new(&config).resolve(&root.join("index.ets"))?;

        let gone = normalize_path(&root.join("gone.ets"));
        assert_eq!(local_paths(&resolution.graph), vec![gone]);
        Ok(())
    }

    #[test]
    fn test_missing_entry_is_file_not_found() {
        let temp_dir = TempDir::new().expect("temp dir");
        let config = Config::default();
        let err = ImportResolver::new(&config)
            .resolve(&temp_dir.path().join("nope.ets"))
            .expect_err("entry is missing");

        assert!(matches!(
            err.downcast_ref::<BundleError>(),
            Some(BundleError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_diamond_merges_bindings_from_every_importer() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(
            &root.join("index.ets"),
            "import { Left } from './left';\nimport { Right } from './right';\n",
        )?;
        create_test_file(&root.join("left.ets"), "import { Shared as L } from './shared';\n")?;
        create_test_file(&root.join("right.ets"), "import { Shared as R } from './shared';\n")?;
        create_test_file(&root.join("shared.ets"), "export function Shared() {}\n")?;

        let config = Config::default();
        let resolution = ImportResolver::new(&config).resolve(&root.join("index.ets"))?;

        let shared = SourcePath::Local(normalize_path(&root.join("shared.ets")));
        let bindings = resolution.graph.bindings(&shared).expect("shared recorded");
        assert!(bindings.contains(&ImportBinding::named("Shared", "L")));
        assert!(bindings.contains(&ImportBinding::named("Shared", "R")));
        assert_eq!(resolution.graph.len(), 3);
        Ok(())
    }

    #[test]
    fn test_cyclic_imports_terminate() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_test_file(&root.join("a.ets"), "import { B } from './b';\n")?;
        create_test_file(&root.join("b.ets"), "import { A } from './a';\nimport { B2 } from './b';\n")?;

        let config = Config::default();
        let resolution = ImportResolver::new(&config).resolve(&root.join("a.ets"))?;

        let a = normalize_path(&root.join("a.ets"));
        let b = normalize_path(&root.join("b.ets"));
        assert_eq!(local_paths(&resolution.graph), vec![a, b]);
        assert_eq!(resolution.graph.cycles().len(), 1);
        Ok(())
    }

    #[test]
    fn test_long_chain_does_not_recurse() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        let depth = 2_000;
        for index in 0..depth {
            create_test_file(
                &root.join(format!("m{index}.ets")),
                &format!("import {{ M{next} }} from './m{next}';\n", next = index + 1),
            )?;
        }
        create_test_file(&root.join(format!("m{depth}.ets")), "export const END = 1;\n")?;

        let config = Config::default();
        let resolution = ImportResolver::new(&config).resolve(&root.join("m0.ets"))?;

        assert_eq!(resolution.graph.len(), depth);
        Ok(())
    }
}
