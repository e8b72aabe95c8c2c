//! Bundle assembly
//!
//! Produces the single output file: hoisted external imports first, then the entry
//! module's own code, then every local dependency in graph order with its imports removed
//! and its exported names rewritten to the aliases its importers use.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::{
    config::{Config, InlineMode},
    error::BundleError,
    extractor::{ExtractError, extract_symbol},
    import_graph::ImportGraph,
    import_parser::strip_imports,
    resolver::{ImportResolver, Resolution, read_source},
    tokens::rename_identifiers,
    types::{FxIndexMap, FxIndexSet, ImportBinding, SourcePath},
};

/// The assembled output of a bundling run
#[derive(Debug)]
pub struct Bundle {
    pub text: String,
    pub graph: ImportGraph,
    /// Local modules whose code was inlined
    pub inlined_modules: Vec<PathBuf>,
    /// Symbols that could not be extracted in [`InlineMode::Symbols`]
    pub skipped_symbols: usize,
}

impl Bundle {
    /// Write the bundle to `path`, creating parent directories as needed
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory {}", parent.display())
                })?;
            }
        }
        fs::write(path, &self.text)
            .with_context(|| format!("failed to write bundle {}", path.display()))
    }

    pub fn external_module_count(&self) -> usize {
        self.graph.external_modules().count()
    }
}

#[derive(Debug)]
pub struct Bundler<'a> {
    config: &'a Config,
}

impl<'a> Bundler<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Resolve `entry` and merge it with all of its local dependencies
    pub fn assemble(&self, entry: &Path) -> Result<Bundle> {
        let Resolution {
            graph,
            entry_residual,
        } = ImportResolver::new(self.config).resolve(entry)?;
        if graph.is_empty() {
            debug!("{} has no imports", graph.entry().display());
        }

        // A dependency importing the entry back under an alias still needs that alias
        let entry_path = graph.entry().to_path_buf();
        let entry_code = match graph.bindings(&SourcePath::Local(entry_path.clone())) {
            Some(bindings) if bindings.iter().any(ImportBinding::is_renamed) => {
                rename_module(&entry_path, &entry_residual, bindings)
            }
            _ => entry_residual,
        };

        let mut sections = vec![graph.hoisted_imports(), entry_code];
        let mut inlined_modules = Vec::new();
        let mut skipped_symbols = 0;

        for (path, bindings) in graph.local_modules() {
            if path == graph.entry() {
                debug!("{} imports the entry module back, not inlining it twice", path.display());
                continue;
            }
            if !path.is_file() {
                return Err(BundleError::MissingDependency {
                    path: path.to_path_buf(),
                    importer: graph.importer_of(path).unwrap_or(graph.entry()).to_path_buf(),
                }
                .into());
            }

            let content = match self.config.inline {
                InlineMode::File => {
                    let residual = strip_imports(&read_source(path)?);
                    rename_module(path, &residual, bindings)
                }
                InlineMode::Symbols => {
                    let (content, skipped) = extract_bindings(path, bindings)?;
                    skipped_symbols += skipped;
                    content
                }
            };

            debug!("Inlining {} ({} bindings)", path.display(), bindings.len());
            sections.push(content);
            inlined_modules.push(path.to_path_buf());
        }

        info!(
            "Assembled bundle from {} local and {} external modules",
            inlined_modules.len(),
            graph.external_modules().count()
        );

        Ok(Bundle {
            text: join_sections(&sections),
            graph,
            inlined_modules,
            skipped_symbols,
        })
    }
}

/// Rewrite every imported name in `source` to the alias its importer uses
///
/// A name imported under several different aliases keeps the first one; the others are
/// reported since their importers will reference an undefined name.
fn rename_module(path: &Path, source: &str, bindings: &FxIndexSet<ImportBinding>) -> String {
    let mut renames: FxIndexMap<&str, &str> = FxIndexMap::default();
    for binding in bindings {
        match renames.get(binding.original.as_str()) {
            Some(&alias) if alias != binding.alias => warn!(
                "{} is imported from {} as both '{}' and '{}'; using '{}'",
                binding.original,
                path.display(),
                alias,
                binding.alias,
                alias
            ),
            Some(_) => {}
            None => {
                renames.insert(&binding.original, &binding.alias);
            }
        }
    }

    let renames: Vec<(&str, &str)> = renames.into_iter().collect();
    rename_identifiers(source, &renames)
}

/// Pull out only the declarations of the imported symbols
///
/// Returns the joined regions and the number of bindings that could not be extracted.
fn extract_bindings(path: &Path, bindings: &FxIndexSet<ImportBinding>) -> Result<(String, usize)> {
    let mut regions = Vec::new();
    let mut skipped = 0;

    for binding in bindings {
        match extract_symbol(path, &binding.original, &binding.alias) {
            Ok(region) => regions.push(region),
            Err(err) => match err.downcast_ref::<ExtractError>() {
                Some(miss) => {
                    warn!("Skipping {} from {}: {}", binding, path.display(), miss);
                    skipped += 1;
                }
                None => return Err(err),
            },
        }
    }

    Ok((regions.join("\n"), skipped))
}

/// Join bundle sections with exactly one blank line between them
fn join_sections(sections: &[String]) -> String {
    let mut bundle = sections
        .iter()
        .map(|section| tidy_section(section))
        .filter(|section| !section.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    bundle.push('\n');
    bundle
}

/// Drop the blank lines left behind by removed imports and trailing whitespace
fn tidy_section(section: &str) -> &str {
    let mut rest = section;
    while let Some(newline) = rest.find('\n') {
        if rest[..newline].trim().is_empty() {
            rest = &rest[newline + 1..];
        } else {
            break;
        }
    }
    rest.trim_end()
}
