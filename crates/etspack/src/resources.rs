//! Resource reference substitution
//!
//! Page sources refer to app resources with calls such as `$r('app.string.title')`. After
//! the bundle is written, element resources (`string`, `color`, `float`, ...) are looked
//! up in `<root>/element/<category>.json` and inlined as literals, while `media` resources
//! are copied next to the bundle. Media references themselves are left in the text.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use cow_utils::CowUtils;
use log::{debug, info, warn};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::{
    config::Config,
    error::BundleError,
    tokens::is_identifier_char,
    types::FxIndexSet,
};

const MEDIA_CATEGORY: &str = "media";

/// Summary of one substitution pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceReport {
    /// Number of reference tokens replaced by literal values
    pub substituted: usize,
    /// Asset files copied into the output folder
    pub copied_assets: Vec<PathBuf>,
    /// References that matched no catalog entry or asset
    pub misses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    value: Value,
}

/// A parsed `<namespace>.<category>.<name>` reference
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResourceRef<'a> {
    category: &'a str,
    name: &'a str,
}

impl<'a> ResourceRef<'a> {
    fn parse(reference: &'a str) -> Option<Self> {
        let mut parts = reference.splitn(3, '.');
        let _namespace = parts.next()?;
        let category = parts.next()?;
        let name = parts.next()?;
        if category.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self { category, name })
    }
}

/// Locate the resource root for `entry`
///
/// An explicit `resource_dir` wins; otherwise the nearest ancestor directory named `main`
/// is taken as the module root and `resources/base` below it is used.
pub fn resource_root(config: &Config, entry: &Path) -> Option<PathBuf> {
    if let Some(dir) = &config.resource_dir {
        return Some(dir.clone());
    }
    entry
        .ancestors()
        .skip(1)
        .find(|dir| dir.file_name().is_some_and(|name| name == "main"))
        .map(|main| main.join("resources").join("base"))
}

#[derive(Debug)]
pub struct ResourceResolver {
    root: PathBuf,
    pattern: Regex,
    /// Loaded element catalogs, keyed by category then resource name
    catalogs: FxHashMap<String, FxHashMap<String, Value>>,
}

impl ResourceResolver {
    pub fn new(config: &Config, root: impl Into<PathBuf>) -> Result<Self> {
        let functions = config
            .reference_functions
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(
            r#"(?:{functions})\(\s*['"]([^'"]+)['"]\s*\)"#
        ))
        .context("invalid resource reference function names")?;

        Ok(Self {
            root: root.into(),
            pattern,
            catalogs: FxHashMap::default(),
        })
    }

    /// Substitute references in the bundle at `bundle_path`, rewriting it in place and
    /// copying media assets into `output_dir`
    pub fn apply(&mut self, bundle_path: &Path, output_dir: &Path) -> Result<ResourceReport> {
        let text = fs::read_to_string(bundle_path)
            .with_context(|| format!("failed to read bundle {}", bundle_path.display()))?;
        let (substituted, report) = self.substitute(&text, output_dir)?;
        if substituted != text {
            fs::write(bundle_path, substituted)
                .with_context(|| format!("failed to rewrite bundle {}", bundle_path.display()))?;
        }
        info!(
            "Resources: {} substituted, {} assets copied, {} unresolved",
            report.substituted,
            report.copied_assets.len(),
            report.misses.len()
        );
        Ok(report)
    }

    /// Substitute references in `text`, returning the new text and a report
    pub fn substitute(&mut self, text: &str, output_dir: &Path) -> Result<(String, ResourceReport)> {
        let mut report = ResourceReport::default();

        let references: FxIndexSet<&str> = self
            .pattern
            .captures_iter(text)
            .filter(|captures| {
                captures
                    .get(0)
                    .is_some_and(|whole| is_call_start(text, whole.start()))
            })
            .filter_map(|captures| captures.get(1).map(|reference| reference.as_str()))
            .collect();

        let mut literals: FxHashMap<&str, String> = FxHashMap::default();
        for reference in references {
            debug!("Looking up resource {reference}");
            let Some(parsed) = ResourceRef::parse(reference) else {
                warn!("Malformed resource reference '{reference}'");
                report.misses.push(reference.to_owned());
                continue;
            };

            if parsed.category == MEDIA_CATEGORY {
                let copied = self.copy_media(parsed.name, output_dir)?;
                if copied.is_empty() {
                    warn!("No media asset found for '{reference}'");
                    report.misses.push(reference.to_owned());
                }
                report.copied_assets.extend(copied);
                continue;
            }

            match self.lookup_element(parsed.category, parsed.name)? {
                Some(literal) => {
                    literals.insert(reference, literal);
                }
                None => {
                    warn!("No {} resource named '{}'", parsed.category, parsed.name);
                    report.misses.push(reference.to_owned());
                }
            }
        }

        let substituted = self.pattern.replace_all(text, |captures: &regex::Captures<'_>| {
            let whole = &captures[0];
            let literal = captures
                .get(0)
                .filter(|m| is_call_start(text, m.start()))
                .and_then(|_| literals.get(&captures[1]));
            match literal {
                Some(literal) => {
                    report.substituted += 1;
                    literal.clone()
                }
                None => whole.to_owned(),
            }
        });

        Ok((substituted.into_owned(), report))
    }

    /// Render the catalog value for `name` as a source literal
    fn lookup_element(&mut self, category: &str, name: &str) -> Result<Option<String>> {
        if !self.catalogs.contains_key(category) {
            let catalog = self.load_catalog(category)?;
            self.catalogs.insert(category.to_owned(), catalog);
        }

        let value = self
            .catalogs
            .get(category)
            .and_then(|catalog| catalog.get(name));
        Ok(value.and_then(render_literal))
    }

    fn load_catalog(&self, category: &str) -> Result<FxHashMap<String, Value>> {
        let path = self.root.join("element").join(format!("{category}.json"));
        if !path.is_file() {
            return Err(BundleError::FileNotFound { path }.into());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read resource catalog {}", path.display()))?;
        let document: FxHashMap<String, Vec<CatalogEntry>> =
            serde_json::from_str(&raw).map_err(|err| BundleError::ResourceCatalog {
                path: path.clone(),
                message: err.to_string(),
            })?;

        let entries = document
            .into_iter()
            .find(|(key, _)| key == category)
            .map(|(_, entries)| entries)
            .ok_or_else(|| BundleError::ResourceCatalog {
                path: path.clone(),
                message: format!("missing '{category}' array"),
            })?;

        let mut catalog = FxHashMap::default();
        for entry in entries {
            catalog.entry(entry.name).or_insert(entry.value);
        }
        debug!("Loaded {} {category} resources from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Copy every media file whose name starts with `name` into `output_dir`
    fn copy_media(&self, name: &str, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let media_dir = self.root.join(MEDIA_CATEGORY);
        if !media_dir.is_dir() {
            debug!("Media directory {} does not exist", media_dir.display());
            return Ok(Vec::new());
        }

        let mut copied = Vec::new();
        for entry in WalkDir::new(&media_dir).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("failed to walk media directory {}", media_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if !file_name.to_string_lossy().starts_with(name) {
                continue;
            }

            fs::create_dir_all(output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;
            let destination = output_dir.join(file_name);
            fs::copy(entry.path(), &destination).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    entry.path().display(),
                    destination.display()
                )
            })?;
            info!("Copied {} to {}", entry.path().display(), destination.display());
            copied.push(destination);
        }
        Ok(copied)
    }
}

/// A reference call must not be the tail of a longer identifier or a member access
fn is_call_start(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .is_none_or(|ch| !is_identifier_char(ch) && ch != '.')
}

fn render_literal(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let escaped = text.cow_replace("\\", "\\\\");
            let escaped = escaped.cow_replace("\"", "\\\"");
            Some(format!("\"{escaped}\""))
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
