//! The resolved import graph of a bundling run
//!
//! Maps every module reachable from the entry to the set of bindings requested from it,
//! in first-discovery order. Local import edges are also kept in a `petgraph` graph so
//! circular imports can be reported.

use std::{
    fmt::Write,
    path::{Path, PathBuf},
};

use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use rustc_hash::FxHashMap;

use crate::types::{BindingKind, FxIndexMap, FxIndexSet, ImportBinding, SourcePath};

#[derive(Debug)]
pub struct ImportGraph {
    entry: PathBuf,
    bindings: FxIndexMap<SourcePath, FxIndexSet<ImportBinding>>,
    /// First module seen importing each local path
    importers: FxIndexMap<PathBuf, PathBuf>,
    edges: DiGraph<PathBuf, ()>,
    nodes: FxHashMap<PathBuf, NodeIndex>,
}

impl ImportGraph {
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            bindings: FxIndexMap::default(),
            importers: FxIndexMap::default(),
            edges: DiGraph::new(),
            nodes: FxHashMap::default(),
        }
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// Merge `bindings` into the set recorded for `path`
    ///
    /// The path is registered even when `bindings` is empty, so `import {} from './x'`
    /// still pulls `x` into the bundle.
    pub fn record(
        &mut self,
        path: SourcePath,
        importer: &Path,
        bindings: impl IntoIterator<Item = ImportBinding>,
    ) {
        if let SourcePath::Local(target) = &path {
            self.importers
                .entry(target.clone())
                .or_insert_with(|| importer.to_path_buf());
            self.add_edge(importer, target);
        }
        self.bindings.entry(path).or_default().extend(bindings);
    }

    fn add_edge(&mut self, from: &Path, to: &Path) {
        let from = self.node(from);
        let to = self.node(to);
        if self.edges.find_edge(from, to).is_none() {
            self.edges.add_edge(from, to, ());
        }
    }

    fn node(&mut self, path: &Path) -> NodeIndex {
        if let Some(&index) = self.nodes.get(path) {
            return index;
        }
        let index = self.edges.add_node(path.to_path_buf());
        self.nodes.insert(path.to_path_buf(), index);
        index
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, path: &SourcePath) -> bool {
        self.bindings.contains_key(path)
    }

    pub fn bindings(&self, path: &SourcePath) -> Option<&FxIndexSet<ImportBinding>> {
        self.bindings.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourcePath, &FxIndexSet<ImportBinding>)> {
        self.bindings.iter()
    }

    pub fn local_modules(&self) -> impl Iterator<Item = (&Path, &FxIndexSet<ImportBinding>)> {
        self.bindings
            .iter()
            .filter_map(|(path, bindings)| path.as_local().map(|local| (local, bindings)))
    }

    pub fn external_modules(&self) -> impl Iterator<Item = (&str, &FxIndexSet<ImportBinding>)> {
        self.bindings.iter().filter_map(|(path, bindings)| match path {
            SourcePath::External(name) => Some((name.as_str(), bindings)),
            SourcePath::Local(_) => None,
        })
    }

    /// The module whose import first brought `path` into the graph
    pub fn importer_of(&self, path: &Path) -> Option<&Path> {
        self.importers.get(path).map(PathBuf::as_path)
    }

    /// Groups of local modules that import each other, directly or transitively
    pub fn cycles(&self) -> Vec<Vec<PathBuf>> {
        tarjan_scc(&self.edges)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.edges.find_edge(node, node).is_some())
            })
            .map(|component| {
                component
                    .into_iter()
                    .map(|node| self.edges[node].clone())
                    .collect()
            })
            .collect()
    }

    /// Re-serialize every external module as import statements for the bundle header
    pub fn hoisted_imports(&self) -> String {
        let mut header = String::new();
        for (path, bindings) in self.external_modules() {
            header.push_str(&render_import(path, bindings));
        }
        header
    }
}

/// Render the import statements for one module
///
/// Default bindings each get their own statement; named bindings are merged into a
/// single braced list. Parsing the result yields the same binding set.
pub fn render_import<'a>(
    path: &str,
    bindings: impl IntoIterator<Item = &'a ImportBinding>,
) -> String {
    let mut rendered = String::new();
    let mut named = Vec::new();

    for binding in bindings {
        match binding.kind {
            BindingKind::Default => {
                let _ = writeln!(rendered, "import {} from \"{path}\";", binding.original);
            }
            BindingKind::Named => named.push(binding.to_string()),
        }
    }

    if !named.is_empty() {
        let _ = writeln!(
            rendered,
            "import {{ {} }} from \"{path}\";",
            named.join(", ")
        );
    }
    rendered
}
