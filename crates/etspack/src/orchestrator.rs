//! End-to-end bundling run: assemble, write, then substitute resources

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};

use crate::{
    bundler::Bundler,
    config::Config,
    resources::{ResourceReport, ResourceResolver, resource_root},
    types::normalize_path,
};

/// What a bundling run produced
#[derive(Debug, Clone)]
pub struct BundleReport {
    pub output: PathBuf,
    pub local_modules: usize,
    pub external_modules: usize,
    pub skipped_symbols: usize,
    /// `None` when resource substitution was disabled or no resource root was found
    pub resources: Option<ResourceReport>,
}

#[derive(Debug)]
pub struct BundleOrchestrator {
    config: Config,
}

impl BundleOrchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Default bundle location: `<stem>/<file name>` relative to the working directory
    pub fn default_output_path(entry: &Path) -> PathBuf {
        let file_name = entry
            .file_name()
            .map_or_else(|| PathBuf::from("bundle.ets"), PathBuf::from);
        let folder = entry
            .file_stem()
            .map_or_else(|| PathBuf::from("bundle"), PathBuf::from);
        folder.join(file_name)
    }

    pub fn bundle(&self, entry: &Path, output: &Path) -> Result<BundleReport> {
        info!("Bundling {} into {}", entry.display(), output.display());

        let bundle = Bundler::new(&self.config).assemble(entry)?;
        bundle.write(output)?;
        info!("Wrote {}", output.display());

        let resources = if self.config.resources {
            self.substitute_resources(entry, output)?
        } else {
            None
        };

        Ok(BundleReport {
            output: output.to_path_buf(),
            local_modules: bundle.inlined_modules.len(),
            external_modules: bundle.external_module_count(),
            skipped_symbols: bundle.skipped_symbols,
            resources,
        })
    }

    fn substitute_resources(&self, entry: &Path, output: &Path) -> Result<Option<ResourceReport>> {
        let Some(root) = resource_root(&self.config, &normalize_path(entry)) else {
            warn!(
                "No resource directory found for {}; skipping resource substitution",
                entry.display()
            );
            return Ok(None);
        };

        let output_dir = output
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut resolver = ResourceResolver::new(&self.config, root)?;
        resolver.apply(output, output_dir).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path_uses_entry_stem() {
        assert_eq!(
            BundleOrchestrator::default_output_path(Path::new("/app/pages/Index.ets")),
            PathBuf::from("Index/Index.ets")
        );
    }
}
