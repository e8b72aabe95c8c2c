//! Layered configuration
//!
//! Precedence, lowest to highest: built-in defaults, the user config file
//! (`<config dir>/etspack/etspack.toml`), `etspack.toml` in the working directory, an
//! explicitly passed config file, `ETSPACK_*` environment variables, and finally
//! command-line flags (applied by the binary).

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use etcetera::{BaseStrategy, choose_base_strategy};
use log::debug;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "etspack.toml";

/// How local dependencies are merged into the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineMode {
    /// Inline the whole residual source of each dependency
    #[default]
    File,
    /// Inline only the declarations of the symbols actually imported
    Symbols,
}

impl FromStr for InlineMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "symbols" => Ok(Self::Symbols),
            other => Err(anyhow!(
                "invalid inline mode '{other}', expected 'file' or 'symbols'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Source file extension appended to local import specifiers
    pub extension: String,
    /// Specifier prefixes marking external modules that are hoisted, never inlined
    pub external_prefixes: Vec<String>,
    pub inline: InlineMode,
    /// Whether resource references are substituted after the bundle is written
    pub resources: bool,
    /// Resource root (the directory holding `element/` and `media/`); derived from the
    /// entry path when unset
    pub resource_dir: Option<PathBuf>,
    /// Function names whose single string argument is a resource reference
    pub reference_functions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: "ets".to_owned(),
            external_prefixes: vec!["@".to_owned()],
            inline: InlineMode::File,
            resources: true,
            resource_dir: None,
            reference_functions: vec!["$r".to_owned(), "ref".to_owned()],
        }
    }
}

/// On-disk form of the config; every key is optional so files can be layered
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    extension: Option<String>,
    external_prefixes: Option<Vec<String>>,
    inline: Option<InlineMode>,
    resources: Option<bool>,
    resource_dir: Option<PathBuf>,
    reference_functions: Option<Vec<String>>,
}

impl Config {
    /// Load the full configuration hierarchy
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config) = user_config_path() {
            if user_config.is_file() {
                config.merge_file(&user_config)?;
            }
        }

        let project_config = PathBuf::from(CONFIG_FILE_NAME);
        if project_config.is_file() {
            config.merge_file(&project_config)?;
        }

        if let Some(path) = explicit {
            config.merge_file(path)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Merge settings from a TOML file on top of the current values
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let partial: PartialConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        self.merge(partial);
        Ok(())
    }

    fn merge(&mut self, partial: PartialConfig) {
        if let Some(extension) = partial.extension {
            self.extension = extension.trim_start_matches('.').to_owned();
        }
        if let Some(prefixes) = partial.external_prefixes {
            self.external_prefixes = prefixes;
        }
        if let Some(inline) = partial.inline {
            self.inline = inline;
        }
        if let Some(resources) = partial.resources {
            self.resources = resources;
        }
        if let Some(resource_dir) = partial.resource_dir {
            self.resource_dir = Some(resource_dir);
        }
        if let Some(functions) = partial.reference_functions {
            self.reference_functions = functions;
        }
    }

    /// Apply `ETSPACK_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(extension) = std::env::var("ETSPACK_EXTENSION") {
            self.extension = extension.trim_start_matches('.').to_owned();
        }
        if let Ok(prefixes) = std::env::var("ETSPACK_EXTERNAL_PREFIXES") {
            self.external_prefixes = split_list(&prefixes);
        }
        if let Ok(inline) = std::env::var("ETSPACK_INLINE") {
            self.inline = inline.parse().context("invalid ETSPACK_INLINE")?;
        }
        if let Ok(resources) = std::env::var("ETSPACK_RESOURCES") {
            self.resources = parse_bool(&resources)
                .ok_or_else(|| anyhow!("invalid ETSPACK_RESOURCES value '{resources}'"))?;
        }
        if let Ok(dir) = std::env::var("ETSPACK_RESOURCE_DIR") {
            if !dir.is_empty() {
                self.resource_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("etspack").join(CONFIG_FILE_NAME))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    /// Sets an environment variable for the lifetime of the guard and restores the
    /// previous value on drop
    #[must_use = "EnvVarGuard must be held in scope to ensure cleanup"]
    struct EnvVarGuard {
        key: &'static str,
        original_value: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let original_value = std::env::var(key).ok();
            // SAFETY: tests touching the environment are marked #[serial]
            unsafe {
                std::env::set_var(key, value);
            }
            Self {
                key,
                original_value,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            // SAFETY: restoring the environment to its original state
            unsafe {
                match self.original_value.take() {
                    Some(original) => std::env::set_var(self.key, original),
                    None => std::env::remove_var(self.key),
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.extension, "ets");
        assert_eq!(config.external_prefixes, vec!["@".to_owned()]);
        assert_eq!(config.inline, InlineMode::File);
        assert!(config.resources);
        assert_eq!(config.reference_functions, vec!["$r", "ref"]);
    }

    #[test]
    fn test_file_layer_overrides_only_present_keys() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "extension = \".ts\"\ninline = \"symbols\"\nexternal_prefixes = [\"@\", \"lib:\"]\n",
        )
        .expect("write config");

        let mut config = Config::default();
        config.merge_file(&path).expect("merge");

        assert_eq!(config.extension, "ts");
        assert_eq!(config.inline, InlineMode::Symbols);
        assert_eq!(config.external_prefixes, vec!["@", "lib:"]);
        assert!(config.resources);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "extensions = \"ets\"\n").expect("write config");

        let mut config = Config::default();
        assert!(config.merge_file(&path).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let _inline = EnvVarGuard::set("ETSPACK_INLINE", "symbols");
        let _prefixes = EnvVarGuard::set("ETSPACK_EXTERNAL_PREFIXES", "@, npm:");
        let _resources = EnvVarGuard::set("ETSPACK_RESOURCES", "off");

        let mut config = Config::default();
        config.apply_env().expect("env applies");

        assert_eq!(config.inline, InlineMode::Symbols);
        assert_eq!(config.external_prefixes, vec!["@", "npm:"]);
        assert!(!config.resources);
    }

    #[test]
    #[serial]
    fn test_env_extension_and_resource_dir() {
        let _extension = EnvVarGuard::set("ETSPACK_EXTENSION", ".ts");
        let _resource_dir = EnvVarGuard::set("ETSPACK_RESOURCE_DIR", "app/resources/base");

        let mut config = Config::default();
        config.apply_env().expect("env applies");

        assert_eq!(config.extension, "ts");
        assert_eq!(config.resource_dir, Some(PathBuf::from("app/resources/base")));
    }

    #[test]
    #[serial]
    fn test_empty_resource_dir_env_is_ignored() {
        let _resource_dir = EnvVarGuard::set("ETSPACK_RESOURCE_DIR", "");

        let mut config = Config {
            resource_dir: Some(PathBuf::from("configured")),
            ..Default::default()
        };
        config.apply_env().expect("env applies");

        assert_eq!(config.resource_dir, Some(PathBuf::from("configured")));
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_is_an_error() {
        let _inline = EnvVarGuard::set("ETSPACK_INLINE", "everything");
        let mut config = Config::default();
        assert!(config.apply_env().is_err());
    }
}
