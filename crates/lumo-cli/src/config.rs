//! Configuration file parsing for lumo.toml.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file names, searched in this order in each directory
const CONFIG_NAMES: &[&str] = &["lumo.toml", ".lumorc.toml"];

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Emit the structured JSON program instead of disassembly
    #[serde(default, alias = "structuredOutput")]
    pub structured_output: bool,
}

/// Load configuration from a file or search for default config files.
///
/// An explicit path must exist; a missing discovered file means defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| find_config_file(&cwd)),
    };

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Search for a configuration file in `start` and its parent directories.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.output.structured_output);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[output]
structured_output = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.output.structured_output);
    }

    #[test]
    fn test_parse_camel_case_alias() {
        let config: Config = toml::from_str("[output]\nstructuredOutput = true\n").unwrap();
        assert!(config.output.structured_output);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.output.structured_output);
    }

    #[test]
    fn test_find_config_in_parent() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("src").join("scripts");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(".lumorc.toml"), "").unwrap();

        assert_eq!(
            find_config_file(&nested),
            Some(root.path().join(".lumorc.toml"))
        );
    }

    #[test]
    fn test_nearest_config_wins() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("project");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join("lumo.toml"), "").unwrap();
        std::fs::write(nested.join("lumo.toml"), "").unwrap();

        assert_eq!(find_config_file(&nested), Some(nested.join("lumo.toml")));
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[output]\nstructured_output = true\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert!(config.output.structured_output);
    }

    #[test]
    fn test_load_missing_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }

    #[test]
    fn test_load_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumo.toml");
        std::fs::write(&path, "[output]\nstructured_output = \"yes\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse"));
    }
}
