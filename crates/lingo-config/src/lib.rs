use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use self::assets::AssetConfig;
use self::ocr::OcrConfig;
use self::translator::TranslatorConfig;

pub mod assets;
pub mod ocr;
pub mod translator;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub assets: AssetConfig,
    pub ocr: OcrConfig,
    pub translator: TranslatorConfig,

    /// OCR catalog name used when none is given on the command line
    pub source_language: Option<String>,
    /// Translation catalog name used when none is given on the command line
    pub target_language: Option<String>,
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn new() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Read a JSON config file, falling back to defaults when it does not exist.
    /// Environment overrides are applied on top either way.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    /// [`load`](Self::load) with overrides taken from `lookup` instead of the
    /// process environment
    pub fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                Config::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        config.apply_overrides(lookup);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("LINGO_MODEL_DIR") {
            self.assets.model_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup("LINGO_ASSET_URL") {
            self.assets.base_url = url;
        }
        if let Some(url) = lookup("LINGO_TRANSLATE_URL") {
            self.translator.api_url = url;
        }
        if let Some(lang) = lookup("LINGO_SOURCE_LANG") {
            self.source_language = Some(lang);
        }
        if let Some(lang) = lookup("LINGO_TARGET_LANG") {
            self.target_language = Some(lang);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "assets": { "timeout_seconds": 60 }, "target_language": "French" }"#,
        )
        .unwrap();

        let config = Config::load_with(&path, no_env).unwrap();
        assert_eq!(config.assets.timeout_seconds, 60);
        assert_eq!(config.assets.base_url, AssetConfig::default().base_url);
        assert_eq!(config.ocr.psm, 3);
        assert_eq!(config.target_language.as_deref(), Some("French"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(&dir.path().join("nope.json"), no_env).unwrap();
        assert_eq!(config.translator.timeout_seconds, 15);
        assert_eq!(config.source_language, None);
        assert_eq!(config.assets.model_dir, None);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load_with(&path, no_env),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LINGO_MODEL_DIR", "/opt/tessdata"),
            ("LINGO_SOURCE_LANG", "Japanese"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.assets.resolved_model_dir(), PathBuf::from("/opt/tessdata"));
        assert_eq!(config.source_language.as_deref(), Some("Japanese"));
        assert_eq!(config.target_language, None);
    }

    #[test]
    fn test_file_values_yield_to_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "source_language": "Russian" }"#).unwrap();

        let config = Config::load_with(&path, |key| {
            (key == "LINGO_SOURCE_LANG").then(|| "Japanese".to_string())
        })
        .unwrap();
        assert_eq!(config.source_language.as_deref(), Some("Japanese"));
    }
}
