use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "https://github.com/tesseract-ocr/tessdata/raw/main".to_string()
}

fn default_timeout_seconds() -> u64 {
    600
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AssetConfig {
    /// Host serving `{code}.traineddata` model files
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Where model files live, platform data dir when unset
    pub model_dir: Option<PathBuf>,
    /// Whole-download timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model_dir: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl AssetConfig {
    pub fn resolved_model_dir(&self) -> PathBuf {
        match &self.model_dir {
            Some(dir) => dir.clone(),
            None => default_model_dir(),
        }
    }
}

/// `<data dir>/Lingo/tessdata`, or `./tessdata` when the platform has none
pub fn default_model_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("Lingo").join("tessdata"))
        .unwrap_or_else(|| PathBuf::from("tessdata"))
}
