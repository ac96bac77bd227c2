use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

/// A recognizer bound to one language model
pub trait OcrEngine: Send + Sync {
    /// Extract text from an image. May block; callers run it off the async runtime.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;

    /// Provider code the engine was built for
    fn language(&self) -> &str;
}

/// Builds engines. Construction is the expensive step, so results are cached.
pub trait EngineFactory: Send + Sync {
    fn create(&self, model_dir: &Path, code: &str) -> Result<Arc<dyn OcrEngine>, OcrError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Model file not found: {0}")]
    ModelMissing(PathBuf),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Recognition failed: {0}")]
    Recognition(String),

}
