use std::sync::Arc;

use image::DynamicImage;
use lingo_assets::AssetManager;
use lingo_ocr::OcrService;
use lingo_translator::TranslationService;

/// One capture to recognize and translate
#[derive(Clone, Default)]
pub struct PipelineRequest {
    pub image: Option<Arc<DynamicImage>>,
    /// OCR catalog name
    pub source_language: Option<String>,
    /// Translation catalog name
    pub target_language: Option<String>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Recognize-then-translate over the shared services
#[derive(Clone)]
pub struct Pipeline {
    assets: Arc<AssetManager>,
    ocr: Arc<OcrService>,
    translator: Arc<TranslationService>,
}

impl Pipeline {
    pub fn new(
        assets: Arc<AssetManager>,
        ocr: Arc<OcrService>,
        translator: Arc<TranslationService>,
    ) -> Self {
        Self {
            assets,
            ocr,
            translator,
        }
    }

    /// `Ok(None)` when a language is unselected, the source model is not
    /// installed, no text was found, or translation failed. A missing or
    /// empty image is a caller bug and the only error.
    pub async fn run(&self, request: PipelineRequest) -> Result<Option<String>, PipelineError> {
        let Some(source) = selected(&request.source_language) else {
            tracing::debug!("No source language selected");
            return Ok(None);
        };
        let Some(target) = selected(&request.target_language) else {
            tracing::debug!("No target language selected");
            return Ok(None);
        };

        let image = request
            .image
            .ok_or(PipelineError::InvalidArgument("no image"))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::InvalidArgument("empty image"));
        }

        if !self.assets.is_installed(source) {
            tracing::warn!("OCR language '{}' is not installed", source);
            return Ok(None);
        }

        let Some(text) = self.ocr.recognize(image, source).await else {
            tracing::info!("No text recognized");
            return Ok(None);
        };
        tracing::debug!("Recognized {} chars", text.len());

        Ok(self.translator.translate(&text, target).await)
    }
}

fn selected(language: &Option<String>) -> Option<&str> {
    language.as_deref().map(str::trim).filter(|l| !l.is_empty())
}
