use std::sync::Arc;

use lingo_core::{CatalogKind, LanguageCatalog};

use crate::Translator;

/// Translates into a target language given by display name
pub struct TranslationService {
    catalog: Arc<LanguageCatalog>,
    backend: Arc<dyn Translator>,
}

impl TranslationService {
    pub fn new(catalog: Arc<LanguageCatalog>, backend: Arc<dyn Translator>) -> Self {
        tracing::debug!("Translation backend: {}", backend.metadata().name);
        Self { catalog, backend }
    }

    /// `None` for an unknown target, blank input, or any provider error.
    /// Errors are logged; there is no retry.
    pub async fn translate(&self, text: &str, target_language: &str) -> Option<String> {
        let code = match self.catalog.code_for(CatalogKind::Translation, target_language) {
            Ok(code) => code.to_string(),
            Err(e) => {
                tracing::warn!("Skipping translation: {}", e);
                return None;
            }
        };

        if text.trim().is_empty() {
            return None;
        }

        match self.backend.translate(text, None, code.clone()).await {
            Ok(translation) => {
                tracing::debug!(
                    "Translated {:?} -> {} via {}",
                    translation.from,
                    code,
                    translation.provider
                );
                Some(translation.text)
            }
            Err(e) => {
                tracing::warn!("Translation to {} failed: {}", code, e);
                None
            }
        }
    }
}
