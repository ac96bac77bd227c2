use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use image::DynamicImage;
use lingo_core::{CatalogKind, LanguageCatalog};
use tokio::sync::OnceCell;

use crate::engine::{EngineFactory, OcrEngine, OcrError};

type EngineSlot = Arc<OnceCell<Arc<dyn OcrEngine>>>;

/// Recognizes text by display language name, keeping one engine per
/// provider code alive for the lifetime of the service.
pub struct OcrService {
    catalog: Arc<LanguageCatalog>,
    model_dir: PathBuf,
    factory: Arc<dyn EngineFactory>,
    engines: Mutex<HashMap<String, EngineSlot>>,
}

impl OcrService {
    pub fn new(
        catalog: Arc<LanguageCatalog>,
        model_dir: PathBuf,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            catalog,
            model_dir,
            factory,
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// Run OCR on `image` with the model for `language`.
    ///
    /// Returns `None` for an unknown language, an engine that cannot be
    /// built, a recognition error, or an image with no text in it.
    pub async fn recognize(&self, image: Arc<DynamicImage>, language: &str) -> Option<String> {
        let code = match self.catalog.code_for(CatalogKind::Ocr, language) {
            Ok(code) => code.to_string(),
            Err(e) => {
                tracing::warn!("Skipping OCR: {}", e);
                return None;
            }
        };

        let engine = match self.engine(&code).await {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!("No OCR engine for '{}': {}", code, e);
                return None;
            }
        };

        tracing::debug!("Recognizing with the '{}' engine", engine.language());
        let started = std::time::Instant::now();
        let result = tokio::task::spawn_blocking(move || engine.recognize(&image)).await;

        match result {
            Ok(Ok(text)) => {
                let text = text.trim();
                tracing::debug!("OCR ({}) got {} chars in {:?}", code, text.len(), started.elapsed());
                if text.is_empty() {
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("OCR ({}) failed: {}", code, e);
                None
            }
            Err(e) => {
                tracing::error!("OCR task error: {}", e);
                None
            }
        }
    }

    /// Cached engine for `code`, built on first use.
    ///
    /// Concurrent first calls for the same code wait on one construction; a
    /// failed construction leaves the slot empty for the next caller.
    async fn engine(&self, code: &str) -> Result<Arc<dyn OcrEngine>, OcrError> {
        let slot = {
            let mut engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
            engines.entry(code.to_string()).or_default().clone()
        };

        let engine = slot
            .get_or_try_init(|| {
                let factory = self.factory.clone();
                let model_dir = self.model_dir.clone();
                let code = code.to_string();
                async move {
                    tracing::debug!("Building OCR engine for '{}'", code);
                    tokio::task::spawn_blocking(move || factory.create(&model_dir, &code))
                        .await
                        .map_err(|e| OcrError::EngineUnavailable(e.to_string()))?
                }
            })
            .await?;

        Ok(engine.clone())
    }

    /// Number of engines built so far
    pub fn cached_engines(&self) -> usize {
        let engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
        engines.values().filter(|slot| slot.initialized()).count()
    }

    /// Drop every cached engine. Recognition after this rebuilds on demand.
    pub fn shutdown(&self) {
        let released = {
            let mut engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *engines)
        };

        let count = released.values().filter(|slot| slot.initialized()).count();
        if count > 0 {
            tracing::info!("Released {} OCR engine(s)", count);
        }
    }
}

impl Drop for OcrService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    struct FixedEngine {
        code: String,
        text: String,
        drops: Arc<AtomicUsize>,
    }

    impl OcrEngine for FixedEngine {
        fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            if self.text == "!fail" {
                return Err(OcrError::Recognition("bad page".into()));
            }
            Ok(self.text.clone())
        }

        fn language(&self) -> &str {
            &self.code
        }
    }

    impl Drop for FixedEngine {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        text: String,
        creates: AtomicUsize,
        failures_left: AtomicUsize,
        drops: Arc<AtomicUsize>,
    }

    impl EngineFactory for CountingFactory {
        fn create(&self, _dir: &Path, code: &str) -> Result<Arc<dyn OcrEngine>, OcrError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(30));
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(OcrError::EngineUnavailable("warming up".into()));
            }
            Ok(Arc::new(FixedEngine {
                code: code.to_string(),
                text: self.text.clone(),
                drops: self.drops.clone(),
            }))
        }
    }

    fn service(factory: Arc<CountingFactory>) -> Arc<OcrService> {
        Arc::new(OcrService::new(
            Arc::new(LanguageCatalog::builtin()),
            PathBuf::from("unused"),
            factory,
        ))
    }

    fn blank() -> Arc<DynamicImage> {
        Arc::new(DynamicImage::new_rgb8(8, 8))
    }

    fn factory_with(text: &str) -> Arc<CountingFactory> {
        Arc::new(CountingFactory {
            text: text.to_string(),
            ..CountingFactory::default()
        })
    }

    #[tokio::test]
    async fn test_recognize_trims_text() {
        let factory = factory_with("  hello\n\u{c}");
        let ocr = service(factory.clone());
        assert_eq!(ocr.recognize(blank(), "English").await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_unknown_language_never_builds_engine() {
        let factory = factory_with("hello");
        let ocr = service(factory.clone());
        assert_eq!(ocr.recognize(blank(), "Klingon").await, None);
        assert_eq!(factory.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_text_is_none() {
        let ocr = service(factory_with(" \n "));
        assert_eq!(ocr.recognize(blank(), "English").await, None);
    }

    #[tokio::test]
    async fn test_engine_error_is_none() {
        let ocr = service(factory_with("!fail"));
        assert_eq!(ocr.recognize(blank(), "English").await, None);
    }

    #[tokio::test]
    async fn test_engine_reused_per_language() {
        let factory = factory_with("hello");
        let ocr = service(factory.clone());

        ocr.recognize(blank(), "English").await;
        ocr.recognize(blank(), "English").await;
        ocr.recognize(blank(), "Russian").await;

        assert_eq!(factory.creates.load(Ordering::SeqCst), 2);
        assert_eq!(ocr.cached_engines(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_builds_once() {
        let factory = factory_with("hello");
        let ocr = service(factory.clone());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let ocr = ocr.clone();
                tokio::spawn(async move { ocr.recognize(blank(), "Japanese").await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().as_deref(), Some("hello"));
        }
        assert_eq!(factory.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_construction_is_retried() {
        let factory = Arc::new(CountingFactory {
            text: "hello".into(),
            failures_left: AtomicUsize::new(1),
            ..CountingFactory::default()
        });
        let ocr = service(factory.clone());

        assert_eq!(ocr.recognize(blank(), "English").await, None);
        assert_eq!(ocr.cached_engines(), 0);
        assert_eq!(ocr.recognize(blank(), "English").await.as_deref(), Some("hello"));
        assert_eq!(factory.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_releases_engines() {
        let factory = factory_with("hello");
        let ocr = service(factory.clone());
        ocr.recognize(blank(), "English").await;
        ocr.recognize(blank(), "Russian").await;

        ocr.shutdown();
        assert_eq!(ocr.cached_engines(), 0);
        assert_eq!(factory.drops.load(Ordering::SeqCst), 2);

        ocr.recognize(blank(), "English").await;
        drop(ocr);
        assert_eq!(factory.drops.load(Ordering::SeqCst), 3);
    }
}
