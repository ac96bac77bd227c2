use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::DynamicImage;
use lingo_config::ocr::OcrConfig;
use tesseract::{OcrEngineMode, Tesseract, TesseractError};

use crate::engine::{EngineFactory, OcrEngine, OcrError};

/// Creates [`TesseractEngine`]s backed by libtesseract
#[derive(Debug, Clone)]
pub struct TesseractFactory {
    psm: u8,
    oem: u8,
}

impl TesseractFactory {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            psm: config.psm,
            oem: config.oem,
        }
    }

    /// Where Tesseract looks for `code`'s model inside `model_dir`
    pub fn model_path(model_dir: &Path, code: &str) -> PathBuf {
        model_dir.join(lingo_core::model_file_name(code))
    }
}

impl EngineFactory for TesseractFactory {
    fn create(&self, model_dir: &Path, code: &str) -> Result<Arc<dyn OcrEngine>, OcrError> {
        let model = Self::model_path(model_dir, code);
        if !model.is_file() {
            return Err(OcrError::ModelMissing(model));
        }

        let datapath = model_dir.to_str().ok_or_else(|| {
            OcrError::EngineUnavailable(format!("{} is not valid UTF-8", model_dir.display()))
        })?;

        let engine = TesseractEngine {
            datapath: datapath.to_string(),
            code: code.to_string(),
            psm: self.psm,
            oem: self.oem,
            api: Mutex::new(None),
        };

        // Loading the model is the slow part; do it here so the cache holds a ready engine
        let api = engine.open()?;
        *engine.api.lock().unwrap_or_else(PoisonError::into_inner) = Some(api);
        tracing::info!("Tesseract ready for '{}'", code);

        Ok(Arc::new(engine))
    }
}

/// Map the numeric `--oem` convention onto the library's enum
fn engine_mode(oem: u8) -> OcrEngineMode {
    match oem {
        0 => OcrEngineMode::TesseractOnly,
        1 => OcrEngineMode::LstmOnly,
        2 => OcrEngineMode::TesseractLstmCombined,
        _ => OcrEngineMode::Default,
    }
}

/// One initialized Tesseract API per language.
///
/// The API is not reentrant, so calls are serialized on the mutex. The
/// builder methods consume the handle; if one fails the slot is left empty
/// and the next call initializes a fresh handle.
pub struct TesseractEngine {
    datapath: String,
    code: String,
    psm: u8,
    oem: u8,
    api: Mutex<Option<Tesseract>>,
}

impl TesseractEngine {
    fn open(&self) -> Result<Tesseract, OcrError> {
        let datapath = Some(self.datapath.as_str());
        let language = Some(self.code.as_str());
        Tesseract::new_with_oem(datapath, language, engine_mode(self.oem))
            .map_err(TesseractError::from)
            .and_then(|api| {
                api.set_variable("tessedit_pageseg_mode", &self.psm.to_string())
                    .map_err(TesseractError::from)
            })
            .map_err(|e| OcrError::EngineUnavailable(format!("{}: {}", self.code, e)))
    }
}

fn read_frame(
    api: Tesseract,
    frame: &[u8],
    width: i32,
    height: i32,
) -> Result<(Tesseract, String), TesseractError> {
    let mut api = api.set_frame(frame, width, height, 3, width * 3)?.recognize()?;
    let text = api.get_text()?;
    Ok((api, text))
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let (width, height) = match (i32::try_from(width), i32::try_from(height)) {
            (Ok(w), Ok(h)) if w.checked_mul(3).is_some() => (w, h),
            _ => {
                return Err(OcrError::Recognition(format!("image too large: {width}x{height}")));
            }
        };

        let mut slot = self.api.lock().unwrap_or_else(PoisonError::into_inner);
        let api = match slot.take() {
            Some(api) => api,
            None => {
                tracing::debug!("Reinitializing Tesseract for '{}'", self.code);
                self.open()?
            }
        };

        let (api, text) = read_frame(api, rgb.as_raw(), width, height)
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        *slot = Some(api);
        Ok(text)
    }

    fn language(&self) -> &str {
        &self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_reported_before_init() {
        let dir = tempfile::tempdir().unwrap();
        let result = TesseractFactory::new(&OcrConfig::default()).create(dir.path(), "eng");
        match result {
            Err(OcrError::ModelMissing(path)) => {
                assert_eq!(path, dir.path().join("eng.traineddata"))
            }
            other => panic!("expected ModelMissing, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_model_path_uses_tesseract_naming() {
        assert_eq!(
            TesseractFactory::model_path(Path::new("/models"), "jpn"),
            PathBuf::from("/models/jpn.traineddata")
        );
    }

    #[test]
    fn test_engine_mode_mapping() {
        assert!(matches!(engine_mode(0), OcrEngineMode::TesseractOnly));
        assert!(matches!(engine_mode(1), OcrEngineMode::LstmOnly));
        assert!(matches!(engine_mode(2), OcrEngineMode::TesseractLstmCombined));
        assert!(matches!(engine_mode(3), OcrEngineMode::Default));
        assert!(matches!(engine_mode(9), OcrEngineMode::Default));
    }
}
