mod engine;
mod service;
mod tesseract;

pub use engine::{EngineFactory, OcrEngine, OcrError};
pub use service::OcrService;
pub use tesseract::{TesseractEngine, TesseractFactory};
