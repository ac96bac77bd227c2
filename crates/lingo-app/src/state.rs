use std::sync::Arc;

use anyhow::Context;
use lingo_assets::AssetManager;
use lingo_config::Config;
use lingo_core::LanguageCatalog;
use lingo_ocr::{OcrService, TesseractFactory};
use lingo_translator::{GoogleTranslator, TranslationService};

use crate::pipeline::Pipeline;

/// Services shared by every command, built once from the config
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<LanguageCatalog>,
    pub assets: Arc<AssetManager>,
    pub ocr: Arc<OcrService>,
    pub translator: Arc<TranslationService>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let catalog = Arc::new(LanguageCatalog::builtin());

        let assets = AssetManager::new(catalog.clone(), config.assets.clone())
            .context("Failed to prepare model directory")?;
        let assets = Arc::new(assets);

        let ocr = Arc::new(OcrService::new(
            catalog.clone(),
            assets.model_dir().to_path_buf(),
            Arc::new(TesseractFactory::new(&config.ocr)),
        ));

        let backend = GoogleTranslator::new(&config.translator)
            .context("Failed to create translation client")?;
        let translator = Arc::new(TranslationService::new(catalog.clone(), Arc::new(backend)));

        Ok(Self {
            config,
            catalog,
            assets,
            ocr,
            translator,
        })
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.assets.clone(), self.ocr.clone(), self.translator.clone())
    }
}
