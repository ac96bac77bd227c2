//! Simple OCR check - run with: cargo run -p lingo-ocr --bin test_ocr -- <image> [language] [model dir]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use lingo_config::Config;
use lingo_core::LanguageCatalog;
use lingo_ocr::{OcrService, TesseractFactory};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let image_path = PathBuf::from(args.next().context("usage: test_ocr <image> [language] [model dir]")?);
    let language = args.next().unwrap_or_else(|| "English".to_string());

    let config = Config::new();
    let model_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.assets.resolved_model_dir());

    tracing::info!("=== OCR Test ===");
    tracing::info!("image: {}", image_path.display());
    tracing::info!("language: {} (models in {})", language, model_dir.display());

    let image = image::open(&image_path)
        .with_context(|| format!("Failed to open {}", image_path.display()))?;
    let image = Arc::new(image);

    let ocr = OcrService::new(
        Arc::new(LanguageCatalog::builtin()),
        model_dir,
        Arc::new(TesseractFactory::new(&config.ocr)),
    );

    // Second pass shows the cached engine
    for pass in 1..=2 {
        let start = std::time::Instant::now();
        match ocr.recognize(image.clone(), &language).await {
            Some(text) => {
                tracing::info!("pass {}: {:?}, {} chars", pass, start.elapsed(), text.len());
                for line in text.lines().take(5) {
                    tracing::info!("   > {}", line);
                }
            }
            None => tracing::warn!("pass {}: no text ({:?})", pass, start.elapsed()),
        }
    }

    ocr.shutdown();
    tracing::info!("=== Done ===");
    Ok(())
}
