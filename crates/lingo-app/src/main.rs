use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use lingo_config::Config;
use lingo_core::{CatalogKind, LanguageEntry};
use serde::Serialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;

pub mod logging;
pub mod pipeline;
pub mod state;


use self::pipeline::PipelineRequest;
use self::state::AppState;

#[derive(Parser)]
#[command(name = "lingo", version, about = "Recognize text in a capture and translate it")]
struct Cli {
    /// JSON config file (defaults plus LINGO_* environment variables when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List OCR and translation languages
    Languages {
        #[arg(long)]
        json: bool,
    },
    /// Download an OCR language model (Ctrl+C cancels)
    Install {
        name: String,
        /// Download again even if already installed
        #[arg(long)]
        force: bool,
    },
    /// Remove an installed OCR language model
    Delete { name: String },
    /// Recognize the text in an image and translate it
    Translate {
        image: PathBuf,
        /// OCR language, e.g. "Japanese"
        #[arg(long)]
        from: Option<String>,
        /// Target language, e.g. "English"
        #[arg(long)]
        to: Option<String>,
        /// Download the source language model first if it is missing
        #[arg(long)]
        install: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::new(),
    };

    let state = AppState::new(config)?;
    let result = run(&state, cli.command).await;
    state.ocr.shutdown();
    result
}

async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Languages { json } => list_languages(state, json),
        Command::Install { name, force } => install(state, &name, force).await,
        Command::Delete { name } => {
            if state.assets.delete(&name)? {
                println!("{name} deleted");
                Ok(())
            } else {
                bail!("Could not delete {name}, is the model in use?")
            }
        }
        Command::Translate {
            image,
            from,
            to,
            install,
        } => translate(state, image, from, to, install).await,
    }
}

#[derive(Serialize)]
struct LanguageListing<'a> {
    ocr: Vec<LanguageEntry>,
    translation: Vec<&'a str>,
}

fn list_languages(state: &AppState, json: bool) -> anyhow::Result<()> {
    let listing = LanguageListing {
        ocr: state.assets.list_languages(),
        translation: state.catalog.all_names(CatalogKind::Translation),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("OCR languages ({}):", state.assets.model_dir().display());
    for entry in &listing.ocr {
        let status = match entry.size_bytes {
            Some(size) => format!("installed, {:.1} MB", size as f64 / 1_000_000.0),
            None => "not installed".to_string(),
        };
        println!("  {:<22} {:<8} {}", entry.display_name, entry.provider_code, status);
    }

    println!("Translation languages:");
    for name in &listing.translation {
        println!("  {name}");
    }
    Ok(())
}

async fn install(state: &AppState, name: &str, force: bool) -> anyhow::Result<()> {
    state.assets.purge_stale_temp_files();

    if install_cancellable(state, name, force).await? {
        println!("{name} installed");
        Ok(())
    } else {
        bail!("Failed to install {name}")
    }
}

/// Run an install that Ctrl+C cancels
async fn install_cancellable(state: &AppState, name: &str, force: bool) -> anyhow::Result<bool> {
    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                tracing::info!("Cancel requested");
                cancel.cancel();
            }
        }
    });

    let result = if force {
        state.assets.reinstall(name, &cancel).await
    } else {
        state.assets.install(name, &cancel).await
    };
    ctrl_c.abort();

    Ok(result?)
}

async fn translate(
    state: &AppState,
    image_path: PathBuf,
    from: Option<String>,
    to: Option<String>,
    install_missing: bool,
) -> anyhow::Result<()> {
    let image = image::open(&image_path)
        .with_context(|| format!("Failed to open {}", image_path.display()))?;

    let request = PipelineRequest {
        image: Some(Arc::new(image)),
        source_language: from.or_else(|| state.config.source_language.clone()),
        target_language: to.or_else(|| state.config.target_language.clone()),
    };

    if let Some(source) = &request.source_language {
        if install_missing {
            if !install_cancellable(state, source, false).await? {
                bail!("Failed to install {source}");
            }
        } else if !state.assets.is_installed(source) {
            tracing::warn!(
                "Run `lingo install \"{source}\"` or pass --install (installed: {:?})",
                state.assets.installed_languages()
            );
        }
    }

    match state.pipeline().run(request).await? {
        Some(text) => {
            println!("{text}");
            Ok(())
        }
        None => bail!("No translation produced"),
    }
}
