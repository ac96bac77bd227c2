use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use lingo_config::assets::AssetConfig;
use lingo_core::{CatalogKind, LanguageCatalog, LanguageEntry, LingoError, model_file_name};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::download::download_to;
use crate::error::{AssetError, Cancelled};
use crate::fs::{commit_download, remove_with_retry};

/// Suffix of in-flight downloads, never a valid model file
pub(crate) const TEMP_EXTENSION: &str = "part";

/// A `.part` file younger than the download timeout plus this may still be
/// written by another process
const STALE_GRACE: Duration = Duration::from_secs(60);

/// Owns the OCR model directory: one `{code}.traineddata` file per language.
pub struct AssetManager {
    catalog: Arc<LanguageCatalog>,
    config: AssetConfig,
    model_dir: PathBuf,
    client: reqwest::Client,
    /// One lock per provider code so installs of the same model queue up
    install_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AssetManager {
    /// Create the manager, creating the model directory if missing
    pub fn new(catalog: Arc<LanguageCatalog>, config: AssetConfig) -> Result<Self, AssetError> {
        let model_dir = config.resolved_model_dir();
        std::fs::create_dir_all(&model_dir)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        tracing::debug!("Model directory: {}", model_dir.display());

        Ok(Self {
            catalog,
            config,
            model_dir,
            client,
            install_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Final on-disk location of a provider code's model
    pub fn model_path(&self, code: &str) -> PathBuf {
        self.model_dir.join(model_file_name(code))
    }

    pub fn download_url(&self, code: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            model_file_name(code)
        )
    }

    /// Unknown names are simply not installed
    pub fn is_installed(&self, name: &str) -> bool {
        match self.catalog.code_for(CatalogKind::Ocr, name) {
            Ok(code) => self.model_path(code).is_file(),
            Err(_) => false,
        }
    }

    /// Download and install a language's model.
    ///
    /// `Ok(false)` covers every environmental failure (unknown name, network,
    /// disk); those are logged, not raised. Only cancellation is an error. An
    /// installed language is a no-op success.
    pub async fn install(&self, name: &str, cancel: &CancellationToken) -> Result<bool, Cancelled> {
        self.install_inner(name, cancel, false).await
    }

    /// Like [`install`](Self::install) but replaces an existing model with a
    /// fresh download. The old file stays in place until the new one is
    /// complete.
    pub async fn reinstall(&self, name: &str, cancel: &CancellationToken) -> Result<bool, Cancelled> {
        self.install_inner(name, cancel, true).await
    }

    async fn install_inner(
        &self,
        name: &str,
        cancel: &CancellationToken,
        replace: bool,
    ) -> Result<bool, Cancelled> {
        let code = match self.catalog.code_for(CatalogKind::Ocr, name) {
            Ok(code) => code.to_string(),
            Err(e) => {
                tracing::warn!("Not installing: {}", e);
                return Ok(false);
            }
        };

        let lock = self.install_lock(&code);
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled),
            guard = lock.lock() => guard,
        };

        let final_path = self.model_path(&code);
        if !replace && final_path.is_file() {
            tracing::info!("{} ({}) already installed", name, code);
            return Ok(true);
        }

        let url = self.download_url(&code);
        let temp_path = self.temp_path(&code);
        tracing::info!("Installing {} from {}", name, url);

        let downloaded = download_to(&self.client, &url, &temp_path, cancel).await;
        let bytes = match downloaded {
            Ok(bytes) => bytes,
            Err(AssetError::Cancelled) => {
                remove_with_retry(&temp_path).await;
                tracing::info!("Install of {} cancelled", name);
                return Err(Cancelled);
            }
            Err(e) => {
                remove_with_retry(&temp_path).await;
                tracing::warn!("Install of {} failed: {}", name, e);
                return Ok(false);
            }
        };

        if !commit_download(&temp_path, &final_path).await {
            return Ok(false);
        }

        tracing::info!("Installed {} ({} bytes)", name, bytes);
        Ok(final_path.is_file())
    }

    /// Remove a language's model.
    ///
    /// Deleting something that is not there is a caller error; a file that
    /// refuses to go away is `Ok(false)`.
    pub fn delete(&self, name: &str) -> Result<bool, LingoError> {
        let code = self.catalog.code_for(CatalogKind::Ocr, name)?;
        let path = self.model_path(code);
        if !path.is_file() {
            return Err(LingoError::NotInstalled(name.to_string()));
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted {} ({})", name, path.display());
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", path.display(), e);
                Ok(false)
            }
        }
    }

    /// Every OCR language with its current install state
    pub fn list_languages(&self) -> Vec<LanguageEntry> {
        self.catalog
            .entries(CatalogKind::Ocr)
            .map(|(name, code)| {
                let size = std::fs::metadata(self.model_path(code))
                    .ok()
                    .filter(|m| m.is_file())
                    .map(|m| m.len());
                LanguageEntry {
                    display_name: name.to_string(),
                    provider_code: code.to_string(),
                    is_installed: size.is_some(),
                    size_bytes: size,
                    download_url: Some(self.download_url(code)),
                }
            })
            .collect()
    }

    /// Display names of installed languages, catalog order
    pub fn installed_languages(&self) -> Vec<String> {
        self.list_languages()
            .into_iter()
            .filter(|entry| entry.is_installed)
            .map(|entry| entry.display_name)
            .collect()
    }

    /// Remove partial downloads left behind by a crashed process.
    ///
    /// Only files older than the download timeout are touched, so installs
    /// running in other processes keep their temp files.
    pub fn purge_stale_temp_files(&self) -> usize {
        let stale_after = Duration::from_secs(self.config.timeout_seconds) + STALE_GRACE;
        self.purge_temp_files_older_than(stale_after)
    }

    pub(crate) fn purge_temp_files_older_than(&self, min_age: Duration) -> usize {
        let entries = match std::fs::read_dir(&self.model_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot scan {}: {}", self.model_dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for path in entries.filter_map(Result::ok).map(|e| e.path()) {
            let is_temp = path.extension().is_some_and(|ext| ext == TEMP_EXTENSION);
            if !is_temp || !path.is_file() {
                continue;
            }

            let age = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .map(|modified| modified.elapsed().unwrap_or_default());
            match age {
                Ok(age) if age >= min_age => {}
                Ok(_) => {
                    tracing::debug!("Keeping {}, download may be in progress", path.display());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            }

            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Cannot remove {}: {}", path.display(), e),
            }
        }

        if removed > 0 {
            tracing::info!("Removed {} stale partial download(s)", removed);
        }
        removed
    }

    fn temp_path(&self, code: &str) -> PathBuf {
        self.model_dir
            .join(format!("{}_{}.{}", code, Uuid::new_v4().simple(), TEMP_EXTENSION))
    }

    fn install_lock(&self, code: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .install_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(code.to_string()).or_default().clone()
    }
}
