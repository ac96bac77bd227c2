use serde::{Deserialize, Serialize};

use crate::error::LingoError;

/// Which provider a lookup goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// Tesseract language codes ("eng", "jpn")
    Ocr,
    /// Translation backend codes ("en", "ja")
    Translation,
}

/// Tesseract only loads `{code}.traineddata` from its data directory
pub const MODEL_EXTENSION: &str = "traineddata";

/// On-disk name of an OCR provider code's model
pub fn model_file_name(code: &str) -> String {
    format!("{code}.{MODEL_EXTENSION}")
}

/// A catalog language annotated with its local install state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub display_name: String,
    pub provider_code: String,
    pub is_installed: bool,
    pub size_bytes: Option<u64>,
    pub download_url: Option<String>,
}

/// Immutable mapping of display names to provider codes.
///
/// The OCR and translation tables are independent: a name present in one
/// says nothing about the other. Order of insertion is kept so menus list
/// languages the way they were declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCatalog {
    ocr: Vec<(String, String)>,
    translation: Vec<(String, String)>,
}

impl LanguageCatalog {
    pub fn new<N, C>(
        ocr: impl IntoIterator<Item = (N, C)>,
        translation: impl IntoIterator<Item = (N, C)>,
    ) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            ocr: collect_unique(ocr),
            translation: collect_unique(translation),
        }
    }

    /// Languages shipped with the app
    pub fn builtin() -> Self {
        Self::new(
            [
                ("English", "eng"),
                ("Russian", "rus"),
                ("Japanese", "jpn"),
                ("Chinese Simplified", "chi_sim"),
                ("Chinese Traditional", "chi_tra"),
            ],
            [
                ("English", "en"),
                ("Russian", "ru"),
                ("Japanese", "ja"),
                ("Chinese Simplified", "zh-CN"),
                ("Chinese Traditional", "zh-TW"),
                ("Spanish", "es"),
                ("French", "fr"),
                ("German", "de"),
                ("Arabic", "ar"),
                ("Portuguese", "pt"),
                ("Hindi", "hi"),
                ("Korean", "ko"),
                ("Italian", "it"),
                ("Turkish", "tr"),
            ],
        )
    }

    pub fn is_supported(&self, kind: CatalogKind, name: &str) -> bool {
        self.table(kind).iter().any(|(n, _)| n == name)
    }

    /// Provider code for a display name
    pub fn code_for(&self, kind: CatalogKind, name: &str) -> Result<&str, LingoError> {
        self.table(kind)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, code)| code.as_str())
            .ok_or_else(|| LingoError::UnsupportedLanguage(name.to_string()))
    }

    pub fn all_names(&self, kind: CatalogKind) -> Vec<&str> {
        self.table(kind).iter().map(|(n, _)| n.as_str()).collect()
    }

    /// (display name, provider code) pairs in declaration order
    pub fn entries(&self, kind: CatalogKind) -> impl Iterator<Item = (&str, &str)> {
        self.table(kind).iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    fn table(&self, kind: CatalogKind) -> &[(String, String)] {
        match kind {
            CatalogKind::Ocr => &self.ocr,
            CatalogKind::Translation => &self.translation,
        }
    }
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// First declaration of a name wins
fn collect_unique<N, C>(pairs: impl IntoIterator<Item = (N, C)>) -> Vec<(String, String)>
where
    N: Into<String>,
    C: Into<String>,
{
    let mut table: Vec<(String, String)> = Vec::new();
    for (name, code) in pairs {
        let name = name.into();
        if !table.iter().any(|(n, _)| *n == name) {
            table.push((name, code.into()));
        }
    }
    table
}
