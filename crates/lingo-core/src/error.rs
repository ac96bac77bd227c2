#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LingoError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Language not installed: {0}")]
    NotInstalled(String),
}
