pub mod catalog;
pub mod error;

pub use catalog::{
    CatalogKind, LanguageCatalog, LanguageEntry, MODEL_EXTENSION, model_file_name,
};
pub use error::LingoError;
