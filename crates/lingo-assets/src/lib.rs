mod download;
mod error;
mod fs;
mod manager;

pub use error::{AssetError, Cancelled};
pub use manager::AssetManager;
