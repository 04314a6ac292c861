//! Everything around the registry that touches the outside world:
//! TOML configuration and a threaded filesystem asset loader.

pub mod config;
pub mod error;
pub mod loader;

pub use config::{CONFIG_ENV, CONFIG_FILE_NAME, Config, LoaderConfig, OverlayEntry, OverlayKind};
pub use error::{AssetsError, Result};
pub use loader::{Completion, FsAssetLoader, LoadedAsset};
