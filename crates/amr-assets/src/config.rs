use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use amr_core::{LocalOffset, OverlayCatalog, OverlayRecipe, RegistryOptions, Vec3};
use serde::Deserialize;

use crate::error::{AssetsError, Result};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "AMR_CONFIG";

/// Config file picked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "amr.toml";

/// Top-level `amr.toml`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub registry: RegistryOptions,
    pub loader: LoaderConfig,
    /// Replaces the built-in overlay table when non-empty.
    #[serde(rename = "overlay")]
    pub overlays: Vec<OverlayEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub asset_dir: PathBuf,
    pub texture_extension: String,
    pub model_extension: String,
    pub workers: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            texture_extension: "png".to_string(),
            model_extension: "sfb".to_string(),
            workers: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Flat,
    Dynamic,
}

/// One `[[overlay]]` table.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayEntry {
    pub label: String,
    pub kind: OverlayKind,
    pub texture: Option<String>,
    pub model: Option<String>,
    /// `[size_x, size_z]` for flat overlays.
    pub size: Option<[f64; 2]>,
    pub offset: Option<[f64; 3]>,
    pub offset_extent_z: Option<f64>,
}

impl OverlayEntry {
    pub fn recipe(&self) -> Result<OverlayRecipe> {
        let invalid =
            |msg: &str| AssetsError::InvalidData(format!("overlay '{}': {msg}", self.label));
        match self.kind {
            OverlayKind::Dynamic => {
                let model = self
                    .model
                    .as_deref()
                    .ok_or_else(|| invalid("dynamic overlay needs `model`"))?;
                if self.texture.is_some() || self.size.is_some() {
                    return Err(invalid("dynamic overlay takes only `model`"));
                }
                Ok(OverlayRecipe::dynamic(model))
            }
            OverlayKind::Flat => {
                let texture = self
                    .texture
                    .as_deref()
                    .ok_or_else(|| invalid("flat overlay needs `texture`"))?;
                let [size_x, size_z] = self
                    .size
                    .ok_or_else(|| invalid("flat overlay needs `size`"))?;
                if !(size_x > 0.0 && size_z > 0.0) {
                    return Err(invalid("quad size must be positive"));
                }
                let offset = match (self.offset, self.offset_extent_z) {
                    (Some(_), Some(_)) => {
                        return Err(invalid("`offset` and `offset_extent_z` are exclusive"));
                    }
                    (Some(v), None) => LocalOffset::Fixed(Vec3::from(v)),
                    (None, Some(factor)) => LocalOffset::ExtentZ(factor),
                    (None, None) => LocalOffset::default(),
                };
                Ok(OverlayRecipe::flat(texture, size_x, size_z).with_offset(offset))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pure helpers (no I/O)
// ---------------------------------------------------------------------------

/// Pick the config file to read.
///
/// Priority chain:
/// 1. Explicit `--config` path
/// 2. `AMR_CONFIG` environment variable (ignored when empty)
/// 3. `amr.toml` in the working directory, if it exists
/// 4. None: built-in defaults
fn pick_config_path(
    explicit: Option<&Path>,
    env_value: Option<String>,
    cwd_candidate: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value
        && !value.trim().is_empty()
    {
        return Some(PathBuf::from(value));
    }
    cwd_candidate
}

impl Config {
    /// Parse and validate TOML. Relative paths stay relative.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.loader.workers == 0 {
            return Err(AssetsError::InvalidData(
                "loader.workers must be at least 1".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for entry in &self.overlays {
            if !seen.insert(entry.label.as_str()) {
                return Err(AssetsError::InvalidData(format!(
                    "duplicate overlay label '{}'",
                    entry.label
                )));
            }
            entry.recipe()?;
        }
        Ok(())
    }

    /// Overlay table: configured entries, or the built-in set when none are given.
    pub fn catalog(&self) -> Result<OverlayCatalog> {
        if self.overlays.is_empty() {
            return Ok(OverlayCatalog::builtin());
        }
        let mut catalog = OverlayCatalog::new();
        for entry in &self.overlays {
            catalog.insert(&entry.label, entry.recipe()?);
        }
        Ok(catalog)
    }

    // -----------------------------------------------------------------------
    // I/O wrappers
    // -----------------------------------------------------------------------

    /// Read a config file. A relative `asset_dir` resolves against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if config.loader.asset_dir.is_relative()
            && let Some(parent) = path.parent()
        {
            config.loader.asset_dir = parent.join(&config.loader.asset_dir);
        }
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve and load the effective config. Returns the file used, if any.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let cwd_candidate = env::current_dir()
            .ok()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|p| p.is_file());
        match pick_config_path(explicit, env::var(CONFIG_ENV).ok(), cwd_candidate) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }
}
