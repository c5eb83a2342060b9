//! Optional project-level settings file (`config.toml` by default):
//! default search paths for directive `include`s and the
//! `DISCARD_N_SOLUTIONS` resolver toggle (§4.6/§9), mirroring the donor's
//! own top-level `config.rs` TOML loader.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("reading {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("parsing {path}: {source}")]
    Toml { path: PathBuf, #[source] source: toml::de::Error },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    #[serde(default)]
    pub discard_n_solutions: bool,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Settings, SettingsError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| SettingsError::Toml { path: path.to_path_buf(), source })
    }
}
