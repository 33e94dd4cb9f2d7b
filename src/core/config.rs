//! Loader configuration
//!
//! ```toml
//! variant = "apex"
//! pak_dir = "paks/Win64"
//! starpak_dir = "paks/Win64"
//! known_names = "names.txt"
//! ```

use crate::error::{RpakError, Result};
use crate::header::Variant;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub variant: Variant,
    /// Directory holding `.rpak` files
    pub pak_dir: PathBuf,
    /// Directory holding `.starpak` files; defaults to `pak_dir`
    pub starpak_dir: Option<PathBuf>,
    /// Newline-separated list of candidate asset names
    pub known_names: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            variant: Variant::default(),
            pak_dir: PathBuf::from("."),
            starpak_dir: None,
            known_names: None,
        }
    }
}

impl LoaderConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RpakError::Config(e.to_string()))
    }

    /// Load from a TOML file; relative paths resolve against the file's directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| RpakError::file_io(path, e))?;
        let mut config = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent() {
            config.pak_dir = base.join(&config.pak_dir);
            config.starpak_dir = config.starpak_dir.map(|dir| base.join(dir));
            config.known_names = config.known_names.map(|file| base.join(file));
        }
        debug!("Loaded loader config from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| RpakError::Config(e.to_string()))
    }

    pub fn starpak_dir(&self) -> &Path {
        self.starpak_dir.as_deref().unwrap_or(&self.pak_dir)
    }
}
