use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "FIVETHIRTY_DATA_DIR";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory (`FIVETHIRTY_DATA_DIR` or the platform
    /// default) and create it if needed. `db_override` replaces the database
    /// path but not the data directory.
    pub fn load(db_override: Option<&Path>) -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "fivethirty")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::in_dir(data_dir, db_override)
    }

    fn in_dir(data_dir: PathBuf, db_override: Option<&Path>) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = db_override.map_or_else(|| data_dir.join("fivethirty.db"), Path::to_path_buf);

        Ok(Config { db_path, data_dir })
    }
}
