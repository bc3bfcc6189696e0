//! # Configuration Module
//!
//! Data directory setup and quiz tuning for Songquiz.
//!
//! ## Data Storage
//!
//! Songquiz keeps its database and optional config file in the
//! platform-standard data directory:
//! - Linux: `~/.local/share/songquiz/`
//! - macOS: `~/Library/Application Support/songquiz/`
//! - Windows: `%APPDATA%\songquiz\`
//!
//! ## Config File
//!
//! `config.json` in the same directory may override any [`QuizConfig`]
//! field; missing fields keep their defaults. A `populations` entry replaces
//! the whole tier table.
//!
//! ```json
//! { "max_responses": 20, "populations": { "1": 800, "2": 2000 } }
//! ```

use crate::estimator::TierPopulation;
use crate::session::MAX_RESPONSES;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "songquiz";
const DB_FILE: &str = "songs.db";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-appropriate data directory for Songquiz,
/// creating it if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The songquiz subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        ))?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!(
            "Failed to create Songquiz data directory at {}. Please check file permissions.",
            app_dir.display()
        ))?;

    Ok(app_dir)
}

/// Returns the platform-appropriate database file path.
///
/// # Examples
///
/// ```no_run
/// use songquiz::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Database location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Tunable quiz parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Answers after which a session finishes.
    pub max_responses: usize,
    /// Songs drawn into a session's working set.
    pub sample_size: usize,
    /// Candidate songs fetched before sampling.
    pub fetch_limit: usize,
    /// Assumed songs per tier, used by the estimator.
    pub populations: TierPopulation,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_responses: MAX_RESPONSES,
            sample_size: 30,
            fetch_limit: 1000,
            populations: TierPopulation::default(),
        }
    }
}

impl QuizConfig {
    /// Load from `path`, or defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    pub quiz: QuizConfig,
}

impl RuntimeConfig {
    /// Standard locations, with `config.json` applied if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is unavailable or the config
    /// file is malformed.
    pub fn new() -> Result<Self> {
        let data_dir = get_data_dir()?;
        Ok(Self {
            db_path: data_dir.join(DB_FILE),
            quiz: QuizConfig::load(&data_dir.join(CONFIG_FILE))?,
        })
    }

    /// Create configuration with explicit database path
    #[must_use]
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            quiz: QuizConfig::default(),
        }
    }
}
