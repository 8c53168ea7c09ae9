//! Runtime settings: built-in defaults, then `SMARTPAWS_*` environment
//! variables. CLI flags are applied on top in `main`.

use std::path::PathBuf;
use std::time::Duration;

use crate::loader::{LoadOptions, DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENT_BATCHES};

pub const ML_URL_VAR: &str = "SMARTPAWS_ML_URL";
pub const ML_TIMEOUT_VAR: &str = "SMARTPAWS_ML_TIMEOUT_SECS";
pub const BATCH_SIZE_VAR: &str = "SMARTPAWS_BATCH_SIZE";
pub const OUTPUT_DIR_VAR: &str = "SMARTPAWS_OUTPUT_DIR";

pub const DEFAULT_ML_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_OUTPUT_DIR: &str = "reports";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Prediction service base URL; `None` means always use the fallbacks.
    pub ml_url: Option<String>,
    pub ml_timeout: Duration,
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ml_url: None,
            ml_timeout: DEFAULT_ML_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparsable or zero numeric values keep the default and log a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        cfg.ml_url = get(ML_URL_VAR);
        if let Some(secs) = get(ML_TIMEOUT_VAR) {
            match secs.parse::<u64>() {
                Ok(n) if n > 0 => cfg.ml_timeout = Duration::from_secs(n),
                _ => log::warn!("Ignoring {ML_TIMEOUT_VAR}={secs}: expected a positive integer"),
            }
        }
        if let Some(size) = get(BATCH_SIZE_VAR) {
            match size.parse::<usize>() {
                Ok(n) if n > 0 => cfg.batch_size = n,
                _ => log::warn!("Ignoring {BATCH_SIZE_VAR}={size}: expected a positive integer"),
            }
        }
        if let Some(dir) = get(OUTPUT_DIR_VAR) {
            cfg.output_dir = PathBuf::from(dir);
        }
        cfg
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            batch_size: self.batch_size,
            max_concurrent_batches: self.max_concurrent_batches,
        }
    }
}
