use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ADVANCE_DELAY_MS: u64 = 1000;
pub const DEFAULT_CATALOG_PATH: &str = "content/curriculum_v1.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: String,
    /// Pause between a correct answer and the next item. Zero advances inline.
    pub advance_delay: Duration,
    pub catalog_path: PathBuf,
    /// Daily rolling log files are written here when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            advance_delay: Duration::from_millis(DEFAULT_ADVANCE_DELAY_MS),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_level = lookup("RUST_LOG").unwrap_or(defaults.log_level);

        let advance_delay = lookup("AX_ADVANCE_DELAY_MS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.advance_delay);

        let catalog_path = lookup("AX_CATALOG_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_path);

        let log_dir = lookup("AX_LOG_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Self {
            log_level,
            advance_delay,
            catalog_path,
            log_dir,
        }
    }
}
