//! Configuration management

use crate::speech::BackendKind;
use crate::{Result, SpeakError};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
///
/// Backed by an INI file (`~/.speakgate.cfg` unless loaded from an explicit
/// path). Missing keys fall back to built-in defaults.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default path, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path`, creating a default file if missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| SpeakError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| SpeakError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Built-in defaults, without touching the filesystem
    pub fn in_memory() -> Self {
        Self {
            ini: Self::default_config(),
            path: PathBuf::new(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| SpeakError::Config(format!("Failed to save config: {}", e)))
    }

    /// Default config file path (~/.speakgate.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".speakgate.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("backend", "native")
            .set("poll_interval_ms", "50");

        ini.with_section(Some("simulated")).set("word_ms", "120");

        ini.with_section(Some("demo"))
            .set("greeting", "Tap Speak n Leak to begin, tap again to stop.")
            .set("max_count", "0");

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get a float value from config
    pub fn get_float(&self, section: &str, key: &str, default: f32) -> f32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    // Speech settings

    /// Which backend speaks: `native` or `simulated`
    pub fn backend(&self) -> Result<BackendKind> {
        self.get_string("speech", "backend", "native").parse()
    }

    /// How often to poll engines that cannot report completion
    pub fn poll_interval(&self) -> Duration {
        let ms = self.get_int("speech", "poll_interval_ms", 50).max(1);
        Duration::from_millis(ms as u64)
    }

    /// Voice language used when a request names none
    pub fn default_language(&self) -> Option<String> {
        self.ini
            .get_from(Some("speech"), "default_language")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Duration of one word on the simulated backend
    pub fn simulated_word_time(&self) -> Duration {
        let ms = self.get_int("simulated", "word_ms", 120).max(0);
        Duration::from_millis(ms as u64)
    }

    // Demo loop settings

    /// Spoken once at startup
    pub fn greeting(&self) -> String {
        self.get_string(
            "demo",
            "greeting",
            "Tap Speak n Leak to begin, tap again to stop.",
        )
    }

    /// Stop the counting loop after this many utterances; 0 means never
    pub fn max_count(&self) -> u64 {
        self.get_int("demo", "max_count", 0).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::in_memory();
        assert_eq!(config.backend().unwrap(), BackendKind::Native);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.simulated_word_time(), Duration::from_millis(120));
        assert_eq!(config.default_language(), None);
        assert_eq!(config.max_count(), 0);
        assert!(config.greeting().starts_with("Tap"));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::in_memory();
        config.set("speech", "backend", "simulated");
        config.set("speech", "poll_interval_ms", "0");
        config.set("speech", "default_language", " fr-FR ");
        config.set("demo", "max_count", "-3");

        assert_eq!(config.backend().unwrap(), BackendKind::Simulated);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.default_language(), Some("fr-FR".to_string()));
        assert_eq!(config.max_count(), 0);
    }

    #[test]
    fn test_bad_backend() {
        let mut config = Config::in_memory();
        config.set("speech", "backend", "sapi");
        assert!(matches!(config.backend(), Err(SpeakError::Config(_))));
    }

    #[test]
    fn test_typed_getters_fall_back() {
        let mut config = Config::in_memory();
        config.set("speech", "flag", "yes");
        assert!(config.get_bool("speech", "flag", true));
        assert_eq!(config.get_float("speech", "missing", 0.25), 0.25);
        assert_eq!(config.get_int("speech", "backend", 7), 7);
    }
}
