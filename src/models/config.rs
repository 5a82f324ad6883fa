use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::ProcessingParameters;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PS1TEX_CONFIG";

/// Application configuration loaded from YAML.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Quiet period before a parameter change is processed, in ms.
    pub debounce_ms: u64,

    /// Largest accepted input file, in bytes.
    pub max_file_size: u64,

    /// Parameters used when none are given.
    pub defaults: ProcessingParameters,

    /// Seed for k-means centroid selection.
    pub palette_seed: u64,

    /// Recompress exported PNGs with oxipng.
    pub optimize_png: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_file_size: crate::codec::DEFAULT_MAX_FILE_SIZE,
            defaults: ProcessingParameters::default(),
            palette_seed: retro_raster::palette::DEFAULT_SEED,
            optimize_png: true,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from `$PS1TEX_CONFIG` when no path is given.
    ///
    /// A missing or unparsable file falls back to defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let env_path = std::env::var(CONFIG_ENV).ok();
        let Some(path) = path.or(env_path.as_deref().map(Path::new)) else {
            tracing::debug!("No config file configured, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_yaml(&content) {
                Ok(config) => {
                    tracing::info!(
                        path = %path.display(),
                        debounce_ms = config.debounce_ms,
                        "Loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    tracing::warn!(%e, path = %path.display(), "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(%e, path = %path.display(), "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Parse YAML. Default parameters outside the component limits are
    /// replaced with the built-in defaults.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let mut config: Self = serde_yaml::from_str(content)?;
        if !config.defaults.within_limits() {
            tracing::warn!(
                resolution = config.defaults.resolution,
                color_depth = config.defaults.color_depth,
                "Configured defaults out of range, using built-in defaults"
            );
            config.defaults = ProcessingParameters::default();
        }
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.max_file_size, 52_428_800);
        assert!(config.optimize_png);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml("debounce_ms: 50\n").unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.defaults, ProcessingParameters::default());
    }

    #[test]
    fn test_nested_defaults() {
        let yaml = "defaults:\n  resolution: 128\n  colorDepth: 8\n  dithering: true\noptimize_png: false\n";
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.defaults, ProcessingParameters::new(128, 8, true));
        assert!(!config.optimize_png);
    }

    #[test]
    fn test_out_of_range_defaults_replaced() {
        let yaml = "defaults:\n  resolution: 4096\n  colorDepth: 8\n  dithering: true\ndebounce_ms: 10\n";
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.defaults, ProcessingParameters::default());
        assert_eq!(config.debounce_ms, 10);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/ps1tex.yaml")));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "debounce_ms: [not a number").unwrap();
        assert_eq!(AppConfig::load(Some(&path)), AppConfig::default());
    }
}
