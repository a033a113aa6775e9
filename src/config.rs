use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "TSF_VIEWER_CONFIG";
/// Env var overriding the timsdata library location.
pub const SDK_ENV: &str = "TIMSDATA_LIB";
const DEFAULT_CONFIG_FILE: &str = "tsf_viewer.json";

// ---------------------------------------------------------------------------
// Viewer configuration
// ---------------------------------------------------------------------------

/// User-tunable settings, read once at start-up.
///
/// ```json
/// {
///   "sdk_library_path": "/opt/bruker/libtimsdata.so",
///   "cache_averages": true,
///   "default_tolerance": 10.0,
///   "default_tolerance_unit": "ppm"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Location of the Bruker timsdata shared library.
    pub sdk_library_path: PathBuf,
    /// Open datasets with the recalibrated m/z state.
    pub use_recalibrated_state: bool,
    /// Persist averaged spectra inside the dataset directory.
    pub cache_averages: bool,
    /// Fraction of frames used by the average estimate.
    pub estimate_fraction: f64,
    pub default_tolerance: f64,
    /// "Da" or "ppm"; anything else yields a zero-width window.
    pub default_tolerance_unit: String,
    /// Point budget for the down-sampled spectrum plot.
    pub max_plot_points: usize,
    /// Rounding applied to m/z values picked from the spectrum.
    pub mz_click_decimals: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            sdk_library_path: PathBuf::from(default_sdk_library()),
            use_recalibrated_state: false,
            cache_averages: true,
            estimate_fraction: 0.2,
            default_tolerance: 0.05,
            default_tolerance_unit: "Da".to_string(),
            max_plot_points: 4000,
            mz_click_decimals: 4,
        }
    }
}

fn default_sdk_library() -> &'static str {
    if cfg!(target_os = "windows") {
        "timsdata.dll"
    } else {
        "libtimsdata.so"
    }
}

impl ViewerConfig {
    /// Load from `$TSF_VIEWER_CONFIG` or `./tsf_viewer.json`, falling back to
    /// defaults when no file exists. `$TIMSDATA_LIB` wins over the file.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.is_file() {
            Self::from_file(&path)?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        if let Some(lib) = std::env::var_os(SDK_ENV) {
            config.sdk_library_path = PathBuf::from(lib);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: ViewerConfig = serde_json::from_str(text).context("invalid viewer config")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(r#"{ "default_tolerance": 10.0, "default_tolerance_unit": "ppm" }"#)
            .unwrap();
        assert_eq!(config.default_tolerance, 10.0);
        assert_eq!(config.default_tolerance_unit, "ppm");
        assert_eq!(config.estimate_fraction, 0.2);
        assert_eq!(config.mz_click_decimals, 4);
        assert!(config.cache_averages);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ViewerConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, r#"{ "cache_averages": false, "max_plot_points": 500 }"#).unwrap();

        let config = ViewerConfig::from_file(&path).unwrap();
        assert!(!config.cache_averages);
        assert_eq!(config.max_plot_points, 500);
    }
}
