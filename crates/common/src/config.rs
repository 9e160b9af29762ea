//! Application configuration.
//!
//! Configuration is never persisted by the engine. Hosts either use the
//! defaults or hand an explicit JSON file to [`AppConfig::try_load_from`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BlurfadeError, BlurfadeResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transcoder capability settings.
    pub transcoder: TranscoderConfig,

    /// Export/delivery settings.
    pub export: ExportSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "blurfade=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// Location and version pin of the transcoder core.
///
/// The two halves of the transcoder (front end and core) must agree on a
/// version. Skew between them is an operational constraint: the engine
/// reports it as a load failure and never attempts to repair it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSpec {
    /// Where the core lives. For the ffmpeg process transcoder this is the
    /// binary name or path.
    pub url: String,

    /// Version string the core must report, if pinned.
    pub expected_version: Option<String>,
}

/// Transcoder capability settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// Core to load.
    pub core: CoreSpec,

    /// Safety-net interval for re-checking capability availability.
    pub poll_interval_ms: u64,

    /// Give up waiting for the capability after this long (`None` = wait
    /// until cancelled).
    pub load_timeout_ms: Option<u64>,

    /// Staged input name inside the transcoder's file space.
    pub input_file_name: String,

    /// Staged output stem; the container extension is appended.
    pub output_file_stem: String,

    /// ffprobe binary used for progress ratios.
    pub ffprobe_binary: String,
}

/// Export/delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Delay before a download URL is revoked.
    pub revoke_delay_ms: u64,

    /// Title passed to the native share sheet.
    pub share_title: String,

    /// Whether the platform supports `video/mp4` output.
    pub prefer_mp4: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl Default for CoreSpec {
    fn default() -> Self {
        Self {
            url: "ffmpeg".to_string(),
            expected_version: None,
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            core: CoreSpec::default(),
            poll_interval_ms: 100,
            load_timeout_ms: None,
            input_file_name: "inputfile".to_string(),
            output_file_stem: "output".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            revoke_delay_ms: 100,
            share_title: "Edited Media".to_string(),
            prefer_mp4: true,
        }
    }
}

impl TranscoderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}

impl ExportSettings {
    pub fn revoke_delay(&self) -> Duration {
        Duration::from_millis(self.revoke_delay_ms)
    }
}

impl AppConfig {
    /// Load config from an explicit file.
    pub fn try_load_from(path: impl AsRef<Path>) -> BlurfadeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BlurfadeError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            BlurfadeError::config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Load config from an explicit file, falling back to defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        Self::try_load_from(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default config");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.transcoder.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.transcoder.input_file_name, "inputfile");
        assert_eq!(config.export.revoke_delay(), Duration::from_millis(100));
        assert!(config.export.prefer_mp4);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"export":{"revoke_delay_ms":250}}"#).unwrap();
        assert_eq!(config.export.revoke_delay_ms, 250);
        assert_eq!(config.export.share_title, "Edited Media");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_missing_file_falls_back() {
        let path = std::env::temp_dir().join("blurfade_missing_config.json");
        let _ = std::fs::remove_file(&path);
        let config = AppConfig::load_from(&path);
        assert_eq!(config.transcoder.core, CoreSpec::default());
    }

    #[test]
    fn test_try_load_from_reports_config_errors() {
        let dir = std::env::temp_dir().join(format!("blurfade_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = AppConfig::try_load_from(dir.join("absent.json")).unwrap_err();
        assert!(matches!(missing, BlurfadeError::Config { .. }));

        let broken = dir.join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let err = AppConfig::try_load_from(&broken).unwrap_err();
        assert!(matches!(err, BlurfadeError::Config { .. }));
        assert!(err.to_string().starts_with("Configuration error: Failed to parse"));

        let valid = dir.join("valid.json");
        std::fs::write(&valid, r#"{"transcoder":{"core":{"url":"/opt/ffmpeg"}}}"#).unwrap();
        let config = AppConfig::try_load_from(&valid).unwrap();
        assert_eq!(config.transcoder.core.url, "/opt/ffmpeg");

        std::fs::remove_dir_all(&dir).ok();
    }
}
