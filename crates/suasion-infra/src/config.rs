//! Study configuration loader.
//!
//! Reads `config.toml` from the given directory and deserializes it into
//! [`StudyConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::Path;

use suasion_types::config::StudyConfig;

/// Load the study configuration from `{dir}/config.toml`.
///
/// - If the file does not exist, returns [`StudyConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config.
pub async fn load_study_config(dir: &Path) -> StudyConfig {
    let config_path = dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return StudyConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return StudyConfig::default();
        }
    };

    match toml::from_str::<StudyConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            StudyConfig::default()
        }
    }
}
