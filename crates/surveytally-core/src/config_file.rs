use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub survey: Option<SurveyConfig>,
    pub gemini: Option<GeminiConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    pub pages_per_person: Option<u32>,
    pub target_audience: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// Platform config directory path: `<config_dir>/surveytally/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("surveytally").join("config.toml"))
}

/// Load config by cascading CWD `.surveytally.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".surveytally.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        survey: Some(SurveyConfig {
            pages_per_person: overlay
                .survey
                .as_ref()
                .and_then(|s| s.pages_per_person)
                .or_else(|| base.survey.as_ref().and_then(|s| s.pages_per_person)),
            target_audience: overlay
                .survey
                .as_ref()
                .and_then(|s| s.target_audience)
                .or_else(|| base.survey.as_ref().and_then(|s| s.target_audience)),
        }),
        gemini: Some(GeminiConfig {
            api_key: overlay
                .gemini
                .as_ref()
                .and_then(|g| g.api_key.clone())
                .or_else(|| base.gemini.as_ref().and_then(|g| g.api_key.clone())),
            model: overlay
                .gemini
                .as_ref()
                .and_then(|g| g.model.clone())
                .or_else(|| base.gemini.as_ref().and_then(|g| g.model.clone())),
        }),
    }
}

/// Save the config to the platform config directory, creating it if needed.
/// Returns the written path.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    save_to_path(config, &path)?;
    Ok(path)
}

/// Save a config to a specific path, creating parent directories.
pub fn save_to_path(config: &ConfigFile, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(())
}
