use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{DroidClawError, DroidClawResult};

/// Immutable application configuration. Built once at startup and passed by
/// reference into each component constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub perception: PerceptionConfig,
    #[serde(default)]
    pub stagnation: StagnationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "openai" for any OpenAI-compatible endpoint, "gemini" for the Google
    /// generateContent API.
    pub provider: String,
    pub api_base: String,
    pub model: String,
    /// Optional API key stored in config.toml (falls back to the
    /// DROIDCLAW_API_KEY environment variable).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Directory on the device where screenshots are captured before pull.
    #[serde(default = "default_device_dir")]
    pub screenshot_dir: String,
    /// Directory on the device where UI dumps are written before pull.
    #[serde(default = "default_device_dir")]
    pub xml_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Inter-round sleep, seconds.
    #[serde(default = "default_request_interval_secs")]
    pub request_interval_secs: u64,
    /// Consecutive model failures tolerated before the run is aborted.
    #[serde(default = "default_max_model_retries")]
    pub max_model_retries: u32,
    /// Start every round in grid mode instead of reverting to element mode.
    #[serde(default)]
    pub always_grid: bool,
    /// Skip the UI dump entirely; only grid mode is usable.
    #[serde(default)]
    pub disable_xml: bool,
    #[serde(default)]
    pub dark_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionConfig {
    /// Center-distance threshold (px) for de-duplicating attribute-flag
    /// candidates.
    #[serde(default = "default_min_dist")]
    pub min_dist: f64,
    /// Minimum element area (px²) for the heuristic-interactive strategy.
    #[serde(default = "default_min_area")]
    pub min_area: i64,
    /// IoU above which a heuristic candidate is dropped as a duplicate.
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f64,
    /// Target minimum grid cell edge (px) when rows/cols are derived.
    #[serde(default = "default_grid_min_cell_px")]
    pub grid_min_cell_px: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagnationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Similarity at or above this value marks the screen as stagnant.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_temperature() -> f64 {
    0.0
}

fn default_max_completion_tokens() -> u32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_device_dir() -> String {
    "/sdcard".into()
}

fn default_max_rounds() -> u32 {
    20
}

fn default_request_interval_secs() -> u64 {
    3
}

fn default_max_model_retries() -> u32 {
    3
}

fn default_min_dist() -> f64 {
    30.0
}

fn default_min_area() -> i64 {
    2000
}

fn default_iou_threshold() -> f64 {
    0.6
}

fn default_grid_min_cell_px() -> u32 {
    40
}

fn default_similarity_threshold() -> f64 {
    0.99
}

fn default_true() -> bool {
    true
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: default_device_dir(),
            xml_dir: default_device_dir(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            request_interval_secs: default_request_interval_secs(),
            max_model_retries: default_max_model_retries(),
            always_grid: false,
            disable_xml: false,
            dark_mode: false,
        }
    }
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            min_dist: default_min_dist(),
            min_area: default_min_area(),
            iou_threshold: default_iou_threshold(),
            grid_min_cell_px: default_grid_min_cell_px(),
        }
    }
}

impl Default for StagnationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

impl ModelConfig {
    /// API key resolution order: environment variable, then config.toml.
    pub fn resolve_api_key(&self) -> DroidClawResult<String> {
        if let Ok(key) = std::env::var("DROIDCLAW_API_KEY") {
            if !key.is_empty() {
                return Ok(key);
            }
        }
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                DroidClawError::Config(
                    "no API key: set DROIDCLAW_API_KEY or [model].api_key".into(),
                )
            })
    }
}

fn resolve_config_path() -> DroidClawResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(DroidClawError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> DroidClawResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), provider = %config.model.provider, "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let toml_src = r#"
            [model]
            provider = "openai"
            api_base = "https://api.openai.com/v1/chat/completions"
            model = "gpt-4o"
        "#;
        let cfg: AppConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.agent.max_rounds, 20);
        assert_eq!(cfg.perception.min_area, 2000);
        assert!((cfg.perception.iou_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(cfg.perception.grid_min_cell_px, 40);
        assert!(cfg.stagnation.enabled);
        assert!((cfg.stagnation.similarity_threshold - 0.99).abs() < f64::EPSILON);
        assert_eq!(cfg.model.request_timeout_secs, 120);
        assert!(!cfg.agent.always_grid);
    }

    #[test]
    fn missing_model_section_is_an_error() {
        let toml_src = "[agent]\nmax_rounds = 5\n";
        assert!(toml::from_str::<AppConfig>(toml_src).is_err());
    }
}
