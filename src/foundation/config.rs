use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::foundation::error::{SynthError, SynthResult};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const LEGACY_MODEL_IDS: &[&str] = &["text-bison-001", "bison", "bison-text"];

/// Synthesis settings for one pipeline instance.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Model id passed to the text-generation service.
    pub model: String,
    /// Upper bound on attempts per request (>= 1).
    pub max_attempts: u32,
    /// Sampling temperature of the first attempt.
    pub initial_temperature: f64,
    /// Amount added to the temperature after each failed attempt.
    pub temperature_step: f64,
    /// Temperature never exceeds this value.
    pub max_temperature: f64,
    pub max_output_tokens: u32,
    /// Length (in chars) of the raw-text sample kept per attempt record.
    pub raw_sample_chars: usize,
    /// Write successful plans to `<output_dir>/plans/`.
    pub save_plans: bool,
    pub output_dir: PathBuf,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            max_attempts: 5,
            initial_temperature: 0.1,
            temperature_step: 0.25,
            max_temperature: 2.0,
            max_output_tokens: 1200,
            raw_sample_chars: 200,
            save_plans: true,
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl SynthConfig {
    pub fn from_json_file(path: &Path) -> SynthResult<Self> {
        let f = File::open(path)
            .map_err(|e| SynthError::config(format!("open config '{}': {e}", path.display())))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| SynthError::config(format!("parse config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> SynthResult<()> {
        if self.max_attempts == 0 {
            return Err(SynthError::config("max_attempts must be >= 1"));
        }
        if !self.initial_temperature.is_finite() || self.initial_temperature < 0.0 {
            return Err(SynthError::config(
                "initial_temperature must be finite and >= 0",
            ));
        }
        if !self.temperature_step.is_finite() || self.temperature_step <= 0.0 {
            return Err(SynthError::config("temperature_step must be finite and > 0"));
        }
        if !self.max_temperature.is_finite() || self.max_temperature < self.initial_temperature {
            return Err(SynthError::config(
                "max_temperature must be finite and >= initial_temperature",
            ));
        }
        if self.max_output_tokens == 0 {
            return Err(SynthError::config("max_output_tokens must be > 0"));
        }
        Ok(())
    }

    /// Temperature used by the 1-based attempt `attempt`.
    pub fn temperature_for(&self, attempt: u32) -> f64 {
        let steps = f64::from(attempt.saturating_sub(1));
        (self.initial_temperature + self.temperature_step * steps).min(self.max_temperature)
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join("enhancer_log.jsonl")
    }

    pub fn plan_dir(&self) -> PathBuf {
        self.output_dir.join("plans")
    }
}

/// Connection settings for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_owned(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Reads `GEMINI_API_KEY` (required) and `GEMINI_ENDPOINT` (optional).
    pub fn from_env() -> SynthResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SynthError::config("GEMINI_API_KEY is not set"))?;
        let mut cfg = Self::new(api_key);
        if let Ok(endpoint) = std::env::var("GEMINI_ENDPOINT")
            && !endpoint.trim().is_empty()
        {
            cfg.endpoint = endpoint.trim().trim_end_matches('/').to_owned();
        }
        Ok(cfg)
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Maps legacy PaLM model names (and an empty id) onto the default Gemini model.
pub fn normalize_model_id(model: &str) -> String {
    let m = model.trim();
    if m.is_empty() || LEGACY_MODEL_IDS.contains(&m.to_ascii_lowercase().as_str()) {
        return DEFAULT_MODEL.to_owned();
    }
    m.to_owned()
}
