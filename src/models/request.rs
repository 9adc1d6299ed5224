use crate::error::{GenerationError, Result, PROMPT_REQUIRED_MESSAGE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_SEED: i64 = 1234;
pub const DEFAULT_GUIDANCE: f64 = 5.0;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

pub const GUIDANCE_MIN: f64 = 5.0;
pub const GUIDANCE_MAX: f64 = 10.0;
pub const TEMPERATURE_MIN: f64 = 0.0;
pub const TEMPERATURE_MAX: f64 = 1.0;

/// Named parameters handed to a remote operation.
pub type PredictionParams = Map<String, Value>;

/// One generation call, built from the form at submit time.
///
/// Field names on the wire follow the hosted `/generate_image` endpoint, which
/// calls the temperature `t2i_temperature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub seed: i64,
    pub guidance: f64,
    #[serde(rename = "t2i_temperature")]
    pub temperature: f64,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            seed: DEFAULT_SEED,
            guidance: DEFAULT_GUIDANCE,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_guidance(mut self, guidance: f64) -> Self {
        self.guidance = guidance;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(GenerationError::Validation(PROMPT_REQUIRED_MESSAGE.into()));
        }
        Ok(())
    }

    pub fn to_params(&self) -> Result<PredictionParams> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(GenerationError::Serialization(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }
}

/// Snap a guidance value onto the form's integer slider range.
pub fn clamp_guidance(value: f64) -> f64 {
    if value.is_nan() {
        return DEFAULT_GUIDANCE;
    }
    value.round().clamp(GUIDANCE_MIN, GUIDANCE_MAX)
}

/// Snap a temperature onto the form's 0.1-step slider range.
pub fn clamp_temperature(value: f64) -> f64 {
    if value.is_nan() {
        return DEFAULT_TEMPERATURE;
    }
    ((value * 10.0).round() / 10.0).clamp(TEMPERATURE_MIN, TEMPERATURE_MAX)
}
