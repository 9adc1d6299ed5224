use crate::models::{
    clamp_guidance, clamp_temperature, GenerationRequest, ImageItem, DEFAULT_GUIDANCE,
    DEFAULT_SEED, DEFAULT_TEMPERATURE,
};
use serde::{Deserialize, Serialize};

/// Everything the form renders from: editable fields, the latest images and
/// the request lifecycle flags.
///
/// `loading` is true exactly while a submit is in flight. `error` and a fresh
/// `generated_images` never come from the same call, but images from an earlier
/// success stay in place when a later call fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub prompt: String,
    pub seed: i64,
    pub guidance: f64,
    pub temperature: f64,
    pub generated_images: Vec<ImageItem>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            seed: DEFAULT_SEED,
            guidance: DEFAULT_GUIDANCE,
            temperature: DEFAULT_TEMPERATURE,
            generated_images: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the form fields as a request.
    pub fn request(&self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.clone(),
            seed: self.seed,
            guidance: self.guidance,
            temperature: self.temperature,
        }
    }

    pub fn set_guidance(&mut self, guidance: f64) {
        self.guidance = clamp_guidance(guidance);
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = clamp_temperature(temperature);
    }

    /// The generate trigger is disabled while a call is in flight.
    pub fn can_submit(&self) -> bool {
        !self.loading
    }

    pub fn trigger_label(&self) -> &'static str {
        if self.loading {
            "Generating..."
        } else {
            "Generate Images"
        }
    }
}
