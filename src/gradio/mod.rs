pub mod client;
pub mod protocol;

use crate::{error::Result, models::PredictionParams};
use async_trait::async_trait;
use serde_json::Value;

pub use client::{GradioConnector, GradioSession};

/// Access credentials for a hosted endpoint. A missing token means anonymous
/// access; it is never validated locally.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub token: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

/// Positional outputs of one remote call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionResponse {
    pub data: Vec<Value>,
}

#[async_trait]
pub trait InferenceConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn InferenceSession>>;
}

#[async_trait]
pub trait InferenceSession: Send + Sync {
    async fn invoke(&self, operation: &str, params: PredictionParams)
        -> Result<PredictionResponse>;
}
