pub mod config;
pub mod download;
pub mod error;
pub mod gradio;
pub mod logger;
pub mod models;
pub mod session;

pub use config::{AppConfig, EndpointConfig};
pub use download::{FsSaveTarget, HttpImageFetcher, ImageFetcher, SaveTarget};
pub use error::{GenerationError, Result};
pub use gradio::{
    Credentials, GradioConnector, InferenceConnector, InferenceSession, PredictionResponse,
};
pub use models::*;
pub use session::{GenerationSession, SessionState};
