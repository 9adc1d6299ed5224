use thiserror::Error;

pub const PROMPT_REQUIRED_MESSAGE: &str = "Please enter a prompt";
pub const NO_DATA_MESSAGE: &str = "No image data received";
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate image. Please try again.";
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Failed to download image. Please try again.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Invocation error: {0}")]
    Invocation(String),
    #[error("No image data received")]
    NoData,
    #[error("Download error: {0}")]
    Download(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// The message shown in the form's error line for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::Validation(_) => PROMPT_REQUIRED_MESSAGE,
            GenerationError::Download(_) | GenerationError::Io(_) => DOWNLOAD_FAILED_MESSAGE,
            GenerationError::Connection(_)
            | GenerationError::Invocation(_)
            | GenerationError::NoData
            | GenerationError::Config(_)
            | GenerationError::Serialization(_) => GENERATION_FAILED_MESSAGE,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, GenerationError::Validation(_))
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(e: serde_json::Error) -> Self {
        GenerationError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
