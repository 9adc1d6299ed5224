use crate::error::{GenerationError, Result};
use crate::logger::LogLevel;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SPACE: &str = "deepseek-ai/Janus-Pro-7B";
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";
pub const GENERATE_OPERATION: &str = "/generate_image";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoint: EndpointConfig,
    pub download_dir: PathBuf,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    pub log_json: bool,
}

/// Where the hosted model lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Either `owner/name` of a hosted Space or a direct `http(s)://` base URL.
    pub space: String,
    pub hub_url: String,
    pub hf_token: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            space: DEFAULT_SPACE.to_string(),
            hub_url: DEFAULT_HUB_URL.to_string(),
            hf_token: None,
        }
    }
}

impl EndpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let space = env::var("JANUSGEN_SPACE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SPACE.to_string());
        let hub_url = env::var("JANUSGEN_HUB_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HUB_URL.to_string());
        let hf_token = env::var("HF_TOKEN")
            .or_else(|_| env::var("VITE_HUGGING_FACE_TOKEN"))
            .ok()
            .filter(|s| !s.is_empty());

        EndpointConfig {
            space,
            hub_url,
            hf_token,
        }
    }

    pub fn with_space(mut self, space: impl Into<String>) -> Self {
        self.space = space.into();
        self
    }

    pub fn with_hub_url(mut self, hub_url: impl Into<String>) -> Self {
        self.hub_url = hub_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.hf_token = Some(token.into());
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            endpoint: EndpointConfig::default(),
            download_dir: PathBuf::from("."),
            log_level: LogLevel::Info,
            log_file: None,
            log_json: false,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails only on values that are present but unreadable; the access token
    /// is never checked here.
    pub fn from_env() -> Result<Self> {
        let download_dir = non_empty_var("JANUSGEN_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let log_level = parse_log_level(non_empty_var("JANUSGEN_LOG_LEVEL"))?;
        let log_file = non_empty_var("JANUSGEN_LOG_FILE").map(PathBuf::from);
        let log_json = parse_flag("JANUSGEN_LOG_JSON", non_empty_var("JANUSGEN_LOG_JSON"))?;

        Ok(AppConfig {
            endpoint: EndpointConfig::from_env(),
            download_dir,
            log_level,
            log_file,
            log_json,
        })
    }

    pub fn with_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_log_json(mut self, enabled: bool) -> Self {
        self.log_json = enabled;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parse_log_level(raw: Option<String>) -> Result<LogLevel> {
    match raw {
        None => Ok(LogLevel::Info),
        Some(raw) => LogLevel::parse(&raw).ok_or_else(|| {
            GenerationError::Config(format!(
                "JANUSGEN_LOG_LEVEL must be one of trace, debug, info, warn, error (got `{}`)",
                raw
            ))
        }),
    }
}

fn parse_flag(name: &str, raw: Option<String>) -> Result<bool> {
    match raw.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(GenerationError::Config(format!(
            "{} must be true or false (got `{}`)",
            name, v
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();
        assert_eq!(config.endpoint.space, "deepseek-ai/Janus-Pro-7B");
        assert!(config.endpoint.hf_token.is_none());
        assert_eq!(config.download_dir, PathBuf::from("."));
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_file.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn test_log_settings_parsing() {
        assert_eq!(parse_log_level(None).unwrap(), LogLevel::Info);
        assert_eq!(parse_log_level(Some("Debug".into())).unwrap(), LogLevel::Debug);
        assert!(matches!(
            parse_log_level(Some("loud".into())),
            Err(GenerationError::Config(ref m)) if m.contains("loud")
        ));

        assert!(!parse_flag("JANUSGEN_LOG_JSON", None).unwrap());
        assert!(parse_flag("JANUSGEN_LOG_JSON", Some("TRUE".into())).unwrap());
        assert!(parse_flag("JANUSGEN_LOG_JSON", Some("1".into())).unwrap());
        assert!(!parse_flag("JANUSGEN_LOG_JSON", Some("off".into())).unwrap());
        assert!(matches!(
            parse_flag("JANUSGEN_LOG_JSON", Some("maybe".into())),
            Err(GenerationError::Config(ref m)) if m.starts_with("JANUSGEN_LOG_JSON")
        ));
    }

    #[test]
    fn test_builders() {
        let config = AppConfig::new()
            .with_endpoint(
                EndpointConfig::new()
                    .with_space("http://localhost:7860")
                    .with_token("hf_abc"),
            )
            .with_download_dir("/tmp/out")
            .with_log_level(LogLevel::Debug)
            .with_log_file("/tmp/out/janusgen.log")
            .with_log_json(true);

        assert_eq!(config.endpoint.space, "http://localhost:7860");
        assert_eq!(config.endpoint.hf_token.as_deref(), Some("hf_abc"));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/out/janusgen.log")));
        assert!(config.log_json);
    }
}
