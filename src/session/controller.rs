use crate::{
    config::{AppConfig, GENERATE_OPERATION},
    download::{FsSaveTarget, HttpImageFetcher, ImageFetcher, SaveTarget},
    error::{Result, DOWNLOAD_FAILED_MESSAGE},
    gradio::{Credentials, GradioConnector, InferenceConnector},
    logger,
    models::{download_file_name, GenerationRequest, GenerationResult},
    session::SessionState,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Drives one form: holds its state, issues generation calls and downloads.
///
/// All methods take `&self`, so a view can keep editing fields while a submit
/// is awaiting the remote call. Nothing here stops two submits from running at
/// once; the view is expected to respect [`SessionState::can_submit`].
pub struct GenerationSession {
    state: watch::Sender<SessionState>,
    connector: Arc<dyn InferenceConnector>,
    fetcher: Arc<dyn ImageFetcher>,
    target: Arc<dyn SaveTarget>,
    endpoint: String,
    credentials: Credentials,
}

impl GenerationSession {
    pub fn new(
        connector: Arc<dyn InferenceConnector>,
        fetcher: Arc<dyn ImageFetcher>,
        target: Arc<dyn SaveTarget>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state,
            connector,
            fetcher,
            target,
            endpoint: crate::config::DEFAULT_SPACE.to_string(),
            credentials: Credentials::anonymous(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let credentials = match &config.endpoint.hf_token {
            Some(token) => Credentials::with_token(token.clone()),
            None => Credentials::anonymous(),
        };
        Self::new(
            Arc::new(GradioConnector::from_config(&config.endpoint)),
            Arc::new(HttpImageFetcher::new()),
            Arc::new(FsSaveTarget::new(config.download_dir.clone())),
        )
        .with_endpoint(config.endpoint.space.clone(), credentials)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>, credentials: Credentials) -> Self {
        self.endpoint = endpoint.into();
        self.credentials = credentials;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.state.send_modify(|s| s.prompt = prompt);
    }

    pub fn set_seed(&self, seed: i64) {
        self.state.send_modify(|s| s.seed = seed);
    }

    pub fn set_guidance(&self, guidance: f64) {
        self.state.send_modify(|s| s.set_guidance(guidance));
    }

    pub fn set_temperature(&self, temperature: f64) {
        self.state.send_modify(|s| s.set_temperature(temperature));
    }

    /// Generate images from the current form fields.
    ///
    /// On success the returned images replace the displayed ones. On failure
    /// the error line is set and the displayed images are left as they were.
    pub async fn submit(&self) -> Result<GenerationResult> {
        let request = self.state.borrow().request();

        if let Err(e) = request.validate() {
            self.state
                .send_modify(|s| s.error = Some(e.user_message().to_string()));
            return Err(e);
        }

        let request_id = Uuid::new_v4().simple().to_string();
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        log::info!(
            "[req:{}] Generating seed={} guidance={} temperature={}",
            &request_id[..8],
            request.seed,
            request.guidance,
            request.temperature
        );

        let outcome = self.generate(&request).await;

        self.state.send_modify(|s| {
            match &outcome {
                Ok(result) => s.generated_images = result.items.clone(),
                Err(e) => s.error = Some(e.user_message().to_string()),
            }
            s.loading = false;
        });

        match &outcome {
            Ok(result) => log::info!(
                "[req:{}] Received {} image(s)",
                &request_id[..8],
                result.len()
            ),
            Err(e) => log::error!("[req:{}] Generation error: {}", &request_id[..8], e),
        }
        outcome
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let params = request.to_params()?;
        let session = self
            .connector
            .connect(&self.endpoint, &self.credentials)
            .await?;

        let mut timer = logger::timer(GENERATE_OPERATION);
        let response = session.invoke(GENERATE_OPERATION, params).await?;
        timer.stop();

        GenerationResult::from_outputs(&response.data)
    }

    /// Fetch `url` and save it as `generated-image-<index+1>.webp`.
    ///
    /// Failures overwrite the error line but never touch `loading`, so this can
    /// run alongside an in-flight submit.
    pub async fn download_image(&self, url: &str, index: usize) -> Result<PathBuf> {
        let outcome = self.fetch_and_save(url, index).await;
        match &outcome {
            Ok(path) => log::info!("💾 Saved {} to {}", url, path.display()),
            Err(e) => {
                log::error!("Download error: {}", e);
                self.state
                    .send_modify(|s| s.error = Some(DOWNLOAD_FAILED_MESSAGE.to_string()));
            }
        }
        outcome
    }

    async fn fetch_and_save(&self, url: &str, index: usize) -> Result<PathBuf> {
        let bytes = self.fetcher.fetch(url).await?;
        log::debug!("Fetched {} bytes from {}", bytes.len(), url);
        self.target.save(&download_file_name(index), &bytes).await
    }
}
