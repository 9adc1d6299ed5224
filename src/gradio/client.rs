use crate::{
    config::EndpointConfig,
    error::{GenerationError, Result},
    gradio::{
        protocol::{
            self, ApiInfo, AppMeta, CallEvent, CallRequest, CallStarted, EndpointInfo, SpaceHost,
        },
        Credentials, InferenceConnector, InferenceSession, PredictionResponse,
    },
    models::PredictionParams,
};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;

#[derive(Clone)]
pub struct GradioConnector {
    http: Client,
    hub_url: String,
}

impl GradioConnector {
    pub fn new(hub_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            hub_url: hub_url.into(),
        }
    }

    pub fn from_config(config: &EndpointConfig) -> Self {
        Self::new(config.hub_url.clone())
    }

    async fn resolve_base_url(&self, endpoint: &str, credentials: &Credentials) -> Result<String> {
        if let Some(base) = protocol::direct_base_url(endpoint) {
            return Ok(base);
        }

        let url = protocol::host_lookup_url(&self.hub_url, endpoint);
        log::debug!("Resolving Space host via {}", url);

        let response = authorize(self.http.get(&url), credentials)
            .send()
            .await
            .map_err(|e| GenerationError::Connection(format!("Host lookup failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Connection(format!(
                "Host lookup for {} returned {}",
                endpoint, status
            )));
        }

        let host: SpaceHost = response
            .json()
            .await
            .map_err(|e| GenerationError::Connection(format!("Bad host lookup response: {}", e)))?;

        Ok(host.host.trim_end_matches('/').to_string())
    }

    async fn fetch_meta(&self, base_url: &str, credentials: &Credentials) -> Result<AppMeta> {
        let response = authorize(self.http.get(format!("{}/config", base_url)), credentials)
            .send()
            .await
            .map_err(|e| GenerationError::Connection(format!("Config request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Connection(format!(
                "Config for {} returned {}",
                base_url, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GenerationError::Connection(format!("Bad config response: {}", e)))
    }
}

#[async_trait]
impl InferenceConnector for GradioConnector {
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn InferenceSession>> {
        let base_url = self.resolve_base_url(endpoint, credentials).await?;
        log::info!("Connecting to {} at {}", endpoint, base_url);

        let meta = self.fetch_meta(&base_url, credentials).await?;
        let api_root = protocol::api_root(&base_url, meta.api_prefix.as_deref());
        log::debug!(
            "Gradio {} serving its API at {}",
            meta.version.as_deref().unwrap_or("(unknown version)"),
            api_root
        );

        let response = authorize(self.http.get(format!("{}/info", api_root)), credentials)
            .send()
            .await
            .map_err(|e| GenerationError::Connection(format!("API info request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Connection(format!(
                "API info for {} returned {}",
                endpoint, status
            )));
        }

        let info: ApiInfo = response
            .json()
            .await
            .map_err(|e| GenerationError::Connection(format!("Bad API info response: {}", e)))?;

        log::debug!(
            "Endpoint exposes {} named operations",
            info.named_endpoints.len()
        );

        Ok(Box::new(GradioSession {
            http: self.http.clone(),
            api_root,
            credentials: credentials.clone(),
            endpoints: info.named_endpoints,
        }))
    }
}

/// A connected endpoint with its declared operation signatures.
pub struct GradioSession {
    http: Client,
    /// App base plus any `api_prefix`; `/info` and `/call` hang off this.
    api_root: String,
    credentials: Credentials,
    endpoints: HashMap<String, EndpointInfo>,
}

impl GradioSession {
    async fn start_call(&self, operation: &str, data: Vec<serde_json::Value>) -> Result<String> {
        let url = format!("{}/call/{}", self.api_root, protocol::api_path(operation));

        let response = authorize(self.http.post(&url), &self.credentials)
            .json(&CallRequest { data })
            .send()
            .await
            .map_err(|e| GenerationError::Invocation(format!("Call to {} failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Invocation(format!(
                "Call to {} returned {}: {}",
                operation, status, body
            )));
        }

        let started: CallStarted = response.json().await.map_err(|e| {
            GenerationError::Invocation(format!("Bad call response from {}: {}", operation, e))
        })?;
        Ok(started.event_id)
    }

    async fn await_result(&self, operation: &str, event_id: &str) -> Result<PredictionResponse> {
        let url = format!(
            "{}/call/{}/{}",
            self.api_root,
            protocol::api_path(operation),
            event_id
        );

        let response = authorize(self.http.get(&url), &self.credentials)
            .send()
            .await
            .map_err(|e| {
                GenerationError::Invocation(format!("Result stream for {} failed: {}", operation, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Invocation(format!(
                "Result stream for {} returned {}",
                operation, status
            )));
        }

        let mut events = Box::pin(response.bytes_stream().eventsource());
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| {
                GenerationError::Invocation(format!("Result stream for {} broke: {}", operation, e))
            })?;
            log::trace!("Event `{}` for {}", event.event, event_id);

            let outcome = protocol::interpret_event(&event.event, &event.data).map_err(|e| {
                GenerationError::Invocation(format!("Undecodable result for {}: {}", operation, e))
            })?;
            match outcome {
                CallEvent::Pending => continue,
                CallEvent::Complete(data) => return Ok(PredictionResponse { data }),
                CallEvent::Failed(message) => {
                    return Err(GenerationError::Invocation(format!(
                        "{} failed remotely: {}",
                        operation, message
                    )))
                }
            }
        }

        Err(GenerationError::Invocation(format!(
            "Result stream for {} ended before completion",
            operation
        )))
    }
}

#[async_trait]
impl InferenceSession for GradioSession {
    async fn invoke(
        &self,
        operation: &str,
        params: PredictionParams,
    ) -> Result<PredictionResponse> {
        let key = protocol::endpoint_key(operation);
        let endpoint = self.endpoints.get(&key).ok_or_else(|| {
            GenerationError::Invocation(format!("Endpoint does not expose {}", key))
        })?;

        let data = protocol::order_params(&key, endpoint, &params)?;
        log::debug!("Invoking {} with {} positional inputs", key, data.len());

        let event_id = self.start_call(&key, data).await?;
        log::debug!("{} queued as event {}", key, event_id);

        self.await_result(&key, &event_id).await
    }
}

fn authorize(builder: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    match &credentials.token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}
