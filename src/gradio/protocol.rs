//! Wire shapes and pure decoding for the Gradio HTTP API.
//!
//! A call is a two-step exchange: `POST /call/<op>` returns an event id, then
//! `GET /call/<op>/<event_id>` streams server-sent events until a `complete`
//! or `error` event arrives. Gradio 5 moved `/info` and `/call` under the
//! `api_prefix` advertised by `/config` (`/gradio_api`); older apps serve them
//! at the root and omit the field.

use crate::error::{GenerationError, Result};
use crate::models::PredictionParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const GENERIC_REMOTE_ERROR: &str = "remote endpoint reported an error";

/// The parts of `GET /config` needed to locate the API routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppMeta {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub api_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpaceHost {
    #[serde(default)]
    pub subdomain: Option<String>,
    pub host: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub named_endpoints: HashMap<String, EndpointInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointInfo {
    #[serde(default)]
    pub parameters: Vec<EndpointParameter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointParameter {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub parameter_name: Option<String>,
    #[serde(default)]
    pub parameter_has_default: bool,
    #[serde(default)]
    pub parameter_default: Value,
}

#[derive(Debug, Serialize)]
pub struct CallRequest {
    pub data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CallStarted {
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// Heartbeats, progress and anything else that does not settle the call.
    Pending,
    Complete(Vec<Value>),
    Failed(String),
}

/// Returns the base URL when the endpoint is already an address rather than a
/// Space id.
pub fn direct_base_url(endpoint: &str) -> Option<String> {
    let endpoint = endpoint.trim();
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Some(endpoint.trim_end_matches('/').to_string())
    } else {
        None
    }
}

pub fn host_lookup_url(hub_url: &str, space: &str) -> String {
    format!(
        "{}/api/spaces/{}/host",
        hub_url.trim_end_matches('/'),
        space.trim().trim_matches('/')
    )
}

/// Root under which `/info` and `/call/..` live for an app at `base_url`.
pub fn api_root(base_url: &str, api_prefix: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match api_prefix.map(|p| p.trim().trim_matches('/')) {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", base, prefix),
        _ => base.to_string(),
    }
}

/// `"/generate_image"` becomes `"generate_image"` for use in `/call/` paths.
pub fn api_path(operation: &str) -> &str {
    operation.trim_start_matches('/')
}

/// `"generate_image"` becomes `"/generate_image"` for `named_endpoints` lookups.
pub fn endpoint_key(operation: &str) -> String {
    format!("/{}", api_path(operation))
}

/// Lay named parameters out in the positional order the endpoint declares.
pub fn order_params(
    operation: &str,
    endpoint: &EndpointInfo,
    params: &PredictionParams,
) -> Result<Vec<Value>> {
    let declared: Vec<&str> = endpoint
        .parameters
        .iter()
        .filter_map(|p| p.parameter_name.as_deref())
        .collect();

    if let Some(unknown) = params.keys().find(|k| !declared.contains(&k.as_str())) {
        return Err(GenerationError::Invocation(format!(
            "Parameter `{}` is not accepted by {}",
            unknown, operation
        )));
    }

    endpoint
        .parameters
        .iter()
        .enumerate()
        .map(|(position, parameter)| {
            let name = parameter.parameter_name.as_deref();
            if let Some(value) = name.and_then(|n| params.get(n)) {
                return Ok(value.clone());
            }
            if parameter.parameter_has_default {
                return Ok(parameter.parameter_default.clone());
            }
            Err(GenerationError::Invocation(format!(
                "Missing required parameter `{}` for {}",
                name.or(parameter.label.as_deref())
                    .map(String::from)
                    .unwrap_or_else(|| format!("#{}", position)),
                operation
            )))
        })
        .collect()
}

/// Interpret one server-sent event from the result stream.
pub fn interpret_event(event: &str, data: &str) -> Result<CallEvent> {
    match event {
        "complete" => match serde_json::from_str::<Value>(data)? {
            Value::Array(outputs) => Ok(CallEvent::Complete(outputs)),
            Value::Null => Ok(CallEvent::Complete(Vec::new())),
            other => Ok(CallEvent::Complete(vec![other])),
        },
        "error" => {
            let trimmed = data.trim();
            let message = match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::String(s)) => s,
                Ok(Value::Null) => GENERIC_REMOTE_ERROR.to_string(),
                Ok(other) => other.to_string(),
                Err(_) if trimmed.is_empty() => GENERIC_REMOTE_ERROR.to_string(),
                Err(_) => trimmed.to_string(),
            };
            Ok(CallEvent::Failed(message))
        }
        _ => Ok(CallEvent::Pending),
    }
}
