//! sw_fetch tool implementation.
//!
//! Routes one request through the worker's fetch interceptor and reports
//! which source answered it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{Method, Request, RequestClass, ResponseSource, ServiceWorker};
use swcache_core::Error;

use crate::error::{ToolError, json_result};

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL to request; relative paths resolve against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests use the cache.
    #[serde(default)]
    pub method: Option<String>,

    /// Maximum characters of body text to include in the output (default: 4096).
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

fn default_max_body_chars() -> usize {
    4096
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub method: String,
    /// "static" or "dynamic".
    pub class: String,
    /// "cache", "network", "cache_fallback" or "none".
    pub source: String,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub body_len: Option<usize>,
    /// Body as lossy UTF-8, cut at `max_body_chars`.
    pub body: Option<String>,
    pub body_truncated: bool,
}

fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn parse_method(method: Option<&str>) -> Result<Method, ToolError> {
    match method.map(str::trim) {
        None | Some("") => Ok(Method::GET),
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| ToolError::InvalidInput(format!("invalid method: {m}"))),
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = parse_method(params.method.as_deref())?;
    let url = worker.config().resolve(&params.url)?;
    let responded = worker.handle_fetch(Request::new(method.clone(), url.clone())).await?;

    let class: RequestClass = responded.class;
    let source: ResponseSource = responded.outcome.source();
    let response = responded.outcome.into_response();

    let (body, body_truncated) = match &response {
        Some(r) => {
            let text = String::from_utf8_lossy(&r.body);
            let truncated = text.chars().count() > params.max_body_chars;
            (Some(text.chars().take(params.max_body_chars).collect::<String>()), truncated)
        }
        None => (None, false),
    };

    let output = SwFetchOutput {
        url: url.to_string(),
        method: method.to_string(),
        class: label(&class),
        source: label(&source),
        status: response.as_ref().map(|r| r.status),
        content_type: response.as_ref().and_then(|r| r.content_type().map(str::to_string)),
        body_len: response.as_ref().map(|r| r.body.len()),
        body,
        body_truncated,
    };

    json_result(&output)
}
