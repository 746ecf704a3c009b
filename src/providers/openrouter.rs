use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::gateway::{ChatRequest, RawResponse, TransportFailure};
use crate::providers::http_errors::describe_request_error;

const REFERER_HEADER: &str = "HTTP-Referer";
const TITLE_HEADER: &str = "X-Title";

#[derive(Debug, Clone)]
pub struct OpenRouterEndpoint {
    pub url: String,
    pub api_key: String,
    pub referer: Option<String>,
    pub title: Option<String>,
    pub timeout_secs: u64,
}

impl OpenRouterEndpoint {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
            referer: cfg.referer.clone(),
            title: cfg.title.clone(),
            timeout_secs: cfg.model_timeout_secs,
        }
    }
}

pub async fn send(
    client: &Client,
    endpoint: &OpenRouterEndpoint,
    request: ChatRequest<'_>,
) -> Result<RawResponse, TransportFailure> {
    let api_url = endpoint.url.as_str();
    debug!(
        api_url = %api_url,
        model = %request.model,
        message_count = request.messages.len(),
        max_tokens = request.max_tokens,
        "sending chat completion request"
    );

    let mut builder = client
        .post(api_url)
        .bearer_auth(&endpoint.api_key)
        .timeout(Duration::from_secs(endpoint.timeout_secs))
        .json(&request);
    if let Some(referer) = &endpoint.referer {
        builder = builder.header(REFERER_HEADER, referer);
    }
    if let Some(title) = &endpoint.title {
        builder = builder.header(TITLE_HEADER, title);
    }

    let response = builder.send().await.map_err(|err| {
        warn!(
            api_url = %api_url,
            model = %request.model,
            error = %err,
            "chat completion request failed"
        );
        TransportFailure::new(describe_request_error(&err, api_url, endpoint.timeout_secs))
    })?;

    let status = response.status().as_u16();
    let body = response.text().await.map_err(|err| {
        warn!(
            api_url = %api_url,
            model = %request.model,
            status,
            error = %err,
            "failed to read chat completion response body"
        );
        TransportFailure::new(describe_request_error(&err, api_url, endpoint.timeout_secs))
    })?;

    debug!(
        model = %request.model,
        status,
        response_body_len = body.len(),
        "received chat completion response"
    );
    Ok(RawResponse { status, body })
}
