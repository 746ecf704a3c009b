use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::model::Message;
use crate::providers::openrouter::{self, OpenRouterEndpoint};

/// Wire body of one completion request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
}

/// Status and body of a completed HTTP exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The exchange never produced a response: connect, DNS, timeout or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub message: String,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type GatewayFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResponse, TransportFailure>> + 'a>>;

pub trait ModelGateway {
    fn send<'a>(&'a self, request: ChatRequest<'a>) -> GatewayFuture<'a>;
}

pub struct HttpGateway {
    client: Client,
    endpoint: OpenRouterEndpoint,
}

impl HttpGateway {
    pub fn new(client: Client, endpoint: OpenRouterEndpoint) -> Self {
        Self { client, endpoint }
    }
}

impl ModelGateway for HttpGateway {
    fn send<'a>(&'a self, request: ChatRequest<'a>) -> GatewayFuture<'a> {
        Box::pin(openrouter::send(&self.client, &self.endpoint, request))
    }
}
