//! Maps one raw provider exchange to a dispatch outcome.
//!
//! Providers do not agree on a single response shape, so a body is read
//! against two schemas in order:
//!
//! - primary: `choices[].message.{role, content}` plus an optional
//!   `error.{message, code}` object;
//! - secondary: role and content flattened onto the choice, or only
//!   `message.content`, with the role defaulting to assistant.
//!
//! A 429 status or a rate-limit phrase anywhere in the body wins over every
//! other rule, whatever the status or shape. A structured `error.code` of 429
//! is checked once the body parses, and the phrase is scanned one last time
//! before a body is declared malformed.

use serde::Deserialize;

use crate::gateway::{RawResponse, TransportFailure};
use crate::model::{Message, MessageRole};

const RATE_LIMIT_STATUS: u16 = 429;
const RATE_LIMIT_PHRASES: [&str; 3] = ["rate limit", "ratelimit", "rate-limit"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(Message),
    RateLimited(String),
    ProviderError { status: u16, message: String },
    TransportError(String),
    MalformedResponse(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorCode {
    Number(i64),
    Text(String),
}

impl ErrorCode {
    fn is_rate_limit(&self) -> bool {
        match self {
            Self::Number(code) => *code == i64::from(RATE_LIMIT_STATUS),
            Self::Text(code) => code.trim() == "429",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    #[serde(default)]
    message: String,
    code: Option<ErrorCode>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct PrimaryBody {
    #[serde(default)]
    choices: Vec<PrimaryChoice>,
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct PrimaryChoice {
    message: PrimaryMessage,
}

#[derive(Debug, Deserialize)]
struct PrimaryMessage {
    #[serde(default)]
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SecondaryBody {
    #[serde(default)]
    choices: Vec<SecondaryChoice>,
}

#[derive(Debug, Deserialize)]
struct SecondaryChoice {
    role: Option<String>,
    content: Option<String>,
    message: Option<SecondaryMessage>,
}

#[derive(Debug, Deserialize)]
struct SecondaryMessage {
    content: Option<String>,
}

impl PrimaryBody {
    fn reply(&self) -> Option<Message> {
        self.choices.iter().find_map(|choice| {
            let role = MessageRole::parse(&choice.message.role)?;
            let content = choice.message.content.clone().unwrap_or_default();
            Some(Message::new(role, content))
        })
    }
}

impl SecondaryBody {
    fn reply(&self) -> Option<Message> {
        let choice = self.choices.first()?;
        let content = choice
            .content
            .clone()
            .or_else(|| choice.message.as_ref().and_then(|msg| msg.content.clone()))?;
        let role = choice
            .role
            .as_deref()
            .and_then(MessageRole::parse)
            .unwrap_or(MessageRole::Assistant);
        Some(Message::new(role, content))
    }
}

pub fn mentions_rate_limit(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    RATE_LIMIT_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// Classifies an attempt, including one that never produced a response.
pub fn classify(attempt: Result<RawResponse, TransportFailure>) -> Outcome {
    match attempt {
        Ok(response) => classify_response(&response),
        Err(failure) => Outcome::TransportError(failure.message),
    }
}

pub fn classify_response(response: &RawResponse) -> Outcome {
    let status = response.status;
    let body = response.body.as_str();

    if status == RATE_LIMIT_STATUS || mentions_rate_limit(body) {
        return Outcome::RateLimited(body.to_string());
    }

    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| body.to_string());
        return Outcome::ProviderError { status, message };
    }

    let primary = serde_json::from_str::<PrimaryBody>(body).ok();
    if let Some(error) = primary
        .as_ref()
        .and_then(|parsed| parsed.error.as_ref())
        .filter(|error| !error.message.is_empty() || error.code.is_some())
    {
        let message = if error.message.is_empty() {
            body.to_string()
        } else {
            error.message.clone()
        };
        let rate_limited = error.code.as_ref().is_some_and(ErrorCode::is_rate_limit)
            || mentions_rate_limit(&message);
        if rate_limited {
            return Outcome::RateLimited(message);
        }
        return Outcome::ProviderError { status, message };
    }

    if let Some(reply) = primary.as_ref().and_then(PrimaryBody::reply) {
        return Outcome::Success(reply);
    }

    if let Some(reply) = serde_json::from_str::<SecondaryBody>(body)
        .ok()
        .as_ref()
        .and_then(SecondaryBody::reply)
    {
        return Outcome::Success(reply);
    }

    if mentions_rate_limit(body) {
        return Outcome::RateLimited(body.to_string());
    }
    Outcome::MalformedResponse(body.to_string())
}
