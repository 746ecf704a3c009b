use std::future::{self, Future};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{Outcome, classify};
use crate::conversation::Conversation;
use crate::gateway::{ChatRequest, ModelGateway, TransportFailure};
use crate::model::Message;
use crate::roster::{Advancement, ModelRoster, NO_ROSTER_REASON};

const CANCELLED_MESSAGE: &str = "request cancelled";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("no model available: {reason}")]
    RosterExhausted {
        reason: String,
        last_response: Option<String>,
    },
}

/// Owns one conversation and its model roster and drives each user turn
/// through the failover loop.
pub struct Dispatcher<G> {
    gateway: G,
    roster: ModelRoster,
    conversation: Conversation,
    max_tokens: u32,
}

impl<G> Dispatcher<G>
where
    G: ModelGateway,
{
    pub fn new(gateway: G, roster: ModelRoster, conversation: Conversation, max_tokens: u32) -> Self {
        Self {
            gateway,
            roster,
            conversation,
            max_tokens,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn roster(&self) -> &ModelRoster {
        &self.roster
    }

    pub fn active_model(&self) -> Option<&str> {
        self.roster.active()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn send_user_message(&mut self, content: &str) -> Result<Message, DispatchError> {
        self.send_user_message_until(content, future::pending()).await
    }

    /// Like [`Dispatcher::send_user_message`], but abandons the in-flight
    /// exchange as a transport error once `cancel` completes. The user message
    /// stays in the conversation either way.
    pub async fn send_user_message_until<C>(
        &mut self,
        content: &str,
        cancel: C,
    ) -> Result<Message, DispatchError>
    where
        C: Future<Output = ()>,
    {
        self.conversation.append(Message::user(content));
        tokio::pin!(cancel);

        let mut attempts = 0usize;
        loop {
            let Some(model) = self.roster.active().map(str::to_owned) else {
                warn!("no model roster configured; nothing to dispatch to");
                return Err(DispatchError::RosterExhausted {
                    reason: NO_ROSTER_REASON.to_string(),
                    last_response: None,
                });
            };
            attempts += 1;

            let request = ChatRequest {
                model: &model,
                messages: self.conversation.snapshot(),
                max_tokens: self.max_tokens,
            };
            debug!(
                model = %model,
                attempt = attempts,
                message_count = request.messages.len(),
                "dispatching chat completion"
            );

            let attempt = tokio::select! {
                result = self.gateway.send(request) => result,
                _ = &mut cancel => {
                    warn!(model = %model, attempt = attempts, "chat completion cancelled");
                    Err(TransportFailure::new(CANCELLED_MESSAGE))
                }
            };

            match classify(attempt) {
                Outcome::Success(reply) => {
                    info!(
                        model = %model,
                        attempts,
                        reply_len = reply.content.len(),
                        "received model reply"
                    );
                    self.conversation.append(reply.clone());
                    return Ok(reply);
                }
                Outcome::RateLimited(raw) => {
                    warn!(model = %model, attempt = attempts, "model is rate limited");
                    match self.roster.advance() {
                        Advancement::Switched { model: next } => {
                            info!(from = %model, to = %next, "switching to next model");
                        }
                        Advancement::NotSwitched { reason } => {
                            warn!(attempts, reason = %reason, "no fallback model left");
                            return Err(DispatchError::RosterExhausted {
                                reason,
                                last_response: Some(raw),
                            });
                        }
                    }
                }
                Outcome::ProviderError { status, message } => {
                    warn!(model = %model, status, "provider returned an error");
                    return Err(DispatchError::Provider { status, message });
                }
                Outcome::TransportError(message) => {
                    return Err(DispatchError::Transport(message));
                }
                Outcome::MalformedResponse(body) => {
                    warn!(
                        model = %model,
                        response_body_len = body.len(),
                        "provider response matched no known shape"
                    );
                    return Err(DispatchError::MalformedResponse(body));
                }
            }
        }
    }
}
