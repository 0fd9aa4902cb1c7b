//! Chat exchange pipeline: validate, record, complete, record.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chat::validator::{RequestValidator, ValidationError, parse_reset_body};
use crate::conversation::store::ConversationStore;
use crate::conversation::turn::Turn;
use crate::llm::gateway::CompletionGateway;

/// Outcome kinds of a chat exchange.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Request rejected before touching any state.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The completion provider is not configured.
    #[error("completion service unavailable")]
    Unavailable,
    /// The provider call failed; the user turn stays recorded.
    #[error("completion failed: {0}")]
    Gateway(String),
    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Runs chat and reset requests against the store and the completion gateway.
pub struct ChatService {
    store: Arc<ConversationStore>,
    gateway: Arc<dyn CompletionGateway>,
    validator: RequestValidator,
    call_timeout: Duration,
}

impl ChatService {
    /// Create a chat service.
    #[must_use]
    pub fn new(
        store: Arc<ConversationStore>,
        gateway: Arc<dyn CompletionGateway>,
        validator: RequestValidator,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            validator,
            call_timeout,
        }
    }

    /// Shared conversation store.
    #[must_use]
    pub const fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Handle one raw `POST /api/chat` body and return the assistant reply.
    ///
    /// The conversation stays locked for the whole exchange so user and
    /// assistant turns are recorded in pairs; other conversations are unaffected.
    ///
    /// # Errors
    /// Returns a [`ChatError`] describing which stage failed.
    pub async fn chat(&self, body: &[u8]) -> Result<String, ChatError> {
        let request = self.validator.validate_chat_body(body)?;

        if !self.gateway.is_configured() {
            warn!("Chat rejected: completion provider is not configured");
            return Err(ChatError::Unavailable);
        }

        let mut lease = self.store.lock(&request.conversation_id).await;
        lease.append(Turn::user(request.message));
        let turns = lease.snapshot();
        debug!(conversation_id = %lease.id(), turns = turns.len(), "Forwarding history");

        let reply = match tokio::time::timeout(self.call_timeout, self.gateway.complete(turns)).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(
                    conversation_id = %lease.id(),
                    error = %err,
                    retryable = err.is_retryable(),
                    "Completion failed"
                );
                // The user turn is already recorded, so this can no longer be a 503.
                return Err(ChatError::Gateway(err.to_string()));
            }
            Err(_) => {
                warn!(conversation_id = %lease.id(), timeout = ?self.call_timeout, "Completion timed out");
                return Err(ChatError::Gateway("completion timed out".to_string()));
            }
        };

        lease.append(Turn::assistant(reply.as_str()));
        info!(conversation_id = %lease.id(), reply_chars = reply.chars().count(), "Chat completed");
        Ok(reply)
    }

    /// Handle one raw `POST /api/reset` body and return the reset conversation id.
    ///
    /// # Errors
    /// Returns [`ChatError::Validation`] if the body is not valid JSON.
    pub fn reset(&self, body: &[u8]) -> Result<String, ChatError> {
        let conversation_id = parse_reset_body(body)?;
        self.store.reset(&conversation_id);
        info!(%conversation_id, "Conversation reset");
        Ok(conversation_id)
    }
}
