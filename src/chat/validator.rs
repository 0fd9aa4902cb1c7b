//! Inbound request schemas and validation.
//!
//! Validation runs before any store or gateway access. Checks, in order:
//! body shape, `message` presence, non-blank message, message length.

use serde::Deserialize;
use thiserror::Error;

/// Conversation id used when the request does not carry one.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

/// Validation failure, naming the first check that failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Body is not JSON of the expected shape.
    #[error("Invalid request body: {0}")]
    MalformedBody(String),
    /// `message` field absent or null.
    #[error("Message is required")]
    MissingMessage,
    /// Message is empty once surrounding whitespace is removed.
    #[error("Message cannot be empty")]
    EmptyMessage,
    /// Message exceeds the configured length.
    #[error("Message too long (max {max} characters)")]
    MessageTooLong {
        /// Configured maximum, in characters.
        max: usize,
        /// Actual length, in characters.
        actual: usize,
    },
}

/// Raw `POST /api/chat` body.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: Option<String>,
    /// Conversation to append to.
    pub conversation_id: Option<String>,
}

/// Raw `POST /api/reset` body.
#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    /// Conversation to reset.
    pub conversation_id: Option<String>,
}

/// A chat request that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidChat {
    /// Target conversation id.
    pub conversation_id: String,
    /// Message with surrounding whitespace removed.
    pub message: String,
}

/// Validates chat requests against a maximum message length.
#[derive(Clone, Copy, Debug)]
pub struct RequestValidator {
    max_message_chars: usize,
}

impl RequestValidator {
    /// Create a validator.
    #[must_use]
    pub const fn new(max_message_chars: usize) -> Self {
        Self { max_message_chars }
    }

    /// Configured maximum message length.
    #[must_use]
    pub const fn max_message_chars(&self) -> usize {
        self.max_message_chars
    }

    /// Parse and validate a raw chat body.
    ///
    /// # Errors
    /// Returns the first failed check as a [`ValidationError`].
    pub fn validate_chat_body(&self, body: &[u8]) -> Result<ValidChat, ValidationError> {
        let request: ChatRequest = parse_body(body)?;
        self.validate_chat(request)
    }

    /// Validate an already-parsed chat request.
    ///
    /// # Errors
    /// Returns the first failed check as a [`ValidationError`].
    pub fn validate_chat(&self, request: ChatRequest) -> Result<ValidChat, ValidationError> {
        let message = request.message.ok_or(ValidationError::MissingMessage)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let actual = message.chars().count();
        if actual > self.max_message_chars {
            return Err(ValidationError::MessageTooLong {
                max: self.max_message_chars,
                actual,
            });
        }

        Ok(ValidChat {
            conversation_id: conversation_id_or_default(request.conversation_id),
            message: message.to_string(),
        })
    }
}

/// Parse a reset body; an empty body or `null` targets the default conversation.
///
/// # Errors
/// Returns [`ValidationError::MalformedBody`] if the body is not a JSON object.
pub fn parse_reset_body(body: &[u8]) -> Result<String, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DEFAULT_CONVERSATION_ID.to_string());
    }

    let request: Option<ResetRequest> = parse_body(body)?;
    Ok(conversation_id_or_default(
        request.and_then(|r| r.conversation_id),
    ))
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, ValidationError> {
    serde_json::from_slice(body).map_err(|err| ValidationError::MalformedBody(err.to_string()))
}

fn conversation_id_or_default(id: Option<String>) -> String {
    id.unwrap_or_else(|| DEFAULT_CONVERSATION_ID.to_string())
}
