//! Chat request handling: validation and the chat exchange pipeline.

pub mod service;
pub mod validator;

pub use service::{ChatError, ChatService};
pub use validator::{
    ChatRequest, DEFAULT_CONVERSATION_ID, RequestValidator, ResetRequest, ValidChat,
    ValidationError, parse_reset_body,
};
