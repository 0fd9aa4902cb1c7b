//! Completion gateway trait and the Groq provider client.

pub mod gateway;
pub mod groq;

pub use gateway::{CompletionGateway, GatewayError, GatewayFuture, GatewayResult};
pub use groq::GroqGateway;
