//! Application state shared across all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::chat::service::ChatService;
use crate::chat::validator::RequestValidator;
use crate::config::RelayConfig;
use crate::conversation::store::ConversationStore;
use crate::llm::gateway::{CompletionGateway, GatewayResult};
use crate::llm::groq::GroqGateway;

/// Extra time granted on top of the provider timeout before the pipeline gives up.
const CALL_TIMEOUT_MARGIN_SECS: u64 = 5;

/// Shared application state.
pub struct AppState {
    /// Chat pipeline (owns the conversation store and the gateway).
    pub chat: ChatService,
    /// Directory with the static entry asset.
    pub static_dir: PathBuf,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl AppState {
    /// Create state backed by the Groq gateway described in `config`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &RelayConfig) -> GatewayResult<Arc<Self>> {
        let gateway = GroqGateway::new(config.provider.clone())?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    /// Create state around any completion gateway.
    #[must_use]
    pub fn with_gateway(config: &RelayConfig, gateway: Arc<dyn CompletionGateway>) -> Arc<Self> {
        let store = Arc::new(ConversationStore::new(
            config.system_prompt.as_str(),
            config.limits.history_window,
        ));
        let call_timeout = config.provider.request_timeout
            + std::time::Duration::from_secs(CALL_TIMEOUT_MARGIN_SECS);
        let chat = ChatService::new(
            store,
            gateway,
            RequestValidator::new(config.limits.max_message_chars),
            call_timeout,
        );

        Arc::new(Self {
            chat,
            static_dir: config.static_dir.clone(),
            max_body_bytes: config.limits.max_body_bytes,
        })
    }

    /// Shared conversation store.
    #[must_use]
    pub fn store(&self) -> Arc<ConversationStore> {
        Arc::clone(self.chat.store())
    }
}
