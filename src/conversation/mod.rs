//! Conversation state: turns, the shared store, history trimming and idle eviction.

pub mod errors;
pub mod eviction;
pub mod store;
pub mod trimmer;
pub mod turn;

pub use errors::{StoreError, StoreResult};
pub use eviction::{EvictionConfig, EvictionStats, IdleEviction};
pub use store::{Conversation, ConversationLease, ConversationStore};
pub use trimmer::{DEFAULT_HISTORY_WINDOW, trim_history};
pub use turn::{Role, Turn};
