//! In-memory conversation store with per-conversation locking.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::conversation::errors::{StoreError, StoreResult};
use crate::conversation::trimmer::trim_history;
use crate::conversation::turn::Turn;

/// Ordered history for one conversation id.
#[derive(Clone, Debug)]
pub struct Conversation {
    turns: Vec<Turn>,
    last_active: DateTime<Utc>,
}

impl Conversation {
    fn seeded(system_prompt: &str) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
            last_active: Utc::now(),
        }
    }

    /// Current turns, system turn first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Time of the last append (or seeding).
    #[must_use]
    pub const fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    fn push(&mut self, turn: Turn, window: usize) -> usize {
        self.turns.push(turn);
        self.last_active = Utc::now();
        trim_history(&mut self.turns, window)
    }
}

type SharedConversation = Arc<Mutex<Conversation>>;

/// Exclusive access to one conversation for the duration of a chat exchange.
///
/// Appends made through a lease are trimmed with the store's window.
pub struct ConversationLease {
    id: String,
    window: usize,
    guard: OwnedMutexGuard<Conversation>,
}

impl ConversationLease {
    /// Conversation id this lease covers.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a turn and trim the history. Returns the number of turns dropped.
    pub fn append(&mut self, turn: Turn) -> usize {
        let dropped = self.guard.push(turn, self.window);
        if dropped > 0 {
            debug!(conversation_id = %self.id, dropped, "Trimmed conversation history");
        }
        dropped
    }

    /// Owned copy of the current turns.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.guard.turns.clone()
    }
}

/// Store owning every conversation, keyed by opaque id.
pub struct ConversationStore {
    conversations: DashMap<String, SharedConversation>,
    system_prompt: Arc<str>,
    window: usize,
}

impl ConversationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(system_prompt: impl Into<Arc<str>>, window: usize) -> Self {
        Self {
            conversations: DashMap::new(),
            system_prompt: system_prompt.into(),
            window,
        }
    }

    /// Maximum retained non-system turns per conversation.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Number of tracked conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether no conversation is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Whether a conversation exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }

    /// Return the conversation for `id`, seeding it with the system turn if unseen.
    ///
    /// Seeding happens under the map shard lock, so concurrent callers share one entry.
    pub fn get_or_create(&self, id: &str) -> Arc<Mutex<Conversation>> {
        let entry = self
            .conversations
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(conversation_id = %id, "Seeding new conversation");
                Arc::new(Mutex::new(Conversation::seeded(&self.system_prompt)))
            });
        Arc::clone(entry.value())
    }

    /// Take exclusive access to the conversation for `id`, creating it if needed.
    pub async fn lock(&self, id: &str) -> ConversationLease {
        let shared = self.get_or_create(id);
        ConversationLease {
            id: id.to_string(),
            window: self.window,
            guard: shared.lock_owned().await,
        }
    }

    /// Append a turn to an existing conversation, then trim it.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `id` was never created.
    pub async fn append(&self, id: &str, turn: Turn) -> StoreResult<usize> {
        let shared = self.existing(id)?;
        let mut conversation = shared.lock().await;
        Ok(conversation.push(turn, self.window))
    }

    /// Owned copy of the turns for `id`.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `id` was never created.
    pub async fn snapshot(&self, id: &str) -> StoreResult<Vec<Turn>> {
        let shared = self.existing(id)?;
        let conversation = shared.lock().await;
        Ok(conversation.turns.clone())
    }

    /// Replace the conversation for `id` with a freshly seeded one.
    ///
    /// Never fails; an in-flight exchange keeps writing to the replaced history.
    pub fn reset(&self, id: &str) {
        let fresh = Arc::new(Mutex::new(Conversation::seeded(&self.system_prompt)));
        self.conversations.insert(id.to_string(), fresh);
        debug!(conversation_id = %id, "Conversation reset");
    }

    /// Drop conversations idle for at least `ttl` as of `now`.
    ///
    /// Conversations that are locked or referenced by a pending request are kept.
    pub fn evict_idle(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.conversations.len();
        self.conversations.retain(|_, shared| {
            if Arc::strong_count(shared) > 1 {
                return true;
            }
            match shared.try_lock() {
                Ok(conversation) => now.signed_duration_since(conversation.last_active) < ttl,
                Err(_) => true,
            }
        });
        before.saturating_sub(self.conversations.len())
    }

    fn existing(&self, id: &str) -> StoreResult<SharedConversation> {
        self.conversations
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
