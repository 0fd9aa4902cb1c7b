//! Background eviction of idle conversations.
//!
//! Conversations are never removed by the chat flow itself; this worker
//! periodically drops the ones nobody has written to within the idle TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::conversation::store::ConversationStore;

/// Configuration for idle eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Inactivity after which a conversation may be dropped (seconds). `0` disables eviction.
    pub idle_ttl_seconds: u64,
    /// Interval between sweeps (seconds).
    pub interval_seconds: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: 86_400, // 24 hours
            interval_seconds: 3600,
        }
    }
}

impl EvictionConfig {
    /// Whether sweeps should run at all.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.idle_ttl_seconds > 0 && self.interval_seconds > 0
    }
}

/// Statistics from one sweep.
#[derive(Debug, Clone, Default)]
pub struct EvictionStats {
    /// Conversations removed.
    pub evicted: usize,
    /// Conversations still tracked afterwards.
    pub remaining: usize,
}

/// Periodic idle-conversation sweeper.
pub struct IdleEviction {
    store: Arc<ConversationStore>,
    config: EvictionConfig,
    shutdown: Arc<Notify>,
}

impl IdleEviction {
    /// Create a new eviction worker.
    #[must_use]
    pub fn new(store: Arc<ConversationStore>, config: EvictionConfig) -> Self {
        Self {
            store,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a notifier that stops the worker.
    #[must_use]
    pub fn shutdown_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Spawn the worker as a tokio task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled() {
            info!("Idle conversation eviction is disabled");
            return;
        }

        let interval = Duration::from_secs(self.config.interval_seconds);
        info!(?interval, ttl_seconds = self.config.idle_ttl_seconds, "Starting idle eviction worker");

        loop {
            tokio::select! {
                () = tokio::time::sleep(interval) => {
                    let stats = self.sweep();
                    if stats.evicted > 0 {
                        info!(evicted = stats.evicted, remaining = stats.remaining, "Evicted idle conversations");
                    } else {
                        debug!(remaining = stats.remaining, "Eviction sweep found nothing idle");
                    }
                }
                () = self.shutdown.notified() => {
                    info!("Idle eviction worker shutting down");
                    break;
                }
            }
        }
    }

    /// Run a single sweep now.
    #[must_use]
    pub fn sweep(&self) -> EvictionStats {
        let Ok(ttl_seconds) = i64::try_from(self.config.idle_ttl_seconds) else {
            warn!(ttl = self.config.idle_ttl_seconds, "Idle TTL out of range, skipping sweep");
            return EvictionStats {
                evicted: 0,
                remaining: self.store.len(),
            };
        };

        let evicted = self
            .store
            .evict_idle(Utc::now(), chrono::Duration::seconds(ttl_seconds));
        EvictionStats {
            evicted,
            remaining: self.store.len(),
        }
    }
}
