use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::context::{ConversationState, DEFAULT_MAX_MESSAGES};

/// Shared handle to one conversation. Each handle carries its own lock, so
/// turns on different conversations never contend with each other.
pub type ConversationHandle = Arc<Mutex<ConversationState>>;

/// Trait for looking up and creating conversation state
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Return the state stored under `id`, creating it if absent.
    ///
    /// A missing id yields a fresh state that is never stored.
    async fn get_or_create(&self, id: Option<&str>) -> ConversationHandle;

    /// Return the state stored under `id` without creating it.
    async fn get(&self, id: &str) -> Option<ConversationHandle>;

    /// Drop conversations that have not been touched for `ttl`.
    /// Returns how many were removed.
    async fn evict_idle(&self, ttl: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory implementation of ConversationStore, lives for the process lifetime
pub struct InMemoryConversationStore {
    conversations: Arc<DashMap<String, ConversationHandle>>,
    max_messages: usize,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::with_max_messages(DEFAULT_MAX_MESSAGES)
    }

    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            conversations: Arc::new(DashMap::new()),
            max_messages,
        }
    }

    fn fresh_state(&self) -> ConversationHandle {
        Arc::new(Mutex::new(ConversationState::new(self.max_messages)))
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_or_create(&self, id: Option<&str>) -> ConversationHandle {
        let Some(id) = id else {
            debug!("No conversation id supplied, using ephemeral state");
            return self.fresh_state();
        };

        let entry = self
            .conversations
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(conversation_id = %id, "Creating conversation state");
                self.fresh_state()
            });
        entry.value().clone()
    }

    async fn get(&self, id: &str) -> Option<ConversationHandle> {
        self.conversations.get(id).map(|entry| entry.value().clone())
    }

    async fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.conversations.len();
        // Only the map's own reference may remain. Any other clone belongs to
        // a turn in flight, which may be waiting on its completion unlocked.
        self.conversations.retain(|_, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(state) => state.idle_for() < ttl,
                Err(_) => true,
            }
        });
        let removed = before.saturating_sub(self.conversations.len());
        if removed > 0 {
            info!(removed, remaining = self.conversations.len(), "Evicted idle conversations");
        }
        removed
    }

    fn len(&self) -> usize {
        self.conversations.len()
    }
}
