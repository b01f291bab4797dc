//! Per-thread message logs.
//!
//! Every operation on one thread is a single critical section, so a
//! cancelled caller never leaves a thread half-written. Threads with
//! different ids do not contend beyond a map shard.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use parley_common::{Message, MessageRole};

/// Storage for conversation threads keyed by an opaque id.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// A snapshot of the thread. Unknown ids yield an empty history.
    async fn get(&self, id: &str) -> Result<Vec<Message>>;

    async fn append(&self, id: &str, message: Message) -> Result<()>;

    async fn prepend(&self, id: &str, message: Message) -> Result<()>;

    /// Keeps only the newest `max` messages. `max <= 0` leaves the thread
    /// untouched.
    ///
    /// This may drop a pinned system message.
    async fn truncate(&self, id: &str, max: i64) -> Result<()>;

    /// Removes the thread. Unknown ids are not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Pins `system` at index 0 unless the thread already starts with a
    /// system message.
    ///
    /// Returns whether the message was inserted. The default implementation
    /// reads then prepends; stores that can do both under one lock should.
    async fn ensure_system(&self, id: &str, system: Message) -> Result<bool> {
        let history = self.get(id).await?;
        if starts_with_system(&history) {
            return Ok(false);
        }
        self.prepend(id, system).await?;
        Ok(true)
    }
}

fn starts_with_system(history: &[Message]) -> bool {
    history
        .first()
        .is_some_and(|message| message.role == MessageRole::System)
}

/// Process-local store. History does not survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    threads: DashMap<String, Vec<Message>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Vec<Message>> {
        Ok(self
            .threads
            .get(id)
            .map(|thread| thread.value().clone())
            .unwrap_or_default())
    }

    async fn append(&self, id: &str, message: Message) -> Result<()> {
        self.threads.entry(id.to_string()).or_default().push(message);
        Ok(())
    }

    async fn prepend(&self, id: &str, message: Message) -> Result<()> {
        self.threads
            .entry(id.to_string())
            .or_default()
            .insert(0, message);
        Ok(())
    }

    async fn truncate(&self, id: &str, max: i64) -> Result<()> {
        let Ok(max) = usize::try_from(max) else {
            return Ok(());
        };
        if max == 0 {
            return Ok(());
        }

        if let Some(mut thread) = self.threads.get_mut(id) {
            let excess = thread.len().saturating_sub(max);
            if excess > 0 {
                thread.drain(..excess);
                log::debug!("Truncated thread '{id}' by {excess} messages");
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.threads.remove(id).is_some() {
            log::debug!("Deleted thread '{id}'");
        }
        Ok(())
    }

    async fn ensure_system(&self, id: &str, system: Message) -> Result<bool> {
        let mut thread = self.threads.entry(id.to_string()).or_default();
        if starts_with_system(&thread) {
            return Ok(false);
        }
        thread.insert(0, system);
        Ok(true)
    }
}
