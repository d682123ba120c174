//! 会话存储：按会话 ID 保存历史，并保证同一会话的请求串行执行。
//!
//! Conversation storage, injected into the service.

mod memory;

pub use memory::MemoryConversationStore;

use crate::types::{ChatTurn, ConversationHistory};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Stored turns, oldest first. Unknown ids yield an empty history.
    async fn load(&self, conversation_id: &str) -> Result<ConversationHistory>;
    async fn append(&self, conversation_id: &str, turns: &[ChatTurn]) -> Result<()>;
    async fn len(&self) -> Result<usize>;
}

/// Per-conversation async locks.
///
/// Requests on the same id run one at a time; different ids never contend.
/// Entries are dropped once nobody holds or waits on them.
#[derive(Default)]
pub struct ConversationLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(conversation_id.to_string())
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Ids currently held or awaited.
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_id_serializes() {
        let locks = Arc::new(ConversationLocks::new());
        let guard = locks.acquire("a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire("a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_ids_do_not_contend() {
        let locks = ConversationLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn released_entries_are_pruned() {
        let locks = ConversationLocks::new();
        drop(locks.acquire("a").await);
        let _b = locks.acquire("b").await;
        assert_eq!(locks.inner.lock().unwrap().len(), 1);
    }
}
