use super::ConversationStore;
use crate::error::ErrorContext;
use crate::types::{ChatTurn, ConversationHistory};
use crate::{Error, Result};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

/// In-process store. Least recently used conversations are evicted first.
pub struct MemoryConversationStore {
    entries: Mutex<LruCache<String, ConversationHistory>>,
    max_turns: usize,
}

impl MemoryConversationStore {
    /// `max_conversations` and `max_turns` are clamped to at least 1.
    pub fn new(max_conversations: usize, max_turns: usize) -> Self {
        let capacity = NonZeroUsize::new(max_conversations).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            max_turns: max_turns.max(1),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, LruCache<String, ConversationHistory>>> {
        self.entries.lock().map_err(|_| {
            Error::store_with_context(
                "Conversation store lock poisoned",
                ErrorContext::new().with_source("memory_store"),
            )
        })
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn load(&self, conversation_id: &str) -> Result<ConversationHistory> {
        let mut entries = self.entries()?;
        Ok(entries.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn append(&self, conversation_id: &str, turns: &[ChatTurn]) -> Result<()> {
        let mut entries = self.entries()?;
        let history = entries.get_or_insert_mut(conversation_id.to_string(), Vec::new);
        history.extend_from_slice(turns);
        if history.len() > self.max_turns {
            let excess = history.len() - self.max_turns;
            history.drain(..excess);
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_id_is_empty() {
        let store = MemoryConversationStore::new(4, 10);
        assert!(store.load("nope").await.unwrap().is_empty());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn append_accumulates_in_order() {
        let store = MemoryConversationStore::new(4, 10);
        store
            .append("c", &[ChatTurn::user("hi"), ChatTurn::assistant("hello")])
            .await
            .unwrap();
        store.append("c", &[ChatTurn::user("again")]).await.unwrap();
        let history = store.load("c").await.unwrap();
        assert_eq!(
            history,
            vec![
                ChatTurn::user("hi"),
                ChatTurn::assistant("hello"),
                ChatTurn::user("again")
            ]
        );
    }

    #[tokio::test]
    async fn least_recently_used_is_evicted() {
        let store = MemoryConversationStore::new(2, 10);
        store.append("a", &[ChatTurn::user("1")]).await.unwrap();
        store.append("b", &[ChatTurn::user("2")]).await.unwrap();
        // touch "a" so "b" becomes the eviction candidate
        store.load("a").await.unwrap();
        store.append("c", &[ChatTurn::user("3")]).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 2);
        assert!(store.load("b").await.unwrap().is_empty());
        assert_eq!(store.load("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oldest_turns_are_dropped_past_the_cap() {
        let store = MemoryConversationStore::new(2, 3);
        for i in 0..5 {
            store.append("a", &[ChatTurn::user(i.to_string())]).await.unwrap();
        }
        let history = store.load("a").await.unwrap();
        let contents: Vec<_> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["2", "3", "4"]);
    }
}
