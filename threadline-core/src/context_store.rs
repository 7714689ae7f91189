// ABOUTME: Bounded in-memory store of the channel context each assistant thread was opened from.
// ABOUTME: Written on thread start and context change, read before summary turns; oldest saves drop first.

use crate::events::ChannelContext;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

type ThreadKey = (String, String);

/// Threads remembered when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct Entries {
    /// Context plus the sequence number of its latest save
    contexts: HashMap<ThreadKey, (u64, ChannelContext)>,
    /// Save order; entries whose sequence no longer matches `contexts` are stale
    order: VecDeque<(u64, ThreadKey)>,
    next_seq: u64,
}

/// Thread context keyed by (channel, thread_ts). Cheap to clone; clones share state.
///
/// Holds at most `capacity` threads. Saving past that evicts the thread whose
/// context was saved longest ago, so a thread that keeps changing context stays.
#[derive(Debug, Clone)]
pub struct ContextStore {
    inner: Arc<RwLock<Entries>>,
    capacity: usize,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of 0 is treated as 1
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Entries::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert or overwrite the context for a thread
    pub fn save(&self, channel: &str, thread_ts: &str, context: ChannelContext) {
        let key = (channel.to_string(), thread_ts.to_string());
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let Entries {
            contexts,
            order,
            next_seq,
        } = &mut *guard;

        let seq = *next_seq;
        *next_seq += 1;
        order.push_back((seq, key.clone()));
        contexts.insert(key, (seq, context));

        while contexts.len() > self.capacity {
            let Some((seq, key)) = order.pop_front() else {
                break;
            };
            if contexts.get(&key).is_some_and(|(current, _)| *current == seq) {
                contexts.remove(&key);
                tracing::debug!(channel = %key.0, thread_ts = %key.1, "Evicted thread context");
            }
        }

        // Overwrites leave stale entries behind; keep the queue proportional to the map
        if order.len() > self.capacity * 2 {
            order.retain(|(seq, key)| contexts.get(key).is_some_and(|(current, _)| current == seq));
        }
    }

    pub fn get(&self, channel: &str, thread_ts: &str) -> Option<ChannelContext> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contexts
            .get(&(channel.to_string(), thread_ts.to_string()))
            .map(|(_, context)| context.clone())
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contexts
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(channel: &str) -> ChannelContext {
        ChannelContext {
            channel_id: Some(channel.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_save_then_overwrite() {
        let store = ContextStore::new();
        store.save("D1", "1.0", ctx("C1"));
        store.save("D1", "1.0", ctx("C2"));
        assert_eq!(store.get("D1", "1.0"), Some(ctx("C2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_threads_are_independent() {
        let store = ContextStore::new();
        store.save("D1", "1.0", ctx("C1"));
        assert!(store.get("D1", "2.0").is_none());
        assert!(store.get("D2", "1.0").is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = ContextStore::new();
        store.clone().save("D1", "1.0", ctx("C1"));
        assert!(!store.is_empty());
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(ContextStore::new().capacity(), DEFAULT_CAPACITY);
        assert_eq!(ContextStore::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn test_oldest_thread_evicted_at_capacity() {
        let store = ContextStore::with_capacity(2);
        store.save("D1", "1.0", ctx("C1"));
        store.save("D1", "2.0", ctx("C2"));
        store.save("D1", "3.0", ctx("C3"));

        assert_eq!(store.len(), 2);
        assert!(store.get("D1", "1.0").is_none());
        assert_eq!(store.get("D1", "2.0"), Some(ctx("C2")));
        assert_eq!(store.get("D1", "3.0"), Some(ctx("C3")));
    }

    #[test]
    fn test_overwrite_moves_thread_to_newest() {
        let store = ContextStore::with_capacity(2);
        store.save("D1", "1.0", ctx("C1"));
        store.save("D1", "2.0", ctx("C2"));
        store.save("D1", "1.0", ctx("C9"));
        store.save("D1", "3.0", ctx("C3"));

        assert!(store.get("D1", "2.0").is_none());
        assert_eq!(store.get("D1", "1.0"), Some(ctx("C9")));
        assert_eq!(store.get("D1", "3.0"), Some(ctx("C3")));
    }

    #[test]
    fn test_repeated_overwrites_stay_bounded() {
        let store = ContextStore::with_capacity(3);
        for i in 0..1_000 {
            store.save("D1", "1.0", ctx(&format!("C{i}")));
        }
        assert_eq!(store.len(), 1);
        assert!(store.inner.read().unwrap().order.len() <= 6);
        assert_eq!(store.get("D1", "1.0"), Some(ctx("C999")));
    }
}
