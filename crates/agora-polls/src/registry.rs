use dashmap::{mapref::entry::Entry, DashMap};

use agora_core::{types::PollId, PollRecord};

use crate::error::{PollError, Result};

/// Open rating polls keyed by the platform's poll id.
///
/// Shard-locked, so the command path inserting and a fired resolver removing
/// never race on the same entry.
#[derive(Debug, Default)]
pub struct PollRegistry {
    polls: DashMap<PollId, PollRecord>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new poll. Fails if the id is already tracked.
    pub fn insert(&self, record: PollRecord) -> Result<()> {
        match self.polls.entry(record.poll_id.clone()) {
            Entry::Occupied(e) => Err(PollError::AlreadyTracked(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(record);
                Ok(())
            }
        }
    }

    pub fn get(&self, poll_id: &PollId) -> Option<PollRecord> {
        self.polls.get(poll_id).map(|r| r.value().clone())
    }

    pub fn remove(&self, poll_id: &PollId) -> Option<PollRecord> {
        self.polls.remove(poll_id).map(|(_, record)| record)
    }

    pub fn contains(&self, poll_id: &PollId) -> bool {
        self.polls.contains_key(poll_id)
    }

    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str) -> PollRecord {
        PollRecord {
            poll_id: id.into(),
            chat_id: -100,
            thread_id: Some(5),
            message_id: 1,
            author_id: 42,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn second_insert_of_same_id_is_rejected() {
        let registry = PollRegistry::new();
        registry.insert(record("p1")).unwrap();
        let err = registry.insert(record("p1")).unwrap_err();
        assert!(matches!(err, PollError::AlreadyTracked(id) if id.as_str() == "p1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_returns_record_once() {
        let registry = PollRegistry::new();
        registry.insert(record("p1")).unwrap();
        assert!(registry.contains(&"p1".into()));
        assert_eq!(registry.remove(&"p1".into()).unwrap().author_id, 42);
        assert!(registry.remove(&"p1".into()).is_none());
        assert!(registry.is_empty());
    }
}
