use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::{StagedImage, StagingKey};

#[derive(Debug, Clone)]
struct StagedBatch {
    images: Vec<StagedImage>,
    staged_at: Instant,
}

/// Staged upload batches, one slot per tenant and session.
///
/// A slot holds the URLs of the most recent successful batch only. Slots
/// older than the ttl read as empty and are dropped on access or by
/// [`UploadStaging::purge_expired`].
pub struct UploadStaging {
    slots: DashMap<String, StagedBatch>,
    ttl: Duration,
}

impl UploadStaging {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replace the slot's contents with `urls`.
    pub fn replace(&self, key: &StagingKey, urls: Vec<String>) {
        let images = urls.into_iter().map(|url| StagedImage { url }).collect();
        self.slots.insert(
            key.slot(),
            StagedBatch {
                images,
                staged_at: Instant::now(),
            },
        );
    }

    /// Current contents of the slot. Does not clear it.
    pub fn consume(&self, key: &StagingKey) -> Vec<String> {
        let slot = key.slot();
        let now = Instant::now();

        let expired = match self.slots.get(&slot) {
            Some(batch) if now.duration_since(batch.staged_at) < self.ttl => {
                return batch.images.iter().map(|i| i.url.clone()).collect();
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            tracing::debug!(slot = %slot, "staged batch expired");
            self.slots
                .remove_if(&slot, |_, batch| now.duration_since(batch.staged_at) >= self.ttl);
        }
        Vec::new()
    }

    /// Empty the slot. Clearing an empty slot is a no-op.
    pub fn clear(&self, key: &StagingKey) {
        self.slots.remove(&key.slot());
    }

    /// Drop every expired slot, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots
            .retain(|_, batch| now.duration_since(batch.staged_at) < self.ttl);
        before.saturating_sub(self.slots.len())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(session: &str) -> StagingKey {
        StagingKey::new("acme", session)
    }

    #[test]
    fn clear_is_idempotent() {
        let staging = UploadStaging::new(Duration::from_secs(60));
        staging.replace(&key("s1"), vec!["https://cdn/upload/a.png".into()]);

        staging.clear(&key("s1"));
        assert!(staging.consume(&key("s1")).is_empty());
        staging.clear(&key("s1"));
        assert!(staging.consume(&key("s1")).is_empty());
    }

    #[test]
    fn second_batch_replaces_the_first() {
        let staging = UploadStaging::new(Duration::from_secs(60));
        staging.replace(&key("s1"), vec!["a1".into(), "a2".into()]);
        staging.replace(&key("s1"), vec!["b1".into()]);

        assert_eq!(staging.consume(&key("s1")), vec!["b1".to_string()]);
        // consume does not clear
        assert_eq!(staging.consume(&key("s1")), vec!["b1".to_string()]);
    }

    #[test]
    fn sessions_do_not_share_slots() {
        let staging = UploadStaging::new(Duration::from_secs(60));
        staging.replace(&key("s1"), vec!["a".into()]);
        staging.replace(&key("s2"), vec!["b".into()]);
        staging.clear(&key("s2"));

        assert_eq!(staging.consume(&key("s1")), vec!["a".to_string()]);
        assert!(staging.consume(&key("s2")).is_empty());
        assert!(staging.consume(&StagingKey::new("other", "s1")).is_empty());
    }

    #[test]
    fn expired_batches_read_as_empty() {
        let staging = UploadStaging::new(Duration::ZERO);
        staging.replace(&key("s1"), vec!["a".into()]);
        staging.replace(&key("s2"), vec!["b".into()]);

        assert!(staging.consume(&key("s1")).is_empty());
        assert_eq!(staging.len(), 1);
        assert_eq!(staging.purge_expired(), 1);
        assert!(staging.is_empty());
    }
}
