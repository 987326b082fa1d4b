use crate::{PlaceCandidate, Restaurant};
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Value with a stable identity used for set semantics.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for PlaceCandidate {
    fn key(&self) -> &str {
        &self.place_id
    }
}

impl Keyed for Restaurant {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Producer half handed to each concurrent branch.
#[derive(Debug)]
pub struct DedupSender<T> {
    sender: mpsc::UnboundedSender<Vec<T>>,
}

impl<T> Clone for DedupSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> DedupSender<T> {
    /// Returns `false` once the owning [`Deduplicator`] is gone.
    pub fn send(&self, batch: Vec<T>) -> bool {
        self.sender.send(batch).is_ok()
    }
}

/// Single owner of a keyed set fed by many producers.
///
/// Producers never touch the set; they send batches over a channel and the
/// owner folds them in arrival order, keeping the first value per key.
#[derive(Debug)]
pub struct Deduplicator<T> {
    receiver: mpsc::UnboundedReceiver<Vec<T>>,
}

impl<T: Keyed> Deduplicator<T> {
    pub fn channel() -> (DedupSender<T>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (DedupSender { sender }, Self { receiver })
    }

    /// Drains every batch and returns the unique values.
    ///
    /// Resolves only after all senders have been dropped.
    pub async fn finish(mut self) -> Vec<T> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();

        while let Some(batch) = self.receiver.recv().await {
            for item in batch {
                if seen.insert(item.key().to_string()) {
                    unique.push(item);
                }
            }
        }

        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_producers_never_duplicate_or_lose_keys() {
        let (sender, dedup) = Deduplicator::<PlaceCandidate>::channel();
        let mut tasks = tokio::task::JoinSet::new();

        for producer in 0..12 {
            let sender = sender.clone();
            tasks.spawn(async move {
                let batch = (0..20)
                    .map(|index| PlaceCandidate::new(format!("place-{}", (producer + index) % 25)))
                    .collect();
                tokio::task::yield_now().await;
                sender.send(batch);
            });
        }
        drop(sender);
        while tasks.join_next().await.is_some() {}

        let unique = dedup.finish().await;
        let keys: HashSet<_> = unique.iter().map(|candidate| candidate.place_id.clone()).collect();
        assert_eq!(unique.len(), 25);
        assert_eq!(keys.len(), 25);
    }

    #[tokio::test]
    async fn first_value_per_key_wins() {
        let (sender, dedup) = Deduplicator::<PlaceCandidate>::channel();
        sender.send(vec![PlaceCandidate::new("a"), PlaceCandidate::new("b")]);
        sender.send(vec![PlaceCandidate::new("b"), PlaceCandidate::new("c")]);
        drop(sender);

        let unique = dedup.finish().await;
        let ids: Vec<_> = unique.iter().map(|candidate| candidate.place_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
