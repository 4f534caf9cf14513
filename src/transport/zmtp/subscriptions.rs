//! Topic prefix subscriptions.

use crate::transport::zmtp::codec::SubscriptionChange;

/// Multiset of subscribed topic prefixes
///
/// Subscribing twice to the same prefix needs two cancels to remove it.
/// The empty prefix matches every topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    prefixes: Vec<Vec<u8>>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, prefix: &[u8]) {
        self.prefixes.push(prefix.to_vec());
    }

    /// Remove one occurrence of `prefix`; returns false if it was not present
    pub fn cancel(&mut self, prefix: &[u8]) -> bool {
        match self.prefixes.iter().position(|p| p == prefix) {
            Some(i) => {
                self.prefixes.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub fn apply(&mut self, change: &SubscriptionChange) {
        match change {
            SubscriptionChange::Subscribe(prefix) => self.subscribe(prefix),
            SubscriptionChange::Cancel(prefix) => {
                self.cancel(prefix);
            }
        }
    }

    /// Whether any subscribed prefix matches `topic`
    pub fn matches(&self, topic: &[u8]) -> bool {
        self.prefixes.iter().any(|p| topic.starts_with(p))
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.prefixes.iter().map(Vec::as_slice)
    }
}
