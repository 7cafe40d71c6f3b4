//! Rate limiting utilities

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Per-key cooldown: a key may pass at most once per `interval_millis`.
///
/// Time is passed in explicitly so callers can drive it with a virtual clock.
#[derive(Debug)]
pub struct CooldownTracker<K> {
    interval_millis: i64,
    last_pass: HashMap<K, i64>,
}

impl<K: Eq + Hash> CooldownTracker<K> {
    pub fn new(interval_millis: i64) -> Self {
        Self {
            interval_millis,
            last_pass: HashMap::new(),
        }
    }

    pub fn interval_millis(&self) -> i64 {
        self.interval_millis
    }

    /// Returns `true` if `key` is still inside its cooldown window at `now_millis`
    pub fn is_cooling<Q>(&self, key: &Q, now_millis: i64) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.last_pass
            .get(key)
            .is_some_and(|last| now_millis - last < self.interval_millis)
    }

    /// Record that `key` passed at `now_millis`
    pub fn mark(&mut self, key: K, now_millis: i64) {
        self.last_pass.insert(key, now_millis);
    }

    /// Check and record in one step.
    ///
    /// Returns `true` if allowed, `false` if still cooling down.
    pub fn check(&mut self, key: K, now_millis: i64) -> bool {
        if self.is_cooling(&key, now_millis) {
            return false;
        }
        self.mark(key, now_millis);
        true
    }

    /// Forget a key's cooldown state
    pub fn reset<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.last_pass.remove(key);
    }

    /// Clean up entries whose cooldown has long elapsed
    pub fn cleanup(&mut self, now_millis: i64) {
        let interval = self.interval_millis;
        self.last_pass.retain(|_, last| now_millis - *last < interval);
    }

    pub fn len(&self) -> usize {
        self.last_pass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_pass.is_empty()
    }
}
