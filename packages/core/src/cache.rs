use std::time::{Duration, Instant};

/// Single-value cache that expires after a fixed TTL.
///
/// Holds the last SOL/USD quote so listing pages do not hit the price API
/// on every render.
pub struct ResponseCache<T: Clone> {
    entry: Option<(T, Instant)>,
    ttl: Duration,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    /// The cached value, or `None` once the TTL has elapsed.
    pub fn get(&self) -> Option<T> {
        self.entry
            .as_ref()
            .filter(|(_, stored_at)| stored_at.elapsed() <= self.ttl)
            .map(|(value, _)| value.clone())
    }

    pub fn set(&mut self, value: T) {
        self.entry = Some((value, Instant::now()));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_fresh(&self) -> bool {
        self.get().is_some()
    }
}
