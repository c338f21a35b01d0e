use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

/// Fixed set of sessions handed out round-robin.
///
/// Each session sits behind an async mutex, so a task that is handed a
/// session still in use by an earlier task waits for it instead of sharing.
pub struct SessionPool<S> {
    sessions: Vec<Arc<Mutex<S>>>,
    cursor: AtomicUsize,
}

impl<S> SessionPool<S> {
    /// Returns `None` when `sessions` is empty.
    #[must_use]
    pub fn new(sessions: Vec<S>) -> Option<Self> {
        if sessions.is_empty() {
            return None;
        }
        Some(Self {
            sessions: sessions.into_iter().map(|s| Arc::new(Mutex::new(s))).collect(),
            cursor: AtomicUsize::new(0),
        })
    }

    /// The next session in round-robin order.
    #[must_use]
    pub fn next(&self) -> Arc<Mutex<S>> {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        Arc::clone(&self.sessions[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hands_out_sessions_round_robin() {
        let pool = SessionPool::new(vec!["a", "b", "c"]).unwrap();
        let picks: Vec<&str> = {
            let mut out = Vec::new();
            for _ in 0..7 {
                out.push(*pool.next().lock().await);
            }
            out
        };
        assert_eq!(picks, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(SessionPool::<u8>::new(Vec::new()).is_none());
    }
}
