//! Per-room subscriber fan-out.
//!
//! Each room keeps a `pid -> connection` map. Registering under an existing
//! `(code, pid)` replaces the old connection; unregistering is identity
//! checked so a late teardown from a replaced connection can never evict
//! the live one. Snapshots are pre-serialized per recipient and pushed over
//! unbounded channels; a dead channel unregisters on the spot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

struct Subscription {
    conn_id: u64,
    sender: UnboundedSender<String>,
}

pub struct Subscribers {
    inner: Mutex<HashMap<String, HashMap<String, Subscription>>>,
    next_conn_id: AtomicU64,
}

impl Subscribers {
    pub fn new() -> Self {
        Subscribers {
            inner: Mutex::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Attach a connection, replacing any prior one for this `(code, pid)`.
    /// Returns the connection identity for later unregistration.
    pub fn register(&self, code: &str, pid: &str, sender: UnboundedSender<String>) -> u64 {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock().unwrap();
        inner
            .entry(code.to_string())
            .or_default()
            .insert(pid.to_string(), Subscription { conn_id, sender });
        conn_id
    }

    /// Detach a connection, but only if it is still the registered one.
    pub fn unregister(&self, code: &str, pid: &str, conn_id: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(room) = inner.get_mut(code) {
            if room.get(pid).map(|s| s.conn_id) == Some(conn_id) {
                room.remove(pid);
            }
            if room.is_empty() {
                inner.remove(code);
            }
        }
    }

    /// Push per-recipient payloads to a room. Broken connections are
    /// dropped as they are discovered.
    pub fn push(&self, code: &str, payloads: &[(String, String)]) {
        let mut inner = self.inner.lock().unwrap();
        let Some(room) = inner.get_mut(code) else {
            return;
        };
        for (pid, payload) in payloads {
            if let Some(sub) = room.get(pid) {
                if sub.sender.send(payload.clone()).is_err() {
                    room.remove(pid);
                }
            }
        }
        if room.is_empty() {
            inner.remove(code);
        }
    }

    /// Currently subscribed pids for a room.
    pub fn pids(&self, code: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .get(code)
            .map(|room| room.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self, code: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(code)
            .map(|room| room.len())
            .unwrap_or(0)
    }
}

impl Default for Subscribers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_register_replaces_prior_connection() {
        let subs = Subscribers::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        let first = subs.register("abcde", "p1", tx1);
        let second = subs.register("abcde", "p1", tx2);
        assert_ne!(first, second);
        assert_eq!(subs.connection_count("abcde"), 1);

        subs.push(
            "abcde",
            &[("p1".to_string(), "snap".to_string())],
        );
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap(), "snap");
    }

    #[test]
    fn test_stale_unregister_keeps_live_connection() {
        let subs = Subscribers::new();
        let (tx1, _rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        let first = subs.register("abcde", "p1", tx1);
        let _second = subs.register("abcde", "p1", tx2);

        // The replaced connection tears down late; the live one survives.
        subs.unregister("abcde", "p1", first);
        assert_eq!(subs.connection_count("abcde"), 1);
        subs.push("abcde", &[("p1".to_string(), "still-here".to_string())]);
        assert_eq!(rx2.try_recv().unwrap(), "still-here");
    }

    #[test]
    fn test_last_connection_removes_room_entry() {
        let subs = Subscribers::new();
        let (tx, _rx) = unbounded_channel();
        let conn = subs.register("abcde", "p1", tx);
        subs.unregister("abcde", "p1", conn);
        assert_eq!(subs.connection_count("abcde"), 0);
        assert!(subs.pids("abcde").is_empty());
    }

    #[test]
    fn test_dead_channel_pruned_on_push() {
        let subs = Subscribers::new();
        let (tx, rx) = unbounded_channel();
        drop(rx);
        subs.register("abcde", "p1", tx);
        subs.push("abcde", &[("p1".to_string(), "lost".to_string())]);
        assert_eq!(subs.connection_count("abcde"), 0);
    }
}
