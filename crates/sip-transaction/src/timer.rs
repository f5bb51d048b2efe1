use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use tokio::time::Instant;

use crate::key::TransactionKey;

/// Every RFC 3261 §17 retransmission/timeout timer a transaction can
/// own (spec.md §4.4). `TimerKind` alone, plus the owning
/// [`TransactionKey`], is enough for the manager to know which state
/// machine method to call when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Client INVITE retransmit (unreliable only), doubling up to T2.
    A,
    /// Client INVITE overall timeout, 64*T1.
    B,
    /// Client INVITE Completed linger for stray final-response retransmits.
    D,
    /// Client non-INVITE retransmit (unreliable only), capped at T2.
    E,
    /// Client non-INVITE overall timeout, 64*T1.
    F,
    /// Server INVITE response retransmit (unreliable only), doubling to T2.
    G,
    /// Server INVITE wait-for-ACK timeout, 64*T1.
    H,
    /// Server INVITE Confirmed linger.
    I,
    /// Server non-INVITE Completed linger.
    J,
    /// Client non-INVITE Completed linger.
    K,
}

pub type TimerToken = u64;

struct Entry {
    kind: TimerKind,
    key: TransactionKey,
    canceled: bool,
}

/// A min-heap of `(due, timer-kind, transaction-key)` ordered by
/// absolute deadline (spec.md §4.5). `cancel` is lazy — it tombstones
/// the entry rather than searching the heap — so cancellation is O(1)
/// and `pop` simply skips tombstoned entries as it drains them, exactly
/// as spec.md describes: "Canceled entries are discarded on pop without
/// dispatch."
///
/// Deadlines are [`tokio::time::Instant`]s rather than raw milliseconds:
/// this is the idiomatic Rust stand-in for "absolute deadline in
/// milliseconds" that composes directly with `tokio::time::sleep_until`
/// in the [`crate`]'s executive, and with `tokio::time::pause`/`advance`
/// in tests.
#[derive(Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    entries: HashMap<u64, Entry>,
    next_token: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        TimerQueue::default()
    }

    /// Schedule `kind` for `key` to fire after `delay`. Returns a token
    /// usable with [`Self::cancel`].
    pub fn schedule(&mut self, delay: Duration, kind: TimerKind, key: TransactionKey) -> TimerToken {
        let token = self.next_token;
        self.next_token += 1;
        let due = Instant::now() + delay;
        self.heap.push(Reverse((due, token)));
        self.entries.insert(token, Entry { kind, key, canceled: false });
        token
    }

    /// Tombstone `token` so it is skipped on pop (spec.md §4.5: "lazy:
    /// mark tombstone, skip on pop").
    pub fn cancel(&mut self, token: TimerToken) {
        if let Some(entry) = self.entries.get_mut(&token) {
            entry.canceled = true;
        }
    }

    /// Cancel every still-pending timer belonging to `key` (used when a
    /// transaction reaches Terminated, spec.md §5: "a transaction
    /// transitioning to Terminated cancels all its pending timers").
    pub fn cancel_all_for(&mut self, key: &TransactionKey) {
        for entry in self.entries.values_mut() {
            if &entry.key == key {
                entry.canceled = true;
            }
        }
    }

    /// The deadline of the next live (non-canceled) timer, used by the
    /// executive to size its `select`/`tokio::select!` timeout (spec.md
    /// §4.5 `getTimeTillNextProcess`).
    pub fn next_due(&mut self) -> Option<Instant> {
        self.drop_tombstones_at_head();
        self.heap.peek().map(|Reverse((due, _))| *due)
    }

    /// Pop the earliest live timer whose deadline has already passed,
    /// if any. Returns `None` if the earliest entry (live or not) is
    /// still in the future.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerKind, TransactionKey)> {
        loop {
            self.drop_tombstones_at_head();
            let Reverse((due, token)) = *self.heap.peek()?;
            if due > now {
                return None;
            }
            self.heap.pop();
            let entry = self.entries.remove(&token)?;
            if !entry.canceled {
                return Some((entry.kind, entry.key));
            }
        }
    }

    fn drop_tombstones_at_head(&mut self) {
        while let Some(Reverse((_, token))) = self.heap.peek() {
            match self.entries.get(token) {
                Some(e) if e.canceled => {
                    self.heap.pop();
                    self.entries.remove(token);
                }
                _ => break,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|e| e.canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvoip_sip_core::types::method::Method;

    fn key(branch: &str) -> TransactionKey {
        TransactionKey::new(branch, "host:5060", Method::Invite)
    }

    #[tokio::test(start_paused = true)]
    async fn pops_in_nondecreasing_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(Duration::from_millis(300), TimerKind::A, key("3"));
        q.schedule(Duration::from_millis(100), TimerKind::A, key("1"));
        q.schedule(Duration::from_millis(200), TimerKind::A, key("2"));

        tokio::time::advance(Duration::from_millis(400)).await;
        let now = Instant::now();

        let mut order = Vec::new();
        while let Some((_, k)) = q.pop_due(now) {
            order.push(k.branch);
        }
        assert_eq!(order, vec!["1", "2", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn canceled_timer_is_skipped_on_pop() {
        let mut q = TimerQueue::new();
        let token = q.schedule(Duration::from_millis(50), TimerKind::B, key("x"));
        q.cancel(token);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(q.pop_due(Instant::now()), None);
        assert!(q.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn not_yet_due_timer_is_not_popped() {
        let mut q = TimerQueue::new();
        q.schedule(Duration::from_secs(5), TimerKind::F, key("late"));
        assert_eq!(q.pop_due(Instant::now()), None);
    }
}
