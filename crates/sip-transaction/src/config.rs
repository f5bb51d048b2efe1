use std::time::Duration;

/// What a [`crate::manager::TransactionManager`] does with a response
/// that matches no live client transaction (spec.md §4.4 "Unmatched
/// responses are discarded (configurable strayResponse flag)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrayResponsePolicy {
    /// Drop silently after a debug-level log (the default).
    #[default]
    Discard,
    /// Hand the response to the TU anyway, as [`crate::event::TransactionEvent::StrayResponse`].
    Deliver,
}

/// RFC 3261 §17.1.1.1 default timer values (spec.md §9 "Scheduler
/// shape" / SPEC_FULL.md §3 Configuration). T1 is the round-trip-time
/// estimate every retransmission interval derives from; T2 caps how far
/// retransmission backoff grows; T4 is the assumed maximum duration a
/// message can remain in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimerSettings {
    pub t1: Duration,
    pub t2: Duration,
    pub t4: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        TimerSettings { t1: Duration::from_millis(500), t2: Duration::from_secs(4), t4: Duration::from_secs(5) }
    }
}

impl TimerSettings {
    /// Timer B / F / H: 64*T1, the overall transaction timeout.
    pub fn timeout(&self) -> Duration {
        self.t1 * 64
    }

    /// Timer D: wait for stray retransmissions of a final response in
    /// Completed, client INVITE side. 32s on an unreliable transport, 0
    /// on a reliable one (spec.md §4.4).
    pub fn timer_d(&self, reliable: bool) -> Duration {
        if reliable {
            Duration::ZERO
        } else {
            Duration::from_secs(32).max(self.t1 * 64)
        }
    }

    /// Timer K: client non-INVITE Completed wait. T4 unreliable, 0
    /// reliable.
    pub fn timer_k(&self, reliable: bool) -> Duration {
        if reliable {
            Duration::ZERO
        } else {
            self.t4
        }
    }

    /// Timer I: server INVITE Confirmed wait. T4 unreliable, 0 reliable.
    pub fn timer_i(&self, reliable: bool) -> Duration {
        if reliable {
            Duration::ZERO
        } else {
            self.t4
        }
    }

    /// Timer J: server non-INVITE Completed wait. 64*T1 unreliable, 0
    /// reliable.
    pub fn timer_j(&self, reliable: bool) -> Duration {
        if reliable {
            Duration::ZERO
        } else {
            self.timeout()
        }
    }
}
