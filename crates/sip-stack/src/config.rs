use std::time::Duration;

pub use rvoip_sip_transaction::config::StrayResponsePolicy;
use rvoip_sip_transaction::config::TimerSettings;

/// Construction-time settings for a [`crate::executive::Executive`],
/// following the builder shape `dialog-core`'s `DialogManagerConfig`
/// uses (plain struct, `with_*` methods returning `Self`, a `Default`
/// impl matching RFC 3261's own defaults rather than an empty struct).
///
/// Per spec.md §1 this crate introduces no external file format — a
/// `StackConfig` is always built in-process, never loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    pub timers: TimerSettings,
    /// RFC 3261 §18.1.2: a malformed message MAY still be delivered to
    /// the TU instead of being discarded outright.
    pub permissive_parse: bool,
    pub stray_response_policy: StrayResponsePolicy,
    /// TCP/TLS connection idle eviction window (spec.md §4.7 "idle
    /// eviction"), forwarded to [`rvoip_sip_transport::selector::TransportSelector`]'s
    /// per-listener linger.
    pub tcp_linger: Duration,
}

impl Default for StackConfig {
    fn default() -> Self {
        StackConfig {
            timers: TimerSettings::default(),
            permissive_parse: false,
            stray_response_policy: StrayResponsePolicy::Discard,
            tcp_linger: Duration::from_secs(120),
        }
    }
}

impl StackConfig {
    pub fn new() -> Self {
        StackConfig::default()
    }

    pub fn with_timers(mut self, timers: TimerSettings) -> Self {
        self.timers = timers;
        self
    }

    pub fn with_permissive_parse(mut self, permissive: bool) -> Self {
        self.permissive_parse = permissive;
        self
    }

    pub fn with_stray_response_policy(mut self, policy: StrayResponsePolicy) -> Self {
        self.stray_response_policy = policy;
        self
    }

    pub fn with_tcp_linger(mut self, linger: Duration) -> Self {
        self.tcp_linger = linger;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_rfc3261_17_1_1_1() {
        let cfg = StackConfig::default();
        assert_eq!(cfg.timers.t1, Duration::from_millis(500));
        assert_eq!(cfg.timers.t2, Duration::from_secs(4));
        assert_eq!(cfg.timers.t4, Duration::from_secs(5));
        assert_eq!(cfg.stray_response_policy, StrayResponsePolicy::Discard);
    }

    #[test]
    fn builder_overrides_compose() {
        let cfg = StackConfig::new().with_permissive_parse(true).with_tcp_linger(Duration::from_secs(30));
        assert!(cfg.permissive_parse);
        assert_eq!(cfg.tcp_linger, Duration::from_secs(30));
    }
}
