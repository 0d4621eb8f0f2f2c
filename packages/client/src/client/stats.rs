//! Client request and routing counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::proxy::EffectiveRoute;

/// Counters updated by every request a client sends.
#[derive(Debug)]
pub struct ClientStats {
    requests_total: AtomicU64,
    requests_successful: AtomicU64,
    requests_failed: AtomicU64,
    routed_direct: AtomicU64,
    routed_via_proxy: AtomicU64,
    tunnels_rejected: AtomicU64,
    bytes_received: AtomicU64,
    created_at: Instant,
}

/// Point-in-time copy of [`ClientStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStatsSnapshot {
    /// Requests sent
    pub requests_total: u64,
    /// Requests that produced a response, whatever its status
    pub requests_successful: u64,
    /// Requests that ended in an error
    pub requests_failed: u64,
    /// Requests routed straight to the origin
    pub routed_direct: u64,
    /// Requests routed through a proxy
    pub routed_via_proxy: u64,
    /// CONNECT requests the proxy refused
    pub tunnels_rejected: u64,
    /// Response body bytes received
    pub bytes_received: u64,
    /// Time since the client was built
    pub uptime: Duration,
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_successful: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            routed_direct: AtomicU64::new(0),
            routed_via_proxy: AtomicU64::new(0),
            tunnels_rejected: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    pub(crate) fn record_request(&self, route: &EffectiveRoute) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        match route {
            EffectiveRoute::Direct => self.routed_direct.fetch_add(1, Ordering::Relaxed),
            EffectiveRoute::ViaProxy { .. } => self.routed_via_proxy.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub(crate) fn record_success(&self, body_len: usize) {
        self.requests_successful.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(u64::try_from(body_len).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, err: &crate::Error) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        if err.is_tunnel_rejected() {
            self.tunnels_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_successful: self.requests_successful.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            routed_direct: self.routed_direct.load(Ordering::Relaxed),
            routed_via_proxy: self.routed_via_proxy.load(Ordering::Relaxed),
            tunnels_rejected: self.tunnels_rejected.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            uptime: self.created_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_routes_and_outcomes() {
        let stats = ClientStats::new();
        stats.record_request(&EffectiveRoute::Direct);
        stats.record_request(&EffectiveRoute::ViaProxy {
            host: "proxy".into(),
            port: 3128,
        });
        stats.record_success(5);
        stats.record_failure(&crate::error::connect("refused"));

        let snap = stats.snapshot();
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.routed_direct, 1);
        assert_eq!(snap.routed_via_proxy, 1);
        assert_eq!(snap.requests_successful, 1);
        assert_eq!(snap.requests_failed, 1);
        assert_eq!(snap.tunnels_rejected, 0);
        assert_eq!(snap.bytes_received, 5);
    }
}
