use metrics::{counter, gauge, histogram};

/// Metric names under: {ns}_*. One instance is shared across the session
/// manager, routers, affiliation engine, and RPC service, each namespaced by
/// a `component` label rather than separate metric families, matching how
/// `GatewayMetrics`/`ControlMetrics` key on a single namespace string.
pub struct FneMetrics {
    ns: &'static str,
}

impl FneMetrics {
    pub fn new(namespace: &'static str) -> Self {
        Self { ns: namespace }
    }

    #[inline]
    pub fn peer_connected(&self) {
        counter!(format!("{}_peers_connected_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn peer_disconnected(&self, reason: &'static str) {
        counter!(format!("{}_peers_disconnected_total", self.ns), "reason" => reason).increment(1);
    }

    #[inline]
    pub fn peers_online(&self, count: u64) {
        gauge!(format!("{}_peers_online", self.ns)).set(count as f64);
    }

    #[inline]
    pub fn auth_failed(&self) {
        counter!(format!("{}_peer_auth_failed_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn nak_sent(&self, reason: &'static str) {
        counter!(format!("{}_nak_sent_total", self.ns), "reason" => reason).increment(1);
    }

    #[inline]
    pub fn grants_active(&self, count: u64) {
        gauge!(format!("{}_grants_active", self.ns)).set(count as f64);
    }

    #[inline]
    pub fn grant_issued(&self, protocol: &'static str) {
        counter!(format!("{}_grants_issued_total", self.ns), "protocol" => protocol).increment(1);
    }

    #[inline]
    pub fn grant_expired(&self, protocol: &'static str) {
        counter!(format!("{}_grants_expired_total", self.ns), "protocol" => protocol).increment(1);
    }

    #[inline]
    pub fn frame_routed(&self, protocol: &'static str, fanout: usize) {
        counter!(format!("{}_frames_routed_total", self.ns), "protocol" => protocol).increment(1);
        histogram!(format!("{}_frame_fanout", self.ns), "protocol" => protocol).record(fanout as f64);
    }

    #[inline]
    pub fn frame_dropped(&self, protocol: &'static str, reason: &'static str) {
        counter!(
            format!("{}_frames_dropped_total", self.ns),
            "protocol" => protocol,
            "reason" => reason
        )
        .increment(1);
    }

    #[inline]
    pub fn parrot_replayed(&self, protocol: &'static str) {
        counter!(format!("{}_parrot_frames_replayed_total", self.ns), "protocol" => protocol).increment(1);
    }

    #[inline]
    pub fn rpc_request(&self, func: u16) {
        counter!(format!("{}_rpc_requests_total", self.ns), "func" => func.to_string()).increment(1);
    }

    #[inline]
    pub fn rpc_unhandled(&self) {
        counter!(format!("{}_rpc_unhandled_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn kmm_exchange(&self, direction: &'static str) {
        counter!(format!("{}_kmm_exchanges_total", self.ns), "direction" => direction).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_do_not_panic_without_an_installed_recorder() {
        let metrics = FneMetrics::new("fne");
        metrics.peer_connected();
        metrics.peer_disconnected("timeout");
        metrics.peers_online(3);
        metrics.auth_failed();
        metrics.nak_sent("bad_conn_state");
        metrics.grants_active(2);
        metrics.grant_issued("dmr");
        metrics.grant_expired("p25");
        metrics.frame_routed("dmr", 4);
        metrics.frame_dropped("nxdn", "talkgroup_not_active");
        metrics.parrot_replayed("p25");
        metrics.rpc_request(0x01);
        metrics.rpc_unhandled();
        metrics.kmm_exchange("inbound");
    }
}
