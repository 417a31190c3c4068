use std::collections::HashMap;

use fne_ids::{DstId, RadioId, StreamId};

/// Tracks the single in-progress call (if any) for one destination id, used
/// to admit or reject a concurrent second stream to the same destination.
#[derive(Clone, Copy, Debug)]
pub struct RxStatus {
    pub call_elapsed_ms: u64,
    pub src_id: RadioId,
    pub dst_id: DstId,
    pub stream_id: StreamId,
}

/// At most one concurrent inbound call per destination id, across all
/// peers. A per-destination call-activity timeout closes out a call whose
/// source has gone silent without sending an explicit terminator.
pub struct RxStatusTable {
    statuses: HashMap<DstId, RxStatus>,
    call_activity_timeout_ms: u64,
}

impl RxStatusTable {
    pub fn new(call_activity_timeout_ms: u64) -> Self {
        Self { statuses: HashMap::new(), call_activity_timeout_ms }
    }

    /// Admits a frame for `dst_id`/`stream_id`, starting a new call record
    /// if none is active. Returns `false` if a different stream already
    /// owns this destination.
    pub fn admit(&mut self, dst_id: DstId, src_id: RadioId, stream_id: StreamId) -> bool {
        match self.statuses.get_mut(&dst_id) {
            Some(status) if status.stream_id == stream_id => {
                status.call_elapsed_ms = 0;
                true
            }
            Some(_) => false,
            None => {
                self.statuses.insert(dst_id, RxStatus { call_elapsed_ms: 0, src_id, dst_id, stream_id });
                true
            }
        }
    }

    pub fn active(&self, dst_id: DstId) -> Option<RxStatus> {
        self.statuses.get(&dst_id).copied()
    }

    pub fn clear(&mut self, dst_id: DstId) {
        self.statuses.remove(&dst_id);
    }

    /// Advances every tracked call's activity clock, returning the
    /// destinations whose call has gone silent past the configured timeout
    /// so the caller can emit a synthetic end-of-call for them.
    pub fn clock(&mut self, ms: u64) -> Vec<DstId> {
        let mut timed_out = Vec::new();
        for (dst_id, status) in self.statuses.iter_mut() {
            status.call_elapsed_ms += ms;
            if status.call_elapsed_ms >= self.call_activity_timeout_ms {
                timed_out.push(*dst_id);
            }
        }
        for dst_id in &timed_out {
            self.statuses.remove(dst_id);
        }
        timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_first_stream_then_rejects_contention() {
        let mut table = RxStatusTable::new(2000);
        assert!(table.admit(DstId(100), RadioId(1), StreamId(7)));
        assert!(!table.admit(DstId(100), RadioId(2), StreamId(8)));
        assert!(table.admit(DstId(100), RadioId(1), StreamId(7)));
    }

    #[test]
    fn clear_allows_a_new_stream_to_take_over() {
        let mut table = RxStatusTable::new(2000);
        table.admit(DstId(100), RadioId(1), StreamId(7));
        table.clear(DstId(100));
        assert!(table.admit(DstId(100), RadioId(2), StreamId(8)));
    }

    #[test]
    fn clock_times_out_silent_calls() {
        let mut table = RxStatusTable::new(1000);
        table.admit(DstId(100), RadioId(1), StreamId(7));
        assert!(table.clock(999).is_empty());
        assert_eq!(table.clock(1), vec![DstId(100)]);
        assert!(table.active(DstId(100)).is_none());
    }
}
