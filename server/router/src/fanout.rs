use fne_ids::{DstId, PeerId};

/// A caller-supplied snapshot of one connected peer's eligibility for
/// fan-out, decoupling this crate from `fne-session`'s connection map and
/// `fne-affiliation`'s per-peer tables.
#[derive(Clone, Copy, Debug)]
pub struct PeerFanoutInfo {
    pub peer_id: PeerId,
    pub running: bool,
    pub affiliated_to: Option<DstId>,
}

impl PeerFanoutInfo {
    pub fn is_affiliated_to(&self, dst_id: DstId) -> bool {
        self.affiliated_to == Some(dst_id)
    }
}
