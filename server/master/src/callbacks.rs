use fne_codec::kmm::KmmFrame;
use fne_ids::{DstId, PeerId};

/// Peer-lifecycle hooks, bound once at wiring time and never reassigned
/// during a connection. Mirrors `original_source`'s per-event callback
/// members on `Network` (`m_peerConnectedCallback`, `m_peerDisconnectedCallback`,
/// `m_p25InCallCallback`/`m_nxdnInCallCallback`, `m_keyRespCallback`) and
/// `fne-affiliation`'s `ReleaseCallback`, collapsed into one trait object so
/// a single `Arc<dyn PeerLifecycleCallbacks>` can be handed to `FneNetwork`
/// at construction instead of five separately-settable function pointers.
pub trait PeerLifecycleCallbacks: Send + Sync {
    /// A peer's login/auth/config handshake reached `Running`.
    fn peer_connected(&self, _peer_id: PeerId) {}

    /// A peer's session ended, by disconnect, NAK, or session timeout.
    fn peer_disconnected(&self, _peer_id: PeerId) {}

    /// An `INCALL_CTRL` command arrived for the named protocol.
    fn in_call_ctrl(&self, _protocol: &'static str, _command: u8, _dst_id: DstId) {}

    /// The master pushed a KMM frame to a peer over `KEY_RSP`.
    fn key_response(&self, _peer_id: PeerId, _kmm: &KmmFrame) {}

    /// A channel grant was released, returning `channel` to the free pool.
    fn release_grant(&self, _channel: u32, _dst_id: DstId, _reserved: u32) {}
}

/// A callback set that does nothing; the default when the host process
/// wires no observer in.
pub struct NoopPeerLifecycleCallbacks;

impl PeerLifecycleCallbacks for NoopPeerLifecycleCallbacks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_callbacks_accept_every_hook() {
        let cb = NoopPeerLifecycleCallbacks;
        cb.peer_connected(PeerId(1));
        cb.peer_disconnected(PeerId(1));
        cb.in_call_ctrl("p25", 0, DstId(100));
        cb.release_grant(1, DstId(100), 0);
    }
}
