use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use fne_affiliation::AffiliationTable;
use fne_ids::{DstId, PeerId};
use fne_router::PeerFanoutInfo;
use fne_session::PeerConnection;

/// A peer's session state plus its own affiliation/grant engine. Per §4.3,
/// every connected peer owns one `AffiliationTable`, created when it reaches
/// `Running` and dropped when the session ends.
pub struct ManagedPeer {
    pub connection: PeerConnection,
    pub affiliation: Arc<AffiliationTable>,
}

/// The session manager's peer-connection map. Guarded by a single
/// `tokio::sync::RwLock`: routers take shared locks to enumerate peers for
/// fan-out, the login/auth/config handlers take exclusive locks to insert or
/// erase.
#[derive(Default)]
pub struct PeerTable {
    peers: RwLock<HashMap<PeerId, ManagedPeer>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, peer_id: PeerId, connection: PeerConnection, channels: &[u32]) {
        let affiliation = Arc::new(AffiliationTable::new(format!("peer-{peer_id}"), channels.iter().copied()));
        self.peers.write().await.insert(peer_id, ManagedPeer { connection, affiliation });
    }

    pub async fn remove(&self, peer_id: PeerId) -> Option<ManagedPeer> {
        self.peers.write().await.remove(&peer_id)
    }

    pub async fn contains(&self, peer_id: PeerId) -> bool {
        self.peers.read().await.contains_key(&peer_id)
    }

    pub async fn address_of(&self, peer_id: PeerId) -> Option<SocketAddr> {
        self.peers.read().await.get(&peer_id).map(|p| p.connection.address())
    }

    pub async fn affiliation_of(&self, peer_id: PeerId) -> Option<Arc<AffiliationTable>> {
        self.peers.read().await.get(&peer_id).map(|p| p.affiliation.clone())
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Ids of every peer currently in `Running` state, for broadcast
    /// operations (MASTER announcements, parrot replay) that fan out to
    /// everyone rather than routing to a single destination.
    pub async fn running_peer_ids(&self) -> Vec<PeerId> {
        self.peers
            .read()
            .await
            .values()
            .filter(|p| p.connection.state().is_running())
            .map(|p| p.connection.peer_id())
            .collect()
    }

    /// Snapshots fan-out eligibility for every peer, given the destination a
    /// frame is being routed to. A peer counts as affiliated to `dst_id` if
    /// any radio registered through it has a group affiliation to `dst_id`.
    pub async fn fanout_snapshot(&self, dst_id: DstId) -> Vec<PeerFanoutInfo> {
        self.peers
            .read()
            .await
            .values()
            .map(|p| PeerFanoutInfo {
                peer_id: p.connection.peer_id(),
                running: p.connection.state().is_running(),
                affiliated_to: p.affiliation.has_group_aff(dst_id).then_some(dst_id),
            })
            .collect()
    }

    pub async fn handle_auth(&self, peer_id: PeerId, password: &str, hash: &[u8]) -> Option<fne_session::SessionResult<()>> {
        let mut peers = self.peers.write().await;
        peers.get_mut(&peer_id).map(|p| p.connection.handle_auth(password, hash))
    }

    pub async fn handle_config(&self, peer_id: PeerId, payload: &[u8], diagnostics_enabled: bool) -> Option<fne_session::SessionResult<()>> {
        let mut peers = self.peers.write().await;
        peers.get_mut(&peer_id).map(|p| p.connection.handle_config(payload, diagnostics_enabled))
    }

    pub async fn record_ping(&self, peer_id: PeerId) -> bool {
        let mut peers = self.peers.write().await;
        match peers.get_mut(&peer_id) {
            Some(p) => {
                p.connection.record_ping();
                true
            }
            None => false,
        }
    }

    pub async fn state_of(&self, peer_id: PeerId) -> Option<fne_session::ConnectionState> {
        self.peers.read().await.get(&peer_id).map(|p| p.connection.state())
    }

    pub async fn salt_of(&self, peer_id: PeerId) -> Option<u32> {
        self.peers.read().await.get(&peer_id).map(|p| p.connection.salt())
    }

    /// Advances every peer's session timeout and affiliation/grant clocks,
    /// returning the ids of peers that timed out so the caller can tear down
    /// their sessions.
    pub async fn clock(&self, ms: u64) -> Vec<PeerId> {
        let mut timed_out = Vec::new();
        let mut peers = self.peers.write().await;
        for (peer_id, peer) in peers.iter_mut() {
            peer.connection.clock(ms);
            peer.affiliation.clock(ms);
            if peer.connection.has_timed_out() {
                timed_out.push(*peer_id);
            }
        }
        timed_out
    }
}
