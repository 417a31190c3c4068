use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use fne_acl::{IdListAcl, PeerList, TalkgroupRules};
use fne_codec::{FneFunction, FneHeader, MasterSubFunction, ProtocolSubFunction};
use fne_ids::{DstId, PeerId};
use fne_router::{ProtocolRouter, RouterError};
use fne_session::{ConnectionState, NakReason, PeerConnection, SessionError};
use fne_transport::{DecodedFrame, FneSocket, FrameQueue, PresharedKey};

use crate::activity::ActivitySink;
use crate::announce;
use crate::callbacks::PeerLifecycleCallbacks;
use crate::config::FneSettings;
use crate::decoder::FrameDecoder;
use crate::peer_table::PeerTable;

/// The three parallel per-protocol traffic handlers, one per LMR family.
/// `*_enabled` mirrors `FneSettings::protocols`: a disabled protocol still
/// gets a router instance (peers may still log in and idle), but its traffic
/// sub-function is never dispatched to it.
pub struct Routers {
    pub dmr: Arc<ProtocolRouter>,
    pub p25: Arc<ProtocolRouter>,
    pub nxdn: Arc<ProtocolRouter>,
    pub dmr_enabled: bool,
    pub p25_enabled: bool,
    pub nxdn_enabled: bool,
}

/// Maps an `INCALL_CTRL`/`PROTOCOL` sub-function byte to its protocol name,
/// independent of whether that protocol's router is enabled — in-call
/// control is signaling, not traffic, so it's dispatched even for a
/// protocol whose traffic routing is switched off.
fn proto_name_for_sub(sub: u8) -> Option<&'static str> {
    match sub {
        x if x == ProtocolSubFunction::Dmr as u8 => Some("dmr"),
        x if x == ProtocolSubFunction::P25 as u8 => Some("p25"),
        x if x == ProtocolSubFunction::Nxdn as u8 => Some("nxdn"),
        _ => None,
    }
}

impl Routers {
    fn pick(&self, sub: u8) -> Option<(&'static str, &Arc<ProtocolRouter>)> {
        match sub {
            x if x == ProtocolSubFunction::Dmr as u8 && self.dmr_enabled => Some(("dmr", &self.dmr)),
            x if x == ProtocolSubFunction::P25 as u8 && self.p25_enabled => Some(("p25", &self.p25)),
            x if x == ProtocolSubFunction::Nxdn as u8 && self.nxdn_enabled => Some(("nxdn", &self.nxdn)),
            _ => None,
        }
    }
}

/// Ties every component in the repo together into the running master
/// process: the login/auth/config state machine, the three traffic
/// routers, the affiliation/grant tables, and the lookup ACLs, all driven
/// off one inbound-datagram read loop plus an externally-ticked clock.
///
/// Mirrors `original_source`'s `FNENetwork` in responsibility (it owns the
/// connection map and dispatches by FNE function/sub-function) but the
/// per-datagram handling here runs serially in the read loop rather than on
/// a worker-thread pool: that trivially preserves the per-`(peerId,
/// streamId)` ordering guarantee from §5 without needing a per-stream
/// dispatch queue, at the cost of the parallelism the spec describes as
/// aspirational ("may execute in parallel"), not mandatory.
pub struct FneNetwork {
    settings: FneSettings,
    read_queue: FrameQueue,
    write_queue: Mutex<FrameQueue>,
    socket_addr: SocketAddr,
    peers: PeerTable,
    peer_list: Arc<PeerList>,
    peer_acl: Arc<IdListAcl>,
    rid_acl: Arc<IdListAcl>,
    talkgroup_rules: Arc<TalkgroupRules>,
    routers: Routers,
    decoder: Arc<dyn FrameDecoder>,
    metrics: Arc<fne_metrics::FneMetrics>,
    activity: Arc<dyn ActivitySink>,
    callbacks: Arc<dyn PeerLifecycleCallbacks>,
    start_epoch: Instant,
    master_seq: AtomicU32,
}

impl FneNetwork {
    #[allow(clippy::too_many_arguments)]
    pub async fn bind(
        settings: FneSettings,
        peer_list: Arc<PeerList>,
        peer_acl: Arc<IdListAcl>,
        rid_acl: Arc<IdListAcl>,
        talkgroup_rules: Arc<TalkgroupRules>,
        routers: Routers,
        decoder: Arc<dyn FrameDecoder>,
        metrics: Arc<fne_metrics::FneMetrics>,
        activity: Arc<dyn ActivitySink>,
        callbacks: Arc<dyn PeerLifecycleCallbacks>,
    ) -> anyhow::Result<Self> {
        let addr: SocketAddr = settings.listen.parse()?;
        let socket = Arc::new(FneSocket::bind(addr).await?);
        let socket_addr = socket.local_addr()?;
        let key = settings.preshared_key.as_deref().map(PresharedKey::from_password);

        // Two `FrameQueue` handles over the same underlying socket: the
        // read side never needs `&mut self` (`FrameQueue::read` takes `&self`)
        // so it stays lock-free; the write side is the only thing that needs
        // exclusive access, mirroring the single-producer/single-consumer
        // split per peer that §5 describes, collapsed here to one producer
        // per direction on the shared traffic socket.
        let read_queue = Self::make_queue(socket.clone(), key.clone());
        let write_queue = Mutex::new(Self::make_queue(socket, key));

        Ok(Self {
            settings,
            read_queue,
            write_queue,
            socket_addr,
            peers: PeerTable::new(),
            peer_list,
            peer_acl,
            rid_acl,
            talkgroup_rules,
            routers,
            decoder,
            metrics,
            activity,
            callbacks,
            start_epoch: Instant::now(),
            master_seq: AtomicU32::new(0),
        })
    }

    fn make_queue(socket: Arc<FneSocket>, key: Option<PresharedKey>) -> FrameQueue {
        match key {
            Some(key) => FrameQueue::with_key(socket, key),
            None => FrameQueue::new(socket),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket_addr
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    fn elapsed_ms(&self) -> u32 {
        self.start_epoch.elapsed().as_millis() as u32
    }

    /// Reads and dispatches datagrams until `shutdown` fires.
    pub async fn run(self: &Arc<Self>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("master network shutting down");
                    return;
                }
                frame = self.read_queue.read() => {
                    match frame {
                        Ok(Some(frame)) => self.handle_datagram(frame).await,
                        Ok(None) => {}
                        Err(e) => tracing::warn!(error = %e, "frame queue read error"),
                    }
                }
            }
        }
    }

    async fn handle_datagram(self: &Arc<Self>, frame: DecodedFrame) {
        let Some(function) = frame.fne.function() else {
            tracing::warn!(opcode = frame.fne.function, "dropping datagram with unknown opcode");
            return;
        };

        let result = match function {
            FneFunction::Rptl => self.handle_login(&frame).await,
            FneFunction::Rptk => self.handle_auth(&frame).await,
            FneFunction::Rptc => self.handle_config(&frame).await,
            FneFunction::RptPing => self.handle_ping(&frame).await,
            FneFunction::RptDisc => self.handle_disconnect(&frame).await,
            FneFunction::Protocol => self.handle_protocol(&frame).await,
            FneFunction::KeyRsp => {
                // `KEY_RSP` is master→peer only (§6); a peer is never the
                // sender. A peer that forwards one back is misbehaving.
                tracing::warn!(peer_id = %frame.fne.peer_id, "dropping master-direction-only KEY_RSP received from a peer");
                Ok(())
            }
            FneFunction::InCallCtrl => self.handle_incall_ctrl(&frame).await,
            other => {
                tracing::debug!(?other, "dropping opcode not handled on the master side");
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "error handling datagram");
        }
    }

    // -- login / auth / config --------------------------------------------

    async fn handle_login(self: &Arc<Self>, frame: &DecodedFrame) -> anyhow::Result<()> {
        let peer_id = frame.fne.peer_id;

        if !self.peer_list.is_permitted(peer_id) {
            tracing::warn!(%peer_id, "peer denied by peer list");
            self.metrics.nak_sent("peer_acl");
            self.send_nak(peer_id, frame.addr, NakReason::PeerAcl).await?;
            return Ok(());
        }

        if self.peers.contains(peer_id).await {
            // a relogin implicitly resets the prior session's state.
            self.peers.remove(peer_id).await;
        }

        let connection = PeerConnection::new(peer_id, frame.addr, self.settings.session_timeout_ms());
        let salt = connection.salt();
        self.peers.insert(peer_id, connection, &self.settings.channels).await;

        if let Some(affiliation) = self.peers.affiliation_of(peer_id).await {
            let callbacks = self.callbacks.clone();
            affiliation.set_release_callback(Box::new(move |channel, dst_id, reserved| {
                callbacks.release_grant(channel, dst_id, reserved);
            }));
        }

        tracing::info!(%peer_id, addr = %frame.addr, "peer login, issuing salt");
        self.send_ack(peer_id, frame.addr, &salt.to_be_bytes()).await
    }

    async fn handle_auth(self: &Arc<Self>, frame: &DecodedFrame) -> anyhow::Result<()> {
        let peer_id = frame.fne.peer_id;
        if frame.payload.len() < 32 {
            self.send_nak(peer_id, frame.addr, NakReason::IllegalPacket).await?;
            return Ok(());
        }

        let password = self.peer_list.password_override(peer_id).unwrap_or_else(|| self.settings.password.clone());
        let outcome = self.peers.handle_auth(peer_id, &password, &frame.payload[..32]).await;

        match outcome {
            Some(Ok(())) => self.send_ack(peer_id, frame.addr, &[]).await,
            Some(Err(SessionError::AuthFailed(_))) => {
                tracing::warn!(%peer_id, "authentication failed");
                self.metrics.auth_failed();
                self.metrics.nak_sent("fne_unauthorized");
                self.activity.record(&format!("peer={peer_id} auth failed"));
                self.peers.remove(peer_id).await;
                self.send_nak(peer_id, frame.addr, NakReason::FneUnauthorized).await
            }
            Some(Err(_)) => self.send_nak(peer_id, frame.addr, NakReason::BadConnState).await,
            None => self.send_nak(peer_id, frame.addr, NakReason::BadConnState).await,
        }
    }

    async fn handle_config(self: &Arc<Self>, frame: &DecodedFrame) -> anyhow::Result<()> {
        let peer_id = frame.fne.peer_id;
        let diagnostics_enabled = self.settings.diagnostics_listen.is_some();
        let outcome = self.peers.handle_config(peer_id, &frame.payload, diagnostics_enabled).await;

        match outcome {
            Some(Ok(())) => {
                self.metrics.peer_connected();
                self.activity.record(&format!("peer={peer_id} connected"));
                tracing::info!(%peer_id, "peer reached running state");
                self.callbacks.peer_connected(peer_id);

                let ack_byte0 = if diagnostics_enabled { 0x80u8 } else { 0x00 };
                self.send_ack(peer_id, frame.addr, &[ack_byte0]).await
            }
            Some(Err(SessionError::InvalidConfig { reason, .. })) => {
                tracing::warn!(%peer_id, reason, "rejecting invalid peer configuration");
                self.metrics.nak_sent("invalid_config_data");
                self.send_nak(peer_id, frame.addr, NakReason::InvalidConfigData).await
            }
            Some(Err(_)) => self.send_nak(peer_id, frame.addr, NakReason::BadConnState).await,
            None => self.send_nak(peer_id, frame.addr, NakReason::BadConnState).await,
        }
    }

    async fn handle_ping(self: &Arc<Self>, frame: &DecodedFrame) -> anyhow::Result<()> {
        let peer_id = frame.fne.peer_id;
        if !self.peers.record_ping(peer_id).await {
            return self.send_nak(peer_id, frame.addr, NakReason::BadConnState).await;
        }

        let server_clock = chrono::Utc::now().timestamp_millis() as u64;
        self.send_frame(FneFunction::Pong, 0, peer_id, fne_ids::StreamId::NONE, &server_clock.to_be_bytes(), frame.addr).await
    }

    async fn handle_disconnect(self: &Arc<Self>, frame: &DecodedFrame) -> anyhow::Result<()> {
        let peer_id = frame.fne.peer_id;
        if self.peers.remove(peer_id).await.is_some() {
            tracing::info!(%peer_id, "peer disconnected");
            self.metrics.peer_disconnected("peer_disc");
            self.activity.record(&format!("peer={peer_id} disconnected"));
            self.callbacks.peer_disconnected(peer_id);
        }
        Ok(())
    }

    /// Encodes `kmm` and pushes it to `peer_id` over `KEY_RSP` (§6: master→peer
    /// only). This is the master's actual responsibility for this opcode —
    /// pushing a key out, not decoding one back from a peer.
    pub async fn send_key_response(&self, peer_id: PeerId, kmm: &mut fne_codec::kmm::KmmFrame) -> anyhow::Result<()> {
        let Some(addr) = self.peers.address_of(peer_id).await else {
            anyhow::bail!("send_key_response: peer {peer_id} not connected");
        };

        let payload = kmm.encode();
        self.send_frame(FneFunction::KeyRsp, 0, peer_id, fne_ids::StreamId::NONE, &payload, addr).await?;
        self.metrics.kmm_exchange("outbound");
        self.callbacks.key_response(peer_id, kmm);
        Ok(())
    }

    async fn handle_incall_ctrl(&self, frame: &DecodedFrame) -> anyhow::Result<()> {
        let Some(proto_name) = proto_name_for_sub(frame.fne.sub_function) else {
            tracing::debug!(sub_function = frame.fne.sub_function, "in-call control for unknown protocol sub-function");
            return Ok(());
        };
        if frame.payload.len() < 4 {
            return Ok(());
        }

        let command = frame.payload[0];
        let dst_id = DstId(u32::from_be_bytes([0, frame.payload[1], frame.payload[2], frame.payload[3]]));
        self.callbacks.in_call_ctrl(proto_name, command, dst_id);
        Ok(())
    }

    // -- traffic routing ----------------------------------------------------

    async fn handle_protocol(self: &Arc<Self>, frame: &DecodedFrame) -> anyhow::Result<()> {
        let peer_id = frame.fne.peer_id;

        if self.peers.state_of(peer_id).await != Some(ConnectionState::Running) {
            self.metrics.nak_sent("bad_conn_state");
            self.send_nak(peer_id, frame.addr, NakReason::BadConnState).await?;
            return Ok(());
        }

        let Some((proto_name, router)) = self.routers.pick(frame.fne.sub_function) else {
            tracing::warn!(sub_function = frame.fne.sub_function, "unknown protocol sub-function");
            return Ok(());
        };

        let Some(info) = self.decoder.decode(peer_id, frame.fne.stream_id, &frame.rtp, &frame.payload) else {
            self.metrics.frame_dropped(proto_name, "undecodable");
            return Ok(());
        };

        let peers_snapshot = self.peers.fanout_snapshot(info.dst_id).await;
        match router.process_frame(info, &peers_snapshot) {
            Ok(outcome) => {
                self.metrics.frame_routed(proto_name, outcome.forward.len());
                self.forward_outbound(proto_name, frame.fne.sub_function, peer_id, frame.fne.stream_id, outcome.forward).await;
            }
            Err(e) => {
                let reason = match &e {
                    RouterError::StreamContention(_) => "stream_contention",
                    RouterError::PeerNotPermitted => "peer_not_permitted",
                    RouterError::RadioIdNotPermitted => "radio_id_not_permitted",
                    RouterError::TalkgroupNotActive(_) => "talkgroup_not_active",
                };
                self.metrics.frame_dropped(proto_name, reason);
            }
        }

        Ok(())
    }

    async fn forward_outbound(
        &self,
        _proto_name: &str,
        sub_function: u8,
        origin_peer: PeerId,
        stream_id: fne_ids::StreamId,
        forward: Vec<fne_router::OutboundFrame>,
    ) {
        if forward.is_empty() {
            return;
        }

        let mut queue = self.write_queue.lock().await;
        for out in forward {
            let Some(addr) = self.peers.address_of(out.peer_id).await else {
                continue;
            };
            let fne = FneHeader::new(FneFunction::Protocol, sub_function, origin_peer, stream_id);
            if let Err(e) = queue.enqueue(out.sequence, self.elapsed_ms(), origin_peer.0, fne, &out.payload, addr) {
                tracing::warn!(error = %e, peer_id = %out.peer_id, "failed to enqueue outbound frame");
            }
        }

        if let Err(e) = queue.flush().await {
            tracing::warn!(error = %e, "failed to flush outbound traffic frames");
        }
    }

    // -- clock-driven maintenance --------------------------------------------

    /// Advances every timer this network owns by `ms` milliseconds: peer
    /// session timeouts, per-peer affiliation/grant tables, and each
    /// router's call-activity/parrot clocks. Call on a fixed tick from the
    /// owning task.
    pub async fn clock(self: &Arc<Self>, ms: u64) {
        for peer_id in self.peers.clock(ms).await {
            tracing::info!(%peer_id, "peer session timed out");
            self.metrics.peer_disconnected("timeout");
            self.activity.record(&format!("peer={peer_id} timed out"));
            self.peers.remove(peer_id).await;
            self.callbacks.peer_disconnected(peer_id);
        }

        for (proto_name, sub, router) in [
            ("dmr", ProtocolSubFunction::Dmr as u8, &self.routers.dmr),
            ("p25", ProtocolSubFunction::P25 as u8, &self.routers.p25),
            ("nxdn", ProtocolSubFunction::Nxdn as u8, &self.routers.nxdn),
        ] {
            let outcome = router.clock(ms);
            for dst_id in outcome.timed_out_destinations {
                tracing::debug!(router = proto_name, %dst_id, "call activity timeout, ending call");
            }
            for (dst_id, parrot_frame, sequence) in outcome.parrot_replays {
                self.replay_parrot_frame(proto_name, sub, dst_id, parrot_frame, sequence).await;
            }
        }
    }

    async fn replay_parrot_frame(&self, proto_name: &'static str, sub_function: u8, dst_id: DstId, frame: fne_router::ParrotFrame, sequence: u16) {
        let running_peers = self.peers.running_peer_ids().await;
        if running_peers.is_empty() {
            return;
        }

        let mut queue = self.write_queue.lock().await;
        let stream_id = fne_ids::StreamId(dst_id.0.max(1));
        for peer_id in running_peers {
            let Some(addr) = self.peers.address_of(peer_id).await else { continue };
            let fne = FneHeader::new(FneFunction::Protocol, sub_function, frame.src_peer, stream_id);
            if let Err(e) = queue.enqueue(sequence, self.elapsed_ms(), frame.src_peer.0, fne, &frame.payload, addr) {
                tracing::warn!(error = %e, %peer_id, "failed to enqueue parrot replay frame");
            }
        }
        if let Err(e) = queue.flush().await {
            tracing::warn!(error = %e, "failed to flush parrot replay");
        }
        self.metrics.parrot_replayed(proto_name);
    }

    /// Re-reads the peer/RID/talkgroup lookup files if their modification
    /// time changed, and broadcasts `MASTER` announcements to every running
    /// peer so their local caches track the reloaded tables.
    pub async fn reload_lookups_and_announce(self: &Arc<Self>) {
        let peer_list_reloaded = self.peer_list.reload_if_changed().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "peer list reload failed");
            false
        });
        let peer_acl_reloaded = self.peer_acl.reload_if_changed().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "peer acl reload failed");
            false
        });
        let rid_acl_reloaded = self.rid_acl.reload_if_changed().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "radio id acl reload failed");
            false
        });
        let rules_reloaded = self.talkgroup_rules.reload_if_changed().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "talkgroup rules reload failed");
            false
        });

        if peer_list_reloaded || peer_acl_reloaded {
            // peer-list membership doesn't have a wire announcement in §6;
            // only the radio id and talkgroup lists do.
        }

        if rid_acl_reloaded {
            self.broadcast_master(MasterSubFunction::WhitelistRid as u8, announce::encode_rid_list(&announce::rid_ids(&self.rid_acl))).await;
        }

        if rules_reloaded {
            self.broadcast_master(MasterSubFunction::ActiveTgs as u8, announce::encode_tg_list(&announce::active_tgs(&self.talkgroup_rules))).await;
            self.broadcast_master(MasterSubFunction::DeactiveTgs as u8, announce::encode_tg_list(&announce::deactive_tgs(&self.talkgroup_rules))).await;
        }
    }

    async fn broadcast_master(&self, sub_function: u8, payload: Vec<u8>) {
        let running_peers = self.peers.running_peer_ids().await;
        if running_peers.is_empty() {
            return;
        }

        let mut queue = self.write_queue.lock().await;
        for peer_id in running_peers {
            let Some(addr) = self.peers.address_of(peer_id).await else { continue };
            let seq = self.master_seq.fetch_add(1, Ordering::Relaxed) as u16;
            let fne = FneHeader::new(FneFunction::Master, sub_function, PeerId(0), fne_ids::StreamId::NONE);
            if let Err(e) = queue.enqueue(seq, self.elapsed_ms(), 0, fne, &payload, addr) {
                tracing::warn!(error = %e, %peer_id, "failed to enqueue master announcement");
            }
        }
        if let Err(e) = queue.flush().await {
            tracing::warn!(error = %e, "failed to flush master announcement");
        }
    }

    // -- datagram send helpers ------------------------------------------------

    async fn send_ack(&self, target_peer: PeerId, addr: SocketAddr, payload: &[u8]) -> anyhow::Result<()> {
        self.send_frame(FneFunction::Ack, 0, target_peer, fne_ids::StreamId::NONE, payload, addr).await
    }

    async fn send_nak(&self, target_peer: PeerId, addr: SocketAddr, reason: NakReason) -> anyhow::Result<()> {
        self.metrics.nak_sent(nak_reason_label(reason));
        self.send_frame(FneFunction::Nak, 0, target_peer, fne_ids::StreamId::NONE, &(reason as u16).to_be_bytes(), addr).await
    }

    async fn send_frame(
        &self,
        function: FneFunction,
        sub_function: u8,
        peer_id: PeerId,
        stream_id: fne_ids::StreamId,
        payload: &[u8],
        addr: SocketAddr,
    ) -> anyhow::Result<()> {
        let mut queue = self.write_queue.lock().await;
        let fne = FneHeader::new(function, sub_function, peer_id, stream_id);
        queue.enqueue(0, self.elapsed_ms(), peer_id.0, fne, payload, addr)?;
        queue.flush().await?;
        Ok(())
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.settings.diagnostics_listen.is_some()
    }
}

fn nak_reason_label(reason: NakReason) -> &'static str {
    match reason {
        NakReason::ModeNotEnabled => "mode_not_enabled",
        NakReason::IllegalPacket => "illegal_packet",
        NakReason::FneUnauthorized => "fne_unauthorized",
        NakReason::BadConnState => "bad_conn_state",
        NakReason::InvalidConfigData => "invalid_config_data",
        NakReason::FneMaxConn => "fne_max_conn",
        NakReason::PeerReset => "peer_reset",
        NakReason::PeerAcl => "peer_acl",
        NakReason::GeneralFailure => "general_failure",
    }
}
