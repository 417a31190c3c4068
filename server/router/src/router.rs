use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fne_acl::{IdListAcl, TalkgroupRules};
use fne_codec::rtp::{next_seq, RTP_END_OF_CALL_SEQ};
use fne_ids::{DstId, PeerId};

use crate::error::{RouterError, RouterResult};
use crate::fanout::PeerFanoutInfo;
use crate::parrot::{ParrotBuffer, ParrotFrame};
use crate::routing_info::{rewrite_dmr_slot, RoutingInfo};
use crate::rx_status::RxStatusTable;

/// One frame queued for delivery to a specific peer, with any per-peer
/// route-rewrite already applied.
#[derive(Clone, Debug)]
pub struct OutboundFrame {
    pub peer_id: PeerId,
    pub dst_id: DstId,
    pub slot: u8,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct RouteOutcome {
    pub forward: Vec<OutboundFrame>,
    pub end_of_call: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ClockOutcome {
    pub timed_out_destinations: Vec<DstId>,
    pub parrot_replays: Vec<(DstId, ParrotFrame, u16)>,
}

struct Inner {
    rx: RxStatusTable,
    out_seq: HashMap<DstId, u16>,
    parrots: HashMap<DstId, ParrotBuffer>,
}

/// The per-protocol traffic handler: admission, ACL, rewrite, fan-out,
/// sequence accounting and parrot playback for one of DMR/P25/NXDN. Each
/// protocol gets its own instance and its own talkgroup rules/ACL handles,
/// even though the instances share this crate's implementation.
pub struct ProtocolRouter {
    name: &'static str,
    rules: Arc<TalkgroupRules>,
    peer_acl: Arc<IdListAcl>,
    rid_acl: Arc<IdListAcl>,
    parrot_delay_ms: u64,
    parrot_frame_spacing_ms: u64,
    inner: Mutex<Inner>,
}

impl ProtocolRouter {
    pub fn new(
        name: &'static str,
        rules: Arc<TalkgroupRules>,
        peer_acl: Arc<IdListAcl>,
        rid_acl: Arc<IdListAcl>,
        call_activity_timeout_ms: u64,
        parrot_delay_ms: u64,
        parrot_frame_spacing_ms: u64,
    ) -> Self {
        Self {
            name,
            rules,
            peer_acl,
            rid_acl,
            parrot_delay_ms,
            parrot_frame_spacing_ms,
            inner: Mutex::new(Inner {
                rx: RxStatusTable::new(call_activity_timeout_ms),
                out_seq: HashMap::new(),
                parrots: HashMap::new(),
            }),
        }
    }

    fn next_sequence_locked(inner: &mut Inner, dst_id: DstId) -> u16 {
        let seq = inner.out_seq.entry(dst_id).or_insert(0);
        *seq = next_seq(*seq);
        *seq
    }

    /// Processes one inbound frame, returning the set of outbound frames to
    /// enqueue on the caller's socket/frame-queue.
    pub fn process_frame(&self, info: RoutingInfo, peers: &[PeerFanoutInfo]) -> RouterResult<RouteOutcome> {
        if !self.peer_acl.is_allowed(info.peer_id.0) {
            tracing::warn!(router = self.name, peer_id = %info.peer_id, "peer denied by ACL");
            return Err(RouterError::PeerNotPermitted);
        }
        if !self.rid_acl.is_allowed(info.src_id.0) {
            tracing::warn!(router = self.name, src_id = %info.src_id, "radio id denied by ACL");
            return Err(RouterError::RadioIdNotPermitted);
        }

        let rule = self.rules.find(info.dst_id.0, info.slot);
        let Some(rule) = rule.filter(|r| r.config.active) else {
            tracing::debug!(router = self.name, dst_id = %info.dst_id, "talkgroup not active");
            return Err(RouterError::TalkgroupNotActive(info.dst_id));
        };

        if !rule.permits_rid(info.src_id.0) {
            tracing::warn!(router = self.name, src_id = %info.src_id, dst_id = %info.dst_id, "radio id not permitted on talkgroup");
            return Err(RouterError::RadioIdNotPermitted);
        }

        let mut inner = self.inner.lock().unwrap();

        if !inner.rx.admit(info.dst_id, info.src_id, info.stream_id) {
            tracing::warn!(router = self.name, dst_id = %info.dst_id, "stream contention");
            return Err(RouterError::StreamContention(info.dst_id));
        }

        if rule.config.parrot {
            inner
                .parrots
                .entry(info.dst_id)
                .or_insert_with(|| ParrotBuffer::new(self.parrot_delay_ms, self.parrot_frame_spacing_ms))
                .record(&info);
        }

        let end_of_call = info.is_terminator || info.pkt_seq == RTP_END_OF_CALL_SEQ;
        if end_of_call {
            inner.rx.clear(info.dst_id);
            if let Some(parrot) = inner.parrots.get_mut(&info.dst_id) {
                parrot.end_call();
            }
        }

        let mut forward = Vec::new();
        for peer in peers {
            if !peer.running {
                continue;
            }
            if peer.peer_id == info.peer_id && !rule.config.parrot {
                continue;
            }
            if !rule.peer_is_eligible(peer.peer_id) {
                continue;
            }
            if rule.config.affiliated
                && !peer.is_affiliated_to(info.dst_id)
                && !rule.always_send.contains(&peer.peer_id.0)
            {
                continue;
            }

            let mut dst_id = info.dst_id;
            let mut slot = info.slot;
            if let Some(rewrite) = rule.rewrite_for(peer.peer_id) {
                if rewrite.from_tgid == info.dst_id.0 && rewrite.from_slot == info.slot {
                    dst_id = DstId(rewrite.to_tgid);
                    slot = rewrite.to_slot;
                }
            }

            let mut payload = info.payload.clone();
            if slot != info.slot {
                rewrite_dmr_slot(&mut payload, slot);
            }

            let sequence = if end_of_call { RTP_END_OF_CALL_SEQ } else { Self::next_sequence_locked(&mut inner, dst_id) };
            forward.push(OutboundFrame { peer_id: peer.peer_id, dst_id, slot, sequence, payload });
        }

        Ok(RouteOutcome { forward, end_of_call })
    }

    /// Advances the call-activity and parrot-playback clocks by `ms`.
    pub fn clock(&self, ms: u64) -> ClockOutcome {
        let mut inner = self.inner.lock().unwrap();

        let timed_out = inner.rx.clock(ms);
        for dst_id in &timed_out {
            if let Some(parrot) = inner.parrots.get_mut(dst_id) {
                parrot.end_call();
            }
        }

        let mut parrot_replays = Vec::new();
        for (dst_id, parrot) in inner.parrots.iter_mut() {
            parrot.clock(ms);
            if let Some(frame) = parrot.next_playback_frame() {
                let seq = inner.out_seq.entry(*dst_id).or_insert(0);
                *seq = next_seq(*seq);
                parrot_replays.push((*dst_id, frame, *seq));
            }
        }
        inner.parrots.retain(|_, p| p.is_playing() || p.has_frames_ready());

        ClockOutcome { timed_out_destinations: timed_out, parrot_replays }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fne_acl::{ListMode, RuleConfig, TalkgroupRule, TalkgroupSource};
    use fne_ids::{RadioId, StreamId};

    fn test_router(rule: TalkgroupRule) -> ProtocolRouter {
        let rules = Arc::new(TalkgroupRules::new("/nonexistent/rules.yml"));
        rules.upsert(rule);
        let peer_acl = Arc::new(IdListAcl::new("/nonexistent/peers.acl", ListMode::Blacklist, false));
        let rid_acl = Arc::new(IdListAcl::new("/nonexistent/rids.acl", ListMode::Blacklist, false));
        ProtocolRouter::new("test", rules, peer_acl, rid_acl, 2000, 1000, 20)
    }

    fn basic_rule(dst: u32) -> TalkgroupRule {
        TalkgroupRule {
            source: TalkgroupSource { tgid: dst, slot: 0 },
            config: RuleConfig { active: true, ..Default::default() },
            ..Default::default()
        }
    }

    fn info(peer: u32, src: u32, dst: u32, stream: u32) -> RoutingInfo {
        RoutingInfo {
            peer_id: PeerId(peer),
            src_id: RadioId(src),
            dst_id: DstId(dst),
            stream_id: StreamId(stream),
            pkt_seq: 1,
            slot: 0,
            is_voice_header: true,
            is_terminator: false,
            from_peer: true,
            payload: vec![1, 2, 3],
        }
    }

    #[test]
    fn rejects_traffic_for_inactive_talkgroup() {
        let router = test_router(TalkgroupRule {
            source: TalkgroupSource { tgid: 100, slot: 0 },
            config: RuleConfig { active: false, ..Default::default() },
            ..Default::default()
        });
        let peers = [PeerFanoutInfo { peer_id: PeerId(2), running: true, affiliated_to: None }];
        let err = router.process_frame(info(1, 1001, 100, 7), &peers).unwrap_err();
        assert!(matches!(err, RouterError::TalkgroupNotActive(_)));
    }

    #[test]
    fn fans_out_to_eligible_peers_excluding_origin() {
        let router = test_router(basic_rule(100));
        let peers = [
            PeerFanoutInfo { peer_id: PeerId(1), running: true, affiliated_to: None },
            PeerFanoutInfo { peer_id: PeerId(2), running: true, affiliated_to: None },
            PeerFanoutInfo { peer_id: PeerId(3), running: false, affiliated_to: None },
        ];
        let outcome = router.process_frame(info(1, 1001, 100, 7), &peers).unwrap();
        let ids: Vec<u32> = outcome.forward.iter().map(|f| f.peer_id.0).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn second_stream_to_same_destination_is_rejected() {
        let router = test_router(basic_rule(100));
        let peers = [PeerFanoutInfo { peer_id: PeerId(2), running: true, affiliated_to: None }];
        router.process_frame(info(1, 1001, 100, 7), &peers).unwrap();
        let err = router.process_frame(info(1, 1002, 100, 8), &peers).unwrap_err();
        assert!(matches!(err, RouterError::StreamContention(_)));
    }

    #[test]
    fn affiliated_rule_requires_affiliation_or_always_send() {
        let mut rule = basic_rule(100);
        rule.config.affiliated = true;
        rule.always_send = vec![3];
        let router = test_router(rule);
        let peers = [
            PeerFanoutInfo { peer_id: PeerId(2), running: true, affiliated_to: None },
            PeerFanoutInfo { peer_id: PeerId(3), running: true, affiliated_to: None },
            PeerFanoutInfo { peer_id: PeerId(4), running: true, affiliated_to: Some(DstId(100)) },
        ];
        let outcome = router.process_frame(info(1, 1001, 100, 7), &peers).unwrap();
        let ids: Vec<u32> = outcome.forward.iter().map(|f| f.peer_id.0).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn per_peer_rewrite_changes_destination_and_slot() {
        let mut rule = basic_rule(100);
        rule.source.slot = 1;
        rule.rewrites = vec![fne_acl::RouteRewrite { peer_id: 2, from_tgid: 100, from_slot: 1, to_tgid: 200, to_slot: 2 }];
        let router = test_router(rule);
        let peers = [PeerFanoutInfo { peer_id: PeerId(2), running: true, affiliated_to: None }];
        let mut frame = info(1, 1001, 100, 7);
        frame.slot = 1;
        let outcome = router.process_frame(frame, &peers).unwrap();
        assert_eq!(outcome.forward[0].dst_id, DstId(200));
        assert_eq!(outcome.forward[0].slot, 2);
    }

    #[test]
    fn terminator_ends_the_call_and_allows_a_new_stream() {
        let router = test_router(basic_rule(100));
        let peers = [PeerFanoutInfo { peer_id: PeerId(2), running: true, affiliated_to: None }];

        let mut first = info(1, 1001, 100, 7);
        first.is_terminator = true;
        let outcome = router.process_frame(first, &peers).unwrap();
        assert!(outcome.end_of_call);

        let second = info(1, 1002, 100, 8);
        assert!(router.process_frame(second, &peers).is_ok());
    }

    #[test]
    fn clock_times_out_a_silent_call() {
        let router = test_router(basic_rule(100));
        let peers = [PeerFanoutInfo { peer_id: PeerId(2), running: true, affiliated_to: None }];
        router.process_frame(info(1, 1001, 100, 7), &peers).unwrap();

        let outcome = router.clock(2000);
        assert_eq!(outcome.timed_out_destinations, vec![DstId(100)]);
    }
}
