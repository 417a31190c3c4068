use fne_ids::{DstId, PeerId, RadioId, StreamId};

/// Routing-relevant fields already extracted from an inbound DMR/P25/NXDN
/// frame. Full protocol-specific decoding (LC/CSBK/TSBK bit unpacking) lives
/// upstream of this crate; the router only ever needs the handful of fields
/// below to make an admission/ACL/fan-out decision.
#[derive(Clone, Debug)]
pub struct RoutingInfo {
    pub peer_id: PeerId,
    pub src_id: RadioId,
    pub dst_id: DstId,
    pub stream_id: StreamId,
    pub pkt_seq: u16,
    /// DMR timeslot; always `0` for P25/NXDN.
    pub slot: u8,
    pub is_voice_header: bool,
    pub is_terminator: bool,
    pub from_peer: bool,
    pub payload: Vec<u8>,
}

/// Bit 7 of payload byte 15 carries the active DMR timeslot on the wire.
pub const DMR_SLOT_BYTE_OFFSET: usize = 15;
pub const DMR_SLOT_BIT: u8 = 0x80;

/// Sets or clears the DMR slot marker bit in place, per the rewrite rule in
/// §4.5: slot 2 sets the bit, slot 1 clears it.
pub fn rewrite_dmr_slot(payload: &mut [u8], slot: u8) {
    if payload.len() <= DMR_SLOT_BYTE_OFFSET {
        return;
    }
    if slot == 2 {
        payload[DMR_SLOT_BYTE_OFFSET] |= DMR_SLOT_BIT;
    } else {
        payload[DMR_SLOT_BYTE_OFFSET] &= !DMR_SLOT_BIT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_sets_and_clears_slot_bit() {
        let mut payload = vec![0u8; 20];
        rewrite_dmr_slot(&mut payload, 2);
        assert_eq!(payload[DMR_SLOT_BYTE_OFFSET] & DMR_SLOT_BIT, DMR_SLOT_BIT);
        rewrite_dmr_slot(&mut payload, 1);
        assert_eq!(payload[DMR_SLOT_BYTE_OFFSET] & DMR_SLOT_BIT, 0);
    }

    #[test]
    fn rewrite_is_a_noop_on_short_payload() {
        let mut payload = vec![0u8; 4];
        rewrite_dmr_slot(&mut payload, 2);
        assert_eq!(payload, vec![0u8; 4]);
    }
}
