use fne_codec::RtpHeader;
use fne_ids::{PeerId, StreamId};
use fne_router::RoutingInfo;

/// Pulls the fields `fne-router::RoutingInfo` needs out of a raw `PROTOCOL`
/// frame. Real implementations of this boundary decode the DMR/P25/NXDN
/// LC/CSBK/TSBK bit fields to recover `srcId`/`dstId`/slot/voice-header and
/// terminator flags; that decoding is out of scope here (see the fne-router
/// grounding note for why), so the only shipped implementation below returns
/// `None` for every frame. Swapping in a protocol-aware decoder means
/// providing a different `FrameDecoder`, nothing else in the traffic loop
/// changes.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, peer_id: PeerId, stream_id: StreamId, rtp: &RtpHeader, payload: &[u8]) -> Option<RoutingInfo>;
}

pub struct UnimplementedFrameDecoder;

impl FrameDecoder for UnimplementedFrameDecoder {
    fn decode(&self, _peer_id: PeerId, _stream_id: StreamId, _rtp: &RtpHeader, _payload: &[u8]) -> Option<RoutingInfo> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unimplemented_decoder_always_drops() {
        let decoder = UnimplementedFrameDecoder;
        let rtp = RtpHeader::new(1, 0, 42);
        assert!(decoder.decode(PeerId(1), StreamId(1), &rtp, b"anything").is_none());
    }
}
