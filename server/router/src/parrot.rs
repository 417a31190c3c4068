use std::collections::VecDeque;

use fne_ids::{DstId, PeerId};

use crate::routing_info::RoutingInfo;

/// One buffered frame awaiting parrot playback.
#[derive(Clone, Debug)]
pub struct ParrotFrame {
    pub dst_id: DstId,
    pub src_peer: PeerId,
    pub payload: Vec<u8>,
    pub is_voice_header: bool,
    pub is_terminator: bool,
}

impl ParrotFrame {
    fn from_routing_info(info: &RoutingInfo) -> Self {
        Self {
            dst_id: info.dst_id,
            src_peer: info.peer_id,
            payload: info.payload.clone(),
            is_voice_header: info.is_voice_header,
            is_terminator: info.is_terminator,
        }
    }
}

/// Buffers a call's frames while it's active and replays them after
/// `parrot_delay_ms` once the call ends. `clock` drives both the post-call
/// delay and in-playback frame spacing so the whole thing runs off the same
/// external tick the rest of the router uses.
pub struct ParrotBuffer {
    frames: VecDeque<ParrotFrame>,
    recording: bool,
    delay_ms: u64,
    frame_spacing_ms: u64,
    delay_elapsed_ms: u64,
    playback_ready: bool,
    playing: bool,
    playback_elapsed_ms: u64,
}

impl ParrotBuffer {
    pub fn new(delay_ms: u64, frame_spacing_ms: u64) -> Self {
        Self {
            frames: VecDeque::new(),
            recording: false,
            delay_ms,
            frame_spacing_ms,
            delay_elapsed_ms: 0,
            playback_ready: false,
            playing: false,
            playback_elapsed_ms: 0,
        }
    }

    pub fn record(&mut self, info: &RoutingInfo) {
        self.recording = true;
        self.frames.push_back(ParrotFrame::from_routing_info(info));
    }

    /// Stops recording and starts the post-call delay countdown before
    /// playback becomes eligible.
    pub fn end_call(&mut self) {
        if self.recording && !self.frames.is_empty() {
            self.delay_elapsed_ms = 0;
        }
        self.recording = false;
    }

    pub fn has_frames_ready(&self) -> bool {
        self.playback_ready && !self.frames.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Advances the delay and in-playback frame-spacing clocks. Call this
    /// once per router tick with the elapsed milliseconds.
    pub fn clock(&mut self, ms: u64) {
        if !self.recording && !self.playback_ready && !self.frames.is_empty() {
            self.delay_elapsed_ms += ms;
            if self.delay_elapsed_ms >= self.delay_ms {
                self.playback_ready = true;
            }
        }

        if self.playing {
            self.playback_elapsed_ms += ms;
        }
    }

    /// Pops the next frame due for replay, or `None` if playback hasn't
    /// started or the next frame's spacing interval hasn't elapsed yet.
    pub fn next_playback_frame(&mut self) -> Option<ParrotFrame> {
        if !self.playback_ready || self.frames.is_empty() {
            return None;
        }

        if !self.playing {
            self.playing = true;
            self.playback_elapsed_ms = 0;
        } else if self.playback_elapsed_ms < self.frame_spacing_ms {
            return None;
        }

        self.playback_elapsed_ms = 0;
        let frame = self.frames.pop_front();

        if self.frames.is_empty() {
            self.playing = false;
            self.playback_ready = false;
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fne_ids::StreamId;

    fn info(dst: u32, payload: &[u8]) -> RoutingInfo {
        RoutingInfo {
            peer_id: PeerId(1),
            src_id: fne_ids::RadioId(100),
            dst_id: DstId(dst),
            stream_id: StreamId(1),
            pkt_seq: 0,
            slot: 0,
            is_voice_header: false,
            is_terminator: false,
            from_peer: true,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn playback_waits_for_the_configured_delay() {
        let mut buf = ParrotBuffer::new(1000, 20);
        buf.record(&info(100, b"a"));
        buf.end_call();

        buf.clock(999);
        assert!(!buf.has_frames_ready());
        buf.clock(1);
        assert!(buf.has_frames_ready());
    }

    #[test]
    fn playback_replays_frames_in_order_with_spacing() {
        let mut buf = ParrotBuffer::new(0, 20);
        buf.record(&info(100, b"a"));
        buf.record(&info(100, b"b"));
        buf.end_call();
        buf.clock(0);

        let first = buf.next_playback_frame().unwrap();
        assert_eq!(first.payload, b"a");
        assert!(buf.next_playback_frame().is_none());

        buf.clock(20);
        let second = buf.next_playback_frame().unwrap();
        assert_eq!(second.payload, b"b");
        assert!(!buf.is_playing());
    }
}
