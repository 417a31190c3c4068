use std::net::SocketAddr;
use std::sync::Arc;

use fne_codec::{FneHeader, RtpHeader, FNE_HEADER_LENGTH, RTP_HEADER_LENGTH};

use crate::crypto::PresharedKey;
use crate::error::TransportResult;
use crate::socket::FneSocket;

struct OutboundDatagram {
    data: Vec<u8>,
    addr: SocketAddr,
}

/// Buffers outbound datagrams for a batched flush, mirroring the teacher's
/// enqueue-then-flush write path rather than sending one packet per call.
pub struct RawFrameQueue {
    socket: Arc<FneSocket>,
    buffered: Vec<OutboundDatagram>,
}

impl RawFrameQueue {
    pub fn new(socket: Arc<FneSocket>) -> Self {
        Self { socket, buffered: Vec::new() }
    }

    pub fn enqueue(&mut self, data: Vec<u8>, addr: SocketAddr) {
        self.buffered.push(OutboundDatagram { data, addr });
    }

    pub fn pending(&self) -> usize {
        self.buffered.len()
    }

    /// Writes every buffered datagram and clears the queue. Stops and
    /// reports the first failure rather than silently dropping datagrams
    /// after it, leaving the queue drained regardless so one bad peer
    /// doesn't wedge the whole batch on the next flush.
    pub async fn flush(&mut self) -> TransportResult<()> {
        let mut first_err = None;
        for dgram in self.buffered.drain(..) {
            if let Err(e) = self.socket.send_to(&dgram.data, dgram.addr).await {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A frame read off the wire with its RTP and FNE headers already parsed out.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub rtp: RtpHeader,
    pub fne: FneHeader,
    pub payload: Vec<u8>,
    pub addr: SocketAddr,
}

/// Reads and writes the composite RTP + FNE header framing used on the
/// radio-traffic socket. Writes are buffered through a `RawFrameQueue` and
/// must be explicitly flushed. When a preshared key is configured, every
/// datagram is AES key-wrapped on send and unwrapped on receipt; a datagram
/// that fails to unwrap is logged and dropped rather than propagated, so one
/// bad peer doesn't stall the read loop.
pub struct FrameQueue {
    socket: Arc<FneSocket>,
    raw: RawFrameQueue,
    key: Option<PresharedKey>,
}

const COMPOSITE_HEADER_LENGTH: usize = RTP_HEADER_LENGTH + FNE_HEADER_LENGTH;

impl FrameQueue {
    pub fn new(socket: Arc<FneSocket>) -> Self {
        let raw = RawFrameQueue::new(socket.clone());
        Self { socket, raw, key: None }
    }

    pub fn with_key(socket: Arc<FneSocket>, key: PresharedKey) -> Self {
        let raw = RawFrameQueue::new(socket.clone());
        Self { socket, raw, key: Some(key) }
    }

    /// Reads and decodes one datagram. If a preshared key is configured and
    /// the datagram fails to unwrap, returns `Ok(None)` so the caller can
    /// keep reading instead of tearing down the loop on one bad packet.
    pub async fn read(&self) -> TransportResult<Option<DecodedFrame>> {
        let (data, addr) = self.socket.recv().await?;
        let data = match &self.key {
            Some(key) => match key.unwrap(&data) {
                Ok(plain) => plain,
                Err(e) => {
                    tracing::warn!(%addr, error = %e, "dropping frame that failed to decrypt");
                    return Ok(None);
                }
            },
            None => data,
        };

        let rtp = RtpHeader::decode(&data)?;
        let fne = FneHeader::decode(&data[RTP_HEADER_LENGTH..])?;
        let payload = data[COMPOSITE_HEADER_LENGTH..].to_vec();
        Ok(Some(DecodedFrame { rtp, fne, payload, addr }))
    }

    pub fn enqueue(&mut self, sequence: u16, timestamp: u32, ssrc: u32, fne: FneHeader, payload: &[u8], addr: SocketAddr) -> TransportResult<()> {
        let mut buf = vec![0u8; COMPOSITE_HEADER_LENGTH + payload.len()];
        RtpHeader::new(sequence, timestamp, ssrc).encode(&mut buf[..RTP_HEADER_LENGTH]);
        fne.encode(&mut buf[RTP_HEADER_LENGTH..COMPOSITE_HEADER_LENGTH]);
        buf[COMPOSITE_HEADER_LENGTH..].copy_from_slice(payload);

        let buf = match &self.key {
            Some(key) => key.wrap(&buf)?,
            None => buf,
        };
        self.raw.enqueue(buf, addr);
        Ok(())
    }

    pub async fn flush(&mut self) -> TransportResult<()> {
        self.raw.flush().await
    }

    pub fn pending(&self) -> usize {
        self.raw.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fne_codec::FneFunction;
    use fne_ids::{PeerId, StreamId};

    #[tokio::test]
    async fn round_trips_a_framed_datagram() {
        let server = Arc::new(FneSocket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap());
        let client = Arc::new(FneSocket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap());
        let server_addr = server.local_addr().unwrap();

        let mut out_queue = FrameQueue::new(client.clone());
        let fne = FneHeader::new(FneFunction::Protocol, 1, PeerId(42), StreamId(7));
        out_queue.enqueue(1, 0, 42, fne, b"payload", server_addr).unwrap();
        out_queue.flush().await.unwrap();

        let in_queue = FrameQueue::new(server);
        let decoded = in_queue.read().await.unwrap().unwrap();
        assert_eq!(decoded.payload, b"payload");
        assert_eq!(decoded.fne.peer_id, PeerId(42));
        assert_eq!(decoded.rtp.sequence, 1);
    }

    #[tokio::test]
    async fn encrypted_queues_round_trip_and_reject_mismatched_keys() {
        let server = Arc::new(FneSocket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap());
        let client = Arc::new(FneSocket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap());
        let server_addr = server.local_addr().unwrap();
        let fne = FneHeader::new(FneFunction::Protocol, 1, PeerId(42), StreamId(7));

        let mut good_sender = FrameQueue::with_key(client.clone(), PresharedKey::from_password("hunter2"));
        good_sender.enqueue(1, 0, 42, fne, b"payload", server_addr).unwrap();
        good_sender.flush().await.unwrap();

        let in_queue = FrameQueue::with_key(server, PresharedKey::from_password("hunter2"));
        let decoded = in_queue.read().await.unwrap().unwrap();
        assert_eq!(decoded.payload, b"payload");

        let mut bad_sender = FrameQueue::with_key(client, PresharedKey::from_password("wrong"));
        bad_sender.enqueue(2, 0, 42, fne, b"payload", server_addr).unwrap();
        bad_sender.flush().await.unwrap();

        assert!(in_queue.read().await.unwrap().is_none());
    }
}
