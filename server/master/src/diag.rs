use std::sync::Arc;

use fne_codec::{FneFunction, FneHeader, RtpHeader, TransferSubFunction, FNE_HEADER_LENGTH, RTP_HEADER_LENGTH};
use fne_transport::FneSocket;

use crate::activity::ActivitySink;

const COMPOSITE_HEADER_LENGTH: usize = RTP_HEADER_LENGTH + FNE_HEADER_LENGTH;

/// A second UDP listener that accepts `TRANSFER` frames from peers and
/// forwards the contained log line to the shared `ActivitySink`, tagged
/// with the originating peer id.
pub struct DiagNetwork {
    socket: FneSocket,
    sink: Arc<dyn ActivitySink>,
}

impl DiagNetwork {
    pub fn new(socket: FneSocket, sink: Arc<dyn ActivitySink>) -> Self {
        Self { socket, sink }
    }

    /// Reads and processes datagrams forever. Malformed frames are logged
    /// and skipped rather than ending the loop.
    pub async fn run(&self) {
        loop {
            if let Err(e) = self.poll_once().await {
                tracing::warn!(error = %e, "dropping malformed diagnostic frame");
            }
        }
    }

    async fn poll_once(&self) -> anyhow::Result<()> {
        let (data, addr) = self.socket.recv().await?;
        if data.len() < COMPOSITE_HEADER_LENGTH {
            anyhow::bail!("diagnostic frame too short: {} bytes", data.len());
        }

        let _rtp = RtpHeader::decode(&data)?;
        let fne = FneHeader::decode(&data[RTP_HEADER_LENGTH..])?;
        if fne.function() != Some(FneFunction::Transfer) {
            anyhow::bail!("unexpected opcode {:#04x} on diagnostic socket", fne.function);
        }

        let kind = if fne.sub_function == TransferSubFunction::Diagnostic as u8 { "diagnostic" } else { "activity" };
        let line = String::from_utf8_lossy(&data[COMPOSITE_HEADER_LENGTH..]);
        self.sink.record(&format!("peer={} addr={} kind={} {}", fne.peer_id, addr, kind, line.trim_end()));
        Ok(())
    }
}
