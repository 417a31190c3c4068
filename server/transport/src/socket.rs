use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::error::{TransportError, TransportResult};

/// Matches the teacher's own packet buffer size for inbound reads.
pub const DATA_PACKET_LENGTH: usize = 8192;

/// Thin wrapper over a bound UDP socket. Keeps the buffer sizing and error
/// mapping in one place rather than scattering `recv_from`/`send_to` calls
/// across callers.
pub struct FneSocket {
    inner: UdpSocket,
}

impl FneSocket {
    pub async fn bind(addr: SocketAddr) -> TransportResult<Self> {
        let inner = UdpSocket::bind(addr).await?;
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Reads one datagram, returning its bytes and the sender's address.
    pub async fn recv(&self) -> TransportResult<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; DATA_PACKET_LENGTH];
        let (len, addr) = self.inner.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((buf, addr))
    }

    pub async fn send_to(&self, data: &[u8], addr: SocketAddr) -> TransportResult<()> {
        if data.len() > DATA_PACKET_LENGTH {
            return Err(TransportError::TooLarge { len: data.len(), max: DATA_PACKET_LENGTH });
        }
        self.inner.send_to(data, addr).await?;
        Ok(())
    }
}
