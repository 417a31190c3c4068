use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::{json, Value};

use fne_codec::crc16::crc16_ccitt;
use fne_codec::rpc_header::{RpcHeader, RPC_FUNC_MASK, RPC_HEADER_LENGTH, RPC_REPLY_FUNC};
use fne_transport::{FneSocket, PresharedKey};

use crate::error::{RpcError, RpcResult};
use crate::status::RpcStatus;

/// A request or reply callback: takes the parsed JSON request body and
/// returns the JSON reply body. Registered handlers run synchronously from
/// `RpcService::poll` and must not block.
pub type RpcHandler = Box<dyn FnMut(Value) -> Value + Send>;

/// Masks `func` down to its 14-bit opcode, dropping the reply bit and the
/// reserved bit 14.
fn bare_func(func: u16) -> u16 {
    func & RPC_FUNC_MASK
}

/// The RPC sub-protocol endpoint: a dedicated AES-wrapped UDP socket
/// carrying JSON request/reply bodies tagged by a 14-bit opcode.
pub struct RpcService {
    socket: Arc<FneSocket>,
    key: PresharedKey,
    handlers: Mutex<HashMap<u16, RpcHandler>>,
}

impl RpcService {
    /// Binds the RPC socket and derives its preshared key from `password`.
    pub async fn bind(addr: SocketAddr, password: &str) -> RpcResult<Self> {
        let socket = Arc::new(FneSocket::bind(addr).await?);
        Ok(Self {
            socket,
            key: PresharedKey::from_password(password),
            handlers: Mutex::new(HashMap::new()),
        })
    }

    pub fn local_addr(&self) -> RpcResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Registers a standing handler for requests carrying `func`.
    pub fn register_handler(&self, func: u16, handler: RpcHandler) {
        self.handlers.lock().unwrap().insert(bare_func(func), handler);
    }

    pub fn unregister_handler(&self, func: u16) {
        self.handlers.lock().unwrap().remove(&bare_func(func));
    }

    /// Sends an RPC request. If `reply_handler` is set, it's invoked exactly
    /// once when the matching reply arrives, then discarded.
    pub async fn req(
        &self,
        func: u16,
        request: &Value,
        addr: SocketAddr,
        reply_handler: Option<RpcHandler>,
    ) -> RpcResult<()> {
        let func = bare_func(func);
        self.send(func, request, addr).await?;

        if let Some(handler) = reply_handler {
            self.handlers.lock().unwrap().insert(func | RPC_REPLY_FUNC, handler);
        }
        Ok(())
    }

    async fn send(&self, func: u16, body: &Value, addr: SocketAddr) -> RpcResult<()> {
        let mut payload = serde_json::to_vec(body)?;
        payload.push(0); // NUL terminator, matching the C-string framing on the wire

        let crc = crc16_ccitt(&payload);
        let header = RpcHeader::new(func, payload.len() as u32, crc);

        let mut buf = vec![0u8; RPC_HEADER_LENGTH + payload.len()];
        header.encode(&mut buf[..RPC_HEADER_LENGTH]);
        buf[RPC_HEADER_LENGTH..].copy_from_slice(&payload);

        let wrapped = self.key.wrap(&buf)?;
        self.socket.send_to(&wrapped, addr).await?;
        Ok(())
    }

    fn default_response(message: &str, status: RpcStatus) -> Value {
        json!({ "status": status.code(), "message": message })
    }

    /// Reads one datagram and dispatches it: a reply is routed to its
    /// one-shot handler and discarded; a request is routed to its standing
    /// handler (or the default unhandled-request response) and replied to.
    pub async fn poll(&self) -> RpcResult<()> {
        let (raw, addr) = self.socket.recv().await?;
        let buf = self.key.unwrap(&raw)?;

        if buf.len() < RPC_HEADER_LENGTH {
            return Err(RpcError::Codec(fne_codec::CodecError::RpcTruncated {
                need: RPC_HEADER_LENGTH,
                got: buf.len(),
            }));
        }

        let header = RpcHeader::decode(&buf)?;
        let declared = header.message_length as usize;
        let actual = buf.len() - RPC_HEADER_LENGTH;
        if declared != actual {
            return Err(RpcError::Codec(fne_codec::CodecError::RpcLengthMismatch {
                declared: header.message_length,
                actual,
            }));
        }

        let payload = &buf[RPC_HEADER_LENGTH..];
        let computed = crc16_ccitt(payload);
        if computed != header.crc16 {
            return Err(RpcError::Codec(fne_codec::CodecError::RpcCrcMismatch {
                declared: header.crc16,
                computed,
            }));
        }

        // payload is NUL-terminated on the wire; trim it before parsing.
        let json_bytes = payload.strip_suffix(&[0u8]).unwrap_or(payload);
        let request: Value = serde_json::from_slice(json_bytes)?;
        if !request.is_object() {
            return Err(RpcError::NotAnObject);
        }

        let func = bare_func(header.func) | (header.func & RPC_REPLY_FUNC);
        let handler = self.handlers.lock().unwrap().remove(&func);

        match handler {
            // a reply handler is one-shot: already removed above, nothing to reply to.
            Some(mut handler) if func & RPC_REPLY_FUNC == RPC_REPLY_FUNC => {
                handler(request);
            }
            // a standing request handler: call it, put it back, then reply.
            Some(mut handler) => {
                let response = handler(request);
                self.handlers.lock().unwrap().insert(func, handler);
                self.send(func | RPC_REPLY_FUNC, &response, addr).await?;
            }
            None => {
                let response = Self::default_response("unhandled request", RpcStatus::UnhandledRequest);
                self.send(func | RPC_REPLY_FUNC, &response, addr).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_reaches_registered_handler_and_replies() {
        let server = RpcService::bind("127.0.0.1:0".parse().unwrap(), "hunter2").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let client = RpcService::bind("127.0.0.1:0".parse().unwrap(), "hunter2").await.unwrap();

        server.register_handler(
            0x0010,
            Box::new(|req| json!({ "status": 200, "echo": req["value"] })),
        );

        client.req(0x0010, &json!({ "value": 42 }), server_addr, None).await.unwrap();
        server.poll().await.unwrap();

        let (raw, _addr) = client.socket.recv().await.unwrap();
        let buf = client.key.unwrap(&raw).unwrap();
        let header = RpcHeader::decode(&buf).unwrap();
        assert!(header.is_reply());
        let payload = &buf[RPC_HEADER_LENGTH..];
        let json_bytes = payload.strip_suffix(&[0u8]).unwrap();
        let reply: Value = serde_json::from_slice(json_bytes).unwrap();
        assert_eq!(reply["echo"], 42);
    }

    #[tokio::test]
    async fn unhandled_request_gets_default_response() {
        let server = RpcService::bind("127.0.0.1:0".parse().unwrap(), "hunter2").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let client = RpcService::bind("127.0.0.1:0".parse().unwrap(), "hunter2").await.unwrap();

        client.req(0x0099, &json!({}), server_addr, None).await.unwrap();
        server.poll().await.unwrap();

        let (raw, _addr) = client.socket.recv().await.unwrap();
        let buf = client.key.unwrap(&raw).unwrap();
        let payload = &buf[RPC_HEADER_LENGTH..];
        let json_bytes = payload.strip_suffix(&[0u8]).unwrap();
        let reply: Value = serde_json::from_slice(json_bytes).unwrap();
        assert_eq!(reply["status"], 402);
    }

    #[tokio::test]
    async fn reply_handler_is_one_shot() {
        let server = RpcService::bind("127.0.0.1:0".parse().unwrap(), "hunter2").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let client = RpcService::bind("127.0.0.1:0".parse().unwrap(), "hunter2").await.unwrap();

        server.register_handler(0x0020, Box::new(|_req| json!({ "status": 200 })));

        let seen = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen_clone = seen.clone();
        client
            .req(
                0x0020,
                &json!({}),
                server_addr,
                Some(Box::new(move |_reply| {
                    seen_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    json!({})
                })),
            )
            .await
            .unwrap();

        server.poll().await.unwrap();
        client.poll().await.unwrap();

        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(client.handlers.lock().unwrap().is_empty());
    }
}
