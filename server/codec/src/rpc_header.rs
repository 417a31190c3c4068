use crate::error::{CodecError, CodecResult};

pub const RPC_HEADER_LENGTH: usize = 8;

/// Set on `func` to mark a frame as a reply rather than a request.
pub const RPC_REPLY_FUNC: u16 = 0x8000;

/// The opcode occupies the low 14 bits of `func`; bit 14 is reserved and
/// bit 15 is the reply flag.
pub const RPC_FUNC_MASK: u16 = 0x3FFF;

/// The 8-byte header prefixing every RPC datagram: a CRC-16 over the
/// payload, the function code (top bit set for replies), and the payload
/// length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcHeader {
    pub crc16: u16,
    pub func: u16,
    pub message_length: u32,
}

impl RpcHeader {
    pub fn new(func: u16, message_length: u32, crc16: u16) -> Self {
        Self {
            crc16,
            func,
            message_length,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.func & RPC_REPLY_FUNC != 0
    }

    pub fn function(&self) -> u16 {
        self.func & RPC_FUNC_MASK
    }

    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        if data.len() < RPC_HEADER_LENGTH {
            return Err(CodecError::RpcTruncated {
                need: RPC_HEADER_LENGTH,
                got: data.len(),
            });
        }

        let crc16 = u16::from_be_bytes([data[0], data[1]]);
        let func = u16::from_be_bytes([data[2], data[3]]);
        let message_length = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);

        Ok(Self {
            crc16,
            func,
            message_length,
        })
    }

    pub fn encode(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= RPC_HEADER_LENGTH);
        out[0..2].copy_from_slice(&self.crc16.to_be_bytes());
        out[2..4].copy_from_slice(&self.func.to_be_bytes());
        out[4..8].copy_from_slice(&self.message_length.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let hdr = RpcHeader::new(0x0005, 128, 0xBEEF);
        let mut buf = [0u8; RPC_HEADER_LENGTH];
        hdr.encode(&mut buf);
        let decoded = RpcHeader::decode(&buf).unwrap();
        assert_eq!(decoded, hdr);
        assert!(!decoded.is_reply());
    }

    #[test]
    fn reply_bit() {
        let hdr = RpcHeader::new(0x0005 | RPC_REPLY_FUNC, 0, 0);
        assert!(hdr.is_reply());
        assert_eq!(hdr.function(), 0x0005);
    }
}
