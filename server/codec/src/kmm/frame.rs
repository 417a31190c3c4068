use crate::error::{CodecError, CodecResult};

/// Wire tag identifying a KMM frame's concrete type. Values are assigned
/// in this port and are internally consistent; they are not drawn from
/// any published TIA-102 table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum KmmMessageId {
    ModifyKeyCmd = 0x13,
    RekeyAck = 0x14,
    NoService = 0x10,
    Hello = 0x11,
    Nak = 0x0F,
    RegCmd = 0x20,
    RegRsp = 0x21,
    DeregCmd = 0x22,
    DeregRsp = 0x23,
    InventoryCmd = 0x2A,
    InventoryRsp = 0x2B,
    Zeroize = 0x30,
}

impl KmmMessageId {
    pub fn from_u8(v: u8) -> CodecResult<Self> {
        use KmmMessageId::*;
        Ok(match v {
            0x13 => ModifyKeyCmd,
            0x14 => RekeyAck,
            0x10 => NoService,
            0x11 => Hello,
            0x0F => Nak,
            0x20 => RegCmd,
            0x21 => RegRsp,
            0x22 => DeregCmd,
            0x23 => DeregRsp,
            0x2A => InventoryCmd,
            0x2B => InventoryRsp,
            0x30 => Zeroize,
            other => return Err(CodecError::UnknownMessageId(other)),
        })
    }
}

/// How urgently a peer must acknowledge a KMM frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum KmmResponseKind {
    None = 0,
    Immediate = 1,
    Delayed = 2,
}

impl KmmResponseKind {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => KmmResponseKind::Immediate,
            2 => KmmResponseKind::Delayed,
            _ => KmmResponseKind::None,
        }
    }
}

pub const KMM_HEADER_LENGTH: usize = 10;

/// The base header shared by every KMM frame: a 1-byte message id, a 2-byte
/// big-endian message length, a 1-byte response kind, and two 24-bit
/// logical link ids (destination then source).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KmmHeader {
    pub message_id: u8,
    pub message_length: u16,
    pub resp_kind: u8,
    pub dst_ll_id: u32,
    pub src_ll_id: u32,
}

impl KmmHeader {
    pub fn new(message_id: KmmMessageId, resp_kind: KmmResponseKind, dst_ll_id: u32, src_ll_id: u32) -> Self {
        Self {
            message_id: message_id as u8,
            message_length: 0,
            resp_kind: resp_kind as u8,
            dst_ll_id,
            src_ll_id,
        }
    }

    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        if data.len() < KMM_HEADER_LENGTH {
            return Err(CodecError::Truncated {
                need: KMM_HEADER_LENGTH,
                got: data.len(),
            });
        }

        let message_id = data[0];
        let message_length = u16::from_be_bytes([data[1], data[2]]);
        let resp_kind = data[3];
        let dst_ll_id = u32::from_be_bytes([0, data[4], data[5], data[6]]);
        let src_ll_id = u32::from_be_bytes([0, data[7], data[8], data[9]]);

        Ok(Self {
            message_id,
            message_length,
            resp_kind,
            dst_ll_id,
            src_ll_id,
        })
    }

    pub fn encode(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= KMM_HEADER_LENGTH);
        out[0] = self.message_id;
        out[1..3].copy_from_slice(&self.message_length.to_be_bytes());
        out[3] = self.resp_kind;
        let dst = self.dst_ll_id.to_be_bytes();
        out[4..7].copy_from_slice(&dst[1..4]);
        let src = self.src_ll_id.to_be_bytes();
        out[7..10].copy_from_slice(&src[1..4]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_24_bit_ids() {
        let mut hdr = KmmHeader::new(KmmMessageId::Hello, KmmResponseKind::Delayed, 0xABCDEF, 0x010203);
        hdr.message_length = 10;
        let mut buf = [0u8; KMM_HEADER_LENGTH];
        hdr.encode(&mut buf);
        let decoded = KmmHeader::decode(&buf).unwrap();
        assert_eq!(decoded, hdr);
        assert_eq!(decoded.dst_ll_id, 0xABCDEF);
    }
}
