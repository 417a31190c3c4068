use fne_ids::{PeerId, StreamId};

use crate::error::{CodecError, CodecResult};

pub const FNE_HEADER_LENGTH: usize = 11;

/// FNE function opcodes, carried in the first byte of the FNE header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FneFunction {
    Protocol = 0x00,
    Master = 0x01,
    InCallCtrl = 0x02,
    KeyRsp = 0x03,
    Rptl = 0x04,
    Rptk = 0x05,
    Rptc = 0x06,
    RptPing = 0x07,
    Pong = 0x08,
    MstDisc = 0x09,
    RptDisc = 0x0A,
    Ack = 0x0B,
    Nak = 0x0C,
    Transfer = 0x0D,
}

impl FneFunction {
    pub fn from_u8(v: u8) -> Option<Self> {
        use FneFunction::*;
        Some(match v {
            0x00 => Protocol,
            0x01 => Master,
            0x02 => InCallCtrl,
            0x03 => KeyRsp,
            0x04 => Rptl,
            0x05 => Rptk,
            0x06 => Rptc,
            0x07 => RptPing,
            0x08 => Pong,
            0x09 => MstDisc,
            0x0A => RptDisc,
            0x0B => Ack,
            0x0C => Nak,
            0x0D => Transfer,
            _ => return None,
        })
    }
}

/// Sub-functions carried under `Protocol`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ProtocolSubFunction {
    Dmr = 0,
    P25 = 1,
    Nxdn = 2,
}

/// Sub-functions carried under `Master` (list announcements).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MasterSubFunction {
    WhitelistRid = 0,
    BlacklistRid = 1,
    ActiveTgs = 2,
    DeactiveTgs = 3,
}

/// Sub-functions carried under `Transfer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferSubFunction {
    Activity = 1,
    Diagnostic = 2,
}

/// The 11-byte FNE extension header following the RTP header: function,
/// sub-function, a reserved/flags byte, the sending peer id, and the stream id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FneHeader {
    pub function: u8,
    pub sub_function: u8,
    pub flags: u8,
    pub peer_id: PeerId,
    pub stream_id: StreamId,
}

impl FneHeader {
    pub fn new(function: FneFunction, sub_function: u8, peer_id: PeerId, stream_id: StreamId) -> Self {
        Self {
            function: function as u8,
            sub_function,
            flags: 0,
            peer_id,
            stream_id,
        }
    }

    pub fn function(&self) -> Option<FneFunction> {
        FneFunction::from_u8(self.function)
    }

    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        if data.len() < FNE_HEADER_LENGTH {
            return Err(CodecError::Truncated {
                need: FNE_HEADER_LENGTH,
                got: data.len(),
            });
        }

        Ok(Self {
            function: data[0],
            sub_function: data[1],
            flags: data[2],
            peer_id: PeerId(u32::from_be_bytes([data[3], data[4], data[5], data[6]])),
            stream_id: StreamId(u32::from_be_bytes([data[7], data[8], data[9], data[10]])),
        })
    }

    pub fn encode(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= FNE_HEADER_LENGTH);
        out[0] = self.function;
        out[1] = self.sub_function;
        out[2] = self.flags;
        out[3..7].copy_from_slice(&self.peer_id.0.to_be_bytes());
        out[7..11].copy_from_slice(&self.stream_id.0.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let hdr = FneHeader::new(FneFunction::Protocol, ProtocolSubFunction::P25 as u8, PeerId(99), StreamId(7));
        let mut buf = [0u8; FNE_HEADER_LENGTH];
        hdr.encode(&mut buf);
        let decoded = FneHeader::decode(&buf).unwrap();
        assert_eq!(decoded, hdr);
        assert_eq!(decoded.function(), Some(FneFunction::Protocol));
    }
}
