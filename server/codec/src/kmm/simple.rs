use super::frame::{KmmHeader, KmmMessageId, KmmResponseKind, KMM_HEADER_LENGTH};
use crate::error::{CodecError, CodecResult};

/// `NO_SERVICE` / `ZEROIZE`: bare header, no body. `NoService` tells a peer
/// its key management facility is unreachable; `Zeroize` commands immediate
/// destruction of loaded key material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderOnlyFrame {
    pub header: KmmHeader,
}

impl HeaderOnlyFrame {
    pub fn new_no_service(dst_ll_id: u32, src_ll_id: u32) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::NoService, KmmResponseKind::None, dst_ll_id, src_ll_id),
        }
    }

    pub fn new_zeroize(dst_ll_id: u32, src_ll_id: u32) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::Zeroize, KmmResponseKind::None, dst_ll_id, src_ll_id),
        }
    }

    pub fn decode(header: KmmHeader, _data: &[u8]) -> CodecResult<Self> {
        Ok(Self { header })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header = self.header;
        header.message_length = KMM_HEADER_LENGTH as u16;
        let mut out = vec![0u8; KMM_HEADER_LENGTH];
        header.encode(&mut out);
        out
    }
}

/// `NAK`: negative acknowledgement of a previously sent KMM frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NegativeAck {
    pub header: KmmHeader,
    /// Message id of the frame being rejected.
    pub nak_message_id: u8,
    pub message_no: u16,
    pub status: u8,
}

impl NegativeAck {
    pub fn new(dst_ll_id: u32, src_ll_id: u32, nak_message_id: u8, message_no: u16, status: u8) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::Nak, KmmResponseKind::Immediate, dst_ll_id, src_ll_id),
            nak_message_id,
            message_no,
            status,
        }
    }

    pub fn decode(header: KmmHeader, data: &[u8]) -> CodecResult<Self> {
        let body = &data[KMM_HEADER_LENGTH..];
        if body.len() < 4 {
            return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + 4, got: data.len() });
        }
        Ok(Self {
            header,
            nak_message_id: body[0],
            message_no: u16::from_be_bytes([body[1], body[2]]),
            status: body[3],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(4);
        body.push(self.nak_message_id);
        body.extend_from_slice(&self.message_no.to_be_bytes());
        body.push(self.status);

        let mut header = self.header;
        header.message_length = (KMM_HEADER_LENGTH + body.len()) as u16;
        let mut out = vec![0u8; KMM_HEADER_LENGTH];
        header.encode(&mut out);
        out.extend_from_slice(&body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only_round_trip() {
        let frame = HeaderOnlyFrame::new_zeroize(1, 2);
        let encoded = frame.encode();
        assert_eq!(encoded.len(), KMM_HEADER_LENGTH);
        let header = KmmHeader::decode(&encoded).unwrap();
        HeaderOnlyFrame::decode(header, &encoded).unwrap();
    }

    #[test]
    fn nak_round_trip() {
        let nak = NegativeAck::new(1, 2, 0x13, 99, 5);
        let encoded = nak.encode();
        let header = KmmHeader::decode(&encoded).unwrap();
        let decoded = NegativeAck::decode(header, &encoded).unwrap();
        assert_eq!(decoded.nak_message_id, 0x13);
        assert_eq!(decoded.message_no, 99);
        assert_eq!(decoded.status, 5);
    }
}
