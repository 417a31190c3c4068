use super::frame::{KmmHeader, KmmMessageId, KmmResponseKind, KMM_HEADER_LENGTH};
use crate::error::{CodecError, CodecResult};

/// What a `HELLO` frame is asking the receiving end to report back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum HelloFlag {
    IdentOnly = 0,
    FullInventory = 1,
}

/// `HELLO`: a keep-alive / capability probe exchanged with a key management
/// facility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hello {
    pub header: KmmHeader,
    pub flag: u8,
}

impl Hello {
    pub fn new(dst_ll_id: u32, src_ll_id: u32) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::Hello, KmmResponseKind::Delayed, dst_ll_id, src_ll_id),
            flag: HelloFlag::IdentOnly as u8,
        }
    }

    pub fn decode(header: KmmHeader, data: &[u8]) -> CodecResult<Self> {
        let body = &data[KMM_HEADER_LENGTH..];
        if body.is_empty() {
            return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + 1, got: data.len() });
        }
        Ok(Self { header, flag: body[0] })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header = self.header;
        header.message_length = (KMM_HEADER_LENGTH + 1) as u16;
        let mut out = vec![0u8; KMM_HEADER_LENGTH];
        header.encode(&mut out);
        out.push(self.flag);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_ident_only_and_delayed_response() {
        let hello = Hello::new(1, 2);
        assert_eq!(hello.flag, HelloFlag::IdentOnly as u8);
        assert_eq!(hello.header.resp_kind, KmmResponseKind::Delayed as u8);
    }
}
