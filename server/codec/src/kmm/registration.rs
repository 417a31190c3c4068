use super::frame::{KmmHeader, KmmMessageId, KmmResponseKind, KMM_HEADER_LENGTH};
use crate::error::{CodecError, CodecResult};

/// `REG_CMD` / `DEREG_CMD`: a peer announcing itself to (or withdrawing
/// itself from) a key management facility. `body_format` is always written
/// as 0 on encode; warm-start registration is not supported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationCommand {
    pub header: KmmHeader,
    pub body_format: u8,
    pub kmf_rsi: u32,
    deregister: bool,
}

impl RegistrationCommand {
    pub fn new_register(dst_ll_id: u32, src_ll_id: u32, kmf_rsi: u32) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::RegCmd, KmmResponseKind::Immediate, dst_ll_id, src_ll_id),
            body_format: 0,
            kmf_rsi,
            deregister: false,
        }
    }

    pub fn new_deregister(dst_ll_id: u32, src_ll_id: u32, kmf_rsi: u32) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::DeregCmd, KmmResponseKind::Immediate, dst_ll_id, src_ll_id),
            body_format: 0,
            kmf_rsi,
            deregister: true,
        }
    }

    pub fn is_deregister(&self) -> bool {
        self.deregister
    }

    pub fn decode(header: KmmHeader, data: &[u8]) -> CodecResult<Self> {
        let body = &data[KMM_HEADER_LENGTH..];
        if body.len() < 4 {
            return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + 4, got: data.len() });
        }
        let deregister = header.message_id == KmmMessageId::DeregCmd as u8;
        Ok(Self {
            header,
            body_format: body[0],
            kmf_rsi: u32::from_be_bytes([0, body[1], body[2], body[3]]),
            deregister,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(4);
        body.push(0u8);
        let rsi = self.kmf_rsi.to_be_bytes();
        body.extend_from_slice(&rsi[1..4]);

        let mut header = self.header;
        header.message_length = (KMM_HEADER_LENGTH + body.len()) as u16;
        let mut out = vec![0u8; KMM_HEADER_LENGTH];
        header.encode(&mut out);
        out.extend_from_slice(&body);
        out
    }
}

/// `REG_RSP` / `DEREG_RSP`: acknowledges a registration or deregistration
/// with a status code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationResponse {
    pub header: KmmHeader,
    pub status: u8,
    deregister: bool,
}

impl RegistrationResponse {
    pub fn new_register(dst_ll_id: u32, src_ll_id: u32, status: u8) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::RegRsp, KmmResponseKind::None, dst_ll_id, src_ll_id),
            status,
            deregister: false,
        }
    }

    pub fn new_deregister(dst_ll_id: u32, src_ll_id: u32, status: u8) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::DeregRsp, KmmResponseKind::None, dst_ll_id, src_ll_id),
            status,
            deregister: true,
        }
    }

    pub fn is_deregister(&self) -> bool {
        self.deregister
    }

    pub fn decode(header: KmmHeader, data: &[u8]) -> CodecResult<Self> {
        let body = &data[KMM_HEADER_LENGTH..];
        if body.is_empty() {
            return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + 1, got: data.len() });
        }
        let deregister = header.message_id == KmmMessageId::DeregRsp as u8;
        Ok(Self {
            header,
            status: body[0],
            deregister,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header = self.header;
        header.message_length = (KMM_HEADER_LENGTH + 1) as u16;
        let mut out = vec![0u8; KMM_HEADER_LENGTH];
        header.encode(&mut out);
        out.push(self.status);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_command_forces_cold_start() {
        let cmd = RegistrationCommand::new_register(1, 2, 0x112233);
        let encoded = cmd.encode();
        assert_eq!(encoded[KMM_HEADER_LENGTH], 0);
        let header = KmmHeader::decode(&encoded).unwrap();
        let decoded = RegistrationCommand::decode(header, &encoded).unwrap();
        assert_eq!(decoded.kmf_rsi, 0x112233);
        assert!(!decoded.is_deregister());
    }

    #[test]
    fn registration_response_tags_match_direction() {
        let reg = RegistrationResponse::new_register(1, 2, 0);
        assert_eq!(reg.header.message_id, KmmMessageId::RegRsp as u8);
        let dereg = RegistrationResponse::new_deregister(1, 2, 0);
        assert_eq!(dereg.header.message_id, KmmMessageId::DeregRsp as u8);
    }
}
