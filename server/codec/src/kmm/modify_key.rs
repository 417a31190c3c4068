use super::frame::{KmmHeader, KmmMessageId, KmmResponseKind, KMM_HEADER_LENGTH};
use super::keyset::KeysetItem;
use crate::error::{CodecError, CodecResult};

pub const ALGO_UNENCRYPT: u8 = 0x80;

/// Format of the decrypt-instruction field preceding the keyset payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DecryptInstructFormat {
    None = 0,
    Mi = 1,
}

impl DecryptInstructFormat {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => DecryptInstructFormat::Mi,
            _ => DecryptInstructFormat::None,
        }
    }
}

/// `MODIFY_KEY_CMD`: pushes one keyset's worth of keys down to a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModifyKeyCommand {
    pub header: KmmHeader,
    pub decrypt_info_fmt: u8,
    pub alg_id: u8,
    pub key_id: u16,
    /// Message indicator, present only when `decrypt_info_fmt == Mi`.
    pub mi: Option<[u8; 9]>,
    pub keyset: KeysetItem,
}

impl ModifyKeyCommand {
    pub fn new(dst_ll_id: u32, src_ll_id: u32, alg_id: u8, key_id: u16, keyset: KeysetItem) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::ModifyKeyCmd, KmmResponseKind::Immediate, dst_ll_id, src_ll_id),
            decrypt_info_fmt: DecryptInstructFormat::None as u8,
            alg_id,
            key_id,
            mi: None,
            keyset,
        }
    }

    pub fn decode(header: KmmHeader, data: &[u8]) -> CodecResult<Self> {
        let body = &data[KMM_HEADER_LENGTH..];
        if body.len() < 4 {
            return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + 4, got: data.len() });
        }

        let decrypt_info_fmt = body[0];
        let alg_id = body[1];
        let key_id = u16::from_be_bytes([body[2], body[3]]);
        let mut offset = 4;

        let mi = if DecryptInstructFormat::from_u8(decrypt_info_fmt) == DecryptInstructFormat::Mi {
            if body.len() < offset + 9 {
                return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + offset + 9, got: data.len() });
            }
            let mut buf = [0u8; 9];
            buf.copy_from_slice(&body[offset..offset + 9]);
            offset += 9;
            Some(buf)
        } else {
            None
        };

        let (keyset, _) = KeysetItem::decode(&body[offset..])?;

        Ok(Self {
            header,
            decrypt_info_fmt,
            alg_id,
            key_id,
            mi,
            keyset,
        })
    }

    pub fn encode(&mut self) -> Vec<u8> {
        let mut body = Vec::new();
        // If no MI was ever set, force the format to NONE regardless of the
        // caller's declared intent.
        let decrypt_info_fmt = if self.mi.is_none() {
            DecryptInstructFormat::None as u8
        } else {
            self.decrypt_info_fmt
        };
        body.push(decrypt_info_fmt);
        body.push(self.alg_id);
        body.extend_from_slice(&self.key_id.to_be_bytes());
        if let Some(mi) = self.mi {
            body.extend_from_slice(&mi);
        }
        self.keyset.encode(&mut body);

        self.header.message_length = (KMM_HEADER_LENGTH + body.len()) as u16;

        let mut out = vec![0u8; KMM_HEADER_LENGTH];
        self.header.encode(&mut out);
        out.extend_from_slice(&body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmm::keyset::KeyItem;

    #[test]
    fn round_trip_no_mi() {
        let keyset = KeysetItem {
            keyset_id: 1,
            alg_id: ALGO_UNENCRYPT,
            key_length: 2,
            keys: vec![KeyItem {
                key_format: 0,
                sln: 1,
                key_id: 2,
                key_name: vec![],
                key_material: vec![0x01, 0x02],
            }],
        };
        let mut cmd = ModifyKeyCommand::new(0x010203, 0x000001, ALGO_UNENCRYPT, 42, keyset);
        let encoded = cmd.encode();
        let header = KmmHeader::decode(&encoded).unwrap();
        let decoded = ModifyKeyCommand::decode(header, &encoded).unwrap();
        assert_eq!(decoded.mi, None);
        assert_eq!(decoded.key_id, 42);
        assert_eq!(decoded.keyset.keys.len(), 1);
    }

    #[test]
    fn round_trip_with_mi() {
        let keyset = KeysetItem {
            keyset_id: 1,
            alg_id: 0x81,
            key_length: 1,
            keys: vec![KeyItem {
                key_format: 0,
                sln: 0,
                key_id: 1,
                key_name: vec![],
                key_material: vec![0xFF],
            }],
        };
        let mut cmd = ModifyKeyCommand::new(1, 2, 0x81, 7, keyset);
        cmd.decrypt_info_fmt = DecryptInstructFormat::Mi as u8;
        cmd.mi = Some([9u8; 9]);
        let encoded = cmd.encode();
        let header = KmmHeader::decode(&encoded).unwrap();
        let decoded = ModifyKeyCommand::decode(header, &encoded).unwrap();
        assert_eq!(decoded.mi, Some([9u8; 9]));
    }
}
