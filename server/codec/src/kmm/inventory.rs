use super::frame::{KmmHeader, KmmMessageId, KmmResponseKind, KMM_HEADER_LENGTH};
use crate::error::{CodecError, CodecResult};

/// Which inventory listing is being requested or returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum InventoryType {
    ListActiveKsetIds = 0,
    ListKeyIds = 1,
    ListKeysets = 2,
}

impl InventoryType {
    pub fn from_u8(v: u8) -> CodecResult<Self> {
        Ok(match v {
            0 => InventoryType::ListActiveKsetIds,
            1 => InventoryType::ListKeyIds,
            2 => InventoryType::ListKeysets,
            other => return Err(CodecError::UnknownInventoryType(other)),
        })
    }
}

/// `INVENTORY_CMD`: asks a peer to report on its loaded key material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryCommand {
    pub header: KmmHeader,
    pub inventory_type: u8,
}

impl InventoryCommand {
    pub fn new(dst_ll_id: u32, src_ll_id: u32, inventory_type: InventoryType) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::InventoryCmd, KmmResponseKind::Immediate, dst_ll_id, src_ll_id),
            inventory_type: inventory_type as u8,
        }
    }

    pub fn decode(header: KmmHeader, data: &[u8]) -> CodecResult<Self> {
        let body = &data[KMM_HEADER_LENGTH..];
        if body.is_empty() {
            return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + 1, got: data.len() });
        }
        Ok(Self {
            header,
            inventory_type: body[0],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header = self.header;
        header.message_length = (KMM_HEADER_LENGTH + 1) as u16;
        let mut out = vec![0u8; KMM_HEADER_LENGTH];
        header.encode(&mut out);
        out.push(self.inventory_type);
        out
    }
}

/// Body of an `INVENTORY_RSP` frame. The wire tag only ever carries one of
/// these kinds, selected by `inventory_type`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryResponseBody {
    /// Keys loaded for one keyset. This implementation, like the system it
    /// ports, only ever encodes a single key id and reports `number_of_items`
    /// as 1 even when more are logically present.
    KeyIds {
        keyset_id: u8,
        alg_id: u8,
        key_ids: Vec<u16>,
    },
    /// All keyset ids currently loaded. Unlike `KeyIds`, `number_of_items`
    /// here faithfully reflects the count.
    Keysets { keyset_ids: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryResponse {
    pub header: KmmHeader,
    pub inventory_type: u8,
    pub body: InventoryResponseBody,
}

impl InventoryResponse {
    pub fn new_key_ids(dst_ll_id: u32, src_ll_id: u32, keyset_id: u8, alg_id: u8, key_ids: Vec<u16>) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::InventoryRsp, KmmResponseKind::None, dst_ll_id, src_ll_id),
            inventory_type: InventoryType::ListKeyIds as u8,
            body: InventoryResponseBody::KeyIds {
                keyset_id,
                alg_id,
                key_ids,
            },
        }
    }

    pub fn new_keysets(dst_ll_id: u32, src_ll_id: u32, keyset_ids: Vec<u8>) -> Self {
        Self {
            header: KmmHeader::new(KmmMessageId::InventoryRsp, KmmResponseKind::None, dst_ll_id, src_ll_id),
            inventory_type: InventoryType::ListKeysets as u8,
            body: InventoryResponseBody::Keysets { keyset_ids },
        }
    }

    pub fn decode(header: KmmHeader, data: &[u8]) -> CodecResult<Self> {
        let body = &data[KMM_HEADER_LENGTH..];
        if body.len() < 3 {
            return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + 3, got: data.len() });
        }
        let inventory_type = body[0];
        let number_of_items = u16::from_be_bytes([body[1], body[2]]);
        let rest = &body[3..];

        let parsed = match InventoryType::from_u8(inventory_type)? {
            InventoryType::ListKeyIds => {
                if rest.len() < 3 {
                    return Err(CodecError::Truncated { need: KMM_HEADER_LENGTH + 6, got: data.len() });
                }
                let keyset_id = rest[0];
                let alg_id = rest[1];
                let number_of_key_ids = rest[2] as usize;
                let ids_bytes = &rest[3..];
                if ids_bytes.len() < number_of_key_ids * 2 {
                    return Err(CodecError::Truncated {
                        need: KMM_HEADER_LENGTH + 6 + number_of_key_ids * 2,
                        got: data.len(),
                    });
                }
                let key_ids = ids_bytes
                    .chunks_exact(2)
                    .take(number_of_key_ids)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                InventoryResponseBody::KeyIds { keyset_id, alg_id, key_ids }
            }
            InventoryType::ListKeysets | InventoryType::ListActiveKsetIds => {
                if rest.len() < number_of_items as usize {
                    return Err(CodecError::Truncated {
                        need: KMM_HEADER_LENGTH + 3 + number_of_items as usize,
                        got: data.len(),
                    });
                }
                InventoryResponseBody::Keysets {
                    keyset_ids: rest[..number_of_items as usize].to_vec(),
                }
            }
        };

        Ok(Self { header, inventory_type, body: parsed })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.push(self.inventory_type);

        match &self.body {
            InventoryResponseBody::KeyIds { keyset_id, alg_id, key_ids } => {
                // number_of_items is always reported as 1: only the first
                // key id list in a response is ever processed downstream.
                body.extend_from_slice(&1u16.to_be_bytes());
                body.push(*keyset_id);
                body.push(*alg_id);
                body.push(key_ids.len() as u8);
                for id in key_ids {
                    body.extend_from_slice(&id.to_be_bytes());
                }
            }
            InventoryResponseBody::Keysets { keyset_ids } => {
                body.extend_from_slice(&(keyset_ids.len() as u16).to_be_bytes());
                body.extend_from_slice(keyset_ids);
            }
        }

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
    fn round_trip_command() {
        let cmd = InventoryCommand::new(1, 2, InventoryType::ListKeysets);
        let encoded = cmd.encode();
        let header = KmmHeader::decode(&encoded).unwrap();
        let decoded = InventoryCommand::decode(header, &encoded).unwrap();
        assert_eq!(decoded.inventory_type, InventoryType::ListKeysets as u8);
    }

    #[test]
    fn key_ids_response_always_reports_one_item() {
        let rsp = InventoryResponse::new_key_ids(1, 2, 5, 0x80, vec![10, 11, 12]);
        let encoded = rsp.encode();
        // number_of_items lives right after the inventory_type byte.
        assert_eq!(u16::from_be_bytes([encoded[11], encoded[12]]), 1);
        let header = KmmHeader::decode(&encoded).unwrap();
        let decoded = InventoryResponse::decode(header, &encoded).unwrap();
        match decoded.body {
            InventoryResponseBody::KeyIds { key_ids, .. } => assert_eq!(key_ids, vec![10, 11, 12]),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn keysets_response_reports_real_count() {
        let rsp = InventoryResponse::new_keysets(1, 2, vec![1, 2, 3, 4]);
        let encoded = rsp.encode();
        assert_eq!(u16::from_be_bytes([encoded[11], encoded[12]]), 4);
        let header = KmmHeader::decode(&encoded).unwrap();
        let decoded = InventoryResponse::decode(header, &encoded).unwrap();
        match decoded.body {
            InventoryResponseBody::Keysets { keyset_ids } => assert_eq!(keyset_ids, vec![1, 2, 3, 4]),
            _ => panic!("wrong variant"),
        }
    }
}
