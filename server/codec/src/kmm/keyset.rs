use crate::error::{CodecError, CodecResult};

/// A single traffic/key-encryption key within a keyset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyItem {
    /// Top 3 bits of the wire `keyFormat` byte.
    pub key_format: u8,
    pub sln: u16,
    pub key_id: u16,
    /// Key name, if the wire `keyFormat` byte's low 5 bits carry a nonzero length.
    pub key_name: Vec<u8>,
    pub key_material: Vec<u8>,
}

impl KeyItem {
    fn key_name_len(&self) -> u8 {
        self.key_name.len() as u8 & 0x1F
    }

    fn wire_format_byte(&self) -> u8 {
        (self.key_format & 0xE0) | self.key_name_len()
    }

    pub fn wire_len(&self) -> usize {
        5 + self.key_name.len() + self.key_material.len()
    }

    pub fn decode(data: &[u8]) -> CodecResult<(Self, usize)> {
        if data.len() < 5 {
            return Err(CodecError::Truncated { need: 5, got: data.len() });
        }
        let format_byte = data[0];
        let key_format = format_byte & 0xE0;
        let key_name_len = (format_byte & 0x1F) as usize;
        let sln = u16::from_be_bytes([data[1], data[2]]);
        let key_id = u16::from_be_bytes([data[3], data[4]]);

        let mut offset = 5;
        if data.len() < offset + key_name_len {
            return Err(CodecError::Truncated { need: offset + key_name_len, got: data.len() });
        }
        let key_name = data[offset..offset + key_name_len].to_vec();
        offset += key_name_len;

        Ok((
            KeyItem {
                key_format,
                sln,
                key_id,
                key_name,
                key_material: Vec::new(),
            },
            offset,
        ))
    }

    /// Finishes decoding by reading `key_length` bytes of key material starting
    /// at `offset` in `data`. The material length lives in the enclosing
    /// `KeysetItem`, not in the key entry itself.
    pub fn decode_material(mut self, data: &[u8], offset: usize, key_length: usize) -> CodecResult<(Self, usize)> {
        if data.len() < offset + key_length {
            return Err(CodecError::Truncated { need: offset + key_length, got: data.len() });
        }
        self.key_material = data[offset..offset + key_length].to_vec();
        Ok((self, offset + key_length))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.wire_format_byte());
        out.extend_from_slice(&self.sln.to_be_bytes());
        out.extend_from_slice(&self.key_id.to_be_bytes());
        out.extend_from_slice(&self.key_name);
        out.extend_from_slice(&self.key_material);
    }
}

/// A keyset carrying one or more keys, all sharing `key_length`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeysetItem {
    pub keyset_id: u8,
    pub alg_id: u8,
    pub key_length: u8,
    pub keys: Vec<KeyItem>,
}

impl KeysetItem {
    pub fn decode(data: &[u8]) -> CodecResult<(Self, usize)> {
        if data.len() < 4 {
            return Err(CodecError::Truncated { need: 4, got: data.len() });
        }
        let keyset_id = data[0];
        let alg_id = data[1];
        let key_length = data[2];
        let key_count = data[3];

        let mut offset = 4;
        let mut keys = Vec::with_capacity(key_count as usize);
        for _ in 0..key_count {
            let (item, next_offset) = KeyItem::decode(&data[offset..])?;
            let (item, next_offset) = item.decode_material(data, offset + next_offset, key_length as usize)?;
            offset = next_offset;
            keys.push(item);
        }

        Ok((
            KeysetItem {
                keyset_id,
                alg_id,
                key_length,
                keys,
            },
            offset,
        ))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.keyset_id);
        out.push(self.alg_id);
        out.push(self.key_length);
        out.push(self.keys.len() as u8);
        for key in &self.keys {
            key.encode(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_single_key() {
        let keyset = KeysetItem {
            keyset_id: 1,
            alg_id: 0x80,
            key_length: 4,
            keys: vec![KeyItem {
                key_format: 0x20,
                sln: 0x1234,
                key_id: 0x5678,
                key_name: vec![],
                key_material: vec![0xAA, 0xBB, 0xCC, 0xDD],
            }],
        };
        let mut buf = Vec::new();
        keyset.encode(&mut buf);
        let (decoded, consumed) = KeysetItem::decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, keyset);
    }

    #[test]
    fn round_trip_named_key() {
        let keyset = KeysetItem {
            keyset_id: 2,
            alg_id: 0x80,
            key_length: 2,
            keys: vec![KeyItem {
                key_format: 0x40,
                sln: 1,
                key_id: 2,
                key_name: b"tg1".to_vec(),
                key_material: vec![0x01, 0x02],
            }],
        };
        let mut buf = Vec::new();
        keyset.encode(&mut buf);
        let (decoded, _) = KeysetItem::decode(&buf).unwrap();
        assert_eq!(decoded, keyset);
    }
}
