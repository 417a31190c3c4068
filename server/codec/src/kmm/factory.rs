use super::frame::{KmmHeader, KmmMessageId};
use super::hello::Hello;
use super::inventory::{InventoryCommand, InventoryResponse};
use super::modify_key::ModifyKeyCommand;
use super::registration::{RegistrationCommand, RegistrationResponse};
use super::simple::{HeaderOnlyFrame, NegativeAck};
use crate::error::CodecResult;

/// Every KMM frame shape this facility exchanges with peers, dispatched on
/// the wire message id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KmmFrame {
    ModifyKey(ModifyKeyCommand),
    NoService(HeaderOnlyFrame),
    Hello(Hello),
    Nak(NegativeAck),
    RegCmd(RegistrationCommand),
    RegRsp(RegistrationResponse),
    DeregCmd(RegistrationCommand),
    DeregRsp(RegistrationResponse),
    InventoryCmd(InventoryCommand),
    InventoryRsp(InventoryResponse),
    Zeroize(HeaderOnlyFrame),
}

impl KmmFrame {
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        let header = KmmHeader::decode(data)?;
        let id = KmmMessageId::from_u8(header.message_id)?;

        Ok(match id {
            KmmMessageId::ModifyKeyCmd => KmmFrame::ModifyKey(ModifyKeyCommand::decode(header, data)?),
            KmmMessageId::NoService => KmmFrame::NoService(HeaderOnlyFrame::decode(header, data)?),
            KmmMessageId::Hello => KmmFrame::Hello(Hello::decode(header, data)?),
            KmmMessageId::Nak => KmmFrame::Nak(NegativeAck::decode(header, data)?),
            KmmMessageId::RegCmd => KmmFrame::RegCmd(RegistrationCommand::decode(header, data)?),
            KmmMessageId::RegRsp => KmmFrame::RegRsp(RegistrationResponse::decode(header, data)?),
            KmmMessageId::DeregCmd => KmmFrame::DeregCmd(RegistrationCommand::decode(header, data)?),
            KmmMessageId::DeregRsp => KmmFrame::DeregRsp(RegistrationResponse::decode(header, data)?),
            KmmMessageId::InventoryCmd => KmmFrame::InventoryCmd(InventoryCommand::decode(header, data)?),
            KmmMessageId::InventoryRsp => KmmFrame::InventoryRsp(InventoryResponse::decode(header, data)?),
            KmmMessageId::Zeroize => KmmFrame::Zeroize(HeaderOnlyFrame::decode(header, data)?),
            KmmMessageId::RekeyAck => return Err(crate::error::CodecError::UnknownMessageId(header.message_id)),
        })
    }

    pub fn encode(&mut self) -> Vec<u8> {
        match self {
            KmmFrame::ModifyKey(f) => f.encode(),
            KmmFrame::NoService(f) => f.encode(),
            KmmFrame::Hello(f) => f.encode(),
            KmmFrame::Nak(f) => f.encode(),
            KmmFrame::RegCmd(f) => f.encode(),
            KmmFrame::RegRsp(f) => f.encode(),
            KmmFrame::DeregCmd(f) => f.encode(),
            KmmFrame::DeregRsp(f) => f.encode(),
            KmmFrame::InventoryCmd(f) => f.encode(),
            KmmFrame::InventoryRsp(f) => f.encode(),
            KmmFrame::Zeroize(f) => f.encode(),
        }
    }

    pub fn header(&self) -> &KmmHeader {
        match self {
            KmmFrame::ModifyKey(f) => &f.header,
            KmmFrame::NoService(f) => &f.header,
            KmmFrame::Hello(f) => &f.header,
            KmmFrame::Nak(f) => &f.header,
            KmmFrame::RegCmd(f) => &f.header,
            KmmFrame::RegRsp(f) => &f.header,
            KmmFrame::DeregCmd(f) => &f.header,
            KmmFrame::DeregRsp(f) => &f.header,
            KmmFrame::InventoryCmd(f) => &f.header,
            KmmFrame::InventoryRsp(f) => &f.header,
            KmmFrame::Zeroize(f) => &f.header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::keyset::{KeyItem, KeysetItem};

    #[test]
    fn dispatches_by_message_id() {
        let hello = Hello::new(1, 2);
        let encoded = hello.encode();
        match KmmFrame::decode(&encoded).unwrap() {
            KmmFrame::Hello(h) => assert_eq!(h.header.dst_ll_id, 1),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn round_trips_modify_key_through_factory() {
        let keyset = KeysetItem {
            keyset_id: 1,
            alg_id: 0x80,
            key_length: 1,
            keys: vec![KeyItem {
                key_format: 0,
                sln: 0,
                key_id: 1,
                key_name: vec![],
                key_material: vec![0xAB],
            }],
        };
        let mut cmd = ModifyKeyCommand::new(1, 2, 0x80, 1, keyset);
        let encoded = cmd.encode();
        match KmmFrame::decode(&encoded).unwrap() {
            KmmFrame::ModifyKey(decoded) => assert_eq!(decoded, cmd),
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
