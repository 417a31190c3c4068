pub mod crc16;
pub mod error;
pub mod fne_header;
pub mod kmm;
pub mod rpc_header;
pub mod rtp;

pub use error::{CodecError, CodecResult};
pub use fne_header::{FneFunction, FneHeader, MasterSubFunction, ProtocolSubFunction, TransferSubFunction, FNE_HEADER_LENGTH};
pub use rpc_header::{RpcHeader, RPC_HEADER_LENGTH, RPC_REPLY_FUNC};
pub use rtp::{next_seq, seq_gap, RtpHeader, RTP_END_OF_CALL_SEQ, RTP_HEADER_LENGTH};
