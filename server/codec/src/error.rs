use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised decoding a frame off the wire. Never constructed for encode failures:
/// encode operates on values already known to be in range.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("frame too short: need at least {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    #[error("unknown message id: {0:#04x}")]
    UnknownMessageId(u8),

    #[error("unknown inventory type: {0:#04x}")]
    UnknownInventoryType(u8),

    #[error("rpc header truncated: need {need} bytes, got {got}")]
    RpcTruncated { need: usize, got: usize },

    #[error("rpc payload length mismatch: header said {declared}, buffer had {actual}")]
    RpcLengthMismatch { declared: u32, actual: usize },

    #[error("rpc CRC mismatch: header said {declared:#06x}, computed {computed:#06x}")]
    RpcCrcMismatch { declared: u16, computed: u16 },
}
