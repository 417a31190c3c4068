use thiserror::Error;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("socket io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] fne_codec::CodecError),

    #[error("datagram too large: {len} bytes exceeds {max}")]
    TooLarge { len: usize, max: usize },

    #[error("preshared key wrap/unwrap failed")]
    Crypto,
}
