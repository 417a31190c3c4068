use thiserror::Error;

pub type RpcResult<T> = Result<T, RpcError>;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] fne_transport::TransportError),

    #[error("codec error: {0}")]
    Codec(#[from] fne_codec::CodecError),

    #[error("malformed rpc payload json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rpc request json body was not an object")]
    NotAnObject,
}
