use thiserror::Error;

use fne_codec::FneFunction;
use fne_ids::PeerId;

use crate::state::ConnectionState;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("peer {peer_id} sent {opcode:?} while in state {state:?}")]
    UnexpectedOpcode { peer_id: PeerId, opcode: FneFunction, state: ConnectionState },

    #[error("peer {peer_id} login payload too short: need {need} bytes, got {got}")]
    LoginTruncated { peer_id: PeerId, need: usize, got: usize },

    #[error("peer {peer_id} auth payload too short: need {need} bytes, got {got}")]
    AuthTruncated { peer_id: PeerId, need: usize, got: usize },

    #[error("peer {0} failed authentication")]
    AuthFailed(PeerId),

    #[error("peer {0} is not permitted to connect")]
    PeerNotPermitted(PeerId),

    #[error("peer {peer_id} sent invalid configuration: {reason}")]
    InvalidConfig { peer_id: PeerId, reason: String },

    #[error("config json error: {0}")]
    Json(#[from] serde_json::Error),
}
