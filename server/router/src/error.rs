use thiserror::Error;

use fne_ids::DstId;

pub type RouterResult<T> = Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("destination {0} rejected: call already active from a different stream")]
    StreamContention(DstId),

    #[error("source peer is not permitted to send traffic")]
    PeerNotPermitted,

    #[error("source radio id is not permitted")]
    RadioIdNotPermitted,

    #[error("destination {0} is not active in the talkgroup rules table")]
    TalkgroupNotActive(DstId),
}
