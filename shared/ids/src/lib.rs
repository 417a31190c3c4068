//! Identifier newtypes shared across the FNE workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Valid range for a peer identifier, per the wire protocol.
pub const PEER_ID_MIN: u32 = 1;
pub const PEER_ID_MAX: u32 = 999_999_999;

/// Unique id of a connected peer, assigned at login.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u32);

impl PeerId {
    pub fn is_valid(self) -> bool {
        (PEER_ID_MIN..=PEER_ID_MAX).contains(&self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PeerId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a single call. Zero means "no active stream".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(pub u32);

impl StreamId {
    pub const NONE: StreamId = StreamId(0);

    pub fn is_active(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StreamId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Talkgroup/radio destination identifier. 24-bit on the wire, stored widened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DstId(pub u32);

impl DstId {
    pub const NONE: DstId = DstId(0);
}

impl fmt::Display for DstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DstId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Radio (subscriber unit) identifier. 24-bit on the wire, stored widened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RadioId(pub u32);

impl fmt::Display for RadioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RadioId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_validity() {
        assert!(PeerId(1).is_valid());
        assert!(PeerId(999_999_999).is_valid());
        assert!(!PeerId(0).is_valid());
        assert!(!PeerId(1_000_000_000).is_valid());
    }

    #[test]
    fn stream_id_none_is_inactive() {
        assert!(!StreamId::NONE.is_active());
        assert!(StreamId(7).is_active());
    }
}
