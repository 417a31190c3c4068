/// Master-side lifecycle of a connecting peer. A connection is created in
/// `WaitingLogin` the moment its `RPTL` arrives (the `WaitingConnect` phase
/// of the full state set only exists on the dialing peer's side); it then
/// advances to `WaitingConfig` once `RPTK` authenticates, and to `Running`
/// once `RPTC` is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    WaitingLogin,
    WaitingConfig,
    Running,
}

impl ConnectionState {
    pub fn is_running(self) -> bool {
        matches!(self, ConnectionState::Running)
    }
}

/// 16-bit NAK reason codes sent in response to a rejected `RPTL`/`RPTK`/`RPTC`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum NakReason {
    ModeNotEnabled = 1,
    IllegalPacket = 2,
    FneUnauthorized = 3,
    BadConnState = 4,
    InvalidConfigData = 5,
    FneMaxConn = 6,
    PeerReset = 7,
    PeerAcl = 8,
    GeneralFailure = 9,
}

impl NakReason {
    pub fn from_u16(v: u16) -> Option<Self> {
        use NakReason::*;
        Some(match v {
            1 => ModeNotEnabled,
            2 => IllegalPacket,
            3 => FneUnauthorized,
            4 => BadConnState,
            5 => InvalidConfigData,
            6 => FneMaxConn,
            7 => PeerReset,
            8 => PeerAcl,
            9 => GeneralFailure,
            _ => return None,
        })
    }
}
