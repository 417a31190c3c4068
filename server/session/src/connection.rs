use std::net::SocketAddr;

use fne_ids::PeerId;

use crate::auth::{generate_salt, verify_challenge};
use crate::config::PeerConfig;
use crate::error::{SessionError, SessionResult};
use crate::state::ConnectionState;
use crate::timer::SessionTimer;

/// One connecting or connected peer, tracked master-side from the moment its
/// `RPTL` arrives through to disconnection.
pub struct PeerConnection {
    peer_id: PeerId,
    address: SocketAddr,
    state: ConnectionState,
    salt: u32,
    config: Option<PeerConfig>,
    diagnostics_enabled: bool,
    pings_received: u64,
    timeout_timer: SessionTimer,
}

impl PeerConnection {
    /// A peer's connection is created the instant its `RPTL` is accepted.
    /// `timeout_ms` is the missed-ping window after which the connection is
    /// considered dead and should be torn down by the caller.
    pub fn new(peer_id: PeerId, address: SocketAddr, timeout_ms: u64) -> Self {
        let mut timeout_timer = SessionTimer::new(timeout_ms);
        timeout_timer.start();
        Self {
            peer_id,
            address,
            state: ConnectionState::WaitingLogin,
            salt: generate_salt(),
            config: None,
            diagnostics_enabled: false,
            pings_received: 0,
            timeout_timer,
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn salt(&self) -> u32 {
        self.salt
    }

    pub fn config(&self) -> Option<&PeerConfig> {
        self.config.as_ref()
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics_enabled
    }

    pub fn pings_received(&self) -> u64 {
        self.pings_received
    }

    /// Handles an `RPTK` carrying the peer's challenge-response hash.
    /// Succeeds and advances to `WaitingConfig` only from `WaitingLogin`.
    pub fn handle_auth(&mut self, password: &str, supplied_hash: &[u8]) -> SessionResult<()> {
        if self.state != ConnectionState::WaitingLogin {
            return Err(SessionError::UnexpectedOpcode {
                peer_id: self.peer_id,
                opcode: fne_codec::FneFunction::Rptk,
                state: self.state,
            });
        }

        if !verify_challenge(self.salt, password, supplied_hash) {
            return Err(SessionError::AuthFailed(self.peer_id));
        }

        self.state = ConnectionState::WaitingConfig;
        self.timeout_timer.start();
        Ok(())
    }

    /// Handles an `RPTC` carrying the peer's JSON configuration. Succeeds
    /// and advances to `Running` only from `WaitingConfig`.
    pub fn handle_config(&mut self, payload: &[u8], diagnostics_enabled: bool) -> SessionResult<()> {
        if self.state != ConnectionState::WaitingConfig {
            return Err(SessionError::UnexpectedOpcode {
                peer_id: self.peer_id,
                opcode: fne_codec::FneFunction::Rptc,
                state: self.state,
            });
        }

        let config: PeerConfig = serde_json::from_slice(payload)?;
        if let Err(reason) = config.validate() {
            return Err(SessionError::InvalidConfig { peer_id: self.peer_id, reason });
        }

        self.config = Some(config);
        self.diagnostics_enabled = diagnostics_enabled;
        self.state = ConnectionState::Running;
        self.timeout_timer.start();
        Ok(())
    }

    /// Records a `RPTPING` keepalive and restarts the timeout window.
    pub fn record_ping(&mut self) {
        self.pings_received += 1;
        self.timeout_timer.start();
    }

    /// Advances the timeout timer by `ms` milliseconds of wall-clock time.
    pub fn clock(&mut self, ms: u64) {
        self.timeout_timer.clock(ms);
    }

    pub fn has_timed_out(&self) -> bool {
        self.timeout_timer.has_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:62031".parse().unwrap()
    }

    #[test]
    fn full_login_sequence_reaches_running() {
        let mut conn = PeerConnection::new(PeerId(9001), addr(), 60_000);
        assert_eq!(conn.state(), ConnectionState::WaitingLogin);

        let hash = crate::auth::challenge_hash(conn.salt(), "secret");
        conn.handle_auth("secret", &hash).unwrap();
        assert_eq!(conn.state(), ConnectionState::WaitingConfig);

        let payload = br#"{"identity":"KW4FOX","rxFrequency":1,"txFrequency":1}"#;
        conn.handle_config(payload, true).unwrap();
        assert_eq!(conn.state(), ConnectionState::Running);
        assert!(conn.diagnostics_enabled());
    }

    #[test]
    fn wrong_password_fails_auth() {
        let mut conn = PeerConnection::new(PeerId(9001), addr(), 60_000);
        let hash = crate::auth::challenge_hash(conn.salt(), "secret");
        let err = conn.handle_auth("different", &hash).unwrap_err();
        assert!(matches!(err, SessionError::AuthFailed(_)));
        assert_eq!(conn.state(), ConnectionState::WaitingLogin);
    }

    #[test]
    fn config_rejected_out_of_order() {
        let mut conn = PeerConnection::new(PeerId(9001), addr(), 60_000);
        let payload = br#"{"identity":"KW4FOX","rxFrequency":1,"txFrequency":1}"#;
        let err = conn.handle_config(payload, false).unwrap_err();
        assert!(matches!(err, SessionError::UnexpectedOpcode { .. }));
    }

    #[test]
    fn timeout_fires_after_no_ping() {
        let mut conn = PeerConnection::new(PeerId(1), addr(), 1000);
        conn.clock(999);
        assert!(!conn.has_timed_out());
        conn.clock(1);
        assert!(conn.has_timed_out());
    }

    #[test]
    fn ping_resets_timeout() {
        let mut conn = PeerConnection::new(PeerId(1), addr(), 1000);
        conn.clock(900);
        conn.record_ping();
        conn.clock(900);
        assert!(!conn.has_timed_out());
        assert_eq!(conn.pings_received(), 1);
    }
}
