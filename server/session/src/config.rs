use serde::{Deserialize, Serialize};

/// RCON credentials a peer advertises for the master's remote-control surface.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RconInfo {
    pub password: String,
    pub port: u16,
}

/// Geographic position a peer reports for mapping/coverage display.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

/// The JSON configuration body carried in a peer's `RPTC` frame. Required
/// fields must be present and non-default for the configuration to be
/// accepted; optional fields fall back to their defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PeerConfig {
    pub identity: String,
    #[serde(rename = "rxFrequency")]
    pub rx_frequency: u32,
    #[serde(rename = "txFrequency")]
    pub tx_frequency: u32,
    #[serde(default)]
    pub power: u32,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "channelId", default)]
    pub channel_id: u8,
    #[serde(rename = "channelNo", default)]
    pub channel_no: u32,
    #[serde(default)]
    pub rcon: RconInfo,
    #[serde(rename = "software", default)]
    pub software_id: String,
}

impl PeerConfig {
    /// Required-field validation performed before a peer's `RPTC` is
    /// accepted. The original checks are loose (non-empty identity, and
    /// both frequencies set) — those are the only two failure modes that
    /// produce an `INVALID_CONFIG_DATA` NAK.
    pub fn validate(&self) -> Result<(), String> {
        if self.identity.trim().is_empty() {
            return Err("missing identity".to_string());
        }
        if self.rx_frequency == 0 || self.tx_frequency == 0 {
            return Err("missing rx/tx frequency".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let json = r#"{"identity":"KW4FOX","rxFrequency":446000000,"txFrequency":441000000}"#;
        let cfg: PeerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.identity, "KW4FOX");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_missing_identity() {
        let cfg = PeerConfig { rx_frequency: 1, tx_frequency: 1, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_frequency() {
        let cfg = PeerConfig { identity: "X".to_string(), ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
