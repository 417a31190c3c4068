use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

/// CLI surface for the master binary, matching the teacher's `Config`
/// (clap derive, env-overridable where it makes sense).
#[derive(Parser, Debug, Clone)]
#[command(name = "dvmfne", about = "Digital Voice Modem Fixed Network Equipment")]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short = 'c', long = "config", default_value = "fne.yml")]
    pub config: PathBuf,

    /// Stay in the foreground instead of daemonizing.
    #[arg(short = 'f', long = "foreground")]
    pub foreground: bool,

    /// Use a syslog-friendly log formatter. Syslog redirection itself is
    /// out of scope; this only changes how `tracing_subscriber` formats.
    #[arg(long = "syslog")]
    pub syslog: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct ProtocolEnable {
    #[serde(default = "default_true")]
    pub dmr: bool,
    #[serde(default = "default_true")]
    pub p25: bool,
    #[serde(default = "default_true")]
    pub nxdn: bool,
}

impl Default for ProtocolEnable {
    fn default() -> Self {
        Self { dmr: true, p25: true, nxdn: true }
    }
}

fn default_true() -> bool {
    true
}

fn default_listen() -> String {
    "0.0.0.0:62031".to_string()
}

fn default_rpc_listen() -> String {
    "0.0.0.0:62032".to_string()
}

fn default_metrics_listen() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_peer_list_path() -> PathBuf {
    PathBuf::from("peers.dat")
}

fn default_talkgroup_rules_path() -> PathBuf {
    PathBuf::from("talkgroup_rules.yml")
}

fn default_ping_interval_s() -> u64 {
    5
}

fn default_max_missed_pings() -> u32 {
    5
}

fn default_parrot_delay_ms() -> u64 {
    1000
}

fn default_parrot_frame_spacing_ms() -> u64 {
    20
}

fn default_call_activity_timeout_ms() -> u64 {
    2000
}

fn default_lookup_reload_interval_s() -> u64 {
    300
}

/// The YAML-loaded body of `FneConfig`, merged with CLI overrides in
/// `main`. Field names mirror the keys called out in the external
/// interfaces section: listen/RPC/diagnostics addresses, password, the
/// peer-list/talkgroup-rules file paths, ping cadence, parrot delay, and
/// per-protocol enable flags.
#[derive(Clone, Debug, Deserialize)]
pub struct FneSettings {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_rpc_listen")]
    pub rpc_listen: String,

    #[serde(default)]
    pub diagnostics_listen: Option<String>,

    #[serde(default = "default_metrics_listen")]
    pub metrics_listen: String,

    /// Master login/auth password, also used to derive the RPC preshared key.
    pub password: String,

    /// Preshared key used to encrypt the main traffic socket. `None` leaves
    /// traffic unencrypted (for local testing against unencrypted peers).
    #[serde(default)]
    pub preshared_key: Option<String>,

    #[serde(default = "default_peer_list_path")]
    pub peer_list_path: PathBuf,

    #[serde(default)]
    pub peer_acl_path: Option<PathBuf>,

    #[serde(default)]
    pub radio_id_acl_path: Option<PathBuf>,

    #[serde(default = "default_talkgroup_rules_path")]
    pub talkgroup_rules_path: PathBuf,

    #[serde(default = "default_ping_interval_s")]
    pub ping_interval_s: u64,

    #[serde(default = "default_max_missed_pings")]
    pub max_missed_pings: u32,

    #[serde(default = "default_parrot_delay_ms")]
    pub parrot_delay_ms: u64,

    #[serde(default = "default_parrot_frame_spacing_ms")]
    pub parrot_frame_spacing_ms: u64,

    #[serde(default = "default_call_activity_timeout_ms")]
    pub call_activity_timeout_ms: u64,

    #[serde(default = "default_lookup_reload_interval_s")]
    pub lookup_reload_interval_s: u64,

    #[serde(default)]
    pub protocols: ProtocolEnable,

    /// Channel numbers available for grant across peers of this master.
    #[serde(default)]
    pub channels: Vec<u32>,

    /// Activity log directory. `None` disables activity persistence.
    #[serde(default)]
    pub activity_log_dir: Option<PathBuf>,
}

impl FneSettings {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&text)?;
        Ok(settings)
    }

    /// Missed-ping window before a session is considered dead.
    pub fn session_timeout_ms(&self) -> u64 {
        self.ping_interval_s * 1000 * self.max_missed_pings as u64
    }
}
