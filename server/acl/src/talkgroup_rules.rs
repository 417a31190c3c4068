use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;

use arc_swap::ArcSwap;
use serde::Deserialize;

use fne_ids::PeerId;

use crate::error::{AclError, AclResult};

/// A per-peer destination/slot rewrite: frames arriving for `(from_tgid,
/// from_slot)` are rewritten to `(to_tgid, to_slot)` before being forwarded
/// to that specific peer.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct RouteRewrite {
    #[serde(rename = "peerId")]
    pub peer_id: u32,
    #[serde(rename = "fromTgid")]
    pub from_tgid: u32,
    #[serde(rename = "fromSlot", default)]
    pub from_slot: u8,
    #[serde(rename = "toTgid")]
    pub to_tgid: u32,
    #[serde(rename = "toSlot", default)]
    pub to_slot: u8,
}

/// Behavior flags carried by a talkgroup rule.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct RuleConfig {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub affiliated: bool,
    #[serde(default)]
    pub parrot: bool,
    #[serde(default, rename = "nonPreferred")]
    pub non_preferred: bool,
}

/// One talkgroup rule, keyed by `(source TGID, slot)`. `slot` is `1` or `2`
/// for DMR traffic, `0` for P25/NXDN, which don't carry a slot concept.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct TalkgroupRule {
    pub source: TalkgroupSource,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: RuleConfig,
    #[serde(default)]
    pub inclusion: Vec<u32>,
    #[serde(default)]
    pub exclusion: Vec<u32>,
    #[serde(default, rename = "alwaysSend")]
    pub always_send: Vec<u32>,
    #[serde(default)]
    pub preferred: Vec<u32>,
    #[serde(default, rename = "permittedRids")]
    pub permitted_rids: Vec<u32>,
    #[serde(default)]
    pub rewrites: Vec<RouteRewrite>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Hash)]
pub struct TalkgroupSource {
    pub tgid: u32,
    #[serde(default)]
    pub slot: u8,
}

impl TalkgroupRule {
    /// Inclusion wins when a peer appears in both lists (per the data model
    /// invariant); exclusion only applies when inclusion is empty or the
    /// peer is absent from it.
    pub fn peer_is_eligible(&self, peer_id: PeerId) -> bool {
        if !self.inclusion.is_empty() {
            return self.inclusion.contains(&peer_id.0);
        }
        !self.exclusion.contains(&peer_id.0)
    }

    pub fn permits_rid(&self, rid: u32) -> bool {
        self.permitted_rids.is_empty() || self.permitted_rids.contains(&rid)
    }

    pub fn rewrite_for(&self, peer_id: PeerId) -> Option<&RouteRewrite> {
        self.rewrites.iter().find(|r| r.peer_id == peer_id.0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RulesFile {
    #[serde(default, rename = "groupVoice")]
    group_voice: Vec<TalkgroupRule>,
}

/// The talkgroup rules table: one entry per `(tgid, slot)`, loaded from a
/// YAML file and swapped in atomically on reload so routers never observe
/// a half-updated table mid-read.
pub struct TalkgroupRules {
    path: PathBuf,
    table: ArcSwap<HashMap<(u32, u8), TalkgroupRule>>,
    last_mtime: Mutex<Option<SystemTime>>,
}

impl TalkgroupRules {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: ArcSwap::from_pointee(HashMap::new()),
            last_mtime: Mutex::new(None),
        }
    }

    pub fn find(&self, tgid: u32, slot: u8) -> Option<TalkgroupRule> {
        self.table.load().get(&(tgid, slot)).cloned()
    }

    pub fn is_active(&self, tgid: u32, slot: u8) -> bool {
        self.find(tgid, slot).map(|r| r.config.active).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    pub fn all(&self) -> Vec<TalkgroupRule> {
        self.table.load().values().cloned().collect()
    }

    /// Inserts or replaces a single rule. Used by the `MASTER_SUBFUNC_*`
    /// announcement handlers to fold network-learned TGs into the table
    /// without waiting for the next file-driven reload.
    pub fn upsert(&self, rule: TalkgroupRule) {
        let mut next = (**self.table.load()).clone();
        next.insert((rule.source.tgid, rule.source.slot), rule);
        self.table.store(std::sync::Arc::new(next));
    }

    pub fn erase(&self, tgid: u32, slot: u8) {
        let mut next = (**self.table.load()).clone();
        if next.remove(&(tgid, slot)).is_some() {
            self.table.store(std::sync::Arc::new(next));
        }
    }

    /// Reloads the table from disk only if the file's modification time
    /// changed since the last successful load. Returns `true` if a reload
    /// happened.
    pub fn reload_if_changed(&self) -> AclResult<bool> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(AclError::Io { path: self.path_str(), source: e }),
        };
        let mtime = metadata.modified().map_err(|e| AclError::Io { path: self.path_str(), source: e })?;

        let mut last = self.last_mtime.lock().unwrap();
        if *last == Some(mtime) {
            return Ok(false);
        }

        let table = parse_rules_file(&self.path)?;
        let count = table.len();
        self.table.store(std::sync::Arc::new(table));
        *last = Some(mtime);
        tracing::info!(path = %self.path.display(), count, "reloaded talkgroup rules");
        Ok(true)
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

fn parse_rules_file(path: &std::path::Path) -> AclResult<HashMap<(u32, u8), TalkgroupRule>> {
    let contents = std::fs::read_to_string(path).map_err(|e| AclError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: RulesFile = serde_yaml::from_str(&contents).map_err(|e| AclError::Yaml {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(file
        .group_voice
        .into_iter()
        .map(|rule| ((rule.source.tgid, rule.source.slot), rule))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("fne-acl-tgrules-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_group_voice_entries() {
        let path = write_temp(
            "basic",
            r#"
groupVoice:
  - source: { tgid: 100, slot: 1 }
    name: "Test TG"
    config: { active: true }
    permittedRids: [501, 502]
"#,
        );
        let rules = TalkgroupRules::new(&path);
        assert!(rules.reload_if_changed().unwrap());
        assert!(rules.is_active(100, 1));
        let rule = rules.find(100, 1).unwrap();
        assert!(rule.permits_rid(501));
        assert!(!rule.permits_rid(999));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn inclusion_wins_over_exclusion() {
        let rule = TalkgroupRule {
            inclusion: vec![1],
            exclusion: vec![1, 2],
            ..Default::default()
        };
        assert!(rule.peer_is_eligible(PeerId(1)));
        assert!(!rule.peer_is_eligible(PeerId(2)));
    }

    #[test]
    fn empty_inclusion_falls_back_to_exclusion() {
        let rule = TalkgroupRule {
            exclusion: vec![2],
            ..Default::default()
        };
        assert!(rule.peer_is_eligible(PeerId(1)));
        assert!(!rule.peer_is_eligible(PeerId(2)));
    }

    #[test]
    fn reload_is_skipped_when_mtime_unchanged() {
        let path = write_temp("unchanged", "groupVoice: []\n");
        let rules = TalkgroupRules::new(&path);
        assert!(rules.reload_if_changed().unwrap());
        assert!(!rules.reload_if_changed().unwrap());
        let _ = std::fs::remove_file(&path);
    }
}
