use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;

use arc_swap::ArcSwap;

use fne_ids::PeerId;

use crate::error::{AclError, AclResult};

/// One line of the persisted peer list: a peer id and its optional
/// per-peer password override. A peer with no override authenticates
/// against the network-wide password instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerListEntry {
    pub peer_id: PeerId,
    pub password: Option<String>,
}

/// The persisted `peerId[,password]` file that pins which peer ids are
/// permitted to connect at all, independent of the radio-ID/talkgroup
/// ACLs applied to traffic once a peer is running.
pub struct PeerList {
    path: PathBuf,
    enabled: bool,
    table: ArcSwap<HashMap<u32, PeerListEntry>>,
    last_mtime: Mutex<Option<SystemTime>>,
}

impl PeerList {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
            table: ArcSwap::from_pointee(HashMap::new()),
            last_mtime: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `peer_id` may attempt a login at all. A disabled list
    /// permits any peer id to try (password verification still applies).
    pub fn is_permitted(&self, peer_id: PeerId) -> bool {
        !self.enabled || self.table.load().contains_key(&peer_id.0)
    }

    pub fn password_override(&self, peer_id: PeerId) -> Option<String> {
        self.table.load().get(&peer_id.0).and_then(|e| e.password.clone())
    }

    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    pub fn entries(&self) -> Vec<PeerListEntry> {
        self.table.load().values().cloned().collect()
    }

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

        let table = parse_peer_list(&self.path)?;
        let count = table.len();
        self.table.store(std::sync::Arc::new(table));
        *last = Some(mtime);
        tracing::info!(path = %self.path.display(), count, "reloaded peer list");
        Ok(true)
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

fn parse_peer_list(path: &std::path::Path) -> AclResult<HashMap<u32, PeerListEntry>> {
    let contents = std::fs::read_to_string(path).map_err(|e| AclError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut table = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.splitn(2, ',');
        let id_str = parts.next().unwrap_or_default().trim();
        let Ok(id) = id_str.parse::<u32>() else {
            continue;
        };
        let password = parts.next().map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);
        table.insert(id, PeerListEntry { peer_id: PeerId(id), password });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempFile(PathBuf);

    impl TempFile {
        fn new(name: &str, contents: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("fne-acl-peerlist-{}-{}", std::process::id(), name));
            std::fs::write(&path, contents).unwrap();
            TempFile(path)
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn permits_only_listed_peers_when_enabled() {
        let file = TempFile::new("enabled", "# comment\n9001,hunter2\n9002\n");
        let list = PeerList::new(&file.0, true);
        list.reload_if_changed().unwrap();

        assert!(list.is_permitted(PeerId(9001)));
        assert!(list.is_permitted(PeerId(9002)));
        assert!(!list.is_permitted(PeerId(9003)));
        assert_eq!(list.password_override(PeerId(9001)), Some("hunter2".to_string()));
        assert_eq!(list.password_override(PeerId(9002)), None);
    }

    #[test]
    fn disabled_list_permits_any_peer() {
        let file = TempFile::new("disabled", "9001\n");
        let list = PeerList::new(&file.0, false);
        list.reload_if_changed().unwrap();

        assert!(list.is_permitted(PeerId(12345)));
    }
}
