use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;

use arc_swap::ArcSwap;

use crate::error::{AclError, AclResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMode {
    Whitelist,
    Blacklist,
}

/// One entry in a peer or radio ID allow/deny list: the id plus an optional
/// free-form label (a per-peer password, or a radio alias).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdEntry {
    pub id: u32,
    pub label: String,
}

/// A line-oriented, comma-delimited `id[,label]` allow/deny list with `#`
/// comment lines, reloaded from disk on a fixed interval and swapped in
/// atomically so readers never observe a half-updated table.
pub struct IdListAcl {
    path: PathBuf,
    mode: ListMode,
    enabled: bool,
    table: ArcSwap<HashMap<u32, IdEntry>>,
    last_mtime: Mutex<Option<SystemTime>>,
}

impl IdListAcl {
    pub fn new(path: impl Into<PathBuf>, mode: ListMode, enabled: bool) -> Self {
        Self {
            path: path.into(),
            mode,
            enabled,
            table: ArcSwap::from_pointee(HashMap::new()),
            last_mtime: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    pub fn is_acl_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_in_list(&self, id: u32) -> bool {
        self.table.load().contains_key(&id)
    }

    /// Whether `id` is allowed, honoring the configured mode. An ACL that
    /// isn't enabled allows everyone.
    pub fn is_allowed(&self, id: u32) -> bool {
        if !self.enabled {
            return true;
        }
        match self.mode {
            ListMode::Whitelist => self.is_in_list(id),
            ListMode::Blacklist => !self.is_in_list(id),
        }
    }

    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    pub fn entries(&self) -> Vec<IdEntry> {
        self.table.load().values().cloned().collect()
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

        let table = parse_id_list(&self.path)?;
        let count = table.len();
        self.table.store(std::sync::Arc::new(table));
        *last = Some(mtime);
        tracing::info!(path = %self.path.display(), count, "reloaded id list");
        Ok(true)
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

fn parse_id_list(path: &std::path::Path) -> AclResult<HashMap<u32, IdEntry>> {
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
        let label = parts.next().unwrap_or_default().trim().to_string();
        table.insert(id, IdEntry { id, label });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct TempFile(PathBuf);

    impl TempFile {
        fn new(name: &str, contents: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("fne-acl-test-{}-{}", std::process::id(), name));
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
    fn whitelist_allows_only_listed_ids() {
        let file = TempFile::new("whitelist", "# comment\n100,secret\n200\n");
        let acl = IdListAcl::new(&file.0, ListMode::Whitelist, true);
        acl.reload_if_changed().unwrap();

        assert!(acl.is_allowed(100));
        assert!(acl.is_allowed(200));
        assert!(!acl.is_allowed(300));
    }

    #[test]
    fn blacklist_denies_only_listed_ids() {
        let file = TempFile::new("blacklist", "100\n");
        let acl = IdListAcl::new(&file.0, ListMode::Blacklist, true);
        acl.reload_if_changed().unwrap();

        assert!(!acl.is_allowed(100));
        assert!(acl.is_allowed(200));
    }

    #[test]
    fn disabled_acl_allows_everyone() {
        let file = TempFile::new("disabled", "100\n");
        let acl = IdListAcl::new(&file.0, ListMode::Whitelist, false);
        acl.reload_if_changed().unwrap();

        assert!(acl.is_allowed(999));
    }

    #[test]
    fn reload_is_skipped_when_mtime_unchanged() {
        let file = TempFile::new("unchanged", "100\n");
        let acl = IdListAcl::new(&file.0, ListMode::Whitelist, true);
        assert!(acl.reload_if_changed().unwrap());
        assert!(!acl.reload_if_changed().unwrap());
    }
}
