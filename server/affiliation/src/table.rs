use std::collections::HashMap;
use std::sync::Mutex;

use fne_ids::{DstId, RadioId};

use crate::channel_pool::ChannelPool;
use crate::error::{AffiliationError, AffiliationResult};
use crate::timer::GrantTimer;

/// A granted channel's bookkeeping.
#[derive(Clone, Copy, Debug)]
pub struct GrantEntry {
    pub channel: u32,
    pub src_id: RadioId,
    pub group: bool,
    pub net_granted: bool,
}

/// Invoked when a grant is released: `(channel, dstId, reserved)`.
pub type ReleaseCallback = Box<dyn Fn(u32, DstId, u32) + Send + Sync>;

struct Inner {
    channel_pool: ChannelPool,
    unit_reg: Vec<RadioId>,
    group_aff: HashMap<RadioId, DstId>,
    grants: HashMap<DstId, (GrantEntry, GrantTimer)>,
    release_grant: Option<ReleaseCallback>,
}

/// Per-peer registration and channel grant state. Every connected peer owns
/// one instance of this table; all mutation — including the clock-driven
/// expiry sweep — goes through the same lock, so there is no lock-free or
/// partially-locked path to race against.
pub struct AffiliationTable {
    name: String,
    inner: Mutex<Inner>,
}

impl AffiliationTable {
    pub fn new(name: impl Into<String>, channels: impl IntoIterator<Item = u32>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                channel_pool: ChannelPool::new(channels),
                unit_reg: Vec::new(),
                group_aff: HashMap::new(),
                grants: HashMap::new(),
                release_grant: None,
            }),
        }
    }

    pub fn set_release_callback(&self, cb: ReleaseCallback) {
        self.inner.lock().unwrap().release_grant = Some(cb);
    }

    // -- unit registration -------------------------------------------------

    pub fn unit_reg(&self, src_id: RadioId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.unit_reg.contains(&src_id) {
            return;
        }
        inner.unit_reg.push(src_id);
        tracing::debug!(table = %self.name, %src_id, "unit registration");
    }

    pub fn unit_dereg(&self, src_id: RadioId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.unit_reg.contains(&src_id) {
            return false;
        }
        tracing::debug!(table = %self.name, %src_id, "unit deregistration");
        group_unaff_locked(&mut inner, src_id);

        if let Some(pos) = inner.unit_reg.iter().position(|id| *id == src_id) {
            inner.unit_reg.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn is_unit_reg(&self, src_id: RadioId) -> bool {
        self.inner.lock().unwrap().unit_reg.contains(&src_id)
    }

    pub fn clear_unit_reg(&self) {
        let mut inner = self.inner.lock().unwrap();
        tracing::warn!(table = %self.name, "releasing all unit registrations");
        inner.unit_reg.clear();
    }

    // -- group affiliation ---------------------------------------------------

    pub fn group_aff(&self, src_id: RadioId, dst_id: DstId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.group_aff.get(&src_id) != Some(&dst_id) {
            inner.group_aff.insert(src_id, dst_id);
            tracing::debug!(table = %self.name, %src_id, %dst_id, "group affiliation");
        }
    }

    pub fn group_unaff(&self, src_id: RadioId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        group_unaff_locked(&mut inner, src_id)
    }

    pub fn has_group_aff(&self, dst_id: DstId) -> bool {
        self.inner.lock().unwrap().group_aff.values().any(|d| *d == dst_id)
    }

    pub fn is_group_aff(&self, src_id: RadioId, dst_id: DstId) -> bool {
        self.inner.lock().unwrap().group_aff.get(&src_id) == Some(&dst_id)
    }

    /// Clears group affiliations, returning the affected source ids.
    /// `dst_id == DstId::NONE && !release_all` is a no-op; `dst_id ==
    /// DstId::NONE && release_all` clears everything.
    pub fn clear_group_aff(&self, dst_id: DstId, release_all: bool) -> Vec<RadioId> {
        let mut inner = self.inner.lock().unwrap();

        if dst_id == DstId::NONE && !release_all {
            return Vec::new();
        }

        let to_release: Vec<RadioId> = if dst_id == DstId::NONE && release_all {
            tracing::warn!(table = %self.name, "releasing all group affiliations");
            inner.group_aff.keys().copied().collect()
        } else {
            tracing::warn!(table = %self.name, %dst_id, "releasing group affiliations");
            inner
                .group_aff
                .iter()
                .filter(|(_, d)| **d == dst_id)
                .map(|(s, _)| *s)
                .collect()
        };

        for src_id in &to_release {
            inner.group_aff.remove(src_id);
        }

        to_release
    }

    // -- channel grants -------------------------------------------------------

    pub fn grant_ch(
        &self,
        dst_id: DstId,
        src_id: RadioId,
        timeout_secs: u32,
        group: bool,
        net_granted: bool,
    ) -> AffiliationResult<u32> {
        let mut inner = self.inner.lock().unwrap();

        if dst_id == DstId::NONE {
            return Err(AffiliationError::NoChannel);
        }
        if !inner.channel_pool.is_available() {
            return Err(AffiliationError::NoChannel);
        }

        let channel = inner.channel_pool.take_first().expect("checked availability above");
        let entry = GrantEntry {
            channel,
            src_id,
            group,
            net_granted,
        };
        let mut timer = GrantTimer::new(timeout_secs);
        timer.start();
        inner.grants.insert(dst_id, (entry, timer));

        tracing::debug!(table = %self.name, channel, %dst_id, %src_id, group, "granting channel");
        Ok(channel)
    }

    pub fn touch_grant(&self, dst_id: DstId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some((_, timer)) = inner.grants.get_mut(&dst_id) {
            timer.start();
        }
    }

    /// Releases the grant for `dst_id`, or every grant if `release_all`.
    /// Clears the channel-pool return, the grant entry, and the grant timer
    /// together in one critical section.
    pub fn release_grant(&self, dst_id: DstId, release_all: bool) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if dst_id == DstId::NONE && !release_all {
            return false;
        }

        if dst_id == DstId::NONE && release_all {
            tracing::warn!(table = %self.name, "force releasing all channel grants");
            let dst_ids: Vec<DstId> = inner.grants.keys().copied().collect();
            drop(inner);
            for dst_id in dst_ids {
                self.release_grant(dst_id, false);
            }
            return true;
        }

        release_one_locked(&mut inner, &self.name, dst_id)
    }

    pub fn is_ch_busy(&self, channel: u32) -> bool {
        if channel == 0 {
            return false;
        }
        self.inner.lock().unwrap().grants.values().any(|(entry, _)| entry.channel == channel)
    }

    pub fn is_granted(&self, dst_id: DstId) -> bool {
        if dst_id == DstId::NONE {
            return false;
        }
        self.inner.lock().unwrap().grants.contains_key(&dst_id)
    }

    /// A destination id with no recorded grant is treated as a group call.
    pub fn is_group(&self, dst_id: DstId) -> bool {
        if dst_id == DstId::NONE {
            return true;
        }
        match self.inner.lock().unwrap().grants.get(&dst_id) {
            Some((entry, _)) => entry.group,
            None => true,
        }
    }

    pub fn is_net_granted(&self, dst_id: DstId) -> bool {
        if dst_id == DstId::NONE {
            return false;
        }
        matches!(self.inner.lock().unwrap().grants.get(&dst_id), Some((entry, _)) if entry.net_granted)
    }

    pub fn granted_ch(&self, dst_id: DstId) -> Option<u32> {
        if dst_id == DstId::NONE {
            return None;
        }
        self.inner.lock().unwrap().grants.get(&dst_id).map(|(e, _)| e.channel)
    }

    pub fn granted_src_id(&self, dst_id: DstId) -> Option<RadioId> {
        if dst_id == DstId::NONE {
            return None;
        }
        self.inner.lock().unwrap().grants.get(&dst_id).map(|(e, _)| e.src_id)
    }

    pub fn granted_by_src_id(&self, src_id: RadioId) -> Option<DstId> {
        if src_id.0 == 0 {
            return None;
        }
        self.inner
            .lock()
            .unwrap()
            .grants
            .iter()
            .find(|(_, (e, _))| e.src_id == src_id)
            .map(|(dst, _)| *dst)
    }

    pub fn granted_count(&self) -> usize {
        self.inner.lock().unwrap().grants.len()
    }

    /// Advances every grant timer by `ms`. Expired grants are collected in a
    /// first pass, then released in a second — the grant map must not be
    /// mutated while it's being iterated.
    pub fn clock(&self, ms: u64) {
        let expired: Vec<DstId> = {
            let mut inner = self.inner.lock().unwrap();
            let mut expired = Vec::new();
            for (dst_id, (_, timer)) in inner.grants.iter_mut() {
                timer.clock(ms);
                if timer.is_running() && timer.has_expired() {
                    expired.push(*dst_id);
                }
            }
            expired
        };

        for dst_id in expired {
            self.release_grant(dst_id, false);
        }
    }
}

fn group_unaff_locked(inner: &mut Inner, src_id: RadioId) -> bool {
    inner.group_aff.remove(&src_id).is_some()
}

fn release_one_locked(inner: &mut Inner, name: &str, dst_id: DstId) -> bool {
    let Some((entry, mut timer)) = inner.grants.remove(&dst_id) else {
        return false;
    };

    tracing::debug!(table = name, channel = entry.channel, %dst_id, "releasing channel grant");

    if let Some(cb) = inner.release_grant.as_ref() {
        cb(entry.channel, dst_id, 0);
    }

    inner.channel_pool.release(entry.channel, true);
    timer.stop();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_reg_is_idempotent() {
        let table = AffiliationTable::new("test", [1]);
        table.unit_reg(RadioId(100));
        table.unit_reg(RadioId(100));
        assert!(table.is_unit_reg(RadioId(100)));
    }

    #[test]
    fn unit_dereg_clears_group_affiliation() {
        let table = AffiliationTable::new("test", [1]);
        table.unit_reg(RadioId(100));
        table.group_aff(RadioId(100), DstId(2000));
        assert!(table.unit_dereg(RadioId(100)));
        assert!(!table.is_group_aff(RadioId(100), DstId(2000)));
    }

    #[test]
    fn grant_ch_fails_without_free_channel() {
        let table = AffiliationTable::new("test", []);
        let err = table.grant_ch(DstId(2000), RadioId(100), 10, true, false).unwrap_err();
        assert_eq!(err, AffiliationError::NoChannel);
    }

    #[test]
    fn release_grant_clears_all_three_tables_together() {
        let table = AffiliationTable::new("test", [1, 2, 3]);
        let ch = table.grant_ch(DstId(2000), RadioId(100), 10, true, true).unwrap();
        assert!(table.is_granted(DstId(2000)));
        assert!(table.is_ch_busy(ch));
        assert_eq!(table.granted_by_src_id(RadioId(100)), Some(DstId(2000)));

        assert!(table.release_grant(DstId(2000), false));

        assert!(!table.is_granted(DstId(2000)));
        assert!(!table.is_ch_busy(ch));
        assert_eq!(table.granted_by_src_id(RadioId(100)), None);
        assert!(!table.is_net_granted(DstId(2000)));
    }

    #[test]
    fn clock_releases_expired_grants_in_two_passes() {
        let table = AffiliationTable::new("test", [1, 2]);
        table.grant_ch(DstId(2000), RadioId(100), 1, true, false).unwrap();
        table.grant_ch(DstId(2001), RadioId(101), 10, true, false).unwrap();

        table.clock(1500);

        assert!(!table.is_granted(DstId(2000)));
        assert!(table.is_granted(DstId(2001)));
    }

    #[test]
    fn touch_grant_restarts_timer_so_it_does_not_expire_early() {
        let table = AffiliationTable::new("test", [1]);
        table.grant_ch(DstId(2000), RadioId(100), 2, true, false).unwrap();
        table.clock(1500);
        table.touch_grant(DstId(2000));
        table.clock(1500);
        assert!(table.is_granted(DstId(2000)));
    }

    #[test]
    fn release_all_drains_every_grant() {
        let table = AffiliationTable::new("test", [1, 2]);
        table.grant_ch(DstId(2000), RadioId(100), 10, true, false).unwrap();
        table.grant_ch(DstId(2001), RadioId(101), 10, true, false).unwrap();

        assert!(table.release_grant(DstId::NONE, true));

        assert_eq!(table.granted_count(), 0);
    }
}
