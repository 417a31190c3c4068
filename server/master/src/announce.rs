use fne_acl::{IdListAcl, TalkgroupRules};

/// Bit layout of the trailing flags byte on each TGID entry in a
/// `MASTER_SUBFUNC_ACTIVE_TGS`/`DEACTIVE_TGS` announcement, per §4.6.
const TG_FLAG_AFFILIATED: u8 = 0x01;
const TG_FLAG_NON_PREFERRED: u8 = 0x02;
const TG_SLOT_SHIFT: u8 = 2;

/// Encodes a whitelist/blacklist RID announcement body: a 16-bit count
/// followed by one 24-bit radio id per entry.
pub fn encode_rid_list(ids: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + ids.len() * 3);
    out.extend_from_slice(&(ids.len() as u16).to_be_bytes());
    for id in ids {
        let be = id.to_be_bytes();
        out.extend_from_slice(&be[1..4]);
    }
    out
}

/// Encodes an active/deactive talkgroup announcement body: a 16-bit count
/// followed by `{tgid(3) | flags(1)}` per entry, flags packing `affiliated`,
/// `nonPreferred`, and the DMR slot (0 for P25/NXDN).
pub fn encode_tg_list(rules: &[fne_acl::TalkgroupRule]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + rules.len() * 4);
    out.extend_from_slice(&(rules.len() as u16).to_be_bytes());
    for rule in rules {
        let be = rule.source.tgid.to_be_bytes();
        out.extend_from_slice(&be[1..4]);

        let mut flags = (rule.source.slot & 0x03) << TG_SLOT_SHIFT;
        if rule.config.affiliated {
            flags |= TG_FLAG_AFFILIATED;
        }
        if rule.config.non_preferred {
            flags |= TG_FLAG_NON_PREFERRED;
        }
        out.push(flags);
    }
    out
}

/// Every radio id currently in `acl`'s table, for a whitelist/blacklist
/// announcement. Skipped entirely (by the caller) when the ACL isn't
/// enabled, matching `IdListAcl::is_allowed`'s "disabled means everyone"
/// semantics: an unused list has nothing worth announcing.
pub fn rid_ids(acl: &IdListAcl) -> Vec<u32> {
    acl.entries().into_iter().map(|e| e.id).collect()
}

pub fn active_tgs(rules: &TalkgroupRules) -> Vec<fne_acl::TalkgroupRule> {
    rules.all().into_iter().filter(|r| r.config.active).collect()
}

pub fn deactive_tgs(rules: &TalkgroupRules) -> Vec<fne_acl::TalkgroupRule> {
    rules.all().into_iter().filter(|r| !r.config.active).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fne_acl::{RuleConfig, TalkgroupRule, TalkgroupSource};

    #[test]
    fn rid_list_encodes_count_and_24_bit_ids() {
        let encoded = encode_rid_list(&[1, 0x00FFFFFF]);
        assert_eq!(&encoded[0..2], &[0x00, 0x02]);
        assert_eq!(&encoded[2..5], &[0x00, 0x00, 0x01]);
        assert_eq!(&encoded[5..8], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn tg_list_packs_flags_byte() {
        let rule = TalkgroupRule {
            source: TalkgroupSource { tgid: 100, slot: 2 },
            config: RuleConfig { active: true, affiliated: true, non_preferred: true, ..Default::default() },
            ..Default::default()
        };
        let encoded = encode_tg_list(&[rule]);
        assert_eq!(&encoded[0..2], &[0x00, 0x01]);
        assert_eq!(&encoded[2..5], &[0x00, 0x00, 100]);
        let flags = encoded[5];
        assert_eq!(flags & 0x03, 0x03);
        assert_eq!(flags >> TG_SLOT_SHIFT, 2);
    }
}
