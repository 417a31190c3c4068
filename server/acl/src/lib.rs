pub mod error;
pub mod id_list;
pub mod peer_list;
pub mod talkgroup_rules;

pub use error::{AclError, AclResult};
pub use id_list::{IdEntry, IdListAcl, ListMode};
pub use peer_list::{PeerList, PeerListEntry};
pub use talkgroup_rules::{RouteRewrite, RuleConfig, TalkgroupRule, TalkgroupRules, TalkgroupSource};
