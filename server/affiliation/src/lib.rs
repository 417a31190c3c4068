pub mod channel_pool;
pub mod error;
pub mod table;
pub mod timer;

pub use channel_pool::ChannelPool;
pub use error::{AffiliationError, AffiliationResult};
pub use table::{AffiliationTable, GrantEntry, ReleaseCallback};
pub use timer::GrantTimer;
