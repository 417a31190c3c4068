pub mod activity;
pub mod announce;
pub mod callbacks;
pub mod config;
pub mod decoder;
pub mod diag;
pub mod network;
pub mod peer_table;

pub use activity::{ActivitySink, DailyFileActivitySink, NoopActivitySink};
pub use callbacks::{NoopPeerLifecycleCallbacks, PeerLifecycleCallbacks};
pub use config::{Cli, FneSettings, ProtocolEnable};
pub use decoder::{FrameDecoder, UnimplementedFrameDecoder};
pub use diag::DiagNetwork;
pub use network::{FneNetwork, Routers};
pub use peer_table::{ManagedPeer, PeerTable};
