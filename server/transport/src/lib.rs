pub mod crypto;
pub mod error;
pub mod queue;
pub mod socket;

pub use crypto::PresharedKey;
pub use error::{TransportError, TransportResult};
pub use queue::{DecodedFrame, FrameQueue, RawFrameQueue};
pub use socket::{FneSocket, DATA_PACKET_LENGTH};
