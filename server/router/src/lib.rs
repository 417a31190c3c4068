pub mod error;
pub mod fanout;
pub mod parrot;
pub mod router;
pub mod routing_info;
pub mod rx_status;

pub use error::{RouterError, RouterResult};
pub use fanout::PeerFanoutInfo;
pub use parrot::{ParrotBuffer, ParrotFrame};
pub use router::{ClockOutcome, OutboundFrame, ProtocolRouter, RouteOutcome};
pub use routing_info::{rewrite_dmr_slot, RoutingInfo, DMR_SLOT_BIT, DMR_SLOT_BYTE_OFFSET};
pub use rx_status::{RxStatus, RxStatusTable};
