pub mod error;
pub mod service;
pub mod status;

pub use error::{RpcError, RpcResult};
pub use service::{RpcHandler, RpcService};
pub use status::RpcStatus;
