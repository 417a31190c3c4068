mod factory;
mod frame;
mod hello;
mod inventory;
mod keyset;
mod modify_key;
mod registration;
mod simple;

pub use factory::KmmFrame;
pub use frame::{KmmHeader, KmmMessageId, KmmResponseKind, KMM_HEADER_LENGTH};
pub use hello::{Hello, HelloFlag};
pub use inventory::{InventoryCommand, InventoryResponse, InventoryResponseBody, InventoryType};
pub use keyset::{KeyItem, KeysetItem};
pub use modify_key::{DecryptInstructFormat, ModifyKeyCommand, ALGO_UNENCRYPT};
pub use registration::{RegistrationCommand, RegistrationResponse};
pub use simple::{HeaderOnlyFrame, NegativeAck};
