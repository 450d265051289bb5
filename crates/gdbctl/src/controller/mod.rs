mod async_ctrl;
mod sync_ctrl;

pub use async_ctrl::{AsyncController, RecvTimeout};
pub use sync_ctrl::SyncController;
pub(crate) use sync_ctrl::RESERVED_METHOD_NAMES;
