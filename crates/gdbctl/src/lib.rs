//! Programmatic control of a GDB/MI-speaking debugger: spawn it behind a
//! PTY, talk `-interpreter=mi` to it, and read its output back as typed
//! records.
//!
//! Split the way `examples/Wirasm-shards` splits `kild-protocol` from
//! `kild-daemon`: the wire grammar lives in the standalone `gdbmi-codec`
//! crate, everything that owns a process and a runtime lives here.

pub mod binder;
pub mod config;
pub mod controller;
pub mod errors;
pub mod logging;
pub mod printer;
pub mod pty;

pub use config::ControllerConfig;
pub use controller::{AsyncController, RecvTimeout, SyncController};
pub use errors::CtrlError;
pub use gdbmi_codec::{AsyncKind, Record, ResultClass, StreamChannel};
