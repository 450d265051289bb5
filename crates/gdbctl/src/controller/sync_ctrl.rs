use gdbmi_codec::Record;
use tracing::info;

use super::async_ctrl::{AsyncController, RecvTimeout};
use crate::binder::BoundCommands;
use crate::config::ControllerConfig;
use crate::errors::CtrlError;
use crate::printer::{self, StylingCapability};

/// The controller's own public method names, used by the Dynamic Command
/// Binder to decide which discovered gdb commands need `z`-prefixing to
/// avoid shadowing a real method (`spec.md` §9: "prefer the derived
/// approach"). Rust has no `dir(self)`, so unlike
/// `examples/original_source/gdb_ctrl.py`'s `SyncGDBCtrl` this list is a
/// literal kept in sync with the methods below by hand rather than computed
/// at runtime — the closest a statically typed surface gets to "derived".
pub(crate) const RESERVED_METHOD_NAMES: &[&str] = &[
    "spawn",
    "shutdown",
    "send",
    "recv",
    "recv_all",
    "execute",
    "bind_commands",
    "call",
    "available_commands",
];

/// Drives an [`AsyncController`] to completion on a private single-threaded
/// Tokio runtime, one public call at a time. Adds `recv_all`/`execute` for
/// interactive use, and owns the bound dynamic command surface and the
/// pretty printer's styling capability.
///
/// Grounded on `examples/original_source/gdb_ctrl.py`'s
/// `SyncGDBCtrl._sync_call` (`loop.run_until_complete`) and
/// `examples/Wirasm-shards/crates/kild-daemon/src/main.rs`'s
/// `rt.block_on(...)` for how the teacher bridges sync callers onto an
/// async core.
pub struct SyncController {
    async_ctrl: AsyncController,
    rt: tokio::runtime::Runtime,
    pub last_batch: Vec<Record>,
    styling: StylingCapability,
    bound: BoundCommands,
}

impl SyncController {
    pub fn new(config: &ControllerConfig) -> Result<Self, CtrlError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        Ok(Self {
            async_ctrl: AsyncController::new(config),
            rt,
            last_batch: Vec::new(),
            styling: StylingCapability::detect(config.force_styling),
            bound: BoundCommands::new(),
        })
    }

    pub fn is_spawned(&self) -> bool {
        self.async_ctrl.is_spawned()
    }

    pub fn styling(&self) -> StylingCapability {
        self.styling
    }

    pub fn spawn(
        &mut self,
        path_to_binary: Option<&str>,
        path_to_data: Option<&str>,
        extra_args: &[String],
        noinit: bool,
    ) -> Result<(), CtrlError> {
        let async_ctrl = &mut self.async_ctrl;
        self.rt
            .block_on(async_ctrl.spawn(path_to_binary, path_to_data, extra_args, noinit))
    }

    pub fn shutdown(&mut self) {
        let async_ctrl = &mut self.async_ctrl;
        self.rt.block_on(async_ctrl.shutdown());
        info!(event = "gdbctl.sync_controller.shutdown_completed");
    }

    pub fn send(&mut self, cmd: &str, token: Option<String>) -> Result<String, CtrlError> {
        let async_ctrl = &mut self.async_ctrl;
        self.rt.block_on(async_ctrl.send(cmd, token))
    }

    pub fn recv(&mut self) -> Result<Option<Record>, CtrlError> {
        let async_ctrl = &mut self.async_ctrl;
        self.rt.block_on(async_ctrl.recv(RecvTimeout::Inherit))
    }

    /// Drain records until a `Prompt` is observed (only when the effective
    /// timeout is infinite) or `recv` returns `None` (timeout/EOF). Neither
    /// sentinel is included in the returned batch. Pretty-prints each record
    /// in arrival order when `pretty_print` is true.
    ///
    /// When the effective timeout is infinite, `recv` has no timeout of its
    /// own to expire, so a `None` there can only mean EOF arrived before the
    /// `Prompt` sentinel did — a desynchronized episode (spec §7). That case
    /// surfaces as `CtrlError::MissingPrompt` rather than a silently
    /// truncated batch. With a finite timeout, `None` is an ordinary timeout
    /// and ends the batch without error, as before.
    pub fn recv_all(
        &mut self,
        timeout: RecvTimeout,
        pretty_print: bool,
    ) -> Result<Vec<Record>, CtrlError> {
        let infinite = match timeout {
            RecvTimeout::Infinite => true,
            RecvTimeout::Inherit => self.async_ctrl.timeout_default().is_none(),
            RecvTimeout::After(_) => false,
        };

        let async_ctrl = &mut self.async_ctrl;
        let batch = self.rt.block_on(async move {
            let mut out = Vec::new();
            loop {
                match async_ctrl.recv(timeout).await? {
                    None if infinite => return Err(CtrlError::MissingPrompt),
                    None => break,
                    Some(Record::Prompt) => {
                        if infinite {
                            break;
                        }
                        continue;
                    }
                    Some(record) => out.push(record),
                }
            }
            Ok::<Vec<Record>, CtrlError>(out)
        })?;

        if pretty_print {
            for record in &batch {
                printer::print_record(record, self.styling);
            }
        }

        Ok(batch)
    }

    /// `send` followed by `recv_all`. Always updates `last_batch`; returns
    /// the batch only when `return_records` is true.
    pub fn execute(
        &mut self,
        cmd: &str,
        timeout: RecvTimeout,
        pretty_print: bool,
        return_records: bool,
    ) -> Result<Option<Vec<Record>>, CtrlError> {
        self.send(cmd, None)?;
        let batch = self.recv_all(timeout, pretty_print)?;
        self.last_batch = batch.clone();
        Ok(if return_records { Some(batch) } else { None })
    }

    /// Internal variant used by the Dynamic Command Binder: always returns
    /// the batch, never pretty-prints.
    pub(crate) fn execute_quiet(
        &mut self,
        cmd: &str,
        timeout: RecvTimeout,
    ) -> Result<Vec<Record>, CtrlError> {
        self.send(cmd, None)?;
        self.recv_all(timeout, false)
    }

    /// Discover the debugger's command vocabulary and attach callables to
    /// this controller's bound-command table. Best effort: commands that
    /// cannot be aliased or normalized are silently skipped.
    pub fn bind_commands(&mut self) -> Result<(), CtrlError> {
        crate::binder::discover(self)
    }

    /// Invoke a previously bound command by its normalized identifier,
    /// executing `<mi-name> <args...>` through [`Self::execute`].
    pub fn call(&mut self, identifier: &str, args: &[String]) -> Result<Vec<Record>, CtrlError> {
        let mi_name = self
            .bound
            .mi_name_for(identifier)
            .ok_or_else(|| CtrlError::InvalidCommand(format!("no bound command '{identifier}'")))?
            .to_string();

        let mut cmd = mi_name;
        for arg in args {
            cmd.push(' ');
            cmd.push_str(arg);
        }

        Ok(self
            .execute(&cmd, RecvTimeout::Inherit, true, true)?
            .unwrap_or_default())
    }

    /// List `(identifier, doc)` pairs for every bound command, in discovery
    /// order. Used for interactive tab-completion / `help`.
    pub fn available_commands(&self) -> Vec<(&str, &str)> {
        self.bound.entries()
    }

    pub(crate) fn bound_mut(&mut self) -> &mut BoundCommands {
        &mut self.bound
    }
}
