use std::time::Duration;

use gdbmi_codec::Record;
use tracing::{error, info};

use crate::config::ControllerConfig;
use crate::errors::CtrlError;
use crate::pty::{PtyHost, ReadOutcome};

/// How long a single `recv` call is willing to wait for the next line.
#[derive(Debug, Clone, Copy)]
pub enum RecvTimeout {
    /// Use the controller's configured default (`timeout=-1` in the source).
    Inherit,
    /// Block indefinitely (`timeout=None` in the source).
    Infinite,
    /// Wait at most this long.
    After(Duration),
}

impl RecvTimeout {
    fn resolve(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            RecvTimeout::Inherit => default,
            RecvTimeout::Infinite => None,
            RecvTimeout::After(d) => Some(d),
        }
    }
}

/// Low-level primitive: spawn, tokenized send, one-record-at-a-time recv,
/// escalating shutdown. Owns the token counter and the PTY child.
///
/// Grounded on `examples/original_source/gdb_ctrl.py`'s `GDBCtrl` class for
/// exact sequencing and on `kild-daemon`'s `ManagedPty` for the Rust
/// ownership shape — here a single `Option<PtyHost>` rather than a map,
/// since at most one child may be live per controller.
pub struct AsyncController {
    pty: Option<PtyHost>,
    token_counter: Option<u64>,
    timeout_default: Option<Duration>,
    geometry: (u16, u16),
}

impl AsyncController {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            pty: None,
            token_counter: config.token_start,
            timeout_default: config.timeout,
            geometry: config.geometry,
        }
    }

    pub fn is_spawned(&self) -> bool {
        self.pty.is_some()
    }

    pub fn timeout_default(&self) -> Option<Duration> {
        self.timeout_default
    }

    /// Spawn the debugger. Fails with `AlreadyRunning` if a child is
    /// already live. Assembles argv exactly per the source: binary
    /// (default `gdb`), `--data-directory=<path>` if given, `--quiet`,
    /// `-interpreter=mi`, then `--nh --nx` if `noinit`. Issues
    /// `set confirm off` as the first command once the startup banner has
    /// been dropped.
    pub async fn spawn(
        &mut self,
        path_to_binary: Option<&str>,
        path_to_data: Option<&str>,
        extra_args: &[String],
        noinit: bool,
    ) -> Result<(), CtrlError> {
        if self.pty.is_some() {
            return Err(CtrlError::AlreadyRunning);
        }

        let cmd = path_to_binary.unwrap_or("gdb").to_string();
        let mut args: Vec<String> = extra_args.to_vec();
        if let Some(data_dir) = path_to_data {
            args.push(format!("--data-directory={data_dir}"));
        }
        args.push("--quiet".to_string());
        args.push("-interpreter=mi".to_string());
        if noinit {
            args.push("--nh".to_string());
            args.push("--nx".to_string());
        }

        let (rows, cols) = self.geometry;
        let env = vec![
            ("LINES".to_string(), rows.to_string()),
            ("COLUMNS".to_string(), cols.to_string()),
        ];

        info!(event = "gdbctl.controller.spawn_started", command = %cmd);

        let mut pty = PtyHost::spawn(&cmd, &args, &env, self.geometry)?;

        match pty.expect(|line| line == "(gdb)", self.timeout_default).await {
            ReadOutcome::Line(_) => {}
            ReadOutcome::Eof => {
                error!(event = "gdbctl.controller.spawn_failed", reason = "eof");
                return Err(CtrlError::UnexpectedEof);
            }
            ReadOutcome::Timeout => {
                error!(event = "gdbctl.controller.spawn_failed", reason = "timeout");
                return Err(CtrlError::UnexpectedEof);
            }
        }

        self.pty = Some(pty);
        self.send("set confirm off", None).await?;

        let pty = self.pty.as_mut().expect("just assigned");
        match pty.expect(|line| line == "(gdb)", self.timeout_default).await {
            ReadOutcome::Line(_) => {}
            ReadOutcome::Eof | ReadOutcome::Timeout => {
                error!(event = "gdbctl.controller.spawn_failed", reason = "confirm_off_eof");
                return Err(CtrlError::UnexpectedEof);
            }
        }

        info!(event = "gdbctl.controller.spawn_completed");
        Ok(())
    }

    /// Send a command without waiting for any response. `cmd` must not end
    /// with a newline — GDB would re-execute the previous command. Returns
    /// the token used (possibly empty, if auto-tokenization is disabled).
    pub async fn send(&mut self, cmd: &str, token: Option<String>) -> Result<String, CtrlError> {
        if cmd.ends_with('\n') {
            return Err(CtrlError::InvalidCommand(
                "command must not end with a newline".to_string(),
            ));
        }

        let token = match token {
            Some(t) => t,
            None => match self.token_counter {
                Some(n) => {
                    self.token_counter = Some(n + 1);
                    n.to_string()
                }
                None => String::new(),
            },
        };

        let pty = self
            .pty
            .as_mut()
            .ok_or_else(|| CtrlError::InvalidCommand("controller is not spawned".to_string()))?;

        let wire = format!("{token}{cmd}\n");
        pty.send_bytes(wire.as_bytes())?;

        Ok(token)
    }

    /// Receive the next record. Returns `None` on EOF or on timeout —
    /// callers retry on timeout.
    pub async fn recv(&mut self, timeout: RecvTimeout) -> Result<Option<Record>, CtrlError> {
        let pty = self
            .pty
            .as_mut()
            .ok_or_else(|| CtrlError::InvalidCommand("controller is not spawned".to_string()))?;

        let resolved = timeout.resolve(self.timeout_default);
        match pty.recv_line(resolved).await {
            ReadOutcome::Line(line) => {
                let with_nl = format!("{line}\n");
                let record = gdbmi_codec::parse_line(&with_nl)?;
                Ok(Some(record))
            }
            ReadOutcome::Eof | ReadOutcome::Timeout => Ok(None),
        }
    }

    /// Idempotent escalating teardown: SIGINT, 0.5s, `-gdb-exit`, stdin EOF,
    /// drain up to 5s per read, then force-close. A no-op when already
    /// terminated.
    pub async fn shutdown(&mut self) {
        let Some(pty) = self.pty.as_mut() else {
            return;
        };

        info!(event = "gdbctl.controller.shutdown_started");

        let _ = pty.send_interrupt();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let _ = pty.send_bytes(b"-gdb-exit\n");
        pty.send_eof();

        loop {
            match pty.drain_once(1024, Duration::from_secs(5)).await {
                Some(_) => continue,
                None => break,
            }
        }

        let _ = pty.close(true);
        self.pty = None;

        info!(event = "gdbctl.controller.shutdown_completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_path() -> String {
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fake_gdb.sh").to_string()
    }

    #[tokio::test]
    async fn send_rejects_trailing_newline() {
        let mut ctrl = AsyncController::new(&ControllerConfig::default());
        let err = ctrl.send("-exec-run\n", None).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_command");
    }

    #[tokio::test]
    async fn spawn_then_double_spawn_is_already_running() {
        let mut ctrl = AsyncController::new(&ControllerConfig::default());
        ctrl.spawn(Some(&fixture_path()), None, &[], true)
            .await
            .unwrap();
        let err = ctrl
            .spawn(Some(&fixture_path()), None, &[], true)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "already_running");
        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn token_counter_increases_monotonically() {
        let mut ctrl = AsyncController::new(&ControllerConfig::default());
        ctrl.spawn(Some(&fixture_path()), None, &[], true)
            .await
            .unwrap();
        let t1 = ctrl.send("-list-features", None).await.unwrap();
        let t2 = ctrl.send("-list-features", None).await.unwrap();
        assert_eq!(t1, "87362");
        assert_eq!(t2, "87363");
        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn disabled_tokenization_sends_empty_token() {
        let mut cfg = ControllerConfig::default();
        cfg.token_start = None;
        let mut ctrl = AsyncController::new(&cfg);
        ctrl.spawn(Some(&fixture_path()), None, &[], true)
            .await
            .unwrap();
        let token = ctrl.send("-list-features", None).await.unwrap();
        assert_eq!(token, "");
        ctrl.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut ctrl = AsyncController::new(&ControllerConfig::default());
        ctrl.spawn(Some(&fixture_path()), None, &[], true)
            .await
            .unwrap();
        ctrl.shutdown().await;
        ctrl.shutdown().await;
        assert!(!ctrl.is_spawned());
    }
}
