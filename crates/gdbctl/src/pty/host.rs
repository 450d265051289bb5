use std::io::{Read, Write};
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, error, info};

use crate::errors::CtrlError;

/// Outcome of a single-line read from the child's stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, newline stripped.
    Line(String),
    /// The child closed its end (process exited or descriptor closed).
    Eof,
    /// No line arrived before the timeout elapsed. The reader is not
    /// disturbed: a later call resumes where this one left off.
    Timeout,
}

/// Owns exactly one PTY-attached child process: the write half of its stdin
/// and a line-buffered, timeout-aware read half of its stdout.
///
/// Grounded on `examples/Wirasm-shards/crates/kild-daemon/src/pty/manager.rs`
/// (`portable_pty` setup, `take_writer()` once) and `.../pty/output.rs` (a
/// background reader forwarding bytes off the blocking PTY fd), adapted from
/// that crate's multi-session `HashMap`-of-PTYs shape down to a single owned
/// child, since `AsyncController::spawn` forbids more than one live child.
/// The reader here runs on a plain `std::thread`, not
/// `tokio::task::spawn_blocking`, because the controller does not assume a
/// multi-threaded Tokio runtime is available (see DESIGN.md).
pub struct PtyHost {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Option<Box<dyn Write + Send>>,
    lines_rx: tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>,
    reader_handle: Option<std::thread::JoinHandle<()>>,
    line_buf: Vec<u8>,
}

impl PtyHost {
    /// Spawn `cmd args...` under a PTY sized `geometry = (rows, cols)`, with
    /// `env` merged over the inherited environment.
    pub fn spawn(
        cmd: &str,
        args: &[String],
        env: &[(String, String)],
        geometry: (u16, u16),
    ) -> Result<Self, CtrlError> {
        let (rows, cols) = geometry;
        let pty_system = native_pty_system();
        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system
            .openpty(size)
            .map_err(|e| CtrlError::Pty(format!("openpty: {e}")))?;

        let mut builder = CommandBuilder::new(cmd);
        builder.args(args);
        for (key, value) in env {
            builder.env(key, value);
        }

        info!(event = "gdbctl.pty.spawn_started", command = cmd);

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| CtrlError::Pty(format!("spawn: {e}")))?;
        let pid = child.process_id();

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| CtrlError::Pty(format!("take writer: {e}")))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| CtrlError::Pty(format!("clone reader: {e}")))?;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let reader_handle = spawn_reader_thread(reader, tx);

        info!(event = "gdbctl.pty.spawn_completed", pid = ?pid);

        Ok(Self {
            master: pair.master,
            child,
            writer: Some(writer),
            lines_rx: rx,
            reader_handle: Some(reader_handle),
            line_buf: Vec::new(),
        })
    }

    /// Write raw bytes to the child's stdin, flushing immediately. There is
    /// no artificial delay before the write: `portable-pty` has no
    /// equivalent of `delaybeforesend` to disable in the first place.
    pub fn send_bytes(&mut self, data: &[u8]) -> Result<(), CtrlError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CtrlError::Pty("stdin already closed".to_string()))?;
        writer
            .write_all(data)
            .map_err(|e| CtrlError::Pty(format!("write stdin: {e}")))?;
        writer
            .flush()
            .map_err(|e| CtrlError::Pty(format!("flush stdin: {e}")))?;
        Ok(())
    }

    /// Read the next complete line, suspending cooperatively until one
    /// arrives, EOF is hit, or `timeout` elapses. `None` timeout blocks
    /// indefinitely.
    pub async fn recv_line(&mut self, timeout: Option<Duration>) -> ReadOutcome {
        // A line may already be sitting in line_buf from a previous partial
        // read (shouldn't happen since the reader thread only forwards
        // whole-line chunks, but kept for clarity/robustness of the split).
        let recv_fut = self.lines_rx.recv();
        let received = match timeout {
            Some(d) => match tokio::time::timeout(d, recv_fut).await {
                Ok(v) => v,
                Err(_) => return ReadOutcome::Timeout,
            },
            None => recv_fut.await,
        };

        match received {
            Some(bytes) => {
                let line = String::from_utf8_lossy(&bytes).into_owned();
                // GDB's own prompt line is `"(gdb) \n"` — a trailing space
                // before the newline — so a bare `['\r', '\n']` strip would
                // leave callers comparing against `"(gdb) "` instead of
                // `"(gdb)"`. Trim all trailing whitespace, not just the line
                // terminator.
                let line = line.trim_end();
                ReadOutcome::Line(line.to_string())
            }
            None => ReadOutcome::Eof,
        }
    }

    /// Read lines until `is_match` accepts one, or EOF/timeout. Used by
    /// `AsyncController::spawn` to drop the startup banner up to the first
    /// `(gdb)` prompt — the PTY-host analogue of the source's
    /// `expect([r'\(gdb\) \r?\n', pexpect.EOF], async_=True)`.
    pub async fn expect(
        &mut self,
        is_match: impl Fn(&str) -> bool,
        timeout: Option<Duration>,
    ) -> ReadOutcome {
        loop {
            match self.recv_line(timeout).await {
                ReadOutcome::Line(line) => {
                    if is_match(&line) {
                        return ReadOutcome::Line(line);
                    }
                }
                other => return other,
            }
        }
    }

    /// Send SIGINT-equivalent to wake a blocked child.
    pub fn send_interrupt(&self) -> Result<(), CtrlError> {
        let Some(pid) = self.child.process_id() else {
            return Ok(());
        };
        signal::kill(Pid::from_raw(pid as i32), Signal::SIGINT)
            .map_err(|e| CtrlError::Pty(format!("sigint: {e}")))
    }

    /// Close stdin, signalling EOF to the child.
    pub fn send_eof(&mut self) {
        self.writer = None;
    }

    /// Read up to `max_bytes` raw bytes with a bounded timeout, discarding
    /// them. Used by shutdown's drain step; returns the number of bytes
    /// read, or `None` on timeout/EOF/error.
    pub async fn drain_once(&mut self, max_bytes: usize, timeout: Duration) -> Option<usize> {
        match tokio::time::timeout(timeout, self.lines_rx.recv()).await {
            Ok(Some(bytes)) => Some(bytes.len().min(max_bytes).max(1)),
            _ => None,
        }
    }

    /// Force-close the child if it is still alive (SIGKILL-equivalent).
    pub fn close(&mut self, force: bool) -> Result<(), CtrlError> {
        if force {
            if let Err(e) = self.child.kill() {
                debug!(event = "gdbctl.pty.close_kill_failed", error = %e);
            }
        }
        let _ = self.child.wait();
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for PtyHost {
    fn drop(&mut self) {
        let _ = self.close(true);
    }
}

fn spawn_reader_thread(
    mut reader: Box<dyn Read + Send>,
    tx: tokio::sync::mpsc::UnboundedSender<Vec<u8>>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut pending = Vec::new();
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = pending.drain(..=pos).collect();
                        if tx.send(line).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!(event = "gdbctl.pty.reader_error", error = %e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_echo_and_read_a_line() {
        let mut host =
            PtyHost::spawn("/bin/echo", &["hello".to_string()], &[], (24, 80)).unwrap();
        let outcome = host.recv_line(Some(Duration::from_secs(5))).await;
        assert_eq!(outcome, ReadOutcome::Line("hello".to_string()));
    }

    #[tokio::test]
    async fn recv_line_times_out_with_nothing_pending() {
        let mut host = PtyHost::spawn("/bin/sleep", &["5".to_string()], &[], (24, 80)).unwrap();
        let outcome = host.recv_line(Some(Duration::from_millis(50))).await;
        assert_eq!(outcome, ReadOutcome::Timeout);
        host.close(true).unwrap();
    }

    #[tokio::test]
    async fn close_force_kills_child() {
        let mut host = PtyHost::spawn("/bin/sleep", &["30".to_string()], &[], (24, 80)).unwrap();
        host.close(true).unwrap();
    }

    #[tokio::test]
    async fn recv_line_strips_the_space_before_the_gdb_prompt_newline() {
        let mut host =
            PtyHost::spawn("/bin/printf", &["(gdb) \\n".to_string()], &[], (24, 80)).unwrap();
        let outcome = host.recv_line(Some(Duration::from_secs(5))).await;
        assert_eq!(outcome, ReadOutcome::Line("(gdb)".to_string()));
    }
}
