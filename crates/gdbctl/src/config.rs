use std::time::Duration;

/// Constructor-level configuration for an [`crate::controller::AsyncController`]
/// / [`crate::controller::SyncController`] pair.
///
/// Named-field builder in place of the source's long positional argument
/// lists (`token_start=87362, timeout=None, ...`).
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// First token value; `None` disables auto-tokenization (sends carry an
    /// empty token).
    pub token_start: Option<u64>,
    /// Default `recv` timeout. `None` means block indefinitely.
    pub timeout: Option<Duration>,
    /// PTY dimensions as `(rows, cols)`, mirrored into the child's
    /// `LINES`/`COLUMNS` environment.
    pub geometry: (u16, u16),
    /// Encoding passed through to the PTY; retained for parity with the
    /// source's `encoding` option. UTF-8 is the only encoding this
    /// implementation currently reads lines as.
    pub encoding: String,
    /// Skip `~/.gdbinit`/site init files (`--nh --nx`) when true.
    pub noinit: bool,
    /// Sync Controller only: force terminal styling on/off regardless of
    /// detected capability. `None` defers to detection.
    pub force_styling: Option<bool>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            token_start: Some(87362),
            timeout: Some(Duration::from_secs(1)),
            geometry: (24, 80),
            encoding: "utf-8".to_string(),
            noinit: true,
            force_styling: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_constants() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.token_start, Some(87362));
        assert_eq!(cfg.geometry, (24, 80));
        assert!(cfg.noinit);
        assert_eq!(cfg.force_styling, None);
    }
}
