use std::io;

/// All error types surfaced by the controller crate.
#[derive(Debug, thiserror::Error)]
pub enum CtrlError {
    #[error("a gdb child is already running on this controller")]
    AlreadyRunning,

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("unexpected EOF while waiting for a prompt")]
    UnexpectedEof,

    #[error("episode ended without the '(gdb)' prompt sentinel")]
    MissingPrompt,

    #[error("MI codec error: {0}")]
    MiCodec(#[from] gdbmi_codec::MiCodecError),

    #[error("PTY error: {0}")]
    Pty(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CtrlError {
    /// Machine-readable classification, used by the binder's best-effort
    /// skip logic to tell "alias rejected" apart from "I/O broke".
    pub fn error_code(&self) -> &'static str {
        match self {
            CtrlError::AlreadyRunning => "already_running",
            CtrlError::InvalidCommand(_) => "invalid_command",
            CtrlError::UnexpectedEof => "unexpected_eof",
            CtrlError::MissingPrompt => "missing_prompt",
            CtrlError::MiCodec(_) => "mi_codec_error",
            CtrlError::Pty(_) => "pty_error",
            CtrlError::Io(_) => "io_error",
        }
    }

    /// Programming errors fail fast at the API boundary; everything else is
    /// a transient condition the caller may legitimately retry around.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, CtrlError::AlreadyRunning | CtrlError::InvalidCommand(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(CtrlError::AlreadyRunning.error_code(), "already_running");
        assert_eq!(
            CtrlError::InvalidCommand("x".into()).error_code(),
            "invalid_command"
        );
        assert_eq!(CtrlError::UnexpectedEof.error_code(), "unexpected_eof");
        assert_eq!(CtrlError::MissingPrompt.error_code(), "missing_prompt");
    }

    #[test]
    fn programming_errors_are_classified() {
        assert!(CtrlError::AlreadyRunning.is_programming_error());
        assert!(CtrlError::InvalidCommand("x".into()).is_programming_error());
        assert!(!CtrlError::UnexpectedEof.is_programming_error());
        assert!(!CtrlError::MissingPrompt.is_programming_error());
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err: CtrlError = io_err.into();
        assert_eq!(err.error_code(), "io_error");
    }

    #[test]
    fn mi_codec_error_conversion() {
        let codec_err = gdbmi_codec::MiCodecError::EmptyLine;
        let err: CtrlError = codec_err.into();
        assert_eq!(err.error_code(), "mi_codec_error");
    }
}
