//! A small parser for the line-oriented GDB/MI protocol.
//!
//! `parse_line` turns a single line of GDB `-interpreter=mi` output into a
//! typed [`Record`]. This crate knows nothing about PTYs, processes, or
//! command/response correlation — it is the pure-function boundary the rest
//! of the `gdbctl` workspace treats as an external collaborator.
//!
//! Grammar reference: the GDB/MI Output Syntax and Result Records sections
//! of the GDB manual (`https://sourceware.org/gdb/onlinedocs/gdb/GDB_002fMI-Output-Syntax.html`).

mod parser;
mod value;

pub use value::{Map, Value};

use thiserror::Error;

/// Which of the three async sigils (`*`, `+`, `=`) produced this record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncKind {
    /// `*` — asynchronous state change on the target.
    Exec,
    /// `+` — progress information about a slow operation.
    Status,
    /// `=` — supplementary notification the client should handle.
    Notify,
}

impl AsyncKind {
    fn name(self) -> &'static str {
        match self {
            AsyncKind::Exec => "exec",
            AsyncKind::Status => "status",
            AsyncKind::Notify => "notify",
        }
    }
}

/// Which of the three stream channels (`~`, `@`, `&`) produced this record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamChannel {
    /// `~` — textual response to a CLI command, echoed as-is.
    Console,
    /// `@` — output produced by the debuggee (inferior) itself.
    Target,
    /// `&` — GDB's own internal log/diagnostic text.
    Log,
}

impl StreamChannel {
    fn name(self) -> &'static str {
        match self {
            StreamChannel::Console => "console",
            StreamChannel::Target => "target",
            StreamChannel::Log => "log",
        }
    }
}

/// The outcome class of a synchronous result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
}

impl ResultClass {
    fn name(self) -> &'static str {
        match self {
            ResultClass::Done => "done",
            ResultClass::Running => "running",
            ResultClass::Connected => "connected",
            ResultClass::Error => "error",
            ResultClass::Exit => "exit",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "done" => Some(ResultClass::Done),
            "running" => Some(ResultClass::Running),
            "connected" => Some(ResultClass::Connected),
            "error" => Some(ResultClass::Error),
            "exit" => Some(ResultClass::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AsyncRecord {
    pub kind: AsyncKind,
    /// The MI async-class keyword, e.g. `"stopped"`, `"running"`,
    /// `"thread-group-started"`. This is what the pretty printer renders.
    pub class: String,
    pub payload: Map,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    pub channel: StreamChannel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Present when the debugger echoed a token back; correlates to a
    /// prior `send`. Absent when tokens are disabled or the debugger did
    /// not echo one.
    pub token: Option<String>,
    pub class: ResultClass,
    pub payload: Map,
}

/// A single parsed line of MI output.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Async(AsyncRecord),
    Stream(StreamRecord),
    Result(ResultRecord),
    /// The `(gdb)` sentinel marking the end of the current response window.
    Prompt,
}

impl Record {
    pub fn is_async(&self) -> bool {
        matches!(self, Record::Async(_))
    }

    /// True if this is a `Stream` record whose channel is one of `channels`.
    pub fn is_stream(&self, channels: &[StreamChannel]) -> bool {
        match self {
            Record::Stream(s) => channels.contains(&s.channel),
            _ => false,
        }
    }

    /// True if this is a `Result`; when `of_class` is given, also requires
    /// the result class to match.
    pub fn is_result(&self, of_class: Option<ResultClass>) -> bool {
        match (self, of_class) {
            (Record::Result(_), None) => true,
            (Record::Result(r), Some(c)) => r.class == c,
            _ => false,
        }
    }

    /// The token on a `Result` record, if any.
    pub fn token(&self) -> Option<&str> {
        match self {
            Record::Result(r) => r.token.as_deref(),
            _ => None,
        }
    }

    /// The broad record discriminant: `"async"`, `"stream"`, `"result"`, or
    /// `"prompt"`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Record::Async(_) => "async",
            Record::Stream(_) => "stream",
            Record::Result(_) => "result",
            Record::Prompt => "prompt",
        }
    }

    /// The `type` accessor: the most specific label for this record — the
    /// async-class keyword (e.g. `"stopped"`), the stream channel name, or
    /// the result class.
    pub fn type_name(&self) -> &str {
        match self {
            Record::Async(a) => &a.class,
            Record::Stream(s) => s.channel.name(),
            Record::Result(r) => r.class.name(),
            Record::Prompt => "prompt",
        }
    }

    /// The `class` accessor: the sigil category (`"exec"`/`"status"`/
    /// `"notify"`) for async records, the channel for stream records, the
    /// result class for result records.
    pub fn class_name(&self) -> &str {
        match self {
            Record::Async(a) => a.kind.name(),
            Record::Stream(s) => s.channel.name(),
            Record::Result(r) => r.class.name(),
            Record::Prompt => "prompt",
        }
    }

    /// Recursive tagged-value dump of this record's payload.
    ///
    /// With `include_headers = false` this is exactly the record's payload
    /// (for `Stream`, a synthesized single-key `{"value": text}` map, since
    /// stream records carry no native key/value payload of their own).
    /// With `include_headers = true`, metadata fields (prefixed with `_` so
    /// they cannot collide with a real MI field name) are added describing
    /// the record's kind, class, and token.
    pub fn as_native(&self, include_headers: bool) -> Map {
        let mut out = match self {
            Record::Async(a) => a.payload.clone(),
            Record::Stream(s) => {
                let mut m = Map::new();
                m.insert("value", Value::Str(s.text.clone()));
                m
            }
            Record::Result(r) => r.payload.clone(),
            Record::Prompt => Map::new(),
        };

        if include_headers {
            let mut headers = Map::new();
            headers.insert("_kind", Value::Str(self.kind_name().to_string()));
            headers.insert("_type", Value::Str(self.type_name().to_string()));
            if let Some(token) = self.token() {
                headers.insert("_token", Value::Str(token.to_string()));
            }
            for (k, v) in &out {
                headers.insert(k.clone(), v.clone());
            }
            out = headers;
        }

        out
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MiCodecError {
    #[error("empty line cannot be parsed as an MI record")]
    EmptyLine,
    #[error("unparseable MI line: {0:?}")]
    Unparseable(String),
}

pub fn parse_line(line: &str) -> Result<Record, MiCodecError> {
    parser::parse_line(line)
}
