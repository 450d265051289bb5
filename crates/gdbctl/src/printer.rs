use std::io::IsTerminal;

use gdbmi_codec::{Record, ResultClass, StreamChannel};
use owo_colors::{AnsiColors, OwoColorize};

/// Whether the printer should emit ANSI color codes, computed once and
/// passed around as a value rather than read from process-wide state (see
/// DESIGN.md, "avoid process-wide mutable state").
///
/// Grounded on `examples/original_source/gdb.py`'s `are_tty_colors_supported`:
/// stdout must be a TTY, `TERM` must not carry an `m` token among its
/// hyphen-split components, and the terminal is assumed to support at least
/// 8 colors (the source falls back to that same assumption when a terminfo
/// query is unavailable; nothing in this workspace's dependency pack reaches
/// for a terminfo crate, so the optimistic assumption is kept rather than
/// introduced just for this).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylingCapability {
    colored: bool,
}

impl StylingCapability {
    /// `force` overrides detection entirely, matching `force_styling`.
    pub fn detect(force: Option<bool>) -> Self {
        if let Some(colored) = force {
            return Self { colored };
        }

        let is_tty = std::io::stdout().is_terminal();
        let term = std::env::var("TERM").unwrap_or_default();
        let has_m_token = term.split('-').any(|part| part == "m");

        Self {
            colored: is_tty && !has_m_token,
        }
    }

    pub fn colored(self) -> bool {
        self.colored
    }
}

fn colorize(capability: StylingCapability, text: &str, color: AnsiColors) -> String {
    if capability.colored() {
        text.color(color).to_string()
    } else {
        text.to_string()
    }
}

/// Render one record the way an interactive session would, per the
/// rendering table in `spec.md` §4.4. Grounded on
/// `examples/original_source/gdb_ctrl.py`'s `_human_print_async` /
/// `_human_print_streams` / `_human_print_result`.
pub fn print_record(record: &Record, capability: StylingCapability) {
    match record {
        Record::Stream(s) => match s.channel {
            StreamChannel::Console | StreamChannel::Target => {
                println!("{}", s.text.trim_end());
            }
            StreamChannel::Log => {}
        },
        Record::Async(a) => {
            let label = colorize(capability, &format!("{}:", a.class), AnsiColors::Green);
            print!("{label}");
            print_fixline(&a.payload.to_string());
        }
        Record::Result(r) => print_result(r, capability),
        Record::Prompt => {}
    }
}

/// Prints `"None"` in cyan — mirrors `_human_print_result(None)` for a
/// direct `recv()` timeout/EOF, which never shows up inside a `recv_all`
/// batch (those already filter `None` out) but matters when a caller
/// pretty-prints a single `recv()` result directly.
pub fn print_none(capability: StylingCapability) {
    println!("{}", colorize(capability, "None", AnsiColors::Cyan));
}

fn print_result(result: &gdbmi_codec::ResultRecord, capability: StylingCapability) {
    let color = match result.class {
        ResultClass::Error => AnsiColors::Red,
        ResultClass::Done => AnsiColors::Cyan,
        ResultClass::Running | ResultClass::Connected | ResultClass::Exit => AnsiColors::Yellow,
    };

    let mut payload = result.payload.clone();
    let class_name = match result.class {
        ResultClass::Done => "Done",
        ResultClass::Running => "Running",
        ResultClass::Connected => "Connected",
        ResultClass::Error => "Error",
        ResultClass::Exit => "Exit",
    };

    let has_payload = !payload.is_empty();
    let prefix = if has_payload {
        format!("{class_name}:")
    } else {
        class_name.to_string()
    };

    if has_payload {
        print!("{}", colorize(capability, &prefix, color));
    } else {
        println!("{}", colorize(capability, &prefix, color));
    }

    if result.class == ResultClass::Error {
        if let Some(msg) = payload.remove("msg").and_then(|v| v.as_str().map(str::to_string)) {
            if !msg.is_empty() {
                println!("{}", msg.trim());
            }
        }
    }

    if !payload.is_empty() {
        print_fixline(&payload.to_string());
    }
}

/// Mirrors the source's `_print(..., fixline=True)`: a multi-line value
/// starts on its own line, a single-line value gets one leading space.
fn print_fixline(s: &str) {
    if s.contains('\n') {
        println!("\n{s}");
    } else {
        println!(" {s}");
    }
}
