//! Discovers the debugger's command vocabulary at runtime and attaches it
//! to a [`SyncController`] as callable, documented entries.
//!
//! Grounded on `examples/original_source/gdb_ctrl.py`'s
//! `SyncGDBCtrl.extend_interface_with_gdb_commands` (the later of the two
//! source variants, which derives its reserved-name set from the
//! controller's own surface rather than hardcoding `{"shutdown", "send"}` —
//! `spec.md` §9 prefers this one). Identifier-legality and Rust-keyword
//! checks use `syn::parse_str`, the same crate
//! `examples/jcn363-AI_IDE` reaches for to validate generated identifiers.

use gdbmi_codec::{Record, StreamChannel};
use tracing::{debug, info};

use crate::controller::{RecvTimeout, SyncController, RESERVED_METHOD_NAMES};
use crate::errors::CtrlError;

struct BoundCommand {
    identifier: String,
    mi_name: String,
    #[allow(dead_code)]
    doc: String,
}

/// The discovered, normalized command table attached to a `SyncController`.
#[derive(Default)]
pub struct BoundCommands {
    entries: Vec<BoundCommand>,
}

impl BoundCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mi_name_for(&self, identifier: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| c.identifier == identifier)
            .map(|c| c.mi_name.as_str())
    }

    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|c| (c.identifier.as_str(), c.doc.as_str()))
            .collect()
    }

    fn push(&mut self, identifier: String, mi_name: String, doc: String) {
        self.entries.push(BoundCommand {
            identifier,
            mi_name,
            doc,
        });
    }
}

fn console_lines(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| match r {
            Record::Stream(s) if s.channel == StreamChannel::Console => Some(s.text.clone()),
            _ => None,
        })
        .collect()
}

/// `true` if `name` is syntactically a valid identifier, keywords included
/// (raw-identifier syntax `r#name` accepts reserved words that would
/// otherwise fail to parse, isolating "is this shaped like an identifier"
/// from "is this a keyword").
fn is_identifier_shaped(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    syn::parse_str::<syn::Ident>(&format!("r#{name}")).is_ok()
}

/// `true` if `name` is a Rust keyword. Only meaningful once
/// `is_identifier_shaped` has already confirmed valid identifier syntax.
fn is_rust_keyword(name: &str) -> bool {
    syn::parse_str::<syn::Ident>(name).is_err()
}

pub fn discover(sync: &mut SyncController) -> Result<(), CtrlError> {
    info!(event = "gdbctl.binder.discover_started");

    let apropos = sync.execute_quiet("apropos -*", RecvTimeout::Infinite)?;
    let lines = console_lines(&apropos);

    let candidates: Vec<String> = lines
        .iter()
        .filter_map(|line| line.split_once("--").map(|(left, _)| left.trim().to_string()))
        .filter(|candidate| !candidate.starts_with("set "))
        .collect();

    for (index, candidate) in candidates.into_iter().enumerate() {
        let alias_cmd = format!("alias -a intwkqjwq{index} = {candidate}");
        let alias_batch = match sync.execute_quiet(&alias_cmd, RecvTimeout::Infinite) {
            Ok(batch) => batch,
            Err(_) => continue,
        };
        let aliased = alias_batch
            .last()
            .is_some_and(|r| r.is_result(Some(gdbmi_codec::ResultClass::Done)));
        if !aliased {
            debug!(event = "gdbctl.binder.candidate_rejected", candidate = %candidate);
            continue;
        }

        let normalized = candidate.trim().replace(' ', "_").replace('-', "_");
        if !is_identifier_shaped(&normalized) {
            debug!(event = "gdbctl.binder.candidate_not_identifier", candidate = %candidate);
            continue;
        }

        let needs_prefix =
            is_rust_keyword(&normalized) || RESERVED_METHOD_NAMES.contains(&normalized.as_str());
        let identifier = if needs_prefix {
            format!("z{normalized}")
        } else {
            normalized
        };

        let help_batch = sync.execute_quiet(&format!("help {candidate}"), RecvTimeout::Infinite)?;
        let mut doc_lines = console_lines(&help_batch);
        doc_lines.insert(0, format!("Command: {candidate}\n\n"));
        let doc = doc_lines.concat();

        sync.bound_mut().push(identifier, candidate, doc);
    }

    info!(
        event = "gdbctl.binder.discover_completed",
        bound = sync.available_commands().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;

    fn fixture_path() -> String {
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fake_gdb.sh").to_string()
    }

    #[test]
    fn identifier_shape_rejects_garbage_accepts_keywords() {
        assert!(is_identifier_shaped("print"));
        assert!(is_identifier_shaped("fn")); // keyword, still identifier-shaped
        assert!(!is_identifier_shaped("123abc"));
        assert!(!is_identifier_shaped("has space"));
        assert!(!is_identifier_shaped(""));
    }

    #[test]
    fn keyword_detection_matches_rust_reserved_words() {
        assert!(is_rust_keyword("fn"));
        assert!(is_rust_keyword("match"));
        assert!(!is_rust_keyword("print"));
        assert!(!is_rust_keyword("send"));
    }

    #[test]
    fn send_collides_with_reserved_and_is_z_prefixed() {
        let mut ctrl = SyncController::new(&ControllerConfig::default()).unwrap();
        ctrl.spawn(Some(&fixture_path()), None, &[], true).unwrap();
        ctrl.bind_commands().unwrap();

        let names: Vec<&str> = ctrl
            .available_commands()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert!(names.contains(&"zsend"));
        assert!(!names.contains(&"send"));
        assert!(names.contains(&"print"));

        ctrl.shutdown();
    }
}
