mod host;

pub use host::{PtyHost, ReadOutcome};
