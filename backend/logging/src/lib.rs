//! Structured logging for sshpair.
//!
//! Console plus optional rolling JSON file output, redaction of key material
//! and tokens, and an audit trail of pairing events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, PairingEvent};
pub use logger::init_logger;
pub use redact::{redact_sensitive_data, token_hint};
