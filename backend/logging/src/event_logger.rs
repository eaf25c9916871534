//! Pairing Event Logger
//!
//! Audit events (key authorized, sudo grant, token reset, rejected request)
//! emitted under the `pairing_events` target so they can be filtered or
//! routed separately.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PairingEvent {
    KeyAuthorized {
        peer: String,
        key_type: String,
    },
    SudoGranted {
        username: String,
    },
    TokenReset,
    RequestRejected {
        route: String,
        kind: String,
        detail: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event: PairingEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redacts free-text fields and emits the event through `tracing`.
    pub fn record(mut event: PairingEvent) -> EventLogEntry {
        if let PairingEvent::RequestRejected { detail, .. } = &mut event {
            *detail = redact_sensitive_data(detail);
        }

        let entry = EventLogEntry {
            timestamp: Utc::now(),
            event,
        };

        info!(target: "pairing_events", event = ?entry.event, "Pairing event");
        entry
    }
}
