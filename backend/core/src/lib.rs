//! Core types, error taxonomy, and collaborator traits for sshpair.
//!
//! Everything here is transport-agnostic: the pairing state machine in
//! `sshpair-security` consumes these traits, and `sshpair-infra` implements
//! them against the real file system.

pub mod error;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{PairError, PairResult};
pub use traits::{AuthorizedKeysStore, Clock, LocalKeySource, PrivilegeProbe, SudoersWriter, SystemClock};
pub use types::{AuthorizedKeyEntry, Credential, KeySubmission, PeerInfo};
