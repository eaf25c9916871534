//! File-system and process backed collaborators for the pairing core.
//!
//! Implements the traits from `sshpair-core` against the real machine:
//! `authorized_keys`, the local key pair, sudoers fragments and the
//! effective uid.

pub mod authorized_keys;
pub mod local_key;
pub mod privilege;
pub mod sudoers;

pub use authorized_keys::FileAuthorizedKeys;
pub use local_key::LocalKeyFiles;
pub use privilege::EffectiveUid;
pub use sudoers::SystemSudoers;
