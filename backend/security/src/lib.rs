//! The pairing authorization core: tokens, relay codes, key validation,
//! key acceptance and sudo grants.

pub mod code;
pub mod key_format;
pub mod pairing;
pub mod sudo;
pub mod token;

pub use code::{derive_code, resolve, CODE_LEN};
pub use key_format::{validate, KeyType, PublicKeyRecord};
pub use pairing::{Authorization, PairingService, StatusSnapshot};
pub use sudo::{DeferredCommand, GrantOutcome, GrantRequest, SudoDirective, SudoGrantService};
pub use token::{generate_token, Refresh, Rotation, TokenManager, DEFAULT_TTL_SECS};
