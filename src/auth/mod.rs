//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Login:
//!     password.rs verify → token.rs issue → bearer token to client
//!
//! Protected request:
//!     gate.rs (Authorization header)
//!     → token.rs verify (signature, structure, expiry)
//!     → AuthUser in request extensions → handler
//! ```
//!
//! # Design Decisions
//! - Tokens are stateless; logout is advisory and nothing is revoked
//! - Verification is pure and needs no locking
//! - Password digests are one-way; plaintext is never stored or logged

pub mod gate;
pub mod password;
pub mod token;

pub use gate::{optional_auth, require_auth, AuthUser};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, TokenCodec, TokenError};
