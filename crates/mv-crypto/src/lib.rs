//! MV Crypto - Identity and lease cryptography
//!
//! Provides the cryptographic primitives the client core relies on:
//! - Identity management (Ed25519), used as the user identity provider
//! - Canonical lease bodies and their signatures
//! - The registry root of trust that parcel leases are checked against

pub mod identity;
pub mod lease;

pub use identity::*;
pub use lease::*;
