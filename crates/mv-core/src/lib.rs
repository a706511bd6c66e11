//! MV Core - Fundamental types shared by the client core
//!
//! This crate defines the types every other crate in the workspace speaks:
//! - Identifiers (ParcelId, UserId, RequestId)
//! - Wall-clock timestamps and the injectable `Clock`
//! - World positions
//! - Network endpoint descriptors
//! - User privacy settings
//! - The workspace error type

pub mod endpoint;
pub mod error;
pub mod geometry;
pub mod id;
pub mod privacy;
pub mod time;

pub use endpoint::*;
pub use error::*;
pub use geometry::*;
pub use id::*;
pub use privacy::*;
pub use time::*;
