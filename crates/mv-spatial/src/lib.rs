//! MV Spatial - "Where do I connect for this location?"
//!
//! This crate provides:
//! - Morton (Z-order) directory keys for block coordinates
//! - Street/parcel geography and gateway-crossing detection
//! - The directory seam and an in-memory directory
//! - The spatial resolver, which only ever hands out lease-verified
//!   parcel records and degrades everything else to wilderness

pub mod directory;
pub mod geography;
pub mod morton;
pub mod record;
pub mod resolver;

pub use directory::*;
pub use geography::*;
pub use morton::*;
pub use record::*;
pub use resolver::*;
