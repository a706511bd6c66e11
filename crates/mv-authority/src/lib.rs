//! MV Authority - Who simulates the avatar
//!
//! The authority manager owns the single answer to "is the avatar locally
//! simulated or handed to a parcel server?". It runs the three-state
//! handoff:
//!
//! ```text
//!   StreetMode --request_entry--> Negotiating --approved + rights ok--> ParcelMode
//!       ^                             |                                     |
//!       +------ abort (rejected / rights violation / dispatch failure) -----+
//!       +------------------------ emergency_exit (any state) --------------+
//! ```
//!
//! The user's privacy settings are enforced on the client: a server that
//! approves entry but mandates something the user refused is rejected
//! before any state changes.

pub mod handle;
pub mod hooks;
pub mod manager;
pub mod protocol;
pub mod rights;
pub mod state;

pub use handle::*;
pub use hooks::*;
pub use manager::*;
pub use protocol::*;
pub use rights::*;
pub use state::*;
