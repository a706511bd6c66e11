//! MV Runtime - Client session orchestration
//!
//! Glues the pieces into the flow a client actually runs:
//! 1. Track avatar positions against the street grid
//! 2. On a gateway crossing, resolve the location (async)
//! 3. Hand a verified parcel endpoint to the authority manager
//! 4. Time out negotiations the server never answers
//! 5. Route server responses and the kill switch to the manager
//!
//! Also home to the client configuration, the outbound transport queue,
//! and tracing initialisation.

pub mod config;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use config::*;
pub use session::*;
pub use telemetry::*;
pub use transport::*;
