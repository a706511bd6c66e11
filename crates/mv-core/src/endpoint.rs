//! Network endpoint descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Immutable descriptor of a network endpoint
///
/// Produced by spatial resolution (relay and parcel server) and consumed by
/// handoff negotiation. The public key is the endpoint's Ed25519 identity.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionInfo {
    address: String,
    port: u16,
    public_key: [u8; 32],
}

impl ConnectionInfo {
    pub fn new(address: impl Into<String>, port: u16, public_key: [u8; 32]) -> Self {
        ConnectionInfo {
            address: address.into(),
            port,
            public_key,
        }
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// Canonical byte encoding, used inside signed lease bodies
    ///
    /// Format: \[addr_len:8\]\[addr\]\[port:2\]\[public_key:32\]
    ///
    /// The whole address is always written, so distinct endpoints never
    /// share an encoding.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let addr = self.address.as_bytes();
        out.extend_from_slice(&(addr.len() as u64).to_le_bytes());
        out.extend_from_slice(addr);
        out.extend_from_slice(&self.port.to_le_bytes());
        out.extend_from_slice(&self.public_key);
    }
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("address", &self.address)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}
