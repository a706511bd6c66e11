//! Parcel leases and the registry root of trust
//!
//! A parcel server may only claim authority over a block if the registry
//! has signed a lease for it. The client checks every lease against a
//! fixed root key, so whoever controls directory entries but not the root
//! key cannot squat on a parcel, and an expired lease cannot be replayed.

use thiserror::Error;

use mv_core::{ConnectionInfo, MvError, ParcelId, Timestamp};

use crate::identity::{Identity, PublicIdentity};

/// Domain separation tag for lease signatures
pub const LEASE_DOMAIN: &[u8] = b"mv-lease-v1";

/// Canonical, signable content of a parcel lease
///
/// The directory key is part of the body, so a lease issued for one block
/// does not verify when served for another.
#[derive(Debug, Clone, Copy)]
pub struct LeaseBody<'a> {
    pub key: u64,
    pub parcel_id: ParcelId,
    pub relay: &'a ConnectionInfo,
    pub parcel_server: &'a ConnectionInfo,
    pub expires_at: Timestamp,
}

impl LeaseBody<'_> {
    /// Format: \[domain\]\[key:8\]\[parcel:8\]\[relay\]\[parcel_server\]\[expires:8\]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LEASE_DOMAIN.len() + 24 + 2 * 54);
        out.extend_from_slice(LEASE_DOMAIN);
        out.extend_from_slice(&self.key.to_le_bytes());
        out.extend_from_slice(&self.parcel_id.to_bytes());
        self.relay.encode_into(&mut out);
        self.parcel_server.encode_into(&mut out);
        out.extend_from_slice(&self.expires_at.to_bytes());
        out
    }
}

/// Why a lease was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseError {
    #[error("Lease expired at {expires_at} (now {now})")]
    Expired { expires_at: Timestamp, now: Timestamp },

    #[error("Lease signature rejected: {0}")]
    BadSignature(#[from] MvError),
}

/// The public key every lease must be signed by
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RootOfTrust {
    key: [u8; 32],
}

impl RootOfTrust {
    /// Public key of the parcel registry
    pub const REGISTRY_PUBLIC_KEY: [u8; 32] = [
        0xb2, 0x3d, 0x91, 0x22, 0x15, 0x26, 0x2e, 0xa4, 0xbf, 0x69, 0xfa, 0x05, 0x53, 0x83, 0x7a,
        0x7f, 0x7c, 0x83, 0x93, 0x58, 0x1b, 0xf6, 0x99, 0xd9, 0x0c, 0x85, 0xf1, 0x97, 0x79, 0x12,
        0xb3, 0x21,
    ];

    /// The production registry root
    pub const fn registry() -> Self {
        RootOfTrust {
            key: Self::REGISTRY_PUBLIC_KEY,
        }
    }

    /// A fixed root for private deployments and test registries
    pub const fn from_public_key(key: [u8; 32]) -> Self {
        RootOfTrust { key }
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.key
    }

    /// Verify a lease signature against this root
    pub fn verify(&self, body: &LeaseBody<'_>, signature: &[u8]) -> Result<(), MvError> {
        let root = PublicIdentity::from_bytes(&self.key)?;
        root.verify(&body.to_bytes(), signature)
    }

    /// Full lease check: unexpired (strictly) and signed by this root
    pub fn check(
        &self,
        body: &LeaseBody<'_>,
        signature: &[u8],
        now: Timestamp,
    ) -> Result<(), LeaseError> {
        if !body.expires_at.is_after(now) {
            return Err(LeaseError::Expired {
                expires_at: body.expires_at,
                now,
            });
        }
        self.verify(body, signature)?;
        Ok(())
    }
}

impl Default for RootOfTrust {
    fn default() -> Self {
        Self::registry()
    }
}

impl std::fmt::Debug for RootOfTrust {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RootOfTrust({:02x}{:02x}{:02x}{:02x}..)",
            self.key[0], self.key[1], self.key[2], self.key[3]
        )
    }
}

/// Registry-side lease issuer
pub struct LeaseSigner {
    identity: Identity,
}

impl LeaseSigner {
    pub fn new(identity: Identity) -> Self {
        LeaseSigner { identity }
    }

    pub fn generate() -> Self {
        Self::new(Identity::generate())
    }

    /// The root clients must trust for this signer's leases
    pub fn root_of_trust(&self) -> RootOfTrust {
        RootOfTrust::from_public_key(self.identity.verifying_key_bytes())
    }

    pub fn sign(&self, body: &LeaseBody<'_>) -> Vec<u8> {
        self.identity.sign(&body.to_bytes()).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn endpoints() -> (ConnectionInfo, ConnectionInfo) {
        (
            ConnectionInfo::new("relay.example", 4433, [1u8; 32]),
            ConnectionInfo::new("parcel.example", 4434, [2u8; 32]),
        )
    }

    #[test]
    fn test_registry_key_is_valid_point() {
        assert!(PublicIdentity::from_bytes(&RootOfTrust::REGISTRY_PUBLIC_KEY).is_ok());
        assert_eq!(RootOfTrust::default(), RootOfTrust::registry());
    }

    #[test]
    fn test_signed_lease_checks() {
        let signer = LeaseSigner::generate();
        let (relay, server) = endpoints();
        let body = LeaseBody {
            key: 0x1234,
            parcel_id: ParcelId::new(9),
            relay: &relay,
            parcel_server: &server,
            expires_at: Timestamp::from_secs(2_000),
        };
        let sig = signer.sign(&body);

        let root = signer.root_of_trust();
        assert!(root.check(&body, &sig, Timestamp::from_secs(1_999)).is_ok());
    }

    #[test]
    fn test_expiry_is_strict() {
        let signer = LeaseSigner::generate();
        let (relay, server) = endpoints();
        let body = LeaseBody {
            key: 1,
            parcel_id: ParcelId::new(1),
            relay: &relay,
            parcel_server: &server,
            expires_at: Timestamp::from_secs(500),
        };
        let sig = signer.sign(&body);
        let root = signer.root_of_trust();

        assert!(matches!(
            root.check(&body, &sig, Timestamp::from_secs(500)),
            Err(LeaseError::Expired { .. })
        ));
    }

    #[test]
    fn test_other_root_rejected() {
        let signer = LeaseSigner::generate();
        let (relay, server) = endpoints();
        let body = LeaseBody {
            key: 1,
            parcel_id: ParcelId::new(1),
            relay: &relay,
            parcel_server: &server,
            expires_at: Timestamp::MAX,
        };
        let sig = signer.sign(&body);

        assert_eq!(
            RootOfTrust::registry().check(&body, &sig, Timestamp::EPOCH),
            Err(LeaseError::BadSignature(MvError::InvalidSignature))
        );
    }

    #[test]
    fn test_lease_bound_to_key() {
        let signer = LeaseSigner::generate();
        let (relay, server) = endpoints();
        let body = LeaseBody {
            key: 7,
            parcel_id: ParcelId::new(1),
            relay: &relay,
            parcel_server: &server,
            expires_at: Timestamp::MAX,
        };
        let sig = signer.sign(&body);
        let moved = LeaseBody { key: 8, ..body };

        assert!(signer
            .root_of_trust()
            .check(&moved, &sig, Timestamp::EPOCH)
            .is_err());
    }

    #[test]
    fn test_lease_bound_to_full_server_address() {
        let signer = LeaseSigner::generate();
        let relay = ConnectionInfo::new("relay.example", 4433, [1u8; 32]);
        let base = "a".repeat(usize::from(u16::MAX));
        let signed_server = ConnectionInfo::new(base.clone(), 4434, [2u8; 32]);
        let hijacked = ConnectionInfo::new(format!("{}.evil.example", base), 4434, [2u8; 32]);

        let body = LeaseBody {
            key: 3,
            parcel_id: ParcelId::new(1),
            relay: &relay,
            parcel_server: &signed_server,
            expires_at: Timestamp::MAX,
        };
        let sig = signer.sign(&body);
        let root = signer.root_of_trust();
        assert!(root.verify(&body, &sig).is_ok());

        let moved = LeaseBody {
            parcel_server: &hijacked,
            ..body
        };
        assert_eq!(root.verify(&moved, &sig), Err(MvError::InvalidSignature));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_tampered_lease_rejected(
            key in any::<u64>(),
            parcel in any::<u64>(),
            expires in 1u64..u64::MAX,
            delta in 1u64..1000,
        ) {
            let signer = LeaseSigner::generate();
            let root = signer.root_of_trust();
            let (relay, server) = endpoints();
            let body = LeaseBody {
                key,
                parcel_id: ParcelId::new(parcel),
                relay: &relay,
                parcel_server: &server,
                expires_at: Timestamp::from_secs(expires),
            };
            let sig = signer.sign(&body);
            prop_assert!(root.verify(&body, &sig).is_ok());

            let other_parcel = LeaseBody {
                parcel_id: ParcelId::new(parcel.wrapping_add(delta)),
                ..body
            };
            prop_assert!(root.verify(&other_parcel, &sig).is_err());

            // Extending the lease invalidates it
            let extended = LeaseBody {
                expires_at: Timestamp::from_secs(expires.saturating_add(delta)),
                ..body
            };
            if extended.expires_at != body.expires_at {
                prop_assert!(root.verify(&extended, &sig).is_err());
            }
        }
    }
}
