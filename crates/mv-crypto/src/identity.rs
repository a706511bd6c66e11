//! Identity management using Ed25519

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use mv_core::{MvError, MvResult, UserId};

/// Identity keypair for the local user
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Identity {
    /// Generate a new random (ephemeral) identity
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        tracing::debug!("generated ephemeral identity");

        Identity {
            signing_key,
            verifying_key,
        }
    }

    /// Create identity from existing signing key bytes (the user's wallet)
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();

        Identity {
            signing_key,
            verifying_key,
        }
    }

    /// Get the signing key bytes (secret)
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the verifying key bytes (public)
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// The user id placed into handoff requests
    pub fn user_id(&self) -> UserId {
        UserId::from_public_key(self.verifying_key.to_bytes())
    }

    /// Short fingerprint for logs (first 8 bytes of SHA-256 of the public key)
    pub fn fingerprint(&self) -> u64 {
        fingerprint(&self.verifying_key)
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature made by this identity
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let sig = Signature::from_bytes(signature);
        self.verifying_key.verify(message, &sig).is_ok()
    }

    /// Public half of this identity
    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            verifying_key: self.verifying_key,
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint()))
            .finish_non_exhaustive()
    }
}

fn fingerprint(verifying_key: &VerifyingKey) -> u64 {
    let hash = Sha256::digest(verifying_key.as_bytes());
    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(id_bytes)
}

/// Public identity for verification only
#[derive(Clone, PartialEq, Eq)]
pub struct PublicIdentity {
    verifying_key: VerifyingKey,
}

impl PublicIdentity {
    /// Create from verifying key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> MvResult<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes).map_err(|_| MvError::InvalidPublicKey)?;
        Ok(PublicIdentity { verifying_key })
    }

    pub fn fingerprint(&self) -> u64 {
        fingerprint(&self.verifying_key)
    }

    /// Verify a signature of arbitrary length
    ///
    /// Anything that is not exactly 64 bytes is rejected before it reaches
    /// the curve arithmetic.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> MvResult<()> {
        let bytes: &[u8; 64] = signature
            .try_into()
            .map_err(|_| MvError::InvalidSignatureLength(signature.len()))?;
        let sig = Signature::from_bytes(bytes);
        self.verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| MvError::InvalidSignature)
    }

    /// Get the verifying key bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }
}

impl std::fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicIdentity")
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint()))
            .finish()
    }
}
