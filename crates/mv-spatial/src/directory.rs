//! Distributed directory seam
//!
//! The directory maps a 64-bit spatial key to zero or one lease entry. How
//! it stores and replicates entries is its own business; the resolver only
//! needs a lookup that eventually answers or fails.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;

use mv_core::{ConnectionInfo, MvError, ParcelId, Timestamp};
use mv_crypto::LeaseBody;

use crate::morton::SpatialKey;

/// Directory lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Directory unreachable: {0}")]
    Unreachable(String),
}

impl From<DirectoryError> for MvError {
    fn from(e: DirectoryError) -> Self {
        MvError::DirectoryError(e.to_string())
    }
}

/// Unverified record as published in the directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub parcel_id: ParcelId,
    pub relay: ConnectionInfo,
    pub parcel_server: ConnectionInfo,
    pub lease_signature: Vec<u8>,
    pub expires_at: Timestamp,
}

impl DirectoryEntry {
    /// The body the registry signed when this entry is served under `key`
    pub fn lease_body(&self, key: SpatialKey) -> LeaseBody<'_> {
        LeaseBody {
            key: key.as_u64(),
            parcel_id: self.parcel_id,
            relay: &self.relay,
            parcel_server: &self.parcel_server,
            expires_at: self.expires_at,
        }
    }
}

/// A key -> lease directory (DHT, registry cache, ...)
pub trait Directory: Send + Sync {
    fn lookup(
        &self,
        key: SpatialKey,
    ) -> impl Future<Output = Result<Option<DirectoryEntry>, DirectoryError>> + Send;
}

impl<D: Directory> Directory for Arc<D> {
    fn lookup(
        &self,
        key: SpatialKey,
    ) -> impl Future<Output = Result<Option<DirectoryEntry>, DirectoryError>> + Send {
        (**self).lookup(key)
    }
}

/// In-process directory for local worlds and tests
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: RwLock<HashMap<SpatialKey, DirectoryEntry>>,
    latency: Option<Duration>,
    offline: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup by `latency` (simulated network round trip)
    pub fn with_latency(latency: Duration) -> Self {
        MemoryDirectory {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Publish (or replace) the entry for a key
    pub fn publish(&self, key: SpatialKey, entry: DirectoryEntry) {
        self.entries.write().insert(key, entry);
    }

    pub fn evict(&self, key: SpatialKey) -> Option<DirectoryEntry> {
        self.entries.write().remove(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Make every lookup fail as unreachable until set back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl Directory for MemoryDirectory {
    fn lookup(
        &self,
        key: SpatialKey,
    ) -> impl Future<Output = Result<Option<DirectoryEntry>, DirectoryError>> + Send {
        let offline = self.offline.load(Ordering::SeqCst);
        let entry = self.entries.read().get(&key).cloned();
        let latency = self.latency;

        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            if offline {
                return Err(DirectoryError::Unreachable("directory offline".into()));
            }
            Ok(entry)
        }
    }
}
