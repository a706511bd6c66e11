//! Spatial resolver
//!
//! position -> block -> Morton key -> directory -> lease check -> record
//!
//! Every failure along that path (unplaceable position, directory error,
//! timeout, miss, expired lease, bad signature) ends in the same wilderness
//! record. "Nobody governs this place" is an ordinary answer, not an error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use mv_core::{Clock, MvError, MvResult, SystemClock, Vec3};
use mv_crypto::RootOfTrust;

use crate::directory::{Directory, DirectoryEntry};
use crate::morton::{BlockCoord, SpatialKey};
use crate::record::{ParcelRecord, SpatialRecord};

/// Resolver configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory grid cell edge length (meters)
    pub block_size: f32,
    /// Give up on the directory after this long (milliseconds)
    pub lookup_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            block_size: 1000.0,
            lookup_timeout_ms: 2_000,
        }
    }
}

impl ResolverConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn validate(&self) -> MvResult<()> {
        if !(self.block_size.is_finite() && self.block_size > 0.0) {
            return Err(MvError::InvalidConfig(format!(
                "block_size must be positive, got {}",
                self.block_size
            )));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(MvError::InvalidConfig(
                "lookup_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Maps world positions to verified parcel authorities
pub struct SpatialResolver<D> {
    directory: D,
    root: RootOfTrust,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
}

impl<D: Directory> SpatialResolver<D> {
    /// Resolver trusting the production registry, on the system clock
    pub fn new(directory: D, config: ResolverConfig) -> MvResult<Self> {
        Self::with_root_of_trust(
            directory,
            config,
            RootOfTrust::registry(),
            Arc::new(SystemClock),
        )
    }

    /// Resolver trusting a different fixed root (private registries, tests)
    pub fn with_root_of_trust(
        directory: D,
        config: ResolverConfig,
        root: RootOfTrust,
        clock: Arc<dyn Clock>,
    ) -> MvResult<Self> {
        config.validate()?;
        Ok(SpatialResolver {
            directory,
            root,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn root_of_trust(&self) -> &RootOfTrust {
        &self.root
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Directory key for a position, if it can be placed on the grid
    pub fn key_for(&self, position: Vec3) -> Option<SpatialKey> {
        BlockCoord::from_position(position, self.config.block_size).map(SpatialKey::from_block)
    }

    /// Resolve a position to a verified record
    ///
    /// Dropping the returned future abandons the lookup.
    pub async fn resolve(&self, position: Vec3) -> SpatialRecord {
        let Some(key) = self.key_for(position) else {
            tracing::debug!(?position, "position off the grid, treating as wilderness");
            return SpatialRecord::wilderness(None);
        };

        let lookup = self.directory.lookup(key);
        let entry = match tokio::time::timeout(self.config.lookup_timeout(), lookup).await {
            Ok(Ok(Some(entry))) => entry,
            Ok(Ok(None)) => {
                tracing::debug!(%key, "no directory entry");
                return SpatialRecord::wilderness(Some(key));
            }
            Ok(Err(e)) => {
                tracing::warn!(%key, error = %e, "directory lookup failed");
                return SpatialRecord::wilderness(Some(key));
            }
            Err(_) => {
                tracing::warn!(%key, timeout = ?self.config.lookup_timeout(), "directory lookup timed out");
                return SpatialRecord::wilderness(Some(key));
            }
        };

        self.verify(key, entry)
    }

    /// Lease check for an entry served under `key`
    ///
    /// Accepted iff the lease expires strictly after now and its signature
    /// verifies against the root of trust.
    pub fn verify(&self, key: SpatialKey, entry: DirectoryEntry) -> SpatialRecord {
        let now = self.clock.now();
        match self
            .root
            .check(&entry.lease_body(key), &entry.lease_signature, now)
        {
            Ok(()) => {
                tracing::debug!(%key, parcel = %entry.parcel_id, "lease verified");
                SpatialRecord::Parcel(ParcelRecord::verified(key, entry))
            }
            Err(e) => {
                tracing::warn!(%key, parcel = %entry.parcel_id, error = %e, "lease rejected");
                SpatialRecord::wilderness(Some(key))
            }
        }
    }
}

impl<D: Directory + 'static> SpatialResolver<D> {
    /// Resolve on the tokio runtime without tying up the caller
    ///
    /// The returned task aborts the lookup if dropped before completion.
    pub fn spawn_resolve(self: &Arc<Self>, position: Vec3) -> ResolveTask {
        let key = self.key_for(position);
        let resolver = Arc::clone(self);
        let handle = tokio::spawn(async move { resolver.resolve(position).await });
        ResolveTask { handle, key }
    }
}

/// Handle to an in-flight resolution
#[derive(Debug)]
pub struct ResolveTask {
    handle: JoinHandle<SpatialRecord>,
    key: Option<SpatialKey>,
}

impl ResolveTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop waiting for the answer
    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Future for ResolveTask {
    type Output = SpatialRecord;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.handle).poll(cx) {
            Poll::Ready(Ok(record)) => Poll::Ready(record),
            Poll::Ready(Err(e)) => {
                tracing::warn!(error = %e, "resolution task failed");
                Poll::Ready(SpatialRecord::wilderness(this.key))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ResolveTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
