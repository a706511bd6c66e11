//! Registry fixture
//!
//! Plays the parcel registry: owns a signing key, a directory and a clock,
//! and hands out resolvers that trust exactly this registry.

use std::sync::Arc;
use std::time::Duration;

use mv_core::{Clock, ConnectionInfo, ManualClock, MvResult, ParcelId, Timestamp, Vec3};
use mv_crypto::LeaseSigner;
use mv_spatial::{
    BlockCoord, DirectoryEntry, MemoryDirectory, ResolverConfig, SpatialKey, SpatialResolver,
};

/// Fixed start time for deterministic lease expiry
pub const TEST_EPOCH: Timestamp = Timestamp(1_700_000_000);

/// Default lease lifetime for published parcels (seconds)
pub const LEASE_SECS: u64 = 3600;

pub type TestResolver = SpatialResolver<Arc<MemoryDirectory>>;

pub struct TestRegistry {
    signer: LeaseSigner,
    directory: Arc<MemoryDirectory>,
    clock: Arc<ManualClock>,
    config: ResolverConfig,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::with_directory(MemoryDirectory::new(), ResolverConfig::default())
    }

    pub fn with_directory(directory: MemoryDirectory, config: ResolverConfig) -> Self {
        TestRegistry {
            signer: LeaseSigner::generate(),
            directory: Arc::new(directory),
            clock: Arc::new(ManualClock::new(TEST_EPOCH)),
            config,
        }
    }

    pub fn directory(&self) -> &Arc<MemoryDirectory> {
        &self.directory
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    pub fn signer(&self) -> &LeaseSigner {
        &self.signer
    }

    /// Resolver trusting this registry, on its manual clock
    pub fn resolver(&self) -> MvResult<Arc<TestResolver>> {
        let resolver = SpatialResolver::with_root_of_trust(
            Arc::clone(&self.directory),
            self.config.clone(),
            self.signer.root_of_trust(),
            self.clock.clone(),
        )?;
        Ok(Arc::new(resolver))
    }

    pub fn key_for(&self, position: Vec3) -> Option<SpatialKey> {
        BlockCoord::from_position(position, self.config.block_size).map(SpatialKey::from_block)
    }

    /// Lease the block under `position` to `parcel` for `LEASE_SECS`
    ///
    /// Returns the directory key, or `None` if the position is off the grid.
    pub fn publish(
        &self,
        position: Vec3,
        parcel: ParcelId,
        server: ConnectionInfo,
    ) -> Option<SpatialKey> {
        let expires_at = self.clock.now() + Duration::from_secs(LEASE_SECS);
        self.publish_until(position, parcel, server, expires_at)
    }

    pub fn publish_until(
        &self,
        position: Vec3,
        parcel: ParcelId,
        server: ConnectionInfo,
        expires_at: Timestamp,
    ) -> Option<SpatialKey> {
        self.publish_signed_by(&self.signer, position, parcel, server, expires_at)
    }

    /// Publish an entry signed by someone other than the registry
    pub fn publish_forged(
        &self,
        position: Vec3,
        parcel: ParcelId,
        server: ConnectionInfo,
    ) -> Option<SpatialKey> {
        let squatter = LeaseSigner::generate();
        self.publish_signed_by(&squatter, position, parcel, server, Timestamp::MAX)
    }

    fn publish_signed_by(
        &self,
        signer: &LeaseSigner,
        position: Vec3,
        parcel: ParcelId,
        server: ConnectionInfo,
        expires_at: Timestamp,
    ) -> Option<SpatialKey> {
        let key = self.key_for(position)?;
        let mut entry = DirectoryEntry {
            parcel_id: parcel,
            relay: relay_endpoint(),
            parcel_server: server,
            lease_signature: Vec::new(),
            expires_at,
        };
        entry.lease_signature = signer.sign(&entry.lease_body(key));
        self.directory.publish(key, entry);
        Some(key)
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn relay_endpoint() -> ConnectionInfo {
    ConnectionInfo::new("relay.test", 4433, [0x11; 32])
}

/// Parcel server endpoint, distinct per parcel
pub fn parcel_endpoint(parcel: ParcelId) -> ConnectionInfo {
    ConnectionInfo::new(format!("parcel-{}.test", parcel.0), 4434, [0x22; 32])
}
