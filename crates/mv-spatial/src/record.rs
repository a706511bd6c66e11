//! Resolution results

use mv_core::{ConnectionInfo, ParcelId, Timestamp};

use crate::directory::DirectoryEntry;
use crate::morton::SpatialKey;

/// A lease-verified parcel record
///
/// Only the resolver constructs these, and only after the lease checked
/// out; holding one means the parcel server was authorised for `key` at
/// resolution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParcelRecord {
    key: SpatialKey,
    parcel_id: ParcelId,
    relay: ConnectionInfo,
    parcel_server: ConnectionInfo,
    lease_signature: Vec<u8>,
    expires_at: Timestamp,
}

impl ParcelRecord {
    pub(crate) fn verified(key: SpatialKey, entry: DirectoryEntry) -> Self {
        ParcelRecord {
            key,
            parcel_id: entry.parcel_id,
            relay: entry.relay,
            parcel_server: entry.parcel_server,
            lease_signature: entry.lease_signature,
            expires_at: entry.expires_at,
        }
    }

    pub fn key(&self) -> SpatialKey {
        self.key
    }

    pub fn parcel_id(&self) -> ParcelId {
        self.parcel_id
    }

    pub fn relay(&self) -> &ConnectionInfo {
        &self.relay
    }

    pub fn parcel_server(&self) -> &ConnectionInfo {
        &self.parcel_server
    }

    pub fn lease_signature(&self) -> &[u8] {
        &self.lease_signature
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// What a handoff needs: which parcel, and which server to ask
    pub fn entry_target(&self) -> (ParcelId, ConnectionInfo) {
        (self.parcel_id, self.parcel_server.clone())
    }
}

/// Result of resolving a world position
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpatialRecord {
    /// A parcel with a valid, unexpired lease
    Parcel(ParcelRecord),
    /// No known authority: unowned land, directory miss, or a lease that
    /// failed verification. `key` is `None` if the position could not be
    /// quantized at all.
    Wilderness { key: Option<SpatialKey> },
}

impl SpatialRecord {
    pub fn wilderness(key: Option<SpatialKey>) -> Self {
        SpatialRecord::Wilderness { key }
    }

    pub fn is_wilderness(&self) -> bool {
        matches!(self, SpatialRecord::Wilderness { .. })
    }

    pub fn key(&self) -> Option<SpatialKey> {
        match self {
            SpatialRecord::Parcel(record) => Some(record.key),
            SpatialRecord::Wilderness { key } => *key,
        }
    }

    pub fn parcel(&self) -> Option<&ParcelRecord> {
        match self {
            SpatialRecord::Parcel(record) => Some(record),
            SpatialRecord::Wilderness { .. } => None,
        }
    }

    pub fn into_parcel(self) -> Option<ParcelRecord> {
        match self {
            SpatialRecord::Parcel(record) => Some(record),
            SpatialRecord::Wilderness { .. } => None,
        }
    }
}
