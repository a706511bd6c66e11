//! Street grid geography
//!
//! The world is laid out as city blocks separated by public roads. Roads
//! run along every block edge and belong to nobody ("the street"); the
//! interior of a block is parcel land, governed by whichever server holds
//! the lease for it. Walking off a road into a block interior is a gateway
//! crossing and starts a handoff.

use serde::{Deserialize, Serialize};

use mv_core::{MvError, MvResult, Vec3};

/// Street grid configuration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeographyConfig {
    /// City block edge length (meters)
    pub street_block_size: f32,
    /// Half the road width, measured from the block edge (meters)
    pub road_half_width: f32,
}

impl Default for GeographyConfig {
    fn default() -> Self {
        GeographyConfig {
            street_block_size: 100.0,
            road_half_width: 10.0,
        }
    }
}

impl GeographyConfig {
    pub fn validate(&self) -> MvResult<()> {
        if !(self.street_block_size.is_finite() && self.street_block_size > 0.0) {
            return Err(MvError::InvalidConfig(format!(
                "street_block_size must be positive, got {}",
                self.street_block_size
            )));
        }
        if !(self.road_half_width.is_finite() && self.road_half_width >= 0.0) {
            return Err(MvError::InvalidConfig(format!(
                "road_half_width must be non-negative, got {}",
                self.road_half_width
            )));
        }
        Ok(())
    }
}

/// Which kind of land a position is on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Public road, locally simulated
    Street,
    /// Block interior, possibly governed by a parcel server
    Parcel,
}

/// Street/parcel classification for a validated grid
#[derive(Clone, Copy, Debug)]
pub struct Geography {
    config: GeographyConfig,
}

impl Geography {
    pub fn new(config: GeographyConfig) -> MvResult<Self> {
        config.validate()?;
        Ok(Geography { config })
    }

    pub fn config(&self) -> &GeographyConfig {
        &self.config
    }

    /// True if (x, z) lies on a public road
    pub fn is_public_street(&self, x: f32, z: f32) -> bool {
        let block = self.config.street_block_size;
        let half = self.config.road_half_width;

        // Euclidean modulo keeps negative coordinates in [0, block)
        let mod_x = x.rem_euclid(block);
        let mod_z = z.rem_euclid(block);

        let on_road_x = mod_x < half || mod_x > block - half;
        let on_road_z = mod_z < half || mod_z > block - half;

        on_road_x || on_road_z
    }

    pub fn zone_at(&self, position: Vec3) -> Zone {
        // Anything we cannot place stays local
        if !position.is_finite() || self.is_public_street(position.x, position.z) {
            Zone::Street
        } else {
            Zone::Parcel
        }
    }
}

/// Zone transition reported by `BoundaryTracker`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundaryEvent {
    /// Avatar stepped from the street into parcel land
    GatewayCrossed { position: Vec3 },
    /// Avatar stepped from parcel land back onto the street
    ReturnedToStreet { position: Vec3 },
}

/// Turns a stream of avatar positions into zone transitions
#[derive(Debug)]
pub struct BoundaryTracker {
    geography: Geography,
    current: Option<Zone>,
}

impl BoundaryTracker {
    pub fn new(geography: Geography) -> Self {
        BoundaryTracker {
            geography,
            current: None,
        }
    }

    /// Zone of the last observed position
    pub fn current_zone(&self) -> Option<Zone> {
        self.current
    }

    /// Feed the latest avatar position
    ///
    /// The first position only primes the tracker; spawning inside a parcel
    /// is not a crossing.
    pub fn observe(&mut self, position: Vec3) -> Option<BoundaryEvent> {
        let zone = self.geography.zone_at(position);
        let previous = self.current.replace(zone);

        match (previous, zone) {
            (Some(Zone::Street), Zone::Parcel) => Some(BoundaryEvent::GatewayCrossed { position }),
            (Some(Zone::Parcel), Zone::Street) => {
                Some(BoundaryEvent::ReturnedToStreet { position })
            }
            _ => None,
        }
    }

    /// Forget the last zone, e.g. after a teleport
    pub fn reset(&mut self) {
        self.current = None;
    }
}
