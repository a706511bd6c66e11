//! Handoff request/response messages
//!
//! Only the semantics live here. Encoding them for the wire is up to the
//! transport; the serde derives let a host pick any format.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use mv_core::{ParcelId, RequestId, UserId, UserPrivacySettings};

/// What the client offers: which overrides the user allows
///
/// This states permissions, not what the server will actually do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffRequest {
    pub request_id: RequestId,
    pub user_id: UserId,
    pub parcel_id: ParcelId,
    pub allow_visual_override: bool,
    pub allow_physics_override: bool,
    pub allow_script_blocking: bool,
}

impl HandoffRequest {
    /// Build a request whose allow-flags mirror the user's settings exactly
    pub fn from_settings(
        request_id: RequestId,
        user_id: UserId,
        parcel_id: ParcelId,
        settings: &UserPrivacySettings,
    ) -> Self {
        HandoffRequest {
            request_id,
            user_id,
            parcel_id,
            allow_visual_override: settings.allow_visual_overrides,
            allow_physics_override: settings.allow_physics_overrides,
            allow_script_blocking: settings.allow_drm_scripts,
        }
    }
}

/// A condition the parcel server imposes on entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mandate {
    /// Server blocks the user's own scripts and tools (DRM)
    ScriptBlocking,
    /// Server replaces visuals (skybox, shaders)
    VisualOverride,
    /// Server replaces physics parameters
    PhysicsOverride,
}

/// The parcel server's answer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffResponse {
    /// Request this answers
    pub request_id: RequestId,
    pub approved: bool,
    /// Meaningful only when `approved` is false
    #[serde(default)]
    pub rejection_reason: String,
    #[serde(default)]
    pub mandates: BTreeSet<Mandate>,
    /// Asset manifest to stream on entry
    #[serde(default)]
    pub manifest: Option<String>,
}

impl HandoffResponse {
    pub fn approve(request_id: RequestId) -> Self {
        HandoffResponse {
            request_id,
            approved: true,
            rejection_reason: String::new(),
            mandates: BTreeSet::new(),
            manifest: None,
        }
    }

    pub fn reject(request_id: RequestId, reason: impl Into<String>) -> Self {
        HandoffResponse {
            request_id,
            approved: false,
            rejection_reason: reason.into(),
            mandates: BTreeSet::new(),
            manifest: None,
        }
    }

    pub fn with_mandate(mut self, mandate: Mandate) -> Self {
        self.mandates.insert(mandate);
        self
    }

    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    pub fn requires(&self, mandate: Mandate) -> bool {
        self.mandates.contains(&mandate)
    }

    pub fn requires_script_blocking(&self) -> bool {
        self.requires(Mandate::ScriptBlocking)
    }
}
