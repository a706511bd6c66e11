//! Collaborators the authority manager drives
//!
//! Each is a narrow capability injected at construction so the manager
//! never depends on a concrete engine, UI or network stack. None of them
//! may block: the emergency exit calls into them and must finish even when
//! the parcel server is unresponsive.

use mv_core::{ConnectionInfo, MvResult, ParcelId, UserId};
use mv_crypto::Identity;

use crate::protocol::HandoffRequest;

/// Local physics layer: toggles locally-authoritative simulation
pub trait PhysicsAuthority: Send {
    fn set_local_authority(&self, enabled: bool);
}

impl<F: Fn(bool) + Send> PhysicsAuthority for F {
    fn set_local_authority(&self, enabled: bool) {
        self(enabled)
    }
}

/// Notification/UI layer: human-readable strings only
pub trait Notifier: Send {
    fn notify(&self, message: &str);
}

impl<F: Fn(&str) + Send> Notifier for F {
    fn notify(&self, message: &str) {
        self(message)
    }
}

/// Movement controller: one-shot push back out of a gateway
pub trait MovementController: Send {
    fn bounce(&self);
}

impl<F: Fn() + Send> MovementController for F {
    fn bounce(&self) {
        self()
    }
}

/// Reliable request delivery to parcel servers
///
/// Both calls hand off and return; delivery happens elsewhere.
pub trait HandoffTransport: Send {
    fn send_request(&self, server: &ConnectionInfo, request: &HandoffRequest) -> MvResult<()>;

    /// Sever any parcel session
    fn disconnect(&self);
}

/// Asset/manifest streaming, started once a parcel takes over
pub trait AssetStreamer: Send {
    fn begin_manifest_load(&self, parcel: ParcelId, manifest: Option<&str>);
}

/// Source of the user id placed into each request
pub trait IdentityProvider: Send {
    fn user_id(&self) -> UserId;
}

impl IdentityProvider for Identity {
    fn user_id(&self) -> UserId {
        Identity::user_id(self)
    }
}

impl IdentityProvider for UserId {
    fn user_id(&self) -> UserId {
        *self
    }
}

/// Streamer for hosts that load assets some other way
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssetStreaming;

impl AssetStreamer for NoAssetStreaming {
    fn begin_manifest_load(&self, _parcel: ParcelId, _manifest: Option<&str>) {}
}

/// Every collaborator the manager needs
pub struct Hooks {
    pub physics: Box<dyn PhysicsAuthority>,
    pub notifier: Box<dyn Notifier>,
    pub movement: Box<dyn MovementController>,
    pub transport: Box<dyn HandoffTransport>,
    pub assets: Box<dyn AssetStreamer>,
    pub identity: Box<dyn IdentityProvider>,
}

impl Hooks {
    pub fn new(
        physics: impl PhysicsAuthority + 'static,
        notifier: impl Notifier + 'static,
        movement: impl MovementController + 'static,
        transport: impl HandoffTransport + 'static,
        identity: impl IdentityProvider + 'static,
    ) -> Self {
        Hooks {
            physics: Box::new(physics),
            notifier: Box::new(notifier),
            movement: Box::new(movement),
            transport: Box::new(transport),
            assets: Box::new(NoAssetStreaming),
            identity: Box::new(identity),
        }
    }

    pub fn with_assets(mut self, assets: impl AssetStreamer + 'static) -> Self {
        self.assets = Box::new(assets);
        self
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
