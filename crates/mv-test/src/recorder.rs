//! Recording hooks
//!
//! One `Recorder` stands in for the physics layer, the UI, the movement
//! controller, the transport and the asset streamer at once, logging every
//! call in order so tests can assert on exact side-effect sequences.

use std::sync::Arc;

use parking_lot::Mutex;

use mv_authority::{
    AssetStreamer, HandoffRequest, HandoffTransport, Hooks, MovementController, Notifier,
    PhysicsAuthority,
};
use mv_core::{ConnectionInfo, MvError, MvResult, ParcelId, UserId};

/// A side effect the authority manager asked for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookCall {
    Physics(bool),
    Notify(String),
    Bounce,
    Request {
        server: ConnectionInfo,
        request: HandoffRequest,
    },
    Disconnect,
    ManifestLoad {
        parcel: ParcelId,
        manifest: Option<String>,
    },
}

/// Shared, clonable call log
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<HookCall>>>,
    fail_sends: Arc<Mutex<bool>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks that all report into this recorder
    pub fn hooks(&self, user: UserId) -> Hooks {
        Hooks::new(self.clone(), self.clone(), self.clone(), self.clone(), user)
            .with_assets(self.clone())
    }

    /// Make `send_request` fail as if the network stack were gone
    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock() = fail;
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().clone()
    }

    pub fn take(&self) -> Vec<HookCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Physics toggles, in order
    pub fn physics(&self) -> Vec<bool> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                HookCall::Physics(enabled) => Some(*enabled),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                HookCall::Notify(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn requests(&self) -> Vec<HandoffRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                HookCall::Request { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &HookCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    fn push(&self, call: HookCall) {
        self.calls.lock().push(call);
    }
}

impl PhysicsAuthority for Recorder {
    fn set_local_authority(&self, enabled: bool) {
        self.push(HookCall::Physics(enabled));
    }
}

impl Notifier for Recorder {
    fn notify(&self, message: &str) {
        self.push(HookCall::Notify(message.to_string()));
    }
}

impl MovementController for Recorder {
    fn bounce(&self) {
        self.push(HookCall::Bounce);
    }
}

impl HandoffTransport for Recorder {
    fn send_request(&self, server: &ConnectionInfo, request: &HandoffRequest) -> MvResult<()> {
        if *self.fail_sends.lock() {
            return Err(MvError::TransportError("link down".into()));
        }
        self.push(HookCall::Request {
            server: server.clone(),
            request: request.clone(),
        });
        Ok(())
    }

    fn disconnect(&self) {
        self.push(HookCall::Disconnect);
    }
}

impl AssetStreamer for Recorder {
    fn begin_manifest_load(&self, parcel: ParcelId, manifest: Option<&str>) {
        self.push(HookCall::ManifestLoad {
            parcel,
            manifest: manifest.map(str::to_string),
        });
    }
}
