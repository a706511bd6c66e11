//! End-to-end Integration Test Suite
//!
//! Drives a full client session against a signed directory and a simulated
//! parcel server:
//! - Gateway crossing to parcel mode
//! - Client-side rights enforcement
//! - Rejections, silent servers and forged or stale leases
//! - The emergency exit

use std::sync::Arc;

use tokio::task::JoinHandle;

use mv_authority::{AuthorityHandle, AuthorityManager, Hooks};
use mv_core::{MvResult, ParcelId, UserId, UserPrivacySettings, Vec3};
use mv_runtime::{ChannelTransport, ClientSession, SessionConfig};
use mv_spatial::{Geography, GeographyConfig, MemoryDirectory, SpatialKey};

use crate::parcel_server::{ParcelServerSim, ServerPolicy};
use crate::recorder::Recorder;
use crate::registry::{parcel_endpoint, TestRegistry};

// ============================================================================
// SIMULATED WORLD
// ============================================================================

/// One client, one registry, one parcel server
pub struct World {
    pub registry: TestRegistry,
    pub recorder: Recorder,
    pub server: Arc<ParcelServerSim>,
    pub session: ClientSession<Arc<MemoryDirectory>>,
    server_task: JoinHandle<()>,
}

impl World {
    /// Must be called inside a tokio runtime
    pub fn new(
        server: ParcelServerSim,
        settings: UserPrivacySettings,
        user: UserId,
    ) -> MvResult<Self> {
        let registry = TestRegistry::new();
        let recorder = Recorder::new();
        let (transport, outbound) = ChannelTransport::new();

        let hooks = Hooks::new(
            recorder.clone(),
            recorder.clone(),
            recorder.clone(),
            transport,
            user,
        )
        .with_assets(recorder.clone());
        let authority = AuthorityHandle::new(AuthorityManager::new(settings, hooks));

        let server = Arc::new(server);
        let server_task = Arc::clone(&server).spawn(outbound, authority.clone());

        let session = ClientSession::new(
            registry.resolver()?,
            authority,
            Geography::new(GeographyConfig::default())?,
            &SessionConfig::default(),
        );

        Ok(World {
            registry,
            recorder,
            server,
            session,
            server_task,
        })
    }

    pub fn publish(&self, position: Vec3, parcel: ParcelId) -> Option<SpatialKey> {
        self.registry
            .publish(position, parcel, parcel_endpoint(parcel))
    }

    /// Feed a walk, one position per frame
    pub fn walk(&mut self, path: &[Vec3]) {
        for position in path {
            self.session.on_position(*position);
        }
    }

    /// Let spawned attempts and the server loop run
    pub async fn settle(&self) {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}

/// A point on the public road
pub fn on_street() -> Vec3 {
    Vec3::new(5.0, 0.0, 50.0)
}

/// A point inside the lot next to `on_street`
pub fn in_lot() -> Vec3 {
    Vec3::new(50.0, 0.0, 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::HookCall;
    use mv_authority::{AbortReason, AuthorityPhase, Mandate, RightsViolation, EMERGENCY_EXIT_MESSAGE};
    use mv_crypto::Identity;
    use std::time::Duration;

    const LOT: ParcelId = ParcelId(0x10);

    fn world(policy: ServerPolicy, settings: UserPrivacySettings) -> World {
        World::new(ParcelServerSim::new(policy), settings, UserId::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_into_parcel() {
        let server = ParcelServerSim::new(ServerPolicy::approve()).with_manifest("manifest://lot");
        let mut w = World::new(server, UserPrivacySettings::default(), UserId::default()).unwrap();
        w.publish(in_lot(), LOT).unwrap();

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::ParcelMode);
        assert_eq!(w.session.authority().current_parcel(), Some(LOT));
        assert_eq!(w.recorder.physics(), vec![false]);
        assert_eq!(
            w.recorder.calls(),
            vec![
                HookCall::Physics(false),
                HookCall::ManifestLoad {
                    parcel: LOT,
                    manifest: Some("manifest://lot".into()),
                },
            ]
        );
        assert_eq!(w.server.log().requests.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_carries_identity_and_settings() {
        let identity = Identity::generate();
        let settings = UserPrivacySettings::strict();
        let mut w = World::new(
            ParcelServerSim::new(ServerPolicy::Silent),
            settings,
            identity.user_id(),
        )
        .unwrap();
        w.publish(in_lot(), LOT).unwrap();

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;

        let requests = w.server.log().requests;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.user_id, identity.user_id());
        assert_eq!(request.parcel_id, LOT);
        assert_eq!(request.allow_visual_override, settings.allow_visual_overrides);
        assert_eq!(request.allow_physics_override, settings.allow_physics_overrides);
        assert_eq!(request.allow_script_blocking, settings.allow_drm_scripts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drm_parcel_refused() {
        let mut w = world(
            ServerPolicy::approve_with(&[Mandate::ScriptBlocking]),
            UserPrivacySettings::default(),
        );
        w.publish(in_lot(), LOT).unwrap();

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::StreetMode);
        assert_eq!(
            w.session.authority().last_abort(),
            Some(AbortReason::RightsViolation(RightsViolation::ScriptBlocking))
        );
        assert_eq!(
            w.recorder.notifications(),
            vec!["Server requires script blocking, but user refused.".to_string()]
        );
        assert_eq!(w.recorder.count(&HookCall::Bounce), 1);
        // Local physics was never handed over
        assert_eq!(w.recorder.physics(), vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drm_parcel_accepted_when_allowed() {
        let mut w = world(
            ServerPolicy::approve_with(&[Mandate::ScriptBlocking]),
            UserPrivacySettings::permissive(),
        );
        w.publish(in_lot(), LOT).unwrap();

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::ParcelMode);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_reason_verbatim() {
        let mut w = world(
            ServerPolicy::reject("Private event until 21:00"),
            UserPrivacySettings::default(),
        );
        w.publish(in_lot(), LOT).unwrap();

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::StreetMode);
        assert_eq!(
            w.recorder.notifications(),
            vec!["Private event until 21:00".to_string()]
        );
        assert_eq!(w.recorder.count(&HookCall::Bounce), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out() {
        let mut w = world(ServerPolicy::Silent, UserPrivacySettings::default());
        w.publish(in_lot(), LOT).unwrap();

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;
        assert_eq!(w.session.phase(), AuthorityPhase::Negotiating);

        tokio::time::sleep(SessionConfig::default().negotiation_timeout() + Duration::from_secs(1))
            .await;
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::StreetMode);
        assert_eq!(w.session.authority().last_abort(), Some(AbortReason::TimedOut));
        assert_eq!(w.server.log().disconnects, 1);
        assert_eq!(w.recorder.count(&HookCall::Bounce), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forged_lease_is_wilderness() {
        let mut w = world(ServerPolicy::approve(), UserPrivacySettings::default());
        w.registry
            .publish_forged(in_lot(), LOT, parcel_endpoint(LOT))
            .unwrap();

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::StreetMode);
        assert!(w.server.log().requests.is_empty());
        assert!(w.recorder.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_is_wilderness() {
        let mut w = world(ServerPolicy::approve(), UserPrivacySettings::default());
        w.publish(in_lot(), LOT).unwrap();
        w.registry
            .clock()
            .advance(Duration::from_secs(crate::registry::LEASE_SECS));

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::StreetMode);
        assert!(w.server.log().requests.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_emergency_exit_from_parcel() {
        let mut w = world(ServerPolicy::approve(), UserPrivacySettings::default());
        w.publish(in_lot(), LOT).unwrap();
        w.walk(&[on_street(), in_lot()]);
        w.settle().await;
        assert_eq!(w.session.phase(), AuthorityPhase::ParcelMode);

        assert_eq!(
            w.session.emergency_trigger().fire(),
            mv_authority::Transition::EmergencyExited
        );
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::StreetMode);
        assert_eq!(w.session.authority().current_parcel(), None);
        assert_eq!(w.recorder.physics(), vec![false, true]);
        assert_eq!(
            w.recorder.notifications(),
            vec![EMERGENCY_EXIT_MESSAGE.to_string()]
        );
        assert_eq!(w.server.log().disconnects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentry_after_walking_out() {
        let mut w = world(ServerPolicy::Silent, UserPrivacySettings::default());
        w.publish(in_lot(), LOT).unwrap();

        w.walk(&[on_street(), in_lot()]);
        w.settle().await;
        w.session.emergency_exit();

        // Back on the road and through the gateway again
        w.walk(&[on_street(), in_lot()]);
        w.settle().await;

        assert_eq!(w.session.phase(), AuthorityPhase::Negotiating);
        assert_eq!(w.server.log().requests.len(), 2);
        let ids: Vec<_> = w
            .server
            .log()
            .requests
            .iter()
            .map(|r| r.request_id)
            .collect();
        assert_ne!(ids[0], ids[1]);
    }
}
