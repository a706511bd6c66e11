//! Authority manager - the handoff state machine
//!
//! Transitions are synchronous and must be serialized by the caller (see
//! `AuthorityHandle`). Events that arrive in the wrong state are ignored:
//! under races with the emergency exit or duplicate triggers that is the
//! expected outcome, not a fault.

use std::fmt;
use std::mem;

use mv_core::{ConnectionInfo, ParcelId, RequestId, UserPrivacySettings};

use crate::hooks::Hooks;
use crate::protocol::{HandoffRequest, HandoffResponse};
use crate::rights::{check_rights, RightsViolation};
use crate::state::{AuthorityPhase, AuthorityState};

/// Shown to the user after the kill switch
pub const EMERGENCY_EXIT_MESSAGE: &str = "Emergency exit activated. Returned to street.";

/// Why a negotiation ended in street mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// Server declined; its reason is shown verbatim
    Rejected(String),
    /// Server approved but demanded something the user refused
    RightsViolation(RightsViolation),
    /// The request never left the client
    DispatchFailed(String),
    /// Server did not answer before the negotiation deadline
    TimedOut,
}

impl AbortReason {
    /// Text handed to the notification layer
    pub fn message(&self) -> String {
        match self {
            AbortReason::Rejected(reason) => reason.clone(),
            AbortReason::RightsViolation(v) => v.to_string(),
            AbortReason::DispatchFailed(e) => format!("Could not reach parcel server: {}", e),
            AbortReason::TimedOut => "Parcel server did not answer in time.".to_string(),
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// What an event did to the state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Event did not apply to the current state; nothing changed
    Ignored,
    /// StreetMode -> Negotiating
    RequestSent(RequestId),
    /// Negotiating -> ParcelMode
    EnteredParcel(ParcelId),
    /// Negotiating -> StreetMode
    Aborted(AbortReason),
    /// Negotiating | ParcelMode -> StreetMode via the kill switch
    EmergencyExited,
}

/// Exclusive owner of one session's `AuthorityState`
pub struct AuthorityManager {
    state: AuthorityState,
    settings: UserPrivacySettings,
    hooks: Hooks,
    next_request: RequestId,
    last_abort: Option<AbortReason>,
}

impl AuthorityManager {
    /// Start in street mode with the user's (read-only) settings
    pub fn new(settings: UserPrivacySettings, hooks: Hooks) -> Self {
        AuthorityManager {
            state: AuthorityState::StreetMode,
            settings,
            hooks,
            next_request: RequestId::new(1),
            last_abort: None,
        }
    }

    pub fn state(&self) -> &AuthorityState {
        &self.state
    }

    pub fn phase(&self) -> AuthorityPhase {
        self.state.phase()
    }

    pub fn current_parcel(&self) -> Option<ParcelId> {
        self.state.parcel()
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.state.pending_request()
    }

    pub fn settings(&self) -> &UserPrivacySettings {
        &self.settings
    }

    /// Reason the most recent negotiation failed, if any did
    pub fn last_abort(&self) -> Option<&AbortReason> {
        self.last_abort.as_ref()
    }

    /// Avatar hit a gateway: ask `server` to take over `parcel`
    ///
    /// Only valid in street mode; anything else is a duplicate trigger.
    pub fn request_entry(&mut self, parcel: ParcelId, server: ConnectionInfo) -> Transition {
        if !self.state.is_street() {
            tracing::debug!(
                %parcel,
                phase = ?self.state.phase(),
                "entry request ignored: negotiation already under way"
            );
            return Transition::Ignored;
        }

        let request_id = self.next_request;
        self.next_request = request_id.next();

        let request = HandoffRequest::from_settings(
            request_id,
            self.hooks.identity.user_id(),
            parcel,
            &self.settings,
        );

        tracing::info!(%parcel, %server, request = %request_id, "requesting parcel entry");
        self.state = AuthorityState::Negotiating {
            parcel,
            server: server.clone(),
            request_id,
        };

        match self.hooks.transport.send_request(&server, &request) {
            Ok(()) => Transition::RequestSent(request_id),
            Err(e) => self.abort(AbortReason::DispatchFailed(e.to_string())),
        }
    }

    /// Apply the parcel server's answer
    ///
    /// Rights are checked after approval but before any state mutation, so
    /// a violation never leaves the client half-transferred.
    pub fn on_handoff_response(&mut self, response: HandoffResponse) -> Transition {
        let (parcel, server) = match &self.state {
            AuthorityState::Negotiating {
                parcel,
                server,
                request_id,
            } if *request_id == response.request_id => (*parcel, server.clone()),
            AuthorityState::Negotiating { request_id, .. } => {
                tracing::debug!(
                    expected = %request_id,
                    got = %response.request_id,
                    "stale handoff response ignored"
                );
                return Transition::Ignored;
            }
            _ => {
                tracing::debug!(
                    phase = ?self.state.phase(),
                    request = %response.request_id,
                    "handoff response ignored: not negotiating"
                );
                return Transition::Ignored;
            }
        };

        if !response.approved {
            return self.abort(AbortReason::Rejected(response.rejection_reason));
        }

        if let Err(violation) = check_rights(&response.mandates, &self.settings) {
            return self.abort(AbortReason::RightsViolation(violation));
        }

        self.state = AuthorityState::ParcelMode { parcel, server };
        self.hooks.physics.set_local_authority(false);
        self.hooks
            .assets
            .begin_manifest_load(parcel, response.manifest.as_deref());

        tracing::info!(%parcel, "entered parcel; simulation authority handed to server");
        Transition::EnteredParcel(parcel)
    }

    /// The server never answered request `request_id`
    pub fn on_negotiation_timeout(&mut self, request_id: RequestId) -> Transition {
        if self.state.pending_request() != Some(request_id) {
            return Transition::Ignored;
        }
        self.hooks.transport.disconnect();
        self.abort(AbortReason::TimedOut)
    }

    /// The kill switch. Returns to street mode from anywhere.
    ///
    /// Performs no network I/O beyond asking the transport to drop the
    /// session, so it completes even against a hostile or dead server.
    pub fn emergency_exit(&mut self) -> Transition {
        if self.state.is_street() {
            return Transition::Ignored;
        }

        let previous = mem::take(&mut self.state);
        self.hooks.transport.disconnect();
        self.hooks.physics.set_local_authority(true);
        self.hooks.notifier.notify(EMERGENCY_EXIT_MESSAGE);

        tracing::warn!(
            from = ?previous.phase(),
            parcel = ?previous.parcel(),
            "emergency exit: returned to street"
        );
        Transition::EmergencyExited
    }

    fn abort(&mut self, reason: AbortReason) -> Transition {
        let previous = mem::take(&mut self.state);
        // Every abort hands the physics layer an explicit "local" so the
        // bounce below runs under local simulation whatever the host assumed.
        self.hooks.physics.set_local_authority(true);
        self.hooks.notifier.notify(&reason.message());
        self.hooks.movement.bounce();

        tracing::warn!(parcel = ?previous.parcel(), %reason, "parcel entry failed");
        self.last_abort = Some(reason.clone());
        Transition::Aborted(reason)
    }
}

impl fmt::Debug for AuthorityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityManager")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("last_abort", &self.last_abort)
            .finish_non_exhaustive()
    }
}
