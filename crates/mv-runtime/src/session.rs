//! Client session
//!
//! Feeds avatar positions through the boundary tracker and, when the avatar
//! walks through a gateway while locally simulated, runs one entry attempt:
//! resolve the location, request entry at the verified parcel server, and
//! give up if the server stays silent past the negotiation deadline.
//!
//! At most one attempt is alive per session. A newer crossing, the session's
//! emergency exit, or dropping the session aborts it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use mv_authority::{
    AuthorityHandle, AuthorityManager, AuthorityPhase, EmergencyTrigger, EntryTicket,
    HandoffResponse, Hooks, Transition,
};
use mv_core::{MvResult, Vec3};
use mv_spatial::{BoundaryEvent, BoundaryTracker, Directory, Geography, SpatialResolver};

use crate::config::{ClientConfig, SessionConfig};

/// Result of an explicit `ClientSession::enter`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Nobody verifiably owns the location; stay on the street
    Wilderness,
    /// A parcel was found and handed to the authority manager
    Transition(Transition),
}

pub struct ClientSession<D> {
    resolver: Arc<SpatialResolver<D>>,
    authority: AuthorityHandle,
    tracker: BoundaryTracker,
    negotiation_timeout: Duration,
    attempt: Option<JoinHandle<()>>,
}

impl<D: Directory + 'static> ClientSession<D> {
    pub fn new(
        resolver: Arc<SpatialResolver<D>>,
        authority: AuthorityHandle,
        geography: Geography,
        config: &SessionConfig,
    ) -> Self {
        ClientSession {
            resolver,
            authority,
            tracker: BoundaryTracker::new(geography),
            negotiation_timeout: config.negotiation_timeout(),
            attempt: None,
        }
    }

    /// Session against the production registry
    pub fn with_registry(directory: D, config: &ClientConfig, hooks: Hooks) -> MvResult<Self> {
        config.validate()?;
        let resolver = SpatialResolver::new(directory, config.resolver.clone())?;
        let geography = Geography::new(config.geography)?;
        let authority = AuthorityHandle::new(AuthorityManager::new(config.privacy, hooks));
        Ok(Self::new(
            Arc::new(resolver),
            authority,
            geography,
            &config.session,
        ))
    }

    pub fn authority(&self) -> &AuthorityHandle {
        &self.authority
    }

    pub fn resolver(&self) -> &Arc<SpatialResolver<D>> {
        &self.resolver
    }

    pub fn phase(&self) -> AuthorityPhase {
        self.authority.phase()
    }

    /// True while an entry attempt is resolving or waiting on the server
    pub fn attempt_in_progress(&self) -> bool {
        self.attempt
            .as_ref()
            .map_or(false, |attempt| !attempt.is_finished())
    }

    /// Feed the latest avatar position
    ///
    /// Must be called from within a tokio runtime: a gateway crossing in
    /// street mode spawns the entry attempt.
    pub fn on_position(&mut self, position: Vec3) -> Option<BoundaryEvent> {
        let event = self.tracker.observe(position)?;

        match event {
            BoundaryEvent::GatewayCrossed { position } => {
                if self.authority.phase() == AuthorityPhase::StreetMode {
                    self.begin_attempt(position);
                } else {
                    tracing::debug!(?position, "gateway crossed while not in street mode");
                }
            }
            BoundaryEvent::ReturnedToStreet { position } => {
                tracing::debug!(?position, "returned to street");
            }
        }

        Some(event)
    }

    fn begin_attempt(&mut self, position: Vec3) {
        self.cancel_attempt();

        let ticket = self.authority.entry_ticket();
        let resolver = Arc::clone(&self.resolver);
        let authority = self.authority.clone();
        let timeout = self.negotiation_timeout;

        tracing::debug!(?position, "gateway crossed, resolving");
        self.attempt = Some(tokio::spawn(run_attempt(
            resolver, authority, ticket, position, timeout,
        )));
    }

    fn cancel_attempt(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            attempt.abort();
        }
    }

    /// Resolve `position` and request entry, without the negotiation timer
    ///
    /// For hosts that drive entry themselves (teleports, scripted portals).
    pub async fn enter(&self, position: Vec3) -> EntryOutcome {
        let ticket = self.authority.entry_ticket();
        match self.resolver.resolve(position).await.into_parcel() {
            Some(parcel) => {
                let (parcel_id, server) = parcel.entry_target();
                EntryOutcome::Transition(self.authority.request_entry_with(ticket, parcel_id, server))
            }
            None => EntryOutcome::Wilderness,
        }
    }

    /// Route a response from the parcel server
    pub fn on_handoff_response(&self, response: HandoffResponse) -> Transition {
        self.authority.on_handoff_response(response)
    }

    /// Kill switch: drop any attempt and return to the street
    pub fn emergency_exit(&mut self) -> Transition {
        self.cancel_attempt();
        self.authority.emergency_exit()
    }

    /// Trigger for the panic input, usable from any thread
    ///
    /// Firing it does not cancel this session's attempt task, but the
    /// attempt can no longer open a negotiation.
    pub fn emergency_trigger(&self) -> EmergencyTrigger {
        self.authority.emergency_trigger()
    }
}

impl<D> Drop for ClientSession<D> {
    fn drop(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            attempt.abort();
        }
    }
}

async fn run_attempt<D: Directory>(
    resolver: Arc<SpatialResolver<D>>,
    authority: AuthorityHandle,
    ticket: EntryTicket,
    position: Vec3,
    negotiation_timeout: Duration,
) {
    let Some(parcel) = resolver.resolve(position).await.into_parcel() else {
        tracing::debug!(?position, "wilderness, staying in street mode");
        return;
    };

    let (parcel_id, server) = parcel.entry_target();
    let Transition::RequestSent(request_id) =
        authority.request_entry_with(ticket, parcel_id, server)
    else {
        return;
    };

    tokio::time::sleep(negotiation_timeout).await;
    // No-op if the server answered or the user bailed out meanwhile
    authority.on_negotiation_timeout(request_id);
}
