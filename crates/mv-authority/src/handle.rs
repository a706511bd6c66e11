//! Thread-safe access to one session's authority manager
//!
//! All transitions go through a single lock, so `request_entry`,
//! `on_handoff_response` and `emergency_exit` always observe a consistent
//! prior state. Hooks never block, so the lock is only ever held for the
//! length of one transition and the emergency exit cannot be starved by
//! network I/O.
//!
//! The handle also counts emergency exits. An entry attempt takes an
//! `EntryTicket` when it starts (before resolving the parcel) and presents
//! it when requesting entry; if the kill switch fired in between, even in
//! street mode, the request is dropped. A lookup that was in flight when
//! the user bailed out must not start a negotiation afterwards.

use std::sync::Arc;

use parking_lot::Mutex;

use mv_core::{ConnectionInfo, ParcelId, RequestId};

use crate::manager::{AbortReason, AuthorityManager, Transition};
use crate::protocol::HandoffResponse;
use crate::state::{AuthorityPhase, AuthorityState};

/// Proof that no emergency exit happened since it was issued
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryTicket(u64);

#[derive(Debug)]
struct Guarded {
    manager: AuthorityManager,
    emergency_exits: u64,
}

/// Clonable, serialized handle to an `AuthorityManager`
#[derive(Clone, Debug)]
pub struct AuthorityHandle {
    inner: Arc<Mutex<Guarded>>,
}

impl AuthorityHandle {
    pub fn new(manager: AuthorityManager) -> Self {
        AuthorityHandle {
            inner: Arc::new(Mutex::new(Guarded {
                manager,
                emergency_exits: 0,
            })),
        }
    }

    pub fn request_entry(&self, parcel: ParcelId, server: ConnectionInfo) -> Transition {
        self.inner.lock().manager.request_entry(parcel, server)
    }

    pub fn entry_ticket(&self) -> EntryTicket {
        EntryTicket(self.inner.lock().emergency_exits)
    }

    /// `request_entry`, unless the kill switch fired after `ticket` was issued
    pub fn request_entry_with(
        &self,
        ticket: EntryTicket,
        parcel: ParcelId,
        server: ConnectionInfo,
    ) -> Transition {
        let mut guarded = self.inner.lock();
        if guarded.emergency_exits != ticket.0 {
            tracing::debug!(%parcel, "entry attempt outlived an emergency exit; dropped");
            return Transition::Ignored;
        }
        guarded.manager.request_entry(parcel, server)
    }

    pub fn on_handoff_response(&self, response: HandoffResponse) -> Transition {
        self.inner.lock().manager.on_handoff_response(response)
    }

    pub fn on_negotiation_timeout(&self, request_id: RequestId) -> Transition {
        self.inner.lock().manager.on_negotiation_timeout(request_id)
    }

    pub fn emergency_exit(&self) -> Transition {
        let mut guarded = self.inner.lock();
        guarded.emergency_exits = guarded.emergency_exits.wrapping_add(1);
        guarded.manager.emergency_exit()
    }

    pub fn phase(&self) -> AuthorityPhase {
        self.inner.lock().manager.phase()
    }

    pub fn state(&self) -> AuthorityState {
        self.inner.lock().manager.state().clone()
    }

    pub fn current_parcel(&self) -> Option<ParcelId> {
        self.inner.lock().manager.current_parcel()
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.inner.lock().manager.pending_request()
    }

    pub fn last_abort(&self) -> Option<AbortReason> {
        self.inner.lock().manager.last_abort().cloned()
    }

    /// A trigger for the dedicated panic input
    pub fn emergency_trigger(&self) -> EmergencyTrigger {
        EmergencyTrigger {
            handle: self.clone(),
        }
    }
}

/// Always-armed kill switch, bound to a dedicated input outside any menu
#[derive(Clone, Debug)]
pub struct EmergencyTrigger {
    handle: AuthorityHandle,
}

impl EmergencyTrigger {
    pub fn fire(&self) -> Transition {
        self.handle.emergency_exit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{HandoffTransport, Hooks};
    use crate::protocol::HandoffRequest;
    use mv_core::{MvResult, UserId, UserPrivacySettings};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct NullTransport;

    impl HandoffTransport for NullTransport {
        fn send_request(&self, _: &ConnectionInfo, _: &HandoffRequest) -> MvResult<()> {
            Ok(())
        }

        fn disconnect(&self) {}
    }

    fn handle(physics_calls: Arc<AtomicUsize>) -> AuthorityHandle {
        let hooks = Hooks::new(
            move |_: bool| {
                physics_calls.fetch_add(1, Ordering::SeqCst);
            },
            |_: &str| {},
            || {},
            NullTransport,
            UserId::default(),
        );
        AuthorityHandle::new(AuthorityManager::new(UserPrivacySettings::default(), hooks))
    }

    fn server() -> ConnectionInfo {
        ConnectionInfo::new("parcel.example", 4433, [0; 32])
    }

    #[test]
    fn test_trigger_exits() {
        let h = handle(Arc::default());
        let trigger = h.emergency_trigger();

        h.request_entry(ParcelId::new(1), server());
        assert_eq!(h.phase(), AuthorityPhase::Negotiating);

        assert_eq!(trigger.fire(), Transition::EmergencyExited);
        assert_eq!(h.phase(), AuthorityPhase::StreetMode);
        assert_eq!(trigger.fire(), Transition::Ignored);
    }

    #[test]
    fn test_ticket_invalidated_by_emergency_exit() {
        let h = handle(Arc::default());
        let stale = h.entry_ticket();

        // Kill switch in street mode changes no state...
        assert_eq!(h.emergency_exit(), Transition::Ignored);
        assert_eq!(h.phase(), AuthorityPhase::StreetMode);

        // ...but a lookup started before it may not open a negotiation
        assert_eq!(
            h.request_entry_with(stale, ParcelId::new(1), server()),
            Transition::Ignored
        );
        assert_eq!(h.phase(), AuthorityPhase::StreetMode);

        let fresh = h.entry_ticket();
        assert!(matches!(
            h.request_entry_with(fresh, ParcelId::new(1), server()),
            Transition::RequestSent(_)
        ));
    }

    #[test]
    fn test_emergency_races_response() {
        for _ in 0..200 {
            let physics = Arc::new(AtomicUsize::new(0));
            let h = handle(physics.clone());
            h.request_entry(ParcelId::new(1), server());
            let id = h.pending_request().unwrap();

            let responder = {
                let h = h.clone();
                thread::spawn(move || h.on_handoff_response(HandoffResponse::approve(id)))
            };
            let exit = {
                let h = h.clone();
                thread::spawn(move || h.emergency_exit())
            };
            let response = responder.join().unwrap();
            let exited = exit.join().unwrap();

            // Whatever the interleaving, the kill switch wins
            assert_eq!(exited, Transition::EmergencyExited);
            assert_eq!(h.phase(), AuthorityPhase::StreetMode);
            assert_eq!(h.current_parcel(), None);
            match response {
                // Response landed first: disable, then re-enable
                Transition::EnteredParcel(_) => assert_eq!(physics.load(Ordering::SeqCst), 2),
                // Emergency landed first: response was discarded
                Transition::Ignored => assert_eq!(physics.load(Ordering::SeqCst), 1),
                other => panic!("unexpected transition {:?}", other),
            }
        }
    }
}
