//! Authority state

use mv_core::{ConnectionInfo, ParcelId, RequestId};

/// Who controls the avatar's simulation
///
/// The current parcel lives inside the state, so there is no separate
/// "current parcel id" to forget to clear.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum AuthorityState {
    /// Local authority. Initial state and the safe terminal of every failure.
    #[default]
    StreetMode,
    /// Request sent, waiting for the parcel server
    Negotiating {
        parcel: ParcelId,
        server: ConnectionInfo,
        request_id: RequestId,
    },
    /// Parcel server has simulation authority
    ParcelMode {
        parcel: ParcelId,
        server: ConnectionInfo,
    },
}

/// Field-less view of `AuthorityState`, handy for logs and UI
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthorityPhase {
    StreetMode,
    Negotiating,
    ParcelMode,
}

impl AuthorityState {
    pub fn phase(&self) -> AuthorityPhase {
        match self {
            AuthorityState::StreetMode => AuthorityPhase::StreetMode,
            AuthorityState::Negotiating { .. } => AuthorityPhase::Negotiating,
            AuthorityState::ParcelMode { .. } => AuthorityPhase::ParcelMode,
        }
    }

    pub fn parcel(&self) -> Option<ParcelId> {
        match self {
            AuthorityState::StreetMode => None,
            AuthorityState::Negotiating { parcel, .. } | AuthorityState::ParcelMode { parcel, .. } => {
                Some(*parcel)
            }
        }
    }

    pub fn server(&self) -> Option<&ConnectionInfo> {
        match self {
            AuthorityState::StreetMode => None,
            AuthorityState::Negotiating { server, .. } | AuthorityState::ParcelMode { server, .. } => {
                Some(server)
            }
        }
    }

    /// Outstanding request, if negotiating
    pub fn pending_request(&self) -> Option<RequestId> {
        match self {
            AuthorityState::Negotiating { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }

    pub fn is_street(&self) -> bool {
        matches!(self, AuthorityState::StreetMode)
    }
}
