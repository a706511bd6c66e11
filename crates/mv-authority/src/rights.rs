//! Client-side rights enforcement
//!
//! A pure function of (mandates, settings). The server's approval does not
//! matter here: if it forces script blocking on a user who refused DRM
//! scripts, the client walks away.
//!
//! Visual and physics override mandates are not enforced on the client. The
//! user's stance on those already travels in the `HandoffRequest`, and an
//! approval carrying them still completes the transfer.

use std::collections::BTreeSet;

use thiserror::Error;

use mv_core::UserPrivacySettings;

use crate::protocol::Mandate;

/// A server mandate that conflicts with the user's settings
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightsViolation {
    #[error("Server requires script blocking, but user refused.")]
    ScriptBlocking,
}

/// Reject forced script blocking the user did not allow
pub fn check_rights(
    mandates: &BTreeSet<Mandate>,
    settings: &UserPrivacySettings,
) -> Result<(), RightsViolation> {
    if mandates.contains(&Mandate::ScriptBlocking) && !settings.allow_drm_scripts {
        return Err(RightsViolation::ScriptBlocking);
    }
    Ok(())
}
