//! User privacy and rights preferences
//!
//! These flags are the user's "bill of rights" when entering a parcel. They
//! are loaded once from identity/settings storage and are read-only to the
//! handoff core: nothing downstream mutates them.

use serde::{Deserialize, Serialize};

/// Which override categories the user allows a parcel server to impose
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPrivacySettings {
    /// Let the server change visuals (skybox, lighting, shaders)
    pub allow_visual_overrides: bool,
    /// Let the server change physics (gravity, speed, collisions)
    pub allow_physics_overrides: bool,
    /// Let the server block the user's own scripts and tools
    pub allow_drm_scripts: bool,
}

impl Default for UserPrivacySettings {
    fn default() -> Self {
        UserPrivacySettings {
            allow_visual_overrides: true,
            allow_physics_overrides: true,
            allow_drm_scripts: false,
        }
    }
}

impl UserPrivacySettings {
    /// Settings that refuse every override category
    pub fn strict() -> Self {
        UserPrivacySettings {
            allow_visual_overrides: false,
            allow_physics_overrides: false,
            allow_drm_scripts: false,
        }
    }

    /// Settings that allow every override category
    pub fn permissive() -> Self {
        UserPrivacySettings {
            allow_visual_overrides: true,
            allow_physics_overrides: true,
            allow_drm_scripts: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_refuse_drm() {
        let s = UserPrivacySettings::default();
        assert!(s.allow_visual_overrides);
        assert!(s.allow_physics_overrides);
        assert!(!s.allow_drm_scripts);
    }
}
