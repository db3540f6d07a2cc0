//! Update policy gate.

use super::update::UpdateType;

/// Which kinds of update may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicy {
    pub allow_major: bool,
    pub allow_minor: bool,
    pub allow_patch: bool,
    pub allow_prerelease: bool,
    /// Confirms a breaking change.
    pub force: bool,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            allow_major: false,
            allow_minor: true,
            allow_patch: true,
            allow_prerelease: false,
            force: false,
        }
    }
}

impl UpdatePolicy {
    /// Check an update against the policy, returning the refusal reason.
    ///
    /// A breaking change needs both `allow_major` and `force`.
    pub fn check(&self, update_type: UpdateType, is_breaking: bool) -> Result<(), String> {
        if !should_allow_update(update_type, self) {
            return Err(match update_type {
                UpdateType::None => "no update to apply".to_string(),
                other => format!("{other} updates are not allowed by the update policy"),
            });
        }
        if is_breaking && !self.force {
            return Err("breaking change requires explicit confirmation (force)".to_string());
        }
        Ok(())
    }
}

/// Per-type gate: whether `update_type` is enabled in `policy`.
pub fn should_allow_update(update_type: UpdateType, policy: &UpdatePolicy) -> bool {
    match update_type {
        UpdateType::None => false,
        UpdateType::Patch => policy.allow_patch,
        UpdateType::Minor => policy.allow_minor,
        UpdateType::Major => policy.allow_major,
        UpdateType::Prerelease => policy.allow_prerelease,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gate() {
        let policy = UpdatePolicy::default();
        assert!(should_allow_update(UpdateType::Patch, &policy));
        assert!(should_allow_update(UpdateType::Minor, &policy));
        assert!(!should_allow_update(UpdateType::Major, &policy));
        assert!(!should_allow_update(UpdateType::Prerelease, &policy));
        assert!(!should_allow_update(UpdateType::None, &policy));
    }

    #[test]
    fn test_breaking_change_needs_force() {
        let allow_major = UpdatePolicy {
            allow_major: true,
            ..UpdatePolicy::default()
        };
        assert!(allow_major.check(UpdateType::Major, true).is_err());

        let forced = UpdatePolicy {
            force: true,
            ..allow_major
        };
        assert!(forced.check(UpdateType::Major, true).is_ok());

        let force_only = UpdatePolicy {
            force: true,
            ..UpdatePolicy::default()
        };
        let reason = force_only.check(UpdateType::Major, true).unwrap_err();
        assert!(reason.contains("major updates are not allowed"));
    }
}
