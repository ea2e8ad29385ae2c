//! Activation policy: should this message get an auto-reply?

use chrono::NaiveTime;

use crate::cache::KvStore;
use crate::config::{Config, Mode};

use super::overrides::{OverrideState, OverrideStore};
use super::schedule;

/// A sender with its derived privilege flag.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub user_id: String,
    pub privileged: bool,
}

impl SenderIdentity {
    pub fn resolve(user_id: &str, config: &Config) -> Self {
        Self {
            user_id: user_id.to_string(),
            privileged: config.is_sudo(user_id),
        }
    }
}

/// The pure activation decision.
///
/// Deliberate tie-break ordering: operator privilege beats everything,
/// deployment-mode gating beats the override/schedule logic, and an
/// explicit override beats the automatic schedule.
pub fn decide(privileged: bool, mode: Mode, overridden: OverrideState, night: bool) -> bool {
    if privileged {
        return true;
    }
    if mode != Mode::Public {
        return false;
    }
    match overridden {
        OverrideState::On => true,
        OverrideState::Off => false,
        OverrideState::Unset => night,
    }
}

/// Resolve the override (failing open to `Unset`) and the night window,
/// then decide. Recomputed per message, never stored.
pub async fn should_respond<S: KvStore>(
    sender: &SenderIdentity,
    now: NaiveTime,
    mode: Mode,
    overrides: &OverrideStore<S>,
) -> bool {
    // Privileged senders short-circuit before any cache read.
    if sender.privileged {
        return true;
    }
    decide(
        false,
        mode,
        overrides.current().await,
        schedule::is_night_window(now),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OVERRIDES: [OverrideState; 3] =
        [OverrideState::On, OverrideState::Off, OverrideState::Unset];
    const ALL_MODES: [Mode; 3] = [Mode::Public, Mode::Private, Mode::Inactive];

    #[test]
    fn test_privileged_always_responds() {
        for mode in ALL_MODES {
            for overridden in ALL_OVERRIDES {
                for night in [true, false] {
                    assert!(decide(true, mode, overridden, night));
                }
            }
        }
    }

    #[test]
    fn test_non_public_mode_never_responds_to_others() {
        for mode in [Mode::Private, Mode::Inactive] {
            for overridden in ALL_OVERRIDES {
                for night in [true, false] {
                    assert!(!decide(false, mode, overridden, night));
                }
            }
        }
    }

    #[test]
    fn test_override_on_responds_any_time() {
        assert!(decide(false, Mode::Public, OverrideState::On, true));
        assert!(decide(false, Mode::Public, OverrideState::On, false));
    }

    #[test]
    fn test_override_off_never_responds() {
        assert!(!decide(false, Mode::Public, OverrideState::Off, true));
        assert!(!decide(false, Mode::Public, OverrideState::Off, false));
    }

    #[test]
    fn test_unset_falls_back_to_schedule() {
        assert!(decide(false, Mode::Public, OverrideState::Unset, true));
        assert!(!decide(false, Mode::Public, OverrideState::Unset, false));
    }
}
