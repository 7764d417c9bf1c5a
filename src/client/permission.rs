//! Notification permission and re-prompt throttling.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Platform notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet, or the user dismissed the prompt
    #[default]
    Default,
    Granted,
    Denied,
}

/// Outcome of the last prompt, persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub asked_at: DateTime<Utc>,
    pub result: Permission,
}

/// What to do before subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    AlreadyGranted,
    /// The platform reports a hard denial
    Blocked,
    /// A recent prompt was refused
    Throttled { retry_after: DateTime<Utc> },
    Prompt,
}

/// Decide whether to prompt, given the platform state and the last prompt.
pub fn decide_permission(
    current: Permission,
    last_prompt: Option<&PermissionRecord>,
    ask_again_after_days: u32,
    now: DateTime<Utc>,
) -> PermissionDecision {
    match current {
        Permission::Granted => PermissionDecision::AlreadyGranted,
        Permission::Denied => PermissionDecision::Blocked,
        Permission::Default => match last_prompt {
            Some(record) if record.result != Permission::Granted => {
                let retry_after = record.asked_at + Duration::days(i64::from(ask_again_after_days));
                if now < retry_after {
                    PermissionDecision::Throttled { retry_after }
                } else {
                    PermissionDecision::Prompt
                }
            }
            _ => PermissionDecision::Prompt,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn refused(days_ago: i64) -> PermissionRecord {
        PermissionRecord {
            asked_at: Utc::now() - Duration::days(days_ago),
            result: Permission::Denied,
        }
    }

    #[test]
    fn test_granted_and_denied_short_circuit() {
        let now = Utc::now();
        assert_eq!(
            decide_permission(Permission::Granted, Some(&refused(0)), 7, now),
            PermissionDecision::AlreadyGranted
        );
        assert_eq!(
            decide_permission(Permission::Denied, None, 7, now),
            PermissionDecision::Blocked
        );
    }

    #[test]
    fn test_first_prompt() {
        assert_eq!(
            decide_permission(Permission::Default, None, 7, Utc::now()),
            PermissionDecision::Prompt
        );
    }

    #[test_case(1, true ; "one day after refusal")]
    #[test_case(6, true ; "six days after refusal")]
    #[test_case(8, false ; "eight days after refusal")]
    fn test_refusal_throttles_prompt(days_ago: i64, throttled: bool) {
        let decision = decide_permission(Permission::Default, Some(&refused(days_ago)), 7, Utc::now());
        assert_eq!(matches!(decision, PermissionDecision::Throttled { .. }), throttled);
    }
}
