//! Retry policies, keyed by the kind of work a step performs.
//!
//! Provisioning-class steps (database, env vars) retry transient provider
//! failures with exponential backoff. Builds and publishes never retry
//! automatically: a failed build is terminal for that step.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ActionKind;

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first try)
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,

    /// Backoff multiplier applied after each retry
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::provisioning()
    }
}

impl RetryPolicy {
    /// Policy for provisioning-class steps: up to 3 attempts
    pub fn provisioning() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }

    /// Policy for builds and publishes: one attempt, no retries
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Default policy for a step's action kind
    pub fn for_action(action: ActionKind) -> Self {
        if action.is_provisioning() {
            Self::provisioning()
        } else {
            Self::single_attempt()
        }
    }

    /// Whether another attempt is allowed after `attempt` attempts
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the retry following the given attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms);
        }

        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_policy_delays() {
        let policy = RetryPolicy::provisioning();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(5000));
        assert_eq!(policy.delay_for_attempt(9), Duration::from_millis(5000));
    }

    #[test]
    fn test_should_retry_bounds() {
        let policy = RetryPolicy::provisioning();

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn test_per_action_defaults() {
        assert_eq!(
            RetryPolicy::for_action(ActionKind::ProvisionDatabase).max_attempts,
            3
        );
        assert_eq!(RetryPolicy::for_action(ActionKind::SetEnv).max_attempts, 3);
        assert_eq!(RetryPolicy::for_action(ActionKind::Build).max_attempts, 1);
        assert_eq!(RetryPolicy::for_action(ActionKind::Publish).max_attempts, 1);
    }
}
