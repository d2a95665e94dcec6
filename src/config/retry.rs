use std::time::Duration;

use serde::Deserialize;

use crate::Error;
use crate::FailureClass;
use crate::Result;

/// Bounded exponential backoff for one failure class
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failure (unit: milliseconds)
    pub base_delay_ms: u64,

    /// Upper bound of the delay (unit: milliseconds)
    pub max_delay_ms: u64,
}

impl BackoffPolicy {
    /// Delay before the retry that follows the `attempt`-th consecutive
    /// failure (1-based): `min(base * 2^(attempt - 1), max)`.
    pub fn delay(
        &self,
        attempt: u32,
    ) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    fn validate(
        &self,
        name: &str,
    ) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(Error::InvalidConfig(format!(
                "retry.{name}.base_delay_ms must be greater than 0"
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::InvalidConfig(format!(
                "retry.{name}.max_delay_ms must not be lower than base_delay_ms"
            )));
        }
        Ok(())
    }
}

/// Divide strategies by failure class
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicies {
    // A single watch request failed (timeouts, HTTP errors, cleared index)
    #[serde(default = "default_transient")]
    pub transient: BackoffPolicy,

    // No registry endpoint could be reached
    #[serde(default = "default_unavailable")]
    pub unavailable: BackoffPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            transient: default_transient(),
            unavailable: default_unavailable(),
        }
    }
}

impl RetryPolicies {
    pub fn policy_for(
        &self,
        class: FailureClass,
    ) -> &BackoffPolicy {
        match class {
            FailureClass::Transient => &self.transient,
            FailureClass::BackendUnavailable => &self.unavailable,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.transient.validate("transient")?;
        self.unavailable.validate("unavailable")
    }
}

fn default_transient() -> BackoffPolicy {
    BackoffPolicy {
        base_delay_ms: 2_000,
        max_delay_ms: 30_000,
    }
}
fn default_unavailable() -> BackoffPolicy {
    BackoffPolicy {
        base_delay_ms: 60_000,
        max_delay_ms: 300_000,
    }
}
