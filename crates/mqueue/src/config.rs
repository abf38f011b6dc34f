use core::time::Duration;

use crate::error::{Error, Result};

/// Default number of correlation shards.
pub const DEFAULT_SHARDS: usize = 256;

/// Default upper bound on a single condition-variable wait.
///
/// Every blocked `take_*` call re-checks the running flag at least this often,
/// which bounds how long shutdown waits for parked threads to leave.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(1);

/// Construction parameters for a [`crate::MessageQueue`].
///
/// # Example
/// ```
/// use core::time::Duration;
/// use mqueue::{MessageQueue, QueueConfig};
///
/// let config = QueueConfig::default()
///     .with_shards(64)
///     .with_wait_interval(Duration::from_micros(200));
/// let queue = MessageQueue::<u32>::with_config(config).unwrap();
/// assert_eq!(queue.shard_count(), 64);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Number of independently locked correlation shards. Identifiers map to
    /// shard `id % shards`.
    pub shards: usize,
    /// Upper bound on a single timed wait inside `take_request` and
    /// `take_response`.
    pub wait_interval: Duration,
}

impl QueueConfig {
    pub const fn new(shards: usize, wait_interval: Duration) -> Self {
        Self {
            shards,
            wait_interval,
        }
    }

    #[must_use]
    pub const fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    #[must_use]
    pub const fn with_wait_interval(mut self, wait_interval: Duration) -> Self {
        self.wait_interval = wait_interval;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(Error::InvalidConfig {
                reason: "shard count must be greater than 0".to_string(),
            });
        }
        if self.wait_interval.is_zero() {
            return Err(Error::InvalidConfig {
                reason: "wait interval must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SHARDS, DEFAULT_WAIT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = QueueConfig::default();
        assert_eq!(config.shards, DEFAULT_SHARDS);
        assert_eq!(config.wait_interval, DEFAULT_WAIT_INTERVAL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_shards_rejected() {
        let err = QueueConfig::default().with_shards(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn zero_wait_interval_rejected() {
        let err = QueueConfig::default()
            .with_wait_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
