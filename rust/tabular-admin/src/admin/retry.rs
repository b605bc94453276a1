// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

use std::time::Duration;

use log::{debug, warn};

use crate::admin::AdminOp;
use crate::config::ResolvedClientConfig;
use crate::error::{Error, Result};

// Exponent cap for the backoff so the pause cannot overflow.
const MAX_BACKOFF_SHIFT: u32 = 16;

pub struct RetryCounter<'a> {
    pub failures: u32,
    pub config: &'a ResolvedClientConfig,
    pub op: AdminOp,
}

impl<'a> RetryCounter<'a> {
    pub(crate) fn new(config: &'a ResolvedClientConfig, op: AdminOp) -> Self {
        Self {
            failures: 0,
            config,
            op,
        }
    }

    /// Record a failed attempt. Returns an error once the retries are used up.
    pub fn increment_failures(&mut self, source: Error) -> Result<()> {
        self.failures += 1;
        if self.failures > self.config.retries {
            return Err(Error::Retry {
                op: self.op,
                failures: self.failures,
                max_failures: self.config.retries,
                source: Box::new(source),
            });
        }
        if self.failures > self.config.start_log_errors_after {
            warn!(
                "{} failed, tries={}, retries={}: {}",
                self.op, self.failures, self.config.retries, source
            );
        } else {
            debug!(
                "{} failed, tries={}, retries={}: {}",
                self.op, self.failures, self.config.retries, source
            );
        }
        Ok(())
    }

    pub fn next_sleep_time(&self) -> Duration {
        let shift = self.failures.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        let backoff = self.config.pause.saturating_mul(1 << shift);
        let jitter = self.config.jitter.mul_f32(rand::random::<f32>());
        let sleep_time = backoff + jitter;
        debug!(
            "Retrying {} ({}/{}) in {:?}",
            self.op, self.failures, self.config.retries, sleep_time
        );
        sleep_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ResolvedClientConfig {
        ResolvedClientConfig {
            retries: 2,
            start_log_errors_after: 0,
            pause: Duration::from_millis(100),
            jitter: Duration::ZERO,
            ..Default::default()
        }
    }

    fn rpc_error() -> Error {
        Error::Rpc {
            op: AdminOp::CreateTable,
            message: "region server unavailable".to_string(),
        }
    }

    #[test]
    fn test_retry_limit() {
        let config = test_config();
        let mut counter = RetryCounter::new(&config, AdminOp::CreateTable);

        counter.increment_failures(rpc_error()).unwrap();
        counter.increment_failures(rpc_error()).unwrap();
        let result = counter.increment_failures(rpc_error());
        assert!(matches!(
            result.unwrap_err(),
            Error::Retry {
                failures: 3,
                max_failures: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_no_retries() {
        let config = ResolvedClientConfig {
            retries: 0,
            ..test_config()
        };
        let mut counter = RetryCounter::new(&config, AdminOp::DeleteTable);
        assert!(counter.increment_failures(rpc_error()).is_err());
    }

    #[test]
    fn test_backoff_doubles() {
        let config = test_config();
        let mut counter = RetryCounter::new(&config, AdminOp::CreateTable);

        counter.failures = 1;
        assert_eq!(counter.next_sleep_time(), Duration::from_millis(100));
        counter.failures = 2;
        assert_eq!(counter.next_sleep_time(), Duration::from_millis(200));
        counter.failures = 3;
        assert_eq!(counter.next_sleep_time(), Duration::from_millis(400));
        counter.failures = 1000;
        assert_eq!(
            counter.next_sleep_time(),
            Duration::from_millis(100) * (1 << MAX_BACKOFF_SHIFT)
        );
    }

    #[test]
    fn test_jitter_is_bounded() {
        let config = ResolvedClientConfig {
            jitter: Duration::from_millis(50),
            ..test_config()
        };
        let mut counter = RetryCounter::new(&config, AdminOp::CreateTable);
        counter.failures = 1;
        for _ in 0..20 {
            let sleep = counter.next_sleep_time();
            assert!(sleep >= Duration::from_millis(100));
            assert!(sleep <= Duration::from_millis(150));
        }
    }
}
