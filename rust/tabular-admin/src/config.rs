// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Process-wide client configuration.
//!
//! Settings are plain key/value pairs held by a [`Configuration`]. They are set
//! once, before the cluster is started, and read when a connection is opened.
//! A [`ClientConfig`] can be used to override individual values in code.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Timeout for a single RPC attempt, in milliseconds.
pub const RPC_TIMEOUT_KEY: &str = "client.rpc.timeout";
/// Timeout for a whole client operation including retries, in milliseconds.
pub const CLIENT_OPERATION_TIMEOUT_KEY: &str = "client.operation.timeout";
/// Number of times a failed RPC is retried.
pub const CLIENT_RETRIES_NUMBER_KEY: &str = "client.retries.number";
/// Retries after this many failures are logged as errors rather than debug noise.
pub const START_LOG_ERRORS_AFTER_COUNT_KEY: &str = "client.start.log.errors.counter";
/// Base pause between retries, in milliseconds.
pub const CLIENT_PAUSE_KEY: &str = "client.pause";
/// Upper bound of the random jitter added to each pause, in milliseconds.
pub const CLIENT_PAUSE_JITTER_KEY: &str = "client.pause.jitter";
/// Number of threads in the shared admin worker pool.
pub const WORKER_POOL_SIZE_KEY: &str = "client.worker.pool.size";

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(1200);
pub const DEFAULT_RETRIES_NUMBER: u32 = 15;
pub const DEFAULT_START_LOG_ERRORS_AFTER_COUNT: u32 = 5;
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(100);

/// Plain key/value settings shared by the cluster and its clients.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configuration {
    values: HashMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.set(key, value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Read an integer setting, falling back to `default` when it is unset.
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64> {
        match self.get(key) {
            Some(value) => parse_int(key, value),
            None => Ok(default),
        }
    }

    fn get_opt_u64(&self, key: &str) -> Result<Option<u64>> {
        self.get(key)
            .map(|value| {
                let parsed = parse_int(key, value)?;
                u64::try_from(parsed).map_err(|_| Error::InvalidInput {
                    message: format!("Value for {key} must not be negative: '{value}'"),
                })
            })
            .transpose()
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| Error::InvalidInput {
        message: format!("Invalid value for {key}: '{value}'"),
    })
}

/// Client settings that can be supplied in code, overriding the [`Configuration`].
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub timeout_config: TimeoutConfig,
    pub retry_config: RetryConfig,
}

/// How to bound the time spent in admin RPCs.
#[derive(Clone, Default, Debug)]
pub struct TimeoutConfig {
    /// The timeout for a single RPC attempt.
    ///
    /// You can also set the `TABULAR_CLIENT_RPC_TIMEOUT` environment variable
    /// to set this value. Use an integer value in milliseconds.
    ///
    /// The default is 60 seconds.
    pub rpc_timeout: Option<Duration>,
    /// The timeout for a whole operation, covering every retry.
    ///
    /// You can also set the `TABULAR_CLIENT_OPERATION_TIMEOUT` environment
    /// variable to set this value. Use an integer value in milliseconds.
    ///
    /// The default is 20 minutes.
    pub operation_timeout: Option<Duration>,
}

/// How to retry failed admin RPCs.
#[derive(Clone, Default, Debug)]
pub struct RetryConfig {
    /// The number of times to retry a request if it fails.
    ///
    /// You can also set the `TABULAR_CLIENT_RETRIES` environment variable
    /// to set this value. Use an integer value.
    ///
    /// The default is 15 retries.
    pub retries: Option<u32>,
    /// After how many failures retries are logged at warn level instead of
    /// debug. Zero logs every failure.
    ///
    /// The default is 5.
    pub start_log_errors_after: Option<u32>,
    /// The base pause between retries. Between each retry, the client waits for:
    ///
    /// ```text
    /// {pause} * (2 ** ({number of previous failures} - 1)) + random(0..{jitter})
    /// ```
    ///
    /// The default is 100 milliseconds.
    pub pause: Option<Duration>,
    /// The maximum jitter added to each pause.
    ///
    /// The default is zero.
    pub jitter: Option<Duration>,
}

/// Fully resolved client settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedClientConfig {
    pub rpc_timeout: Duration,
    pub operation_timeout: Duration,
    pub retries: u32,
    pub start_log_errors_after: u32,
    pub pause: Duration,
    pub jitter: Duration,
}

impl Default for ResolvedClientConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            retries: DEFAULT_RETRIES_NUMBER,
            start_log_errors_after: DEFAULT_START_LOG_ERRORS_AFTER_COUNT,
            pause: DEFAULT_PAUSE,
            jitter: Duration::ZERO,
        }
    }
}

impl ResolvedClientConfig {
    /// Resolve every setting: explicit value, then configuration key, then
    /// environment variable, then the built-in default.
    pub fn resolve(client_config: &ClientConfig, conf: &Configuration) -> Result<Self> {
        let timeouts = &client_config.timeout_config;
        let retry = &client_config.retry_config;

        let rpc_timeout = Self::get_millis(
            timeouts.rpc_timeout,
            conf,
            RPC_TIMEOUT_KEY,
            "TABULAR_CLIENT_RPC_TIMEOUT",
            DEFAULT_RPC_TIMEOUT,
        )?;
        let operation_timeout = Self::get_millis(
            timeouts.operation_timeout,
            conf,
            CLIENT_OPERATION_TIMEOUT_KEY,
            "TABULAR_CLIENT_OPERATION_TIMEOUT",
            DEFAULT_OPERATION_TIMEOUT,
        )?;
        let retries = Self::get_count(
            retry.retries,
            conf,
            CLIENT_RETRIES_NUMBER_KEY,
            "TABULAR_CLIENT_RETRIES",
            DEFAULT_RETRIES_NUMBER,
        )?;
        let start_log_errors_after = Self::get_count(
            retry.start_log_errors_after,
            conf,
            START_LOG_ERRORS_AFTER_COUNT_KEY,
            "TABULAR_CLIENT_START_LOG_ERRORS_AFTER",
            DEFAULT_START_LOG_ERRORS_AFTER_COUNT,
        )?;
        let pause = Self::get_millis(
            retry.pause,
            conf,
            CLIENT_PAUSE_KEY,
            "TABULAR_CLIENT_PAUSE",
            DEFAULT_PAUSE,
        )?;
        let jitter = Self::get_millis(
            retry.jitter,
            conf,
            CLIENT_PAUSE_JITTER_KEY,
            "TABULAR_CLIENT_PAUSE_JITTER",
            Duration::ZERO,
        )?;

        Ok(Self {
            rpc_timeout,
            operation_timeout,
            retries,
            start_log_errors_after,
            pause,
            jitter,
        })
    }

    fn get_millis(
        passed: Option<Duration>,
        conf: &Configuration,
        key: &str,
        env_var: &str,
        default: Duration,
    ) -> Result<Duration> {
        if let Some(passed) = passed {
            return Ok(passed);
        }
        if let Some(millis) = conf.get_opt_u64(key)? {
            return Ok(Duration::from_millis(millis));
        }
        match std::env::var(env_var) {
            Ok(value) => {
                let millis = value.parse::<u64>().map_err(|_| Error::InvalidInput {
                    message: format!(
                        "Invalid value for {} environment variable: '{}'",
                        env_var, value
                    ),
                })?;
                Ok(Duration::from_millis(millis))
            }
            Err(_) => Ok(default),
        }
    }

    fn get_count(
        passed: Option<u32>,
        conf: &Configuration,
        key: &str,
        env_var: &str,
        default: u32,
    ) -> Result<u32> {
        if let Some(passed) = passed {
            return Ok(passed);
        }
        if let Some(count) = conf.get_opt_u64(key)? {
            return u32::try_from(count).map_err(|_| Error::InvalidInput {
                message: format!("Value for {key} is out of range: {count}"),
            });
        }
        match std::env::var(env_var) {
            Ok(value) => value.parse::<u32>().map_err(|_| Error::InvalidInput {
                message: format!(
                    "Invalid value for {} environment variable: '{}'",
                    env_var, value
                ),
            }),
            Err(_) => Ok(default),
        }
    }
}
