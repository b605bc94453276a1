// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

use std::sync::PoisonError;
use std::time::Duration;

use snafu::Snafu;

use crate::admin::AdminOp;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid table name (\"{name}\"): {reason}"))]
    InvalidTableName { name: String, reason: String },
    #[snafu(display("Invalid input, {message}"))]
    InvalidInput { message: String },
    #[snafu(display("Table '{name}' was not found"))]
    TableNotFound { name: String },
    #[snafu(display("Table '{name}' already exists"))]
    TableAlreadyExists { name: String },
    #[snafu(display("Table '{name}' is not enabled"))]
    TableNotEnabled { name: String },
    #[snafu(display("Table '{name}' is not disabled"))]
    TableNotDisabled { name: String },

    #[snafu(display("Cluster is not running"))]
    ClusterNotRunning,
    #[snafu(display("Unable to start cluster: {message}"))]
    ClusterStart { message: String },
    #[snafu(display("Connection is closed"))]
    ConnectionClosed,

    #[snafu(display("RPC error during {op}: {message}"))]
    Rpc { op: AdminOp, message: String },
    #[snafu(display("RPC for {op} timed out after {timeout:?}"))]
    RpcTimeout { op: AdminOp, timeout: Duration },
    #[snafu(display("Operation {op} timed out after {timeout:?}"))]
    OperationTimeout { op: AdminOp, timeout: Duration },
    #[snafu(display("Hit retry limit for {op} (failures={failures}/{max_failures}): {source}"))]
    Retry {
        op: AdminOp,
        failures: u32,
        max_failures: u32,
        source: Box<Error>,
    },

    #[snafu(display("Cleanup of table '{table}' failed: {source}"))]
    Cleanup { table: String, source: Box<Error> },

    #[snafu(display("Runtime error: {message}"))]
    Runtime { message: String },
    #[snafu(whatever, display("{message}"))]
    Other {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the client is allowed to retry the call that produced this error.
    ///
    /// Only transient remote failures qualify. Errors describing table state
    /// (not found, not disabled, ...) are final answers from the master.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc { .. } | Self::RpcTimeout { .. })
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(e: PoisonError<T>) -> Self {
        Self::Runtime {
            message: e.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Runtime {
            message: format!("worker pool task failed: {e}"),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Self::InvalidInput {
            message: format!("invalid table name pattern: {e}"),
        }
    }
}
