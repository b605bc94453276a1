// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! The `AsyncAdmin` trait and its implementations.
//!
//! An admin handle manages the lifecycle of tables: creation, listing,
//! enabling, disabling and deletion. Every operation is asynchronous.
//!
//! Two implementations share the same capability set and differ only in where
//! the work runs:
//!  * [`RawAsyncAdmin`] drives each call in the caller's task.
//!  * [`PooledAsyncAdmin`] hands each call to a shared [`WorkerPool`] and
//!    awaits the result.
//!
//! Both are obtained from an [`AsyncConnection`](crate::connection::AsyncConnection).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;

use crate::cluster::{ClusterInner, TableState};
use crate::connection::ConnectionInner;
use crate::error::{Error, Result};
use crate::table::{RegionInfo, TableDescriptor, TableName};

pub mod pooled;
pub(crate) mod retry;

pub use pooled::{PooledAsyncAdmin, WorkerPool};

use retry::RetryCounter;

/// The kinds of RPC an admin issues. Used for retry accounting, error
/// messages and fault injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdminOp {
    CreateTable,
    ListTables,
    DisableTable,
    EnableTable,
    DeleteTable,
    GetTableState,
    GetDescriptor,
    GetRegions,
}

impl fmt::Display for AdminOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateTable => "createTable",
            Self::ListTables => "listTables",
            Self::DisableTable => "disableTable",
            Self::EnableTable => "enableTable",
            Self::DeleteTable => "deleteTable",
            Self::GetTableState => "getTableState",
            Self::GetDescriptor => "getDescriptor",
            Self::GetRegions => "getRegions",
        };
        f.write_str(name)
    }
}

/// Asynchronous table management.
#[async_trait]
pub trait AsyncAdmin: Send + Sync + fmt::Debug {
    /// Create a table, pre-split at `split_keys` when given.
    async fn create_table(
        &self,
        descriptor: TableDescriptor,
        split_keys: Option<Vec<Bytes>>,
    ) -> Result<()>;
    /// List the names of tables whose full name matches `pattern`.
    ///
    /// System tables are only included when `include_sys_tables` is set. The
    /// result is sorted by name.
    async fn list_table_names(
        &self,
        pattern: Option<Regex>,
        include_sys_tables: bool,
    ) -> Result<Vec<TableName>>;
    /// Like [`Self::list_table_names`] but returns full descriptors.
    async fn list_tables(
        &self,
        pattern: Option<Regex>,
        include_sys_tables: bool,
    ) -> Result<Vec<TableDescriptor>>;
    /// Take an enabled table offline. Fails with `TableNotEnabled` otherwise.
    async fn disable_table(&self, name: &TableName) -> Result<()>;
    /// Bring a disabled table back online.
    async fn enable_table(&self, name: &TableName) -> Result<()>;
    /// Delete a table. The table must be disabled first.
    async fn delete_table(&self, name: &TableName) -> Result<()>;
    async fn table_exists(&self, name: &TableName) -> Result<bool>;
    async fn is_table_enabled(&self, name: &TableName) -> Result<bool>;
    async fn is_table_disabled(&self, name: &TableName) -> Result<bool>;
    async fn get_descriptor(&self, name: &TableName) -> Result<TableDescriptor>;
    /// The regions of a table, ordered by start key.
    async fn get_regions(&self, name: &TableName) -> Result<Vec<RegionInfo>>;
}

/// An admin whose calls run to completion in the caller's context.
#[derive(Clone)]
pub struct RawAsyncAdmin {
    conn: Arc<ConnectionInner>,
}

impl fmt::Debug for RawAsyncAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAsyncAdmin").finish_non_exhaustive()
    }
}

impl RawAsyncAdmin {
    pub(crate) fn new(conn: Arc<ConnectionInner>) -> Self {
        Self { conn }
    }

    /// Issue one RPC, retrying transient failures as configured.
    ///
    /// Each attempt is bounded by the RPC timeout and the call as a whole by
    /// the operation timeout.
    async fn call<T, F, Fut>(&self, op: AdminOp, rpc: F) -> Result<T>
    where
        F: Fn(Arc<ClusterInner>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let config = self.conn.client_config();
        let attempts = async {
            let mut counter = RetryCounter::new(config, op);
            loop {
                if self.conn.is_closed() {
                    return Err(Error::ConnectionClosed);
                }
                let attempt = tokio::time::timeout(config.rpc_timeout, rpc(self.conn.cluster()))
                    .await
                    .unwrap_or(Err(Error::RpcTimeout {
                        op,
                        timeout: config.rpc_timeout,
                    }));
                match attempt {
                    Ok(value) => return Ok(value),
                    Err(err) if err.is_retryable() => {
                        counter.increment_failures(err)?;
                        tokio::time::sleep(counter.next_sleep_time()).await;
                    }
                    Err(err) => return Err(err),
                }
            }
        };
        match tokio::time::timeout(config.operation_timeout, attempts).await {
            Ok(result) => result,
            Err(_) => Err(Error::OperationTimeout {
                op,
                timeout: config.operation_timeout,
            }),
        }
    }

    async fn state(&self, name: &TableName) -> Result<Option<TableState>> {
        self.call(AdminOp::GetTableState, |cluster| async move {
            cluster.table_state(name).await
        })
        .await
    }

    async fn existing_state(&self, name: &TableName) -> Result<TableState> {
        self.state(name).await?.ok_or_else(|| Error::TableNotFound {
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl AsyncAdmin for RawAsyncAdmin {
    async fn create_table(
        &self,
        descriptor: TableDescriptor,
        split_keys: Option<Vec<Bytes>>,
    ) -> Result<()> {
        self.call(AdminOp::CreateTable, |cluster| {
            let descriptor = descriptor.clone();
            let split_keys = split_keys.clone();
            async move { cluster.create_table(descriptor, split_keys).await }
        })
        .await
    }

    async fn list_table_names(
        &self,
        pattern: Option<Regex>,
        include_sys_tables: bool,
    ) -> Result<Vec<TableName>> {
        Ok(self
            .list_tables(pattern, include_sys_tables)
            .await?
            .into_iter()
            .map(|descriptor| descriptor.name().clone())
            .collect())
    }

    async fn list_tables(
        &self,
        pattern: Option<Regex>,
        include_sys_tables: bool,
    ) -> Result<Vec<TableDescriptor>> {
        let pattern = pattern.as_ref();
        self.call(AdminOp::ListTables, |cluster| async move {
            cluster.list_tables(pattern, include_sys_tables).await
        })
        .await
    }

    async fn disable_table(&self, name: &TableName) -> Result<()> {
        self.call(AdminOp::DisableTable, |cluster| async move {
            cluster.disable_table(name).await
        })
        .await
    }

    async fn enable_table(&self, name: &TableName) -> Result<()> {
        self.call(AdminOp::EnableTable, |cluster| async move {
            cluster.enable_table(name).await
        })
        .await
    }

    async fn delete_table(&self, name: &TableName) -> Result<()> {
        self.call(AdminOp::DeleteTable, |cluster| async move {
            cluster.delete_table(name).await
        })
        .await
    }

    async fn table_exists(&self, name: &TableName) -> Result<bool> {
        Ok(self.state(name).await?.is_some())
    }

    async fn is_table_enabled(&self, name: &TableName) -> Result<bool> {
        Ok(self.existing_state(name).await? == TableState::Enabled)
    }

    async fn is_table_disabled(&self, name: &TableName) -> Result<bool> {
        Ok(self.existing_state(name).await? == TableState::Disabled)
    }

    async fn get_descriptor(&self, name: &TableName) -> Result<TableDescriptor> {
        self.call(AdminOp::GetDescriptor, |cluster| async move {
            cluster.descriptor(name).await
        })
        .await
    }

    async fn get_regions(&self, name: &TableName) -> Result<Vec<RegionInfo>> {
        self.call(AdminOp::GetRegions, |cluster| async move {
            cluster.regions(name).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cluster::MiniCluster;
    use crate::config::{ClientConfig, Configuration, RetryConfig, TimeoutConfig};
    use crate::connection::connect;
    use crate::table::ColumnFamilyDescriptor;

    async fn setup(client_config: ClientConfig) -> (MiniCluster, Arc<dyn AsyncAdmin>) {
        let cluster = MiniCluster::start(&Configuration::new(), 2).await.unwrap();
        let conn = connect(&cluster)
            .client_config(client_config)
            .execute()
            .await
            .unwrap();
        (cluster, conn.admin())
    }

    fn fast_retries(retries: u32) -> ClientConfig {
        ClientConfig {
            retry_config: RetryConfig {
                retries: Some(retries),
                pause: Some(Duration::from_millis(1)),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn descriptor(name: &str) -> TableDescriptor {
        TableDescriptor::builder(TableName::new(name).unwrap())
            .column_family(ColumnFamilyDescriptor::of("cf").unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_table_state_queries() {
        let (_cluster, admin) = setup(ClientConfig::default()).await;
        let name = TableName::new("state").unwrap();

        assert!(!admin.table_exists(&name).await.unwrap());
        assert!(matches!(
            admin.is_table_enabled(&name).await,
            Err(Error::TableNotFound { .. })
        ));

        admin.create_table(descriptor("state"), None).await.unwrap();
        assert!(admin.table_exists(&name).await.unwrap());
        assert!(admin.is_table_enabled(&name).await.unwrap());

        admin.disable_table(&name).await.unwrap();
        assert!(admin.is_table_disabled(&name).await.unwrap());
        assert_eq!(admin.get_descriptor(&name).await.unwrap(), descriptor("state"));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let (cluster, admin) = setup(fast_retries(2)).await;
        cluster.inject_failures(AdminOp::CreateTable, 2).unwrap();

        admin.create_table(descriptor("retried"), None).await.unwrap();
        assert!(admin
            .table_exists(&TableName::new("retried").unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_retry_limit() {
        let (cluster, admin) = setup(fast_retries(2)).await;
        cluster.inject_failures(AdminOp::ListTables, 3).unwrap();

        let err = admin.list_table_names(None, false).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Retry {
                op: AdminOp::ListTables,
                failures: 3,
                max_failures: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_table_errors_are_not_retried() {
        let (cluster, admin) = setup(fast_retries(5)).await;
        let name = TableName::new("missing").unwrap();
        // The transient failure is retried, the missing table is reported as is.
        cluster.inject_failures(AdminOp::DeleteTable, 1).unwrap();
        assert!(matches!(
            admin.delete_table(&name).await,
            Err(Error::TableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_rpc_timeout_and_operation_timeout() {
        let cluster = MiniCluster::start(&Configuration::new(), 1).await.unwrap();
        let conn = connect(&cluster)
            .client_config(ClientConfig {
                timeout_config: TimeoutConfig {
                    rpc_timeout: Some(Duration::from_millis(20)),
                    operation_timeout: Some(Duration::from_millis(200)),
                },
                retry_config: RetryConfig {
                    retries: Some(1),
                    pause: Some(Duration::from_millis(1)),
                    ..Default::default()
                },
            })
            .execute()
            .await
            .unwrap();
        let admin = conn.admin();

        cluster.set_rpc_latency(Duration::from_millis(100)).unwrap();
        let err = admin.list_table_names(None, false).await.unwrap_err();
        match err {
            Error::Retry { source, .. } => {
                assert!(matches!(*source, Error::RpcTimeout { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
        cluster.clear_faults().unwrap();

        let conn = connect(&cluster)
            .client_config(ClientConfig {
                timeout_config: TimeoutConfig {
                    rpc_timeout: Some(Duration::from_secs(10)),
                    operation_timeout: Some(Duration::from_millis(20)),
                },
                ..Default::default()
            })
            .execute()
            .await
            .unwrap();
        cluster.set_rpc_latency(Duration::from_millis(200)).unwrap();
        assert!(matches!(
            conn.admin().list_table_names(None, false).await,
            Err(Error::OperationTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let cluster = MiniCluster::start(&Configuration::new(), 1).await.unwrap();
        let conn = connect(&cluster).execute().await.unwrap();
        let admin = conn.admin();
        conn.close().await.unwrap();
        assert!(matches!(
            admin.list_table_names(None, false).await,
            Err(Error::ConnectionClosed)
        ));
    }
}
