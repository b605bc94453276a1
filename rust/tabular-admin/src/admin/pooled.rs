// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! An admin that runs its calls on a shared worker pool.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use regex::Regex;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::admin::{AsyncAdmin, RawAsyncAdmin};
use crate::config::{Configuration, WORKER_POOL_SIZE_KEY};
use crate::error::{Error, Result};
use crate::table::{RegionInfo, TableDescriptor, TableName};

/// A fixed-size pool of worker threads shared by pooled admins.
///
/// The pool owns its own multi-threaded runtime. Dropping the pool shuts the
/// runtime down in the background, which is safe from within async code.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    size: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("running", &self.runtime.is_some())
            .finish()
    }
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidInput {
                message: "worker pool needs at least one thread".to_string(),
            });
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(size)
            .thread_name("admin-worker")
            .enable_all()
            .build()
            .map_err(|err| Error::Runtime {
                message: format!("unable to start worker pool: {err}"),
            })?;
        let handle = runtime.handle().clone();
        debug!("Started admin worker pool with {} threads", size);
        Ok(Self {
            runtime: Some(runtime),
            handle,
            size,
        })
    }

    /// Size the pool from [`WORKER_POOL_SIZE_KEY`], defaulting to the
    /// available parallelism.
    pub fn from_configuration(conf: &Configuration) -> Result<Self> {
        let default = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let size = conf.get_int(WORKER_POOL_SIZE_KEY, default as i64)?;
        let size = usize::try_from(size).map_err(|_| Error::InvalidInput {
            message: format!("Invalid value for {WORKER_POOL_SIZE_KEY}: {size}"),
        })?;
        Self::new(size)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Stop the workers. Tasks still running are dropped.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            debug!("Shut down admin worker pool");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// An admin whose calls are dispatched onto a [`WorkerPool`].
///
/// Results are identical to [`RawAsyncAdmin`]; only the thread that drives the
/// call differs. If the pool has been shut down every call fails with
/// [`Error::Runtime`].
#[derive(Clone, Debug)]
pub struct PooledAsyncAdmin {
    inner: Arc<RawAsyncAdmin>,
    pool: Handle,
}

impl PooledAsyncAdmin {
    pub fn new(inner: RawAsyncAdmin, pool: &WorkerPool) -> Self {
        Self {
            inner: Arc::new(inner),
            pool: pool.handle().clone(),
        }
    }

    async fn dispatch<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: FnOnce(Arc<RawAsyncAdmin>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.pool.spawn(call(self.inner.clone())).await?
    }
}

#[async_trait]
impl AsyncAdmin for PooledAsyncAdmin {
    async fn create_table(
        &self,
        descriptor: TableDescriptor,
        split_keys: Option<Vec<Bytes>>,
    ) -> Result<()> {
        self.dispatch(move |admin| async move { admin.create_table(descriptor, split_keys).await })
            .await
    }

    async fn list_table_names(
        &self,
        pattern: Option<Regex>,
        include_sys_tables: bool,
    ) -> Result<Vec<TableName>> {
        self.dispatch(move |admin| async move {
            admin.list_table_names(pattern, include_sys_tables).await
        })
        .await
    }

    async fn list_tables(
        &self,
        pattern: Option<Regex>,
        include_sys_tables: bool,
    ) -> Result<Vec<TableDescriptor>> {
        self.dispatch(move |admin| async move {
            admin.list_tables(pattern, include_sys_tables).await
        })
        .await
    }

    async fn disable_table(&self, name: &TableName) -> Result<()> {
        let name = name.clone();
        self.dispatch(move |admin| async move { admin.disable_table(&name).await })
            .await
    }

    async fn enable_table(&self, name: &TableName) -> Result<()> {
        let name = name.clone();
        self.dispatch(move |admin| async move { admin.enable_table(&name).await })
            .await
    }

    async fn delete_table(&self, name: &TableName) -> Result<()> {
        let name = name.clone();
        self.dispatch(move |admin| async move { admin.delete_table(&name).await })
            .await
    }

    async fn table_exists(&self, name: &TableName) -> Result<bool> {
        let name = name.clone();
        self.dispatch(move |admin| async move { admin.table_exists(&name).await })
            .await
    }

    async fn is_table_enabled(&self, name: &TableName) -> Result<bool> {
        let name = name.clone();
        self.dispatch(move |admin| async move { admin.is_table_enabled(&name).await })
            .await
    }

    async fn is_table_disabled(&self, name: &TableName) -> Result<bool> {
        let name = name.clone();
        self.dispatch(move |admin| async move { admin.is_table_disabled(&name).await })
            .await
    }

    async fn get_descriptor(&self, name: &TableName) -> Result<TableDescriptor> {
        let name = name.clone();
        self.dispatch(move |admin| async move { admin.get_descriptor(&name).await })
            .await
    }

    async fn get_regions(&self, name: &TableName) -> Result<Vec<RegionInfo>> {
        let name = name.clone();
        self.dispatch(move |admin| async move { admin.get_regions(&name).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MiniCluster;
    use crate::connection::connect;
    use crate::table::ColumnFamilyDescriptor;

    fn descriptor(name: &str) -> TableDescriptor {
        TableDescriptor::builder(TableName::new(name).unwrap())
            .column_family(ColumnFamilyDescriptor::of("cf").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_pool_size() {
        assert!(WorkerPool::new(0).is_err());

        let mut conf = Configuration::new();
        conf.set_int(WORKER_POOL_SIZE_KEY, 3);
        let pool = WorkerPool::from_configuration(&conf).unwrap();
        assert_eq!(pool.size(), 3);
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_calls_run_on_pool() {
        let pool = WorkerPool::new(2).unwrap();
        // The pool's threads are named, the test thread is not an admin worker.
        let thread_name = pool
            .handle()
            .spawn(async { std::thread::current().name().map(str::to_string) })
            .await
            .unwrap();
        assert_eq!(thread_name.as_deref(), Some("admin-worker"));

        let cluster = MiniCluster::start(&Configuration::new(), 2).await.unwrap();
        let conn = connect(&cluster).execute().await.unwrap();
        let admin = conn.admin_with_pool(&pool);

        admin.create_table(descriptor("pooled"), None).await.unwrap();
        let names = admin.list_table_names(None, false).await.unwrap();
        assert_eq!(names, vec![TableName::new("pooled").unwrap()]);
    }

    #[tokio::test]
    async fn test_shut_down_pool() {
        let pool = WorkerPool::new(1).unwrap();
        let cluster = MiniCluster::start(&Configuration::new(), 1).await.unwrap();
        let conn = connect(&cluster).execute().await.unwrap();
        let admin = conn.admin_with_pool(&pool);
        pool.shutdown();

        assert!(matches!(
            admin.list_table_names(None, false).await,
            Err(Error::Runtime { .. })
        ));
    }
}
