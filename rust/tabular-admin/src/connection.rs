// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Functions to establish a connection to a cluster

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;

use crate::admin::{AsyncAdmin, PooledAsyncAdmin, RawAsyncAdmin, WorkerPool};
use crate::cluster::{ClusterInner, MiniCluster};
use crate::config::{ClientConfig, Configuration, ResolvedClientConfig};
use crate::error::{Error, Result};
use crate::table::TableName;

pub(crate) struct ConnectionInner {
    cluster: Arc<ClusterInner>,
    conf: Configuration,
    client_config: ResolvedClientConfig,
    closed: AtomicBool,
}

impl ConnectionInner {
    pub(crate) fn cluster(&self) -> Arc<ClusterInner> {
        self.cluster.clone()
    }

    pub(crate) fn client_config(&self) -> &ResolvedClientConfig {
        &self.client_config
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A connection to a cluster.
///
/// Connections are cheap to clone; clones share the same underlying state, so
/// closing one closes all of them. Admin handles obtained from a connection
/// stop working once it is closed.
#[derive(Clone)]
pub struct AsyncConnection {
    inner: Arc<ConnectionInner>,
}

impl std::fmt::Debug for AsyncConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncConnection")
            .field("closed", &self.is_closed())
            .field("client_config", &self.inner.client_config)
            .finish()
    }
}

impl AsyncConnection {
    /// An admin whose calls run in the caller's context.
    pub fn admin(&self) -> Arc<dyn AsyncAdmin> {
        Arc::new(RawAsyncAdmin::new(self.inner.clone()))
    }

    /// An admin whose calls run on `pool`.
    pub fn admin_with_pool(&self, pool: &WorkerPool) -> Arc<dyn AsyncAdmin> {
        Arc::new(PooledAsyncAdmin::new(
            RawAsyncAdmin::new(self.inner.clone()),
            pool,
        ))
    }

    pub fn configuration(&self) -> &Configuration {
        &self.inner.conf
    }

    pub fn client_config(&self) -> &ResolvedClientConfig {
        &self.inner.client_config
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Close the connection. Fails if it was already closed.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        debug!("Closed connection");
        Ok(())
    }
}

/// A builder for configuring a connection to a cluster
#[derive(Debug)]
pub struct ConnectBuilder {
    cluster: MiniCluster,
    conf: Configuration,
    client_config: ClientConfig,
}

impl ConnectBuilder {
    /// Create a new [`ConnectBuilder`] for the given cluster. The cluster's
    /// own configuration is used unless [`Self::configuration`] is called.
    pub fn new(cluster: &MiniCluster) -> Self {
        Self {
            cluster: cluster.clone(),
            conf: cluster.configuration().clone(),
            client_config: ClientConfig::default(),
        }
    }

    pub fn configuration(mut self, conf: Configuration) -> Self {
        self.conf = conf;
        self
    }

    /// Override settings from the configuration in code.
    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = config;
        self
    }

    /// Establish the connection, waiting until the cluster answers.
    pub async fn execute(self) -> Result<AsyncConnection> {
        let client_config = ResolvedClientConfig::resolve(&self.client_config, &self.conf)?;
        let cluster = self.cluster.inner();
        if !cluster.is_running() {
            return Err(Error::ClusterNotRunning);
        }
        let connection = AsyncConnection {
            inner: Arc::new(ConnectionInner {
                cluster,
                conf: self.conf,
                client_config,
                closed: AtomicBool::new(false),
            }),
        };

        // The meta table is always present on a live cluster, so finding it
        // means the master is serving requests.
        let meta = TableName::value_of("system:meta")?;
        if !connection.admin().table_exists(&meta).await? {
            return Err(Error::Runtime {
                message: "cluster is missing its meta table".to_string(),
            });
        }
        debug!(
            "Connected to cluster with client config {:?}",
            connection.inner.client_config
        );
        Ok(connection)
    }
}

/// Connect to a running cluster.
///
/// # Arguments
///
/// * `cluster` - the cluster to connect to. Settings are read from its
///   configuration unless overridden on the returned builder.
pub fn connect(cluster: &MiniCluster) -> ConnectBuilder {
    ConnectBuilder::new(cluster)
}
