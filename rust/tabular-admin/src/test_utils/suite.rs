// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Cluster lifecycle for a suite of admin tests.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::admin::WorkerPool;
use crate::cluster::MiniCluster;
use crate::config::{
    Configuration, CLIENT_OPERATION_TIMEOUT_KEY, CLIENT_RETRIES_NUMBER_KEY, RPC_TIMEOUT_KEY,
    START_LOG_ERRORS_AFTER_COUNT_KEY,
};
use crate::connection::{connect, AsyncConnection};

/// Number of region servers the suite's cluster runs.
pub const NODE_COUNT: usize = 2;

/// State shared by every test of a suite: one cluster, one connection and
/// one worker pool.
///
/// The suite is created once before the first test and torn down once after
/// the last one; it is passed explicitly to every test rather than held in a
/// global.
#[derive(Debug)]
pub struct AdminTestSuite {
    conf: Configuration,
    cluster: MiniCluster,
    connection: AsyncConnection,
    pool: WorkerPool,
}

impl AdminTestSuite {
    /// Start the suite with the standard test settings.
    pub async fn set_up_before_all() -> Result<Self> {
        Self::set_up_before_all_with(Configuration::new()).await
    }

    /// Start the suite, applying the standard test settings on top of `conf`.
    pub async fn set_up_before_all_with(mut conf: Configuration) -> Result<Self> {
        conf.set_int(RPC_TIMEOUT_KEY, 60_000)
            .set_int(CLIENT_OPERATION_TIMEOUT_KEY, 120_000)
            .set_int(CLIENT_RETRIES_NUMBER_KEY, 2)
            .set_int(START_LOG_ERRORS_AFTER_COUNT_KEY, 0);

        let pool = WorkerPool::from_configuration(&conf).context("unable to start worker pool")?;
        let cluster = MiniCluster::start(&conf, NODE_COUNT)
            .await
            .context("unable to start mini cluster")?;
        let connection = match connect(&cluster).configuration(conf.clone()).execute().await {
            Ok(connection) => connection,
            Err(err) => {
                // Do not leak a running cluster when the suite cannot start.
                if let Err(shutdown_err) = cluster.shutdown().await {
                    warn!("Failed to shut down cluster after failed setup: {shutdown_err}");
                }
                return Err(err).context("unable to connect to mini cluster");
            }
        };
        info!("Admin test suite is ready on {} nodes", cluster.node_count());
        Ok(Self {
            conf,
            cluster,
            connection,
            pool,
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.conf
    }

    pub fn cluster(&self) -> &MiniCluster {
        &self.cluster
    }

    pub fn connection(&self) -> &AsyncConnection {
        &self.connection
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Close the connection quietly, then stop the pool and the cluster.
    pub async fn tear_down_after_all(self) -> Result<()> {
        if let Err(err) = self.connection.close().await {
            warn!("Ignoring error while closing connection: {err}");
        }
        self.pool.shutdown();
        self.cluster
            .shutdown()
            .await
            .context("unable to shut down mini cluster")?;
        info!("Admin test suite torn down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_set_up_and_tear_down() {
        let suite = AdminTestSuite::set_up_before_all().await.unwrap();
        assert!(suite.cluster().is_running());
        assert_eq!(suite.cluster().region_servers().len(), NODE_COUNT);

        let client = suite.connection().client_config();
        assert_eq!(client.rpc_timeout, Duration::from_secs(60));
        assert_eq!(client.operation_timeout, Duration::from_secs(120));
        assert_eq!(client.retries, 2);
        assert_eq!(client.start_log_errors_after, 0);

        let cluster = suite.cluster().clone();
        let connection = suite.connection().clone();
        suite.tear_down_after_all().await.unwrap();
        assert!(connection.is_closed());
        assert!(!cluster.is_running());
    }

    #[tokio::test]
    async fn test_tear_down_ignores_closed_connection() {
        let suite = AdminTestSuite::set_up_before_all().await.unwrap();
        suite.connection().close().await.unwrap();
        suite.tear_down_after_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_pool_size_is_fatal() {
        let mut conf = Configuration::new();
        conf.set_int(crate::config::WORKER_POOL_SIZE_KEY, 0);
        let err = AdminTestSuite::set_up_before_all_with(conf).await.unwrap_err();
        assert!(err.to_string().contains("unable to start worker pool"));
    }

    #[tokio::test]
    async fn test_bad_configuration_is_fatal() {
        let mut conf = Configuration::new();
        conf.set(crate::config::CLIENT_PAUSE_KEY, "never");
        let err = AdminTestSuite::set_up_before_all_with(conf).await.unwrap_err();
        assert!(err.to_string().contains("unable to connect"));
    }
}
