// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! An in-process multi-node cluster for tests.
//!
//! A [`MiniCluster`] runs a master and a fixed number of region servers inside
//! the current process. It keeps table metadata only (descriptors, enabled
//! state and region layout) and answers admin RPCs with the same errors a real
//! cluster would report to a client. Nothing is persisted.
//!
//! Tests can make the cluster misbehave with [`MiniCluster::inject_failures`]
//! and [`MiniCluster::set_rpc_latency`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use log::{debug, info};
use regex::Regex;

use crate::admin::AdminOp;
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::table::{
    normalize_split_keys, ColumnFamilyDescriptor, RegionInfo, TableDescriptor, TableName,
};

const META_TABLE: &str = "meta";
const NAMESPACE_TABLE: &str = "namespace";
const SYSTEM_FAMILY: &str = "info";

/// Whether a table is serving requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableState {
    Enabled,
    Disabled,
}

struct TableEntry {
    descriptor: TableDescriptor,
    state: TableState,
    regions: Vec<RegionInfo>,
}

struct RegionServer {
    name: String,
    online: AtomicBool,
}

struct MasterState {
    running: bool,
    tables: BTreeMap<TableName, TableEntry>,
    next_region_id: u64,
}

#[derive(Default)]
struct FaultPlan {
    failures: HashMap<AdminOp, u32>,
    latency: Duration,
}

pub(crate) struct ClusterInner {
    conf: Configuration,
    servers: Vec<RegionServer>,
    master: Mutex<MasterState>,
    faults: Mutex<FaultPlan>,
}

/// A handle to a running in-process cluster. Cloning shares the cluster.
#[derive(Clone)]
pub struct MiniCluster {
    inner: Arc<ClusterInner>,
}

impl std::fmt::Debug for MiniCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniCluster")
            .field("nodes", &self.node_count())
            .field("running", &self.is_running())
            .finish()
    }
}

impl MiniCluster {
    /// Start a cluster with `node_count` region servers.
    pub async fn start(conf: &Configuration, node_count: usize) -> Result<Self> {
        if node_count == 0 {
            return Err(Error::ClusterStart {
                message: "a cluster needs at least one region server".to_string(),
            });
        }
        let servers = (0..node_count)
            .map(|idx| RegionServer {
                name: format!("regionserver-{idx}"),
                online: AtomicBool::new(true),
            })
            .collect::<Vec<_>>();

        let inner = ClusterInner {
            conf: conf.clone(),
            servers,
            master: Mutex::new(MasterState {
                running: true,
                tables: BTreeMap::new(),
                next_region_id: 1,
            }),
            faults: Mutex::new(FaultPlan::default()),
        };
        inner.bootstrap_system_tables()?;

        info!(
            "Started mini cluster with {} region servers: {:?}",
            node_count,
            inner.servers.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Stop every region server and forget all tables.
    ///
    /// Calling this on a stopped cluster does nothing.
    pub async fn shutdown(&self) -> Result<()> {
        let mut master = self.inner.master.lock()?;
        if !master.running {
            debug!("Mini cluster already shut down");
            return Ok(());
        }
        master.running = false;
        master.tables.clear();
        for server in &self.inner.servers {
            server.online.store(false, Ordering::SeqCst);
        }
        info!("Shut down mini cluster");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn node_count(&self) -> usize {
        self.inner.servers.len()
    }

    /// Names of the region servers that are currently online.
    pub fn region_servers(&self) -> Vec<String> {
        self.inner
            .servers
            .iter()
            .filter(|server| server.online.load(Ordering::SeqCst))
            .map(|server| server.name.clone())
            .collect()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.inner.conf
    }

    /// Make the next `count` RPCs of kind `op` fail with a retryable error.
    pub fn inject_failures(&self, op: AdminOp, count: u32) -> Result<()> {
        let mut faults = self.inner.faults.lock()?;
        *faults.failures.entry(op).or_default() += count;
        Ok(())
    }

    /// Delay every RPC by `latency` before it is served.
    pub fn set_rpc_latency(&self, latency: Duration) -> Result<()> {
        self.inner.faults.lock()?.latency = latency;
        Ok(())
    }

    pub fn clear_faults(&self) -> Result<()> {
        *self.inner.faults.lock()? = FaultPlan::default();
        Ok(())
    }

    pub(crate) fn inner(&self) -> Arc<ClusterInner> {
        self.inner.clone()
    }
}

impl ClusterInner {
    fn bootstrap_system_tables(&self) -> Result<()> {
        let mut master = self.master.lock()?;
        for qualifier in [META_TABLE, NAMESPACE_TABLE] {
            let name = TableName::system(qualifier);
            let descriptor = TableDescriptor::builder(name.clone())
                .column_family(ColumnFamilyDescriptor::of(SYSTEM_FAMILY)?)
                .build()?;
            let regions = self.assign_regions(&mut master, &name, &[])?;
            master.tables.insert(
                name,
                TableEntry {
                    descriptor,
                    state: TableState::Enabled,
                    regions,
                },
            );
        }
        Ok(())
    }

    fn assign_regions(
        &self,
        master: &mut MasterState,
        table: &TableName,
        split_keys: &[Bytes],
    ) -> Result<Vec<RegionInfo>> {
        let online = self
            .servers
            .iter()
            .filter(|server| server.online.load(Ordering::SeqCst))
            .collect::<Vec<_>>();
        if online.is_empty() {
            return Err(Error::ClusterNotRunning);
        }
        let mut boundaries = Vec::with_capacity(split_keys.len() + 2);
        boundaries.push(Bytes::new());
        boundaries.extend(split_keys.iter().cloned());
        boundaries.push(Bytes::new());

        Ok(boundaries
            .windows(2)
            .map(|window| {
                let region_id = master.next_region_id;
                master.next_region_id += 1;
                let server = &online[(region_id as usize) % online.len()];
                RegionInfo {
                    table: table.clone(),
                    region_id,
                    start_key: window[0].clone(),
                    end_key: window[1].clone(),
                    server: server.name.clone(),
                }
            })
            .collect())
    }

    /// Entry point of every RPC: checks liveness and applies injected faults.
    async fn rpc(&self, op: AdminOp) -> Result<()> {
        let latency = {
            let mut faults = self.faults.lock()?;
            if let Some(remaining) = faults.failures.get_mut(&op) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(Error::Rpc {
                        op,
                        message: "injected failure".to_string(),
                    });
                }
            }
            faults.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if !self.master.lock()?.running {
            return Err(Error::ClusterNotRunning);
        }
        Ok(())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.master
            .lock()
            .map(|master| master.running)
            .unwrap_or(false)
    }

    pub(crate) async fn create_table(
        &self,
        descriptor: TableDescriptor,
        split_keys: Option<Vec<Bytes>>,
    ) -> Result<()> {
        self.rpc(AdminOp::CreateTable).await?;
        if descriptor.column_families().is_empty() {
            return Err(Error::InvalidInput {
                message: format!(
                    "Table '{}' should have at least one column family",
                    descriptor.name()
                ),
            });
        }
        let split_keys = normalize_split_keys(split_keys.unwrap_or_default())?;

        let mut master = self.master.lock()?;
        let name = descriptor.name().clone();
        if master.tables.contains_key(&name) {
            return Err(Error::TableAlreadyExists {
                name: name.to_string(),
            });
        }
        let regions = self.assign_regions(&mut master, &name, &split_keys)?;
        debug!("Created table {} with {} regions", name, regions.len());
        master.tables.insert(
            name,
            TableEntry {
                descriptor,
                state: TableState::Enabled,
                regions,
            },
        );
        Ok(())
    }

    pub(crate) async fn list_tables(
        &self,
        pattern: Option<&Regex>,
        include_sys_tables: bool,
    ) -> Result<Vec<TableDescriptor>> {
        self.rpc(AdminOp::ListTables).await?;
        // Patterns have to match the whole name, not a substring of it.
        let anchored = pattern
            .map(|pattern| Regex::new(&format!("^(?:{})$", pattern.as_str())))
            .transpose()?;
        let master = self.master.lock()?;
        Ok(master
            .tables
            .iter()
            .filter(|(name, _)| include_sys_tables || !name.is_system_table())
            .filter(|(name, _)| {
                anchored
                    .as_ref()
                    .map(|pattern| pattern.is_match(&name.name_as_string()))
                    .unwrap_or(true)
            })
            .map(|(_, entry)| entry.descriptor.clone())
            .collect())
    }

    pub(crate) async fn disable_table(&self, name: &TableName) -> Result<()> {
        self.rpc(AdminOp::DisableTable).await?;
        let mut master = self.master.lock()?;
        let entry = Self::entry_mut(&mut master, name)?;
        if entry.state != TableState::Enabled {
            return Err(Error::TableNotEnabled {
                name: name.to_string(),
            });
        }
        entry.state = TableState::Disabled;
        debug!("Disabled table {}", name);
        Ok(())
    }

    pub(crate) async fn enable_table(&self, name: &TableName) -> Result<()> {
        self.rpc(AdminOp::EnableTable).await?;
        let mut master = self.master.lock()?;
        let entry = Self::entry_mut(&mut master, name)?;
        if entry.state != TableState::Disabled {
            return Err(Error::TableNotDisabled {
                name: name.to_string(),
            });
        }
        entry.state = TableState::Enabled;
        debug!("Enabled table {}", name);
        Ok(())
    }

    pub(crate) async fn delete_table(&self, name: &TableName) -> Result<()> {
        self.rpc(AdminOp::DeleteTable).await?;
        let mut master = self.master.lock()?;
        let entry = Self::entry_mut(&mut master, name)?;
        if entry.state != TableState::Disabled {
            return Err(Error::TableNotDisabled {
                name: name.to_string(),
            });
        }
        master.tables.remove(name);
        debug!("Deleted table {}", name);
        Ok(())
    }

    /// `None` when the table does not exist.
    pub(crate) async fn table_state(&self, name: &TableName) -> Result<Option<TableState>> {
        self.rpc(AdminOp::GetTableState).await?;
        let master = self.master.lock()?;
        Ok(master.tables.get(name).map(|entry| entry.state))
    }

    pub(crate) async fn descriptor(&self, name: &TableName) -> Result<TableDescriptor> {
        self.rpc(AdminOp::GetDescriptor).await?;
        let mut master = self.master.lock()?;
        Ok(Self::entry_mut(&mut master, name)?.descriptor.clone())
    }

    pub(crate) async fn regions(&self, name: &TableName) -> Result<Vec<RegionInfo>> {
        self.rpc(AdminOp::GetRegions).await?;
        let mut master = self.master.lock()?;
        Ok(Self::entry_mut(&mut master, name)?.regions.clone())
    }

    fn entry_mut<'a>(
        master: &'a mut MasterState,
        name: &TableName,
    ) -> Result<&'a mut TableEntry> {
        master.tables.get_mut(name).ok_or_else(|| Error::TableNotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> TableDescriptor {
        TableDescriptor::builder(TableName::new(name).unwrap())
            .column_family(ColumnFamilyDescriptor::of("cf").unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_requires_nodes() {
        let result = MiniCluster::start(&Configuration::new(), 0).await;
        assert!(matches!(result, Err(Error::ClusterStart { .. })));
    }

    #[tokio::test]
    async fn test_system_tables() {
        let cluster = MiniCluster::start(&Configuration::new(), 2).await.unwrap();
        let inner = cluster.inner();

        let user = inner.list_tables(None, false).await.unwrap();
        assert!(user.is_empty());

        let all = inner.list_tables(None, true).await.unwrap();
        let names = all.iter().map(|d| d.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["system:meta", "system:namespace"]);
    }

    #[tokio::test]
    async fn test_table_lifecycle() {
        let cluster = MiniCluster::start(&Configuration::new(), 2).await.unwrap();
        let inner = cluster.inner();
        let name = TableName::new("lifecycle").unwrap();

        inner.create_table(descriptor("lifecycle"), None).await.unwrap();
        assert!(matches!(
            inner.create_table(descriptor("lifecycle"), None).await,
            Err(Error::TableAlreadyExists { .. })
        ));
        assert_eq!(
            inner.table_state(&name).await.unwrap(),
            Some(TableState::Enabled)
        );

        // Enabled tables cannot be deleted.
        assert!(matches!(
            inner.delete_table(&name).await,
            Err(Error::TableNotDisabled { .. })
        ));

        inner.disable_table(&name).await.unwrap();
        assert!(matches!(
            inner.disable_table(&name).await,
            Err(Error::TableNotEnabled { .. })
        ));

        inner.enable_table(&name).await.unwrap();
        inner.disable_table(&name).await.unwrap();
        inner.delete_table(&name).await.unwrap();
        assert_eq!(inner.table_state(&name).await.unwrap(), None);
        assert!(matches!(
            inner.delete_table(&name).await,
            Err(Error::TableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_pre_split_regions() {
        let cluster = MiniCluster::start(&Configuration::new(), 2).await.unwrap();
        let inner = cluster.inner();
        let name = TableName::new("split").unwrap();

        inner
            .create_table(
                descriptor("split"),
                Some(vec![Bytes::from_static(b"m"), Bytes::from_static(b"f")]),
            )
            .await
            .unwrap();

        let regions = inner.regions(&name).await.unwrap();
        assert_eq!(regions.len(), 3);
        assert!(regions[0].start_key.is_empty());
        assert_eq!(regions[0].end_key, Bytes::from_static(b"f"));
        assert_eq!(regions[1].start_key, Bytes::from_static(b"f"));
        assert_eq!(regions[1].end_key, Bytes::from_static(b"m"));
        assert!(regions[2].end_key.is_empty());

        // Round robin over both servers.
        let servers = regions.iter().map(|r| r.server.as_str()).collect::<Vec<_>>();
        assert!(servers.contains(&"regionserver-0"));
        assert!(servers.contains(&"regionserver-1"));
    }

    #[tokio::test]
    async fn test_create_requires_family() {
        let cluster = MiniCluster::start(&Configuration::new(), 1).await.unwrap();
        let empty = TableDescriptor::builder(TableName::new("empty").unwrap())
            .build()
            .unwrap();
        assert!(matches!(
            cluster.inner().create_table(empty, None).await,
            Err(Error::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_pattern_is_anchored() {
        let cluster = MiniCluster::start(&Configuration::new(), 1).await.unwrap();
        let inner = cluster.inner();
        for name in ["abc", "abcd", "xabc"] {
            inner.create_table(descriptor(name), None).await.unwrap();
        }

        let pattern = Regex::new("abc.*").unwrap();
        let found = inner.list_tables(Some(&pattern), false).await.unwrap();
        let names = found.iter().map(|d| d.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["abc", "abcd"]);
    }

    #[tokio::test]
    async fn test_injected_failures_and_shutdown() {
        let cluster = MiniCluster::start(&Configuration::new(), 1).await.unwrap();
        let inner = cluster.inner();

        cluster.inject_failures(AdminOp::ListTables, 1).unwrap();
        assert!(matches!(
            inner.list_tables(None, false).await,
            Err(Error::Rpc { op: AdminOp::ListTables, .. })
        ));
        inner.list_tables(None, false).await.unwrap();

        cluster.shutdown().await.unwrap();
        cluster.shutdown().await.unwrap();
        assert!(!cluster.is_running());
        assert!(cluster.region_servers().is_empty());
        assert!(matches!(
            inner.list_tables(None, false).await,
            Err(Error::ClusterNotRunning)
        ));
    }
}
