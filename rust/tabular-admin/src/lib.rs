// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! An asynchronous admin client for a distributed table store, together with
//! an in-process cluster and a harness for testing admin implementations
//! against it.
//!
//! ## Quick Start
//!
//! #### Start a cluster and connect to it.
//!
//! ```rust
//! # use tabular_admin::config::Configuration;
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cluster = tabular_admin::MiniCluster::start(&Configuration::new(), 2)
//!     .await
//!     .unwrap();
//! let conn = tabular_admin::connect(&cluster).execute().await.unwrap();
//! # });
//! ```
//!
//! #### Manage tables.
//!
//! ```rust
//! # use tabular_admin::config::Configuration;
//! # use tabular_admin::table::{ColumnFamilyDescriptor, TableDescriptor, TableName};
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! # let cluster = tabular_admin::MiniCluster::start(&Configuration::new(), 2).await.unwrap();
//! # let conn = tabular_admin::connect(&cluster).execute().await.unwrap();
//! let admin = conn.admin();
//! let name = TableName::new("my_table").unwrap();
//! let descriptor = TableDescriptor::builder(name.clone())
//!     .column_family(ColumnFamilyDescriptor::of("cf").unwrap())
//!     .build()
//!     .unwrap();
//! admin.create_table(descriptor, None).await.unwrap();
//!
//! // Tables must be disabled before they can be deleted.
//! admin.disable_table(&name).await.unwrap();
//! admin.delete_table(&name).await.unwrap();
//! # });
//! ```
//!
//! Admin calls are retried and bounded by timeouts according to the client
//! settings in [`config`].

pub mod admin;
pub mod cluster;
pub mod config;
pub mod connection;
pub mod error;
pub mod table;
pub mod test_utils;

pub use admin::{AdminOp, AsyncAdmin};
pub use cluster::MiniCluster;
pub use connection::AsyncConnection;
pub use error::{Error, Result};
pub use table::{TableDescriptor, TableName};

/// Connect to a cluster
pub use connection::connect;
