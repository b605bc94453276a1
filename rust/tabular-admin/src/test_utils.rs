// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Harness for integration tests of [`AsyncAdmin`](crate::admin::AsyncAdmin)
//! implementations.
//!
//! A suite starts one [`MiniCluster`](crate::cluster::MiniCluster) and runs
//! every test case once per admin strategy. Each run owns the tables whose
//! names start with its test name, and those tables are removed after the run.

pub mod cleanup;
pub mod context;
pub mod naming;
pub mod provision;
pub mod runner;
pub mod strategy;
pub mod suite;

pub use cleanup::{cleanup_tables, CleanupReport};
pub use context::TestContext;
pub use naming::{table_name_prefix, TestName};
pub use provision::{create_table_with_default_conf, FAMILY, FAMILY_0, FAMILY_1};
pub use runner::{run_suite, AdminTestCase, CaseOutcome, SuiteReport, TestBody};
pub use strategy::{params, AdminStrategy, AdminSupplier};
pub use suite::AdminTestSuite;
