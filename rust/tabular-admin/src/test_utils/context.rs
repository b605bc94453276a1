// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

use std::sync::Arc;

use bytes::Bytes;

use crate::admin::AsyncAdmin;
use crate::error::Result;
use crate::table::TableName;
use crate::test_utils::cleanup::{cleanup_tables, CleanupReport};
use crate::test_utils::naming::TestName;
use crate::test_utils::provision::create_table_with_default_conf;
use crate::test_utils::strategy::AdminStrategy;
use crate::test_utils::suite::AdminTestSuite;

/// State owned by a single test run: its admin handle and the table name
/// prefix it is allowed to use.
#[derive(Debug)]
pub struct TestContext {
    admin: Arc<dyn AsyncAdmin>,
    table_name: TableName,
    test_name: TestName,
}

impl TestContext {
    /// Acquire a fresh admin from `strategy` and derive the table prefix from
    /// `test_name`.
    pub fn set_up(
        suite: &AdminTestSuite,
        strategy: &AdminStrategy,
        test_name: TestName,
    ) -> Result<Self> {
        let table_name = test_name.table_name()?;
        Ok(Self {
            admin: strategy.admin(suite),
            table_name,
            test_name,
        })
    }

    pub fn admin(&self) -> &dyn AsyncAdmin {
        self.admin.as_ref()
    }

    /// The table name owned by this test. Every table the test creates must
    /// start with it.
    pub fn table_name(&self) -> &TableName {
        &self.table_name
    }

    pub fn test_name(&self) -> &TestName {
        &self.test_name
    }

    pub async fn create_table_with_default_conf(&self, name: &TableName) -> Result<()> {
        create_table_with_default_conf(self.admin(), name, None, &[]).await
    }

    pub async fn create_table_with_splits(
        &self,
        name: &TableName,
        split_keys: Vec<Bytes>,
    ) -> Result<()> {
        create_table_with_default_conf(self.admin(), name, Some(split_keys), &[]).await
    }

    pub async fn create_table_with_families(
        &self,
        name: &TableName,
        split_keys: Option<Vec<Bytes>>,
        families: &[&[u8]],
    ) -> Result<()> {
        create_table_with_default_conf(self.admin(), name, split_keys, families).await
    }

    /// Remove every table carrying this test's prefix, using the same admin.
    pub async fn tear_down(self) -> Result<CleanupReport> {
        cleanup_tables(self.admin(), &self.table_name).await
    }
}
