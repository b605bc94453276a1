// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! The two ways a test obtains its admin handle.

use std::fmt;
use std::sync::Arc;

use crate::admin::AsyncAdmin;
use crate::test_utils::suite::AdminTestSuite;

/// Produces a fresh admin handle from the suite's shared connection.
pub type AdminSupplier = fn(&AdminTestSuite) -> Arc<dyn AsyncAdmin>;

/// An admin whose completions run in the caller's context.
pub fn raw_async_admin(suite: &AdminTestSuite) -> Arc<dyn AsyncAdmin> {
    suite.connection().admin()
}

/// An admin whose completions run on the suite's shared worker pool.
pub fn pooled_async_admin(suite: &AdminTestSuite) -> Arc<dyn AsyncAdmin> {
    suite.connection().admin_with_pool(suite.pool())
}

/// One parameter of the suite: a named admin supplier.
#[derive(Clone, Copy)]
pub struct AdminStrategy {
    pub name: &'static str,
    pub supplier: AdminSupplier,
}

impl AdminStrategy {
    pub fn admin(&self, suite: &AdminTestSuite) -> Arc<dyn AsyncAdmin> {
        (self.supplier)(suite)
    }
}

impl fmt::Debug for AdminStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminStrategy")
            .field("name", &self.name)
            .finish()
    }
}

/// Every strategy the suite runs under, in run order.
pub fn params() -> Vec<AdminStrategy> {
    vec![
        AdminStrategy {
            name: "raw",
            supplier: raw_async_admin,
        },
        AdminStrategy {
            name: "pooled",
            supplier: pooled_async_admin,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params() {
        let names = params().iter().map(|p| p.name).collect::<Vec<_>>();
        assert_eq!(names, vec!["raw", "pooled"]);
    }

    #[tokio::test]
    async fn test_strategy_admins() {
        let suite = AdminTestSuite::set_up_before_all().await.unwrap();
        let admins = params()
            .iter()
            .map(|strategy| format!("{:?}", strategy.admin(&suite)))
            .collect::<Vec<_>>();
        assert!(admins[0].starts_with("RawAsyncAdmin"), "{}", admins[0]);
        assert!(admins[1].starts_with("PooledAsyncAdmin"), "{}", admins[1]);
        suite.tear_down_after_all().await.unwrap();
    }
}
