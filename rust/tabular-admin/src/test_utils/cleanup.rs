// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Remove every table a test created.

use log::debug;
use regex::Regex;

use crate::admin::AsyncAdmin;
use crate::error::{Error, Result};
use crate::table::TableName;

/// What [`cleanup_tables`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Tables deleted, in the order they were deleted.
    pub deleted: Vec<TableName>,
    /// Tables whose disable step failed, usually because the test had already
    /// disabled them.
    pub already_disabled: Vec<TableName>,
}

/// Disable and delete every user table whose name starts with `prefix`.
///
/// Tables are processed one at a time in listing order. A failed disable is
/// logged and ignored, a failed delete stops the cleanup and is returned.
pub async fn cleanup_tables(admin: &dyn AsyncAdmin, prefix: &TableName) -> Result<CleanupReport> {
    let pattern = Regex::new(&format!("{}.*", regex::escape(&prefix.name_as_string())))?;
    let tables = admin.list_table_names(Some(pattern), false).await?;

    let mut report = CleanupReport::default();
    for table in tables {
        if let Err(err) = admin.disable_table(&table).await {
            debug!("Ignoring failure to disable {table} during cleanup: {err}");
            report.already_disabled.push(table.clone());
        }
        admin
            .delete_table(&table)
            .await
            .map_err(|err| Error::Cleanup {
                table: table.to_string(),
                source: Box::new(err),
            })?;
        debug!("Deleted table {table}");
        report.deleted.push(table);
    }
    Ok(report)
}
