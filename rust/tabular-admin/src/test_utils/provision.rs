// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Create tables for tests.

use bytes::Bytes;

use crate::admin::AsyncAdmin;
use crate::error::Result;
use crate::table::{ColumnFamilyDescriptor, TableDescriptor, TableName};

pub const FAMILY: &[u8] = b"testFamily";
pub const FAMILY_0: &[u8] = b"cf0";
pub const FAMILY_1: &[u8] = b"cf1";

/// Create `name` with one column family per entry of `families`, or a single
/// [`FAMILY`] if none are given, pre-split at `split_keys`.
///
/// Returns once the table exists. Errors from the admin are returned as is;
/// retrying is left to the admin's client configuration.
pub async fn create_table_with_default_conf(
    admin: &dyn AsyncAdmin,
    name: &TableName,
    split_keys: Option<Vec<Bytes>>,
    families: &[&[u8]],
) -> Result<()> {
    let families = if families.is_empty() {
        &[FAMILY][..]
    } else {
        families
    };
    let mut builder = TableDescriptor::builder(name.clone());
    for family in families {
        let family = ColumnFamilyDescriptor::of(Bytes::copy_from_slice(family))?;
        builder = builder.column_family(family);
    }
    admin.create_table(builder.build()?, split_keys).await
}
