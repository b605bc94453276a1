// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Table names, descriptors and region layout.

use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};

pub mod descriptor;

pub use descriptor::{
    ColumnFamilyDescriptor, ColumnFamilyDescriptorBuilder, TableDescriptor,
    TableDescriptorBuilder,
};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const SYSTEM_NAMESPACE: &str = "system";
const NAMESPACE_DELIMITER: char = ':';

/// A fully qualified table name.
///
/// Names in the default namespace render without a namespace prefix, so
/// `TableName::new("orders")` displays as `orders` while a system table
/// displays as `system:meta`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    namespace: String,
    qualifier: String,
}

impl TableName {
    /// A table in the default namespace.
    pub fn new(qualifier: impl Into<String>) -> Result<Self> {
        Self::with_namespace(DEFAULT_NAMESPACE, qualifier)
    }

    pub fn with_namespace(
        namespace: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Result<Self> {
        let namespace = namespace.into();
        let qualifier = qualifier.into();
        validate_namespace(&namespace)?;
        validate_qualifier(&qualifier)?;
        Ok(Self {
            namespace,
            qualifier,
        })
    }

    /// Parse `namespace:qualifier` or a bare qualifier.
    pub fn value_of(name: &str) -> Result<Self> {
        match name.split_once(NAMESPACE_DELIMITER) {
            Some((namespace, qualifier)) => Self::with_namespace(namespace, qualifier),
            None => Self::new(name),
        }
    }

    pub(crate) fn system(qualifier: &str) -> Self {
        Self {
            namespace: SYSTEM_NAMESPACE.to_string(),
            qualifier: qualifier.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn is_system_table(&self) -> bool {
        self.namespace == SYSTEM_NAMESPACE
    }

    /// The name as used in listings and patterns.
    pub fn name_as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == DEFAULT_NAMESPACE {
            write!(f, "{}", self.qualifier)
        } else {
            write!(f, "{}{}{}", self.namespace, NAMESPACE_DELIMITER, self.qualifier)
        }
    }
}

fn validate_qualifier(qualifier: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidTableName {
        name: qualifier.to_string(),
        reason: reason.to_string(),
    };
    if qualifier.is_empty() {
        return Err(invalid("Table names cannot be empty strings"));
    }
    if qualifier.starts_with('.') || qualifier.starts_with('-') {
        return Err(invalid("Table names cannot start with '.' or '-'"));
    }
    if !qualifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(invalid(
            "Table names can only contain alphanumeric characters, underscores, hyphens, and periods",
        ));
    }
    Ok(())
}

fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty()
        || !namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::InvalidTableName {
            name: namespace.to_string(),
            reason: "Namespaces can only contain alphanumeric characters and underscores"
                .to_string(),
        });
    }
    Ok(())
}

/// Where a region of a table lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionInfo {
    pub table: TableName,
    pub region_id: u64,
    /// Inclusive. Empty for the first region.
    pub start_key: Bytes,
    /// Exclusive. Empty for the last region.
    pub end_key: Bytes,
    pub server: String,
}

/// Sort and check split keys, returning the region boundaries to use.
pub(crate) fn normalize_split_keys(split_keys: Vec<Bytes>) -> Result<Vec<Bytes>> {
    let mut keys = split_keys;
    if keys.iter().any(|key| key.is_empty()) {
        return Err(Error::InvalidInput {
            message: "Empty split key must not be passed in the split keys".to_string(),
        });
    }
    keys.sort();
    if let Some(window) = keys.windows(2).find(|window| window[0] == window[1]) {
        return Err(Error::InvalidInput {
            message: format!("All split keys must be unique, found duplicate: {:?}", window[0]),
        });
    }
    Ok(keys)
}
