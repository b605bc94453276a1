// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::table::TableName;

/// A named group of columns, configured when the table is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnFamilyDescriptor {
    name: Bytes,
    max_versions: u32,
    time_to_live: Option<Duration>,
}

impl ColumnFamilyDescriptor {
    /// A family with default settings.
    pub fn of(name: impl Into<Bytes>) -> Result<Self> {
        ColumnFamilyDescriptorBuilder::new(name).build()
    }

    pub fn name(&self) -> &Bytes {
        &self.name
    }

    pub fn name_as_string(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    pub fn max_versions(&self) -> u32 {
        self.max_versions
    }

    pub fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live
    }
}

pub struct ColumnFamilyDescriptorBuilder {
    name: Bytes,
    max_versions: u32,
    time_to_live: Option<Duration>,
}

impl ColumnFamilyDescriptorBuilder {
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            max_versions: 1,
            time_to_live: None,
        }
    }

    /// How many versions of each cell to keep. Must be at least 1.
    pub fn max_versions(mut self, max_versions: u32) -> Self {
        self.max_versions = max_versions;
        self
    }

    pub fn time_to_live(mut self, time_to_live: Duration) -> Self {
        self.time_to_live = Some(time_to_live);
        self
    }

    pub fn build(self) -> Result<ColumnFamilyDescriptor> {
        validate_family_name(&self.name)?;
        if self.max_versions == 0 {
            return Err(Error::InvalidInput {
                message: format!(
                    "Column family '{}' must keep at least one version",
                    String::from_utf8_lossy(&self.name)
                ),
            });
        }
        Ok(ColumnFamilyDescriptor {
            name: self.name,
            max_versions: self.max_versions,
            time_to_live: self.time_to_live,
        })
    }
}

fn validate_family_name(name: &[u8]) -> Result<()> {
    let reason = if name.is_empty() {
        Some("Column family name can not be empty")
    } else if name[0] == b'.' {
        Some("Column family names cannot start with a period")
    } else if name.contains(&b':') {
        Some("Column family names cannot contain ':'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(Error::InvalidInput {
            message: format!("{reason}: '{}'", String::from_utf8_lossy(name)),
        }),
        None => Ok(()),
    }
}

/// An immutable description of a table: its name and column families.
///
/// Split keys are not part of the descriptor; they are passed next to it when
/// the table is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    name: TableName,
    families: Vec<ColumnFamilyDescriptor>,
}

impl TableDescriptor {
    pub fn builder(name: TableName) -> TableDescriptorBuilder {
        TableDescriptorBuilder::new(name)
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn column_families(&self) -> &[ColumnFamilyDescriptor] {
        &self.families
    }

    pub fn has_column_family(&self, name: &[u8]) -> bool {
        self.families.iter().any(|family| family.name() == name)
    }
}

pub struct TableDescriptorBuilder {
    name: TableName,
    families: Vec<ColumnFamilyDescriptor>,
}

impl TableDescriptorBuilder {
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            families: Vec::new(),
        }
    }

    pub fn column_family(mut self, family: ColumnFamilyDescriptor) -> Self {
        self.families.push(family);
        self
    }

    pub fn build(self) -> Result<TableDescriptor> {
        for (idx, family) in self.families.iter().enumerate() {
            if self.families[..idx]
                .iter()
                .any(|other| other.name() == family.name())
            {
                return Err(Error::InvalidInput {
                    message: format!(
                        "Column family '{}' is defined twice for table '{}'",
                        family.name_as_string(),
                        self.name
                    ),
                });
            }
        }
        Ok(TableDescriptor {
            name: self.name,
            families: self.families,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_descriptor() {
        let name = TableName::new("orders").unwrap();
        let descriptor = TableDescriptor::builder(name.clone())
            .column_family(ColumnFamilyDescriptor::of("cf0").unwrap())
            .column_family(
                ColumnFamilyDescriptorBuilder::new("cf1")
                    .max_versions(3)
                    .time_to_live(Duration::from_secs(60))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert_eq!(descriptor.name(), &name);
        assert_eq!(descriptor.column_families().len(), 2);
        assert!(descriptor.has_column_family(b"cf1"));
        assert!(!descriptor.has_column_family(b"cf2"));
        assert_eq!(descriptor.column_families()[1].max_versions(), 3);
    }

    #[test]
    fn test_duplicate_family() {
        let result = TableDescriptor::builder(TableName::new("orders").unwrap())
            .column_family(ColumnFamilyDescriptor::of("cf").unwrap())
            .column_family(ColumnFamilyDescriptor::of("cf").unwrap())
            .build();
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_invalid_family() {
        assert!(ColumnFamilyDescriptor::of("").is_err());
        assert!(ColumnFamilyDescriptor::of(".meta").is_err());
        assert!(ColumnFamilyDescriptor::of("a:b").is_err());
        assert!(ColumnFamilyDescriptorBuilder::new("cf")
            .max_versions(0)
            .build()
            .is_err());
    }
}
