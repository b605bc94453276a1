// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Derive table names from the name of the running test.
//!
//! Every parameterized run of a test carries a three character suffix such as
//! `[0]`. Dropping it yields a prefix shared by all runs of the same test
//! method and distinct between methods, so each test owns its own set of
//! tables without any bookkeeping.

use std::fmt;

use crate::error::{Error, Result};
use crate::table::TableName;

/// Length of the parameter suffix appended to a test method name.
pub const PARAMETER_SUFFIX_LEN: usize = 3;

/// The table name prefix for a test: `method_name` minus its last three
/// characters.
///
/// Names shorter than four characters are out of range.
pub fn table_name_prefix(method_name: &str) -> Result<String> {
    let len = method_name.chars().count();
    if len <= PARAMETER_SUFFIX_LEN {
        return Err(Error::InvalidInput {
            message: format!(
                "test method name '{method_name}' is out of range: it must be longer than {PARAMETER_SUFFIX_LEN} characters"
            ),
        });
    }
    Ok(method_name
        .chars()
        .take(len - PARAMETER_SUFFIX_LEN)
        .collect())
}

/// The name of the currently executing test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestName {
    method_name: String,
}

impl TestName {
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
        }
    }

    /// The name of run `index` of a parameterized test, e.g. `testCreate[0]`.
    pub fn parameterized(method: &str, index: usize) -> Self {
        Self::new(format!("{method}[{index}]"))
    }

    /// The test running on this thread, as named by the test runner.
    ///
    /// The module path is dropped, so `tests::create_table` yields
    /// `create_table`. Fails on threads the test runner did not name after a
    /// test, such as runtime workers, the admin worker pool or `main` (when
    /// tests run single threaded), since those names are shared between tests.
    pub fn current() -> Result<Self> {
        let thread = std::thread::current();
        let name = thread.name().ok_or_else(|| Error::InvalidInput {
            message: "the current thread has no test name".to_string(),
        })?;
        if !is_test_path(name) {
            return Err(Error::InvalidInput {
                message: format!("thread '{name}' is not named after a test"),
            });
        }
        let method = name.rsplit("::").next().unwrap_or(name);
        Ok(Self::new(method))
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// The table name prefix owned by this test.
    pub fn table_name(&self) -> Result<TableName> {
        TableName::new(table_name_prefix(&self.method_name)?)
    }
}

// libtest names each test thread after the test's path, e.g.
// `test_utils::naming::tests::test_current`.
fn is_test_path(name: &str) -> bool {
    name != "main"
        && name.split("::").all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.method_name)
    }
}
