// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The LanceDB Authors

//! Run a suite of admin tests once per admin strategy.
//!
//! The suite's cluster is started once, every case is run under every
//! strategy in [`params`] order, and the cluster is stopped once at the end.
//! Each run gets its own [`TestContext`], and its tables are cleaned up after
//! the body finishes whether it passed, failed or panicked.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use anyhow::anyhow;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{info, warn};

use crate::config::Configuration;
use crate::test_utils::cleanup::CleanupReport;
use crate::test_utils::context::TestContext;
use crate::test_utils::naming::TestName;
use crate::test_utils::strategy::params;
use crate::test_utils::suite::AdminTestSuite;

/// The body of a test case.
pub type TestBody = for<'a> fn(&'a TestContext) -> BoxFuture<'a, anyhow::Result<()>>;

/// A named test case.
#[derive(Clone, Copy)]
pub struct AdminTestCase {
    pub name: &'static str,
    pub body: TestBody,
}

impl AdminTestCase {
    pub fn new(name: &'static str, body: TestBody) -> Self {
        Self { name, body }
    }
}

impl fmt::Debug for AdminTestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminTestCase")
            .field("name", &self.name)
            .finish()
    }
}

/// The result of one case under one strategy.
#[derive(Debug)]
pub struct CaseOutcome {
    pub strategy: &'static str,
    pub test_name: TestName,
    /// What the body returned. A panic is reported as an error.
    pub result: anyhow::Result<()>,
    /// What cleanup did, or `None` if the context could not be set up.
    pub cleanup: Option<crate::Result<CleanupReport>>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok() && matches!(self.cleanup, Some(Ok(_)))
    }
}

/// All outcomes of a suite run, in run order.
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub outcomes: Vec<CaseOutcome>,
    /// Set when the suite could not be torn down after the last run.
    pub teardown: Option<anyhow::Error>,
}

impl SuiteReport {
    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed()).collect()
    }

    /// Panic with a summary of every failed run and of a failed teardown, if
    /// any.
    pub fn assert_all_passed(&self) {
        let mut failures = self
            .failures()
            .into_iter()
            .map(|o| {
                let cleanup = match &o.cleanup {
                    Some(Ok(_)) => "ok".to_string(),
                    Some(Err(err)) => err.to_string(),
                    None => "skipped".to_string(),
                };
                let result = match &o.result {
                    Ok(()) => "ok".to_string(),
                    Err(err) => format!("{err:#}"),
                };
                format!(
                    "  {} ({}): result={}, cleanup={}",
                    o.test_name, o.strategy, result, cleanup
                )
            })
            .collect::<Vec<_>>();
        let failed_runs = failures.len();
        if let Some(err) = &self.teardown {
            failures.push(format!("  teardown: {err:#}"));
        }
        assert!(
            failures.is_empty(),
            "{} of {} runs failed:\n{}",
            failed_runs,
            self.outcomes.len(),
            failures.join("\n")
        );
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn run_case(
    strategy_name: &'static str,
    ctx: TestContext,
    body: TestBody,
) -> CaseOutcome {
    let test_name = ctx.test_name().clone();
    let result = match AssertUnwindSafe(body(&ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("test panicked: {}", panic_message(payload))),
    };
    if let Err(err) = &result {
        warn!("{test_name} ({strategy_name}) failed: {err:#}");
    }
    let cleanup = ctx.tear_down().await;
    if let Err(err) = &cleanup {
        warn!("Cleanup after {test_name} ({strategy_name}) failed: {err}");
    }
    CaseOutcome {
        strategy: strategy_name,
        test_name,
        result,
        cleanup: Some(cleanup),
    }
}

/// Run every case under every admin strategy against one shared cluster.
///
/// Fails only if the suite itself cannot be set up. Failures of individual
/// runs and of the final teardown are collected in the returned report.
pub async fn run_suite(
    conf: Configuration,
    cases: &[AdminTestCase],
) -> anyhow::Result<SuiteReport> {
    let suite = AdminTestSuite::set_up_before_all_with(conf).await?;
    let mut report = SuiteReport::default();

    for (idx, strategy) in params().iter().enumerate() {
        for case in cases {
            let test_name = TestName::parameterized(case.name, idx);
            info!("Running {test_name} with the {} admin", strategy.name);
            let ctx = TestContext::set_up(&suite, strategy, test_name.clone());
            let outcome = match ctx {
                Ok(ctx) => run_case(strategy.name, ctx, case.body).await,
                Err(err) => CaseOutcome {
                    strategy: strategy.name,
                    test_name,
                    result: Err(err.into()),
                    cleanup: None,
                },
            };
            report.outcomes.push(outcome);
        }
    }

    if let Err(err) = suite.tear_down_after_all().await {
        warn!("Suite teardown failed: {err:#}");
        report.teardown = Some(err);
    }
    Ok(report)
}
