//! Integration tests for dispatch, cancellation and stats aggregation.

mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use declcheck::{
    AnalyzerOperation, CancelToken, Error, MemoryLogger, Operation, OperationContext,
    OperationOptions, OperationRegistry, OperationState, Orchestrator, RegistryError, Report,
    RunOutcome,
};
use declcheck::detect::{DuplicateTypes, ImportConflicts};

use common::{fixture, orchestrator};

/// Counts executions and reports nothing.
#[derive(Default)]
struct CountingOperation {
    calls: AtomicUsize,
}

impl Operation for CountingOperation {
    fn id(&self) -> &str {
        "counting"
    }

    fn describe(&self) -> String {
        "counting: counts executions".to_string()
    }

    fn validate(&self, _ctx: &OperationContext) -> declcheck::Result<()> {
        Ok(())
    }

    fn execute(
        &self,
        _ctx: &OperationContext,
        _options: &OperationOptions,
    ) -> declcheck::Result<RunOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RunOutcome {
            operation: "counting".into(),
            report: Report::new("counting", 0, Vec::new(), 0, 0, Duration::ZERO, None),
            files_analyzed: 0,
            fixes_applied: 0,
            error_count: 0,
            success: true,
            duration: Duration::ZERO,
        })
    }

    fn collect_metrics(&self) -> BTreeMap<String, serde_json::Value> {
        let mut m = BTreeMap::new();
        m.insert("tool".into(), serde_json::json!("declcheck"));
        m.insert("dry_run".into(), serde_json::json!(false));
        m.insert("calls".into(), serde_json::json!(self.calls.load(Ordering::SeqCst)));
        m
    }

    fn health_check(&self, _ctx: &OperationContext) -> declcheck::Result<()> {
        Ok(())
    }
}

#[test]
fn test_registered_operation_is_dispatched() {
    let temp = fixture("users");
    let op = Arc::new(CountingOperation::default());
    let mut registry = OperationRegistry::new();
    registry.register("counting", op.clone()).unwrap();

    let mut orch = Orchestrator::new(registry)
        .with_base_dir(temp.path())
        .with_logger(Arc::new(MemoryLogger::new()));

    orch.execute("counting", &OperationOptions::default()).unwrap();
    orch.execute("counting", &OperationOptions::default()).unwrap();

    assert_eq!(op.calls.load(Ordering::SeqCst), 2);
    assert_eq!(op.collect_metrics()["calls"], 2);
    assert_eq!(orch.operations(), vec!["counting".to_string()]);
}

#[test]
fn test_builtin_fallback_without_registration() {
    let temp = fixture("users");
    let mut orch = Orchestrator::new(OperationRegistry::new())
        .with_base_dir(temp.path())
        .with_logger(Arc::new(MemoryLogger::new()));

    let outcome = orch
        .execute("duplicate-types", &OperationOptions::default())
        .unwrap();
    assert_eq!(outcome.findings().len(), 1);
    assert!(orch.operations().is_empty());
}

#[test]
fn test_duplicate_registration_rejected() {
    let mut registry = OperationRegistry::with_builtins();
    let err = registry
        .register("naming", Arc::new(AnalyzerOperation::new(DuplicateTypes)))
        .unwrap_err();
    assert_eq!(err, RegistryError::AlreadyRegistered("naming".into()));
}

#[test]
fn test_expired_deadline_cancels_without_report() {
    let temp = fixture("users");
    let output = temp.path().join("report.json");
    let (orch, _) = orchestrator(temp.path());
    let mut orch = orch.with_cancel(CancelToken::with_deadline(Instant::now()));

    let err = orch
        .execute(
            "duplicate-types",
            &OperationOptions {
                output: Some(output.clone()),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(!output.exists());
    assert_eq!(orch.state(), OperationState::Failed);
    assert_eq!(orch.stats().runs, 0);
}

#[test]
fn test_zero_timeout_cancels() {
    let temp = fixture("users");
    let (mut orch, _) = orchestrator(temp.path());

    let err = orch
        .execute(
            "duplicate-types",
            &OperationOptions {
                timeout: Some(Duration::ZERO),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn test_cancel_token_stops_later_runs() {
    let temp = fixture("users");
    let (mut orch, _) = orchestrator(temp.path());

    orch.execute("duplicate-types", &OperationOptions::default())
        .unwrap();
    orch.cancel_token().cancel();
    let err = orch
        .execute("duplicate-types", &OperationOptions::default())
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(orch.stats().runs, 1);
}

#[test]
fn test_stats_accumulate_until_reset() {
    let temp = fixture("users");
    let (mut orch, _) = orchestrator(temp.path());

    orch.execute("duplicate-types", &OperationOptions::default())
        .unwrap();
    orch.execute("naming", &OperationOptions::default()).unwrap();

    let stats = orch.stats().clone();
    assert_eq!(stats.runs, 2);
    assert_eq!(stats.files_analyzed, 4);
    assert_eq!(stats.findings, 1);

    orch.reset_stats();
    assert_eq!(orch.stats().runs, 0);
}

#[test]
fn test_metrics_track_dry_run() {
    let temp = fixture("imports");
    let op = AnalyzerOperation::new(ImportConflicts);
    let ctx = OperationContext::new(temp.path(), Arc::new(MemoryLogger::new()));

    op.execute(
        &ctx,
        &OperationOptions {
            force: true,
            dry_run: true,
            ..Default::default()
        },
    )
    .unwrap();

    let metrics = op.collect_metrics();
    assert_eq!(metrics["tool"], "declcheck");
    assert_eq!(metrics["dry_run"], true);
    assert_eq!(metrics["runs"], 1);
    assert_eq!(metrics["fixes_applied"], 0);
}

#[test]
fn test_health_check_and_describe() {
    let temp = fixture("users");
    let (orch, _) = orchestrator(temp.path());

    orch.health_check("import-conflicts").unwrap();
    assert!(orch
        .describe("import-conflicts")
        .unwrap()
        .starts_with("import-conflicts: "));
    orch.stop("import-conflicts").unwrap();
    assert!(matches!(
        orch.health_check("missing"),
        Err(Error::Registry(RegistryError::NotFound(_)))
    ));
}
