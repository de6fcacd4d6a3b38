//! Run coordination: validation, dispatch by id, stats aggregation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::{self, Config};
use crate::error::{Error, RegistryError, Result};
use crate::logger::Logger;
use crate::operation::{Operation, OperationContext, OperationOptions, OperationState, RunOutcome};
use crate::registry::{builtin_operation, OperationRegistry};

/// Totals across runs. Only [`Orchestrator::reset_stats`] clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub runs: usize,
    pub files_analyzed: usize,
    pub findings: usize,
    pub fixes_applied: usize,
    pub errors: usize,
    pub total_duration: Duration,
}

impl Stats {
    pub fn merge(&mut self, outcome: &RunOutcome) {
        self.runs += 1;
        self.files_analyzed += outcome.files_analyzed;
        self.findings += outcome.report.findings.len();
        self.fixes_applied += outcome.fixes_applied;
        self.errors += outcome.error_count;
        self.total_duration += outcome.duration;
    }
}

pub struct Orchestrator {
    registry: OperationRegistry,
    config: Arc<Config>,
    base_dir: Option<PathBuf>,
    logger: Option<Arc<dyn Logger>>,
    cancel: CancelToken,
    state: OperationState,
    stats: Stats,
}

impl Orchestrator {
    pub fn new(registry: OperationRegistry) -> Self {
        Self {
            registry,
            config: Arc::new(Config::default()),
            base_dir: None,
            logger: None,
            cancel: CancelToken::new(),
            state: OperationState::Created,
            stats: Stats::default(),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = Stats::default();
    }

    /// Token shared with every run; cancelling it stops the current walk.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Registered operation ids in registration order.
    pub fn operations(&self) -> Vec<String> {
        self.registry.list()
    }

    pub fn validate(&mut self) -> Result<()> {
        let result = self.check_ready();
        self.state = match result {
            Ok(()) => OperationState::Validated,
            Err(_) => OperationState::Failed,
        };
        result
    }

    fn check_ready(&self) -> Result<()> {
        if self.base_dir.is_none() {
            return Err(Error::Configuration("no base directory set".into()));
        }
        if self.logger.is_none() {
            return Err(Error::Configuration("no logger attached".into()));
        }
        config::validate(&self.config).map_err(|e| Error::Configuration(e.to_string()))
    }

    fn context(&self) -> Result<OperationContext> {
        let (Some(base_dir), Some(logger)) = (&self.base_dir, &self.logger) else {
            return Err(Error::Configuration("orchestrator is not configured".into()));
        };
        Ok(OperationContext::new(base_dir.clone(), Arc::clone(logger))
            .with_config(Arc::clone(&self.config))
            .with_cancel(self.cancel.clone()))
    }

    /// Registry first, then the built-in dispatch table.
    fn resolve(&self, id: &str) -> Result<Arc<dyn Operation>> {
        match self.registry.get(id) {
            Ok(op) => Ok(op),
            Err(RegistryError::NotFound(_)) => match builtin_operation(id) {
                Some(op) => {
                    tracing::debug!("{} not registered, using built-in", id);
                    Ok(op)
                }
                None => Err(RegistryError::NotFound(id.to_string()).into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    pub fn execute(&mut self, id: &str, options: &OperationOptions) -> Result<RunOutcome> {
        if self.state == OperationState::Created {
            self.validate()?;
        }
        let op = self.resolve(id)?;
        let ctx = self.context()?;

        self.state = OperationState::Executing;
        ctx.logger.info(&format!("running {}", id));

        let result = op.validate(&ctx).and_then(|_| op.execute(&ctx, options));
        match &result {
            Ok(outcome) => {
                self.stats.merge(outcome);
                self.state = OperationState::Completed;
            }
            Err(e) => {
                ctx.logger.error(&format!("{} failed: {}", id, e));
                self.state = OperationState::Failed;
            }
        }
        result
    }

    pub fn health_check(&self, id: &str) -> Result<()> {
        let op = self.resolve(id)?;
        op.health_check(&self.context()?)
    }

    pub fn describe(&self, id: &str) -> Result<String> {
        Ok(self.resolve(id)?.describe())
    }

    pub fn stop(&self, id: &str) -> Result<()> {
        let op = self.resolve(id)?;
        op.stop(&self.context()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogger;
    use tempfile::TempDir;

    #[test]
    fn test_validate_requires_base_dir_and_logger() {
        let mut orch = Orchestrator::new(OperationRegistry::new());
        assert!(matches!(orch.validate(), Err(Error::Configuration(_))));
        assert_eq!(orch.state(), OperationState::Failed);

        let mut orch = Orchestrator::new(OperationRegistry::new()).with_base_dir(".");
        assert!(matches!(orch.validate(), Err(Error::Configuration(_))));

        let mut orch = Orchestrator::new(OperationRegistry::new())
            .with_base_dir(".")
            .with_logger(Arc::new(MemoryLogger::new()));
        orch.validate().unwrap();
        assert_eq!(orch.state(), OperationState::Validated);
    }

    #[test]
    fn test_execute_auto_validates_and_completes() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.go"), "package a\ntype T struct{}\n").unwrap();
        let mut orch = Orchestrator::new(OperationRegistry::with_builtins())
            .with_base_dir(temp.path())
            .with_logger(Arc::new(MemoryLogger::new()));
        assert_eq!(orch.state(), OperationState::Created);

        let outcome = orch
            .execute("duplicate-types", &OperationOptions::default())
            .unwrap();
        assert_eq!(outcome.files_analyzed, 1);
        assert_eq!(orch.state(), OperationState::Completed);
        assert_eq!(orch.stats().runs, 1);
    }

    #[test]
    fn test_unknown_operation() {
        let temp = TempDir::new().unwrap();
        let mut orch = Orchestrator::new(OperationRegistry::new())
            .with_base_dir(temp.path())
            .with_logger(Arc::new(MemoryLogger::new()));
        let err = orch
            .execute("does-not-exist", &OperationOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Registry(RegistryError::NotFound(_))));
        assert!(orch.describe("does-not-exist").is_err());
    }

    #[test]
    fn test_stats_merge() {
        let mut stats = Stats::default();
        let outcome = RunOutcome {
            operation: "naming".into(),
            report: crate::report::Report::new(
                "naming",
                3,
                Vec::new(),
                2,
                1,
                Duration::from_millis(5),
                None,
            ),
            files_analyzed: 3,
            fixes_applied: 2,
            error_count: 1,
            success: false,
            duration: Duration::from_millis(5),
        };
        stats.merge(&outcome);
        stats.merge(&outcome);
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.files_analyzed, 6);
        assert_eq!(stats.fixes_applied, 4);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.total_duration, Duration::from_millis(10));
    }
}
