//! The uniform operation contract and the analyzer skeleton behind it.
//!
//! Every analyzer is a [`Detector`]: a pure function from a walked source
//! tree to findings. [`AnalyzerOperation`] wraps one and supplies the rest
//! of a run: walking, parse-error reporting, fix application, the report
//! and metrics.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::analysis::{get_analyzer, SourceError, SourceSet, SourceTree};
use crate::cancel::CancelToken;
use crate::config::{self, Config};
use crate::detect::{sort_findings, DependencyGraph, Finding, FindingKind, Severity};
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::report::Report;
use crate::rewrite::{rewrite_file, Edit};

/// Everything an operation needs from its caller.
#[derive(Clone)]
pub struct OperationContext {
    pub base_dir: PathBuf,
    pub logger: Arc<dyn Logger>,
    pub cancel: CancelToken,
    pub config: Arc<Config>,
}

impl OperationContext {
    pub fn new(base_dir: impl Into<PathBuf>, logger: Arc<dyn Logger>) -> Self {
        Self {
            base_dir: base_dir.into(),
            logger,
            cancel: CancelToken::new(),
            config: Arc::new(Config::default()),
        }
    }

    pub fn with_config(mut self, config: Arc<Config>) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Per-run switches, built by the CLI.
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    /// Directory or file to analyze; relative paths resolve against the base directory.
    pub target: Option<PathBuf>,
    /// Where to write the JSON report.
    pub output: Option<PathBuf>,
    /// Apply auto-fixes.
    pub force: bool,
    /// Never touch the filesystem, even with `force`.
    pub dry_run: bool,
    /// Log one debug line per analyzed file.
    pub verbose: bool,
    pub timeout: Option<Duration>,
    /// Threads for the parse phase; 0 and 1 mean sequential.
    pub workers: usize,
}

/// Lifecycle of an operation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Created,
    Validated,
    Executing,
    Completed,
    Failed,
}

/// What one run produced. Merged into the orchestrator's stats.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub operation: String,
    pub report: Report,
    pub files_analyzed: usize,
    pub fixes_applied: usize,
    pub error_count: usize,
    /// No file-scoped errors occurred.
    pub success: bool,
    pub duration: Duration,
}

impl RunOutcome {
    pub fn findings(&self) -> &[Finding] {
        &self.report.findings
    }
}

/// Contract shared by every operation, dispatched by id.
pub trait Operation: Send + Sync {
    fn id(&self) -> &str;

    fn describe(&self) -> String;

    fn validate(&self, ctx: &OperationContext) -> Result<()>;

    fn execute(&self, ctx: &OperationContext, options: &OperationOptions) -> Result<RunOutcome>;

    /// Snapshot of counters; always carries `tool` and `dry_run`.
    fn collect_metrics(&self) -> BTreeMap<String, serde_json::Value>;

    fn health_check(&self, ctx: &OperationContext) -> Result<()>;

    fn stop(&self, _ctx: &OperationContext) -> Result<()> {
        Ok(())
    }
}

/// Finding strategy plugged into [`AnalyzerOperation`].
pub trait Detector: Send + Sync {
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn detect(&self, sources: &SourceSet, config: &Config) -> Vec<Finding>;

    /// Whether findings may carry edits worth applying.
    fn supports_fixes(&self) -> bool {
        false
    }

    /// Findings plus the dependency graph when the detector builds one,
    /// from a single pass over the sources.
    fn detect_with_graph(
        &self,
        sources: &SourceSet,
        config: &Config,
    ) -> (Vec<Finding>, Option<DependencyGraph>) {
        (self.detect(sources, config), None)
    }
}

#[derive(Debug, Default, Clone)]
struct Metrics {
    runs: usize,
    files_analyzed: usize,
    findings: usize,
    fixes_applied: usize,
    errors: usize,
    dry_run: bool,
    last_duration_ms: u64,
}

/// Operation skeleton shared by all analyzers.
pub struct AnalyzerOperation<D: Detector> {
    detector: D,
    metrics: Mutex<Metrics>,
}

impl<D: Detector> AnalyzerOperation<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            metrics: Mutex::new(Metrics::default()),
        }
    }

    fn target(&self, ctx: &OperationContext, options: &OperationOptions) -> PathBuf {
        match &options.target {
            Some(t) if t.is_absolute() => t.clone(),
            Some(t) => ctx.base_dir.join(t),
            None => ctx.base_dir.clone(),
        }
    }

    /// Apply every attached edit, one write per file. Returns (applied, failed files).
    fn apply_fixes(
        &self,
        ctx: &OperationContext,
        sources: &SourceSet,
        findings: &[Finding],
    ) -> (usize, usize) {
        let mut by_file: BTreeMap<&str, Vec<Edit>> = BTreeMap::new();
        for finding in findings {
            if let Some(edit) = &finding.edit {
                by_file.entry(finding.file.as_str()).or_default().push(edit.clone());
            }
        }

        let mut applied = 0;
        let mut failed = 0;
        for (rel, edits) in by_file {
            let Some(file) = sources.files.iter().find(|f| f.rel_path == rel) else {
                continue;
            };
            match rewrite_file(&file.path, &file.text, &edits) {
                Ok(n) => {
                    ctx.logger.debug(&format!("{}: applied {} fix(es)", rel, n));
                    applied += n;
                }
                Err(e) => {
                    ctx.logger.error(&format!("{}: fixes not applied: {}", rel, e));
                    failed += 1;
                }
            }
        }
        (applied, failed)
    }

    fn record(&self, outcome: &RunOutcome, dry_run: bool) {
        let mut m = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        m.runs += 1;
        m.files_analyzed += outcome.files_analyzed;
        m.findings += outcome.report.findings.len();
        m.fixes_applied += outcome.fixes_applied;
        m.errors += outcome.error_count;
        m.dry_run = dry_run;
        m.last_duration_ms = outcome.duration.as_millis() as u64;
    }
}

impl<D: Detector> Operation for AnalyzerOperation<D> {
    fn id(&self) -> &str {
        self.detector.id()
    }

    fn describe(&self) -> String {
        format!("{}: {}", self.detector.id(), self.detector.description())
    }

    fn validate(&self, ctx: &OperationContext) -> Result<()> {
        if !ctx.base_dir.exists() {
            return Err(Error::Configuration(format!(
                "base directory {} does not exist",
                ctx.base_dir.display()
            )));
        }
        config::validate(&ctx.config).map_err(|e| Error::Configuration(e.to_string()))
    }

    fn execute(&self, ctx: &OperationContext, options: &OperationOptions) -> Result<RunOutcome> {
        let start = Instant::now();
        let cancel = ctx.cancel.child_with_timeout(options.timeout);
        cancel.check()?;

        let target = self.target(ctx, options);
        if !target.exists() {
            return Err(Error::Configuration(format!(
                "target {} does not exist",
                target.display()
            )));
        }
        ctx.logger.debug(&format!("{}: walking {}", self.id(), target.display()));

        let tree = SourceTree::new(&target, &ctx.config);
        let files = tree.collect(&cancel, options.workers.max(1))?;

        let mut error_count = 0;
        let mut findings = Vec::new();
        for file in &files {
            let Some(failure) = file.failure() else {
                continue;
            };
            ctx.logger.warn(&failure.to_string());
            error_count += 1;
            if let Some(SourceError::Parse { line, message, .. }) = &file.error {
                findings.push(
                    Finding::new(
                        FindingKind::ParseError,
                        Severity::Medium,
                        file.rel_path.clone(),
                        *line,
                        message.clone(),
                    )
                    .with_suggestion("fix the syntax error; the file was not analyzed"),
                );
            }
        }

        let files_analyzed = files.len();
        let sources = SourceSet::new(target, files);
        if options.verbose {
            for (file, facts) in sources.parsed() {
                ctx.logger.debug(&format!(
                    "{}: package {}, {} declaration(s), {} import(s)",
                    file.rel_path,
                    facts.package.as_deref().unwrap_or("?"),
                    facts.declarations.len(),
                    facts.imports().count()
                ));
            }
        }
        let (detected, graph) = self.detector.detect_with_graph(&sources, &ctx.config);
        findings.extend(detected);
        sort_findings(&mut findings);

        let mut fixes_applied = 0;
        let fixable = findings.iter().filter(|f| f.edit.is_some()).count();
        if self.detector.supports_fixes() && fixable > 0 {
            if options.force && !options.dry_run {
                cancel.check()?;
                let (applied, failed) = self.apply_fixes(ctx, &sources, &findings);
                fixes_applied = applied;
                error_count += failed;
            } else if options.force {
                ctx.logger.info(&format!("dry run: {} fix(es) not applied", fixable));
            }
        }

        let duration = start.elapsed();
        let report = Report::new(
            self.id(),
            files_analyzed,
            findings,
            fixes_applied,
            error_count,
            duration,
            graph,
        );

        if let Some(output) = &options.output {
            if options.dry_run {
                ctx.logger.info(&format!("dry run: report not written to {}", output.display()));
            } else {
                report.write_json_file(output)?;
                ctx.logger.info(&format!("report written to {}", output.display()));
            }
        }

        ctx.logger.info(&format!(
            "{}: {} file(s), {} finding(s), {} fix(es), {} error(s)",
            self.id(),
            files_analyzed,
            report.findings.len(),
            fixes_applied,
            error_count
        ));

        let outcome = RunOutcome {
            operation: self.id().to_string(),
            report,
            files_analyzed,
            fixes_applied,
            error_count,
            success: error_count == 0,
            duration,
        };
        self.record(&outcome, options.dry_run);
        Ok(outcome)
    }

    fn collect_metrics(&self) -> BTreeMap<String, serde_json::Value> {
        let m = self
            .metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let mut out = BTreeMap::new();
        out.insert("tool".to_string(), serde_json::json!(crate::TOOL_NAME));
        out.insert("operation".to_string(), serde_json::json!(self.id()));
        out.insert("dry_run".to_string(), serde_json::json!(m.dry_run));
        out.insert("runs".to_string(), serde_json::json!(m.runs));
        out.insert("files_analyzed".to_string(), serde_json::json!(m.files_analyzed));
        out.insert("findings".to_string(), serde_json::json!(m.findings));
        out.insert("fixes_applied".to_string(), serde_json::json!(m.fixes_applied));
        out.insert("errors".to_string(), serde_json::json!(m.errors));
        out.insert("last_duration_ms".to_string(), serde_json::json!(m.last_duration_ms));
        out
    }

    fn health_check(&self, ctx: &OperationContext) -> Result<()> {
        self.validate(ctx)?;
        if get_analyzer("go").is_none() {
            return Err(Error::Configuration("no Go analyzer available".into()));
        }
        Ok(())
    }
}
