//! Declcheck - declaration-level static analysis and codemods for Go.
//!
//! Declcheck walks a Go source tree, extracts declarations, imports and
//! type references with tree-sitter, and runs one analyzer per invocation:
//! duplicated type definitions, import conflicts (with an in-place fix),
//! naming conventions, undefined type references and package import
//! cycles. Each run produces a JSON report.
//!
//! # Architecture
//!
//! - `analysis`: Go parsing, fact extraction, tree walking, symbol tables
//! - `detect`: Analyzers that consume the facts and emit findings
//! - `rewrite`: Line-range edits and atomic file replacement
//! - `operation`: The operation contract and the shared analyzer run
//! - `registry` / `orchestrator`: Lookup by id, validation, run stats
//! - `report`: Report document, JSON and terminal output
//!
//! # Adding an Analyzer
//!
//! Implement `detect::Detector`, wrap it in `AnalyzerOperation`, and
//! register it under its id.

pub mod analysis;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod logger;
pub mod operation;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod rewrite;

/// Name stamped into reports and metrics.
pub const TOOL_NAME: &str = "declcheck";

pub use analysis::{
    Declaration, DeclarationKind, FileFacts, GoAnalyzer, LanguageAnalyzer, SourceFile, SourceSet,
    SourceTree, SymbolTable,
};
pub use cancel::CancelToken;
pub use config::Config;
pub use detect::{Finding, FindingKind, Severity};
pub use error::{Error, RegistryError, Result};
pub use logger::{Logger, MemoryLogger, TracingLogger};
pub use operation::{
    AnalyzerOperation, Detector, Operation, OperationContext, OperationOptions, OperationState,
    RunOutcome,
};
pub use orchestrator::{Orchestrator, Stats};
pub use registry::OperationRegistry;
pub use report::Report;
