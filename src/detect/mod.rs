//! Analyzers over a walked source tree.

mod dependencies;
mod duplicates;
mod imports;
mod naming;
mod types;
mod undefined;

pub use dependencies::{
    build_dependency_graph, detect_dependency_cycles, is_stdlib, DependencyCycles,
    DependencyGraph, GoModule, PackageNode,
};
pub use duplicates::{cluster_severity, detect_duplicate_types, DuplicateTypes};
pub use imports::{
    analyze_file as analyze_imports, detect_import_conflicts, synthesize_alias, ImportConflicts,
};
pub use naming::{detect_naming_violations, mixed_case_initialism, NamingConventions};
pub use types::{count_by_kind, sort_findings, Finding, FindingKind, Location, Severity};
pub use undefined::{detect_undefined_references, UndefinedReferences};
