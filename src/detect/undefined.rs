//! References to types nothing in the tree declares.
//!
//! Unqualified type names must be declared somewhere in the file's package,
//! be predeclared, or be bound by a type parameter list or a local type
//! declaration. Qualified types must use a qualifier the file imports.

use std::collections::HashSet;
use std::path::Path;

use crate::analysis::{namespace, FileFacts, SourceFile, SourceSet};
use crate::config::Config;
use crate::operation::Detector;

use super::{sort_findings, Finding, FindingKind, Severity};

/// Types every Go file can name without declaring them.
const PREDECLARED_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

/// Detector behind the `undefined-refs` operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UndefinedReferences;

impl Detector for UndefinedReferences {
    fn id(&self) -> &'static str {
        "undefined-refs"
    }

    fn description(&self) -> &'static str {
        "Finds type references with no declaration in the package and unknown package qualifiers"
    }

    fn detect(&self, sources: &SourceSet, _config: &Config) -> Vec<Finding> {
        detect_undefined_references(sources)
    }
}

pub fn detect_undefined_references(sources: &SourceSet) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (file, facts) in sources.parsed() {
        findings.extend(check_file(sources, file, facts));
    }
    sort_findings(&mut findings);
    findings
}

fn check_file(sources: &SourceSet, file: &SourceFile, facts: &FileFacts) -> Vec<Finding> {
    let mut findings = Vec::new();

    let imported: HashSet<String> = facts
        .imports()
        .filter_map(|d| d.import.as_ref())
        .filter(|site| site.binds_qualifier())
        .map(|site| site.local_name())
        .collect();

    let mut reported = HashSet::new();
    for qualifier in &facts.qualified_types {
        if imported.contains(&qualifier.name) || !reported.insert(qualifier.name.as_str()) {
            continue;
        }
        findings.push(
            Finding::new(
                FindingKind::UndefinedReference,
                Severity::High,
                file.rel_path.clone(),
                qualifier.line,
                format!("{} is used as a package qualifier but is not imported", qualifier.name),
            )
            .with_name(qualifier.name.clone())
            .with_suggestion(format!("import the package that provides {}", qualifier.name)),
        );
    }

    // A dot import brings unqualified names in from elsewhere.
    if facts.has_dot_import() {
        return findings;
    }

    let dir = Path::new(&file.rel_path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    let ns = namespace(&dir, facts.package.as_deref().unwrap_or(""));

    let mut reported = HashSet::new();
    for reference in &facts.type_refs {
        let name = reference.name.as_str();
        if PREDECLARED_TYPES.contains(&name)
            || facts.type_params.iter().any(|p| p == name)
            || sources.symbols.declared_in(name, &ns)
            || !reported.insert(name)
        {
            continue;
        }
        findings.push(
            Finding::new(
                FindingKind::UndefinedReference,
                Severity::Medium,
                file.rel_path.clone(),
                reference.line,
                format!("type {} is not declared in package {}", name, ns),
            )
            .with_name(name)
            .with_suggestion(format!("declare {} or import the package that provides it", name)),
        );
    }

    findings
}
