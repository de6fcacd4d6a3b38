//! Core types for analyzer findings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rewrite::Edit;

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Kinds of findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    DuplicateType,
    ImportDuplicate,
    ImportAliasConflict,
    UnusedImport,
    NamingViolation,
    UndefinedReference,
    DependencyCycle,
    ParseError,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::DuplicateType => "duplicate-type",
            FindingKind::ImportDuplicate => "import-duplicate",
            FindingKind::ImportAliasConflict => "import-alias-conflict",
            FindingKind::UnusedImport => "unused-import",
            FindingKind::NamingViolation => "naming-violation",
            FindingKind::UndefinedReference => "undefined-reference",
            FindingKind::DependencyCycle => "dependency-cycle",
            FindingKind::ParseError => "parse-error",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One implicated place in the source tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// A single reported issue.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub file: String,
    pub line: usize,
    pub kind: FindingKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub description: String,
    pub suggestion: String,
    pub auto_fixable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    /// Fix for this finding, expressed against the original file text.
    #[serde(skip)]
    pub edit: Option<Edit>,
}

impl Finding {
    pub fn new(
        kind: FindingKind,
        severity: Severity,
        file: impl Into<String>,
        line: usize,
        description: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            kind,
            severity,
            name: None,
            description: description.into(),
            suggestion: String::new(),
            auto_fixable: false,
            locations: Vec::new(),
            edit: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    /// Attach a fix; marks the finding auto-fixable.
    pub fn with_edit(mut self, edit: Edit) -> Self {
        self.edit = Some(edit);
        self.auto_fixable = true;
        self
    }
}

/// Order findings by (file, line, name).
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.line.cmp(&b.line))
            .then_with(|| a.name.cmp(&b.name))
            .then(a.kind.cmp(&b.kind))
    });
}

/// Number of findings per kind.
pub fn count_by_kind(findings: &[Finding]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for finding in findings {
        *counts.entry(finding.kind.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}
