//! Output formatting for run results.
//!
//! Supports two output formats:
//! - JSON: the report document, printed or written to a file
//! - Pretty: colored terminal output for human readability

use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::detect::{count_by_kind, DependencyGraph, Finding, Severity};
use crate::error::{Error, Result};

// =============================================================================
// JSON Format
// =============================================================================

/// The report document of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub tool: String,
    pub version: String,
    pub operation: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub files_analyzed: usize,
    /// Findings per kind.
    pub counts: BTreeMap<String, usize>,
    pub fixes_applied: usize,
    pub error_count: usize,
    pub duration_ms: u64,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_graph: Option<DependencyGraph>,
}

impl Report {
    pub fn new(
        operation: &str,
        files_analyzed: usize,
        findings: Vec<Finding>,
        fixes_applied: usize,
        error_count: usize,
        duration: Duration,
        dependency_graph: Option<DependencyGraph>,
    ) -> Self {
        Self {
            tool: crate::TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            operation: operation.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            files_analyzed,
            counts: count_by_kind(&findings),
            fixes_applied,
            error_count,
            duration_ms: duration.as_millis() as u64,
            findings,
            dependency_graph,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON document to `path`, creating parent directories.
    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }
        fs::write(path, json + "\n").map_err(|e| Error::io(path, e))
    }

    /// Highest severity among the findings.
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// Whether any finding is at or above `threshold`.
    pub fn has_findings_at(&self, threshold: Severity) -> bool {
        self.max_severity().is_some_and(|s| s >= threshold)
    }
}

/// Print the report as JSON.
pub fn write_json(report: &Report) -> Result<()> {
    println!("{}", report.to_json()?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(report: &Report, path: &str) {
    // Header
    println!();
    print!("  ");
    print!("{}", crate::TOOL_NAME.cyan().bold());
    println!(" v{}", report.version);
    println!();

    print!("  {}", "Scanning:  ".dimmed());
    println!("{}", path);
    print!("  {}", "Operation: ".dimmed());
    println!("{}", report.operation);
    println!();

    write_summary(report);
    println!();

    if !report.findings.is_empty() {
        write_findings(&report.findings);
        println!();
    }

    if !report.counts.is_empty() {
        write_breakdown(&report.counts);
        println!();
    }

    if let Some(graph) = &report.dependency_graph {
        write_graph(graph);
        println!();
    }
}

fn write_summary(report: &Report) {
    if report.findings.is_empty() {
        print!("  {}", "✓ CLEAN".green());
    } else {
        print!("  {}", format!("✗ {} finding(s)", report.findings.len()).red());
    }
    print!(
        "  {}",
        format!(
            "{} file(s) in {}ms",
            report.files_analyzed, report.duration_ms
        )
        .dimmed()
    );
    if report.fixes_applied > 0 {
        print!("  {}", format!("{} fix(es) applied", report.fixes_applied).green());
    }
    if report.error_count > 0 {
        print!("  {}", format!("{} error(s)", report.error_count).yellow());
    }
    println!();
}

fn write_findings(findings: &[Finding]) {
    println!("  {} ({}):", "Findings".bold(), findings.len());
    println!();

    for f in findings {
        write_severity_tag(&f.severity);
        print!("   ");
        print!("{:<24}", f.kind.as_str().dimmed());
        print!("{}", f.file.blue());
        if f.line > 0 {
            print!("{}", format!(":{}", f.line).dimmed());
        }
        if f.auto_fixable {
            print!("  {}", "(fixable)".green());
        }
        println!();

        println!("            {}", f.description);
        for loc in f.locations.iter().skip(1) {
            println!("            {}", format!("also at {}:{}", loc.file, loc.line).dimmed());
        }
        if !f.suggestion.is_empty() {
            println!("            {}", format!("→ {}", f.suggestion).dimmed());
        }
        println!();
    }
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::High => print!("    {} ", "HIGH".red()),
        Severity::Medium => print!("    {} ", "MED ".yellow()),
        Severity::Low => print!("    {} ", "LOW ".blue()),
    }
}

fn write_breakdown(counts: &BTreeMap<String, usize>) {
    println!("  {}", "Breakdown:".bold());

    // Sort kinds by count descending
    let mut kinds: Vec<(&String, &usize)> = counts.iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    for (kind, count) in kinds {
        println!("    {:<24} {:>4}", kind, count);
    }
}

fn write_graph(graph: &DependencyGraph) {
    print!("  {}", "Packages:".bold());
    if let Some(module) = &graph.module {
        print!(" {}", module.dimmed());
    }
    println!();

    for (dir, node) in &graph.packages {
        println!(
            "    {:<32} {} local, {} external, {} stdlib",
            dir,
            node.local.len(),
            node.external.len(),
            node.stdlib.len()
        );
    }
    for cycle in &graph.cycles {
        println!("    {} {}", "cycle:".red(), cycle.join(" -> "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{FindingKind, Location};
    use tempfile::TempDir;

    fn sample() -> Report {
        let findings = vec![
            Finding::new(FindingKind::DuplicateType, Severity::Low, "a.go", 3, "dup")
                .with_name("User")
                .with_locations(vec![Location::new("a.go", 3), Location::new("b.go", 3)]),
            Finding::new(FindingKind::UnusedImport, Severity::Medium, "b.go", 5, "unused"),
        ];
        Report::new(
            "duplicate-types",
            2,
            findings,
            0,
            0,
            Duration::from_millis(12),
            None,
        )
    }

    #[test]
    fn test_json_document_fields() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(value["tool"], "declcheck");
        assert_eq!(value["operation"], "duplicate-types");
        assert_eq!(value["files_analyzed"], 2);
        assert_eq!(value["duration_ms"], 12);
        assert_eq!(value["counts"]["duplicate-type"], 1);
        assert_eq!(value["findings"][0]["locations"][1]["file"], "b.go");
        assert!(value.get("dependency_graph").is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_severity_gate() {
        let report = sample();
        assert_eq!(report.max_severity(), Some(Severity::Medium));
        assert!(report.has_findings_at(Severity::Low));
        assert!(report.has_findings_at(Severity::Medium));
        assert!(!report.has_findings_at(Severity::High));
    }

    #[test]
    fn test_write_json_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/nested/report.json");
        sample().write_json_file(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"operation\": \"duplicate-types\""));
    }
}
