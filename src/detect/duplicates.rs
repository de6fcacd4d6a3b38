//! Detection of structurally identical type declarations.
//!
//! Declarations are grouped by name, then by signature. Two types with the
//! same name but a different shape are not duplicates.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{Declaration, SourceSet};
use crate::config::{Config, SeverityPolicy};
use crate::operation::Detector;

use super::{sort_findings, Finding, FindingKind, Location, Severity};

/// Detector behind the `duplicate-types` operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateTypes;

impl Detector for DuplicateTypes {
    fn id(&self) -> &'static str {
        "duplicate-types"
    }

    fn description(&self) -> &'static str {
        "Finds type declarations that repeat the same name and structure"
    }

    fn detect(&self, sources: &SourceSet, config: &Config) -> Vec<Finding> {
        detect_duplicate_types(sources, &config.severity)
    }
}

/// Report every cluster of same-name, same-signature type declarations.
pub fn detect_duplicate_types(sources: &SourceSet, policy: &SeverityPolicy) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (name, decls) in sources.symbols.iter() {
        let mut by_signature: BTreeMap<&str, Vec<&Declaration>> = BTreeMap::new();
        for decl in decls.iter().filter(|d| d.kind.is_type()) {
            by_signature.entry(decl.signature.as_str()).or_default().push(decl);
        }

        for (_, mut cluster) in by_signature {
            if cluster.len() < 2 {
                continue;
            }
            cluster.sort_by(|a, b| a.file.cmp(&b.file).then(a.line().cmp(&b.line())));
            findings.push(cluster_finding(name, &cluster, policy));
        }
    }

    sort_findings(&mut findings);
    findings
}

fn cluster_finding(name: &str, cluster: &[&Declaration], policy: &SeverityPolicy) -> Finding {
    let namespaces: BTreeSet<&str> = cluster.iter().map(|d| d.namespace.as_str()).collect();
    let severity = cluster_severity(cluster.len(), namespaces.len(), policy);
    let first = cluster[0];

    let (description, suggestion) = if namespaces.len() > 1 {
        let packages: BTreeSet<&str> = cluster.iter().map(|d| d.package.as_str()).collect();
        (
            format!(
                "{} {} is declared {} times across {} packages ({})",
                first.kind,
                name,
                cluster.len(),
                namespaces.len(),
                packages.into_iter().collect::<Vec<_>>().join(", ")
            ),
            "consolidate into a shared location".to_string(),
        )
    } else {
        (
            format!(
                "{} {} is declared {} times in package {}",
                first.kind,
                name,
                cluster.len(),
                first.package
            ),
            "remove duplicate definitions".to_string(),
        )
    };

    let locations = cluster
        .iter()
        .map(|d| Location::new(d.file.clone(), d.line()))
        .collect();

    Finding::new(
        FindingKind::DuplicateType,
        severity,
        first.file.clone(),
        first.line(),
        description,
    )
    .with_name(name)
    .with_suggestion(suggestion)
    .with_locations(locations)
}

/// Cross-package clusters are `high`; large same-package clusters `medium`.
pub fn cluster_severity(members: usize, namespaces: usize, policy: &SeverityPolicy) -> Severity {
    if namespaces > 1 {
        Severity::High
    } else if members > policy.same_package_medium_threshold {
        Severity::Medium
    } else {
        Severity::Low
    }
}
