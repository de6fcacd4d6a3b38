//! Go naming conventions.

use std::collections::BTreeSet;
use std::path::Path;

use crate::analysis::{namespace, DeclarationKind, SourceSet};
use crate::config::{Config, NamingConfig};
use crate::operation::Detector;

use super::{sort_findings, Finding, FindingKind, Severity};

/// Detector behind the `naming` operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NamingConventions;

impl Detector for NamingConventions {
    fn id(&self) -> &'static str {
        "naming"
    }

    fn description(&self) -> &'static str {
        "Checks identifiers, package names and import aliases against Go naming conventions"
    }

    fn detect(&self, sources: &SourceSet, config: &Config) -> Vec<Finding> {
        detect_naming_violations(sources, &config.naming)
    }
}

pub fn detect_naming_violations(sources: &SourceSet, naming: &NamingConfig) -> Vec<Finding> {
    if !naming.enabled {
        return Vec::new();
    }

    let mut findings = Vec::new();
    let mut seen_namespaces = BTreeSet::new();

    for (file, facts) in sources.parsed() {
        if let Some(package) = facts.package.as_deref() {
            let dir = Path::new(&file.rel_path)
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            let ns = namespace(&dir, package);
            if !valid_package_name(package) && seen_namespaces.insert(ns) {
                findings.push(
                    Finding::new(
                        FindingKind::NamingViolation,
                        Severity::Medium,
                        file.rel_path.clone(),
                        1,
                        format!("package name {} should be short and all lower-case", package),
                    )
                    .with_name(package)
                    .with_suggestion(format!(
                        "rename the package to {}",
                        package.replace('_', "").to_lowercase()
                    )),
                );
            }
        }

        for decl in &facts.declarations {
            if decl.kind == DeclarationKind::Import {
                let Some(alias) = decl.import.as_ref().and_then(|i| i.alias.as_deref()) else {
                    continue;
                };
                if alias != "_" && alias.contains('_') {
                    findings.push(underscore_finding(&decl.file, decl.line(), alias, "import alias"));
                }
                continue;
            }

            let mut identifiers = vec![(decl.name.as_str(), decl.line())];
            if decl.kind == DeclarationKind::Struct {
                identifiers.extend(decl.members.iter().map(|m| (m.name.as_str(), m.line)));
            }

            for (name, line) in identifiers {
                if has_underscore(name) {
                    findings.push(underscore_finding(&decl.file, line, name, decl.kind.as_str()));
                }
                if let Some((word, fixed)) = mixed_case_initialism(name, &naming.initialisms) {
                    findings.push(
                        Finding::new(
                            FindingKind::NamingViolation,
                            Severity::Low,
                            decl.file.clone(),
                            line,
                            format!(
                                "{} writes the initialism {} as {}",
                                name,
                                word.to_uppercase(),
                                word
                            ),
                        )
                        .with_name(name)
                        .with_suggestion(format!("rename to {}", fixed)),
                    );
                }
            }
        }
    }

    sort_findings(&mut findings);
    findings
}

fn underscore_finding(file: &str, line: usize, name: &str, what: &str) -> Finding {
    Finding::new(
        FindingKind::NamingViolation,
        Severity::Low,
        file.to_string(),
        line,
        format!("{} {} contains an underscore", what, name),
    )
    .with_name(name)
    .with_suggestion("use MixedCaps instead of underscores")
}

/// Underscores inside a name; the blank identifier and `_`-prefixed
/// cgo-style names are left alone.
fn has_underscore(name: &str) -> bool {
    name != "_" && !name.starts_with('_') && name.contains('_')
}

fn valid_package_name(package: &str) -> bool {
    let base = package.strip_suffix("_test").unwrap_or(package);
    !base.contains('_') && !base.chars().any(|c| c.is_uppercase())
}

/// First word written as `Url`/`Id` instead of `URL`/`ID`, and the name
/// with that word corrected.
pub fn mixed_case_initialism(name: &str, initialisms: &[String]) -> Option<(String, String)> {
    for word in split_words(name) {
        let upper = word.to_uppercase();
        let is_mixed = word != upper && word != word.to_lowercase();
        if is_mixed && initialisms.iter().any(|i| *i == upper) {
            let at = word.as_ptr() as usize - name.as_ptr() as usize;
            let fixed = format!("{}{}{}", &name[..at], upper, &name[at + word.len()..]);
            return Some((word.to_string(), fixed));
        }
    }
    None
}

/// Split a MixedCaps identifier into words, keeping runs of capitals
/// together: `HTTPServerId` becomes `HTTP`, `Server`, `Id`.
fn split_words(name: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut words = Vec::new();
    let mut start = 0;

    for i in 1..chars.len() {
        let (idx, c) = chars[i];
        let prev = chars[i - 1].1;
        let next_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_lowercase());
        let boundary = c == '_'
            || prev == '_'
            || (c.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit()))
            || (c.is_uppercase() && prev.is_uppercase() && next_lower);
        if boundary {
            if idx > start {
                words.push(&name[start..idx]);
            }
            start = idx;
        }
    }
    if start < name.len() {
        words.push(&name[start..]);
    }
    words.into_iter().map(|w| w.trim_matches('_')).filter(|w| !w.is_empty()).collect()
}
