//! Import conflicts within a single file.
//!
//! Three classes are reported: the same path imported twice, two paths
//! binding the same package name, and imports never used as a qualifier.
//! The first two carry a line edit when the import spec sits on lines of
//! its own.

use std::collections::{HashMap, HashSet};

use crate::analysis::{default_package_name, Declaration, FileFacts, SourceFile, SourceSet, Span};
use crate::config::Config;
use crate::operation::Detector;
use crate::rewrite::Edit;

use super::{sort_findings, Finding, FindingKind, Location, Severity};

/// Detector behind the `import-conflicts` operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportConflicts;

impl Detector for ImportConflicts {
    fn id(&self) -> &'static str {
        "import-conflicts"
    }

    fn description(&self) -> &'static str {
        "Finds duplicate, colliding and unused imports; --force rewrites the first two"
    }

    fn detect(&self, sources: &SourceSet, _config: &Config) -> Vec<Finding> {
        detect_import_conflicts(sources)
    }

    fn supports_fixes(&self) -> bool {
        true
    }
}

pub fn detect_import_conflicts(sources: &SourceSet) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (file, facts) in sources.parsed() {
        findings.extend(analyze_file(file, facts));
    }
    sort_findings(&mut findings);
    findings
}

/// Import findings for one file, in source order.
pub fn analyze_file(file: &SourceFile, facts: &FileFacts) -> Vec<Finding> {
    let lines: Vec<&str> = file.text.split_inclusive('\n').collect();
    let imports: Vec<&Declaration> = facts.imports().collect();

    let mut findings = Vec::new();
    let mut first_by_path: HashMap<&str, &Declaration> = HashMap::new();
    let mut first_by_name: HashMap<String, &Declaration> = HashMap::new();
    let mut taken: HashSet<String> = imports.iter().map(|d| d.name.clone()).collect();

    for decl in imports.iter().copied() {
        let Some(site) = decl.import.as_ref() else {
            continue;
        };

        if let Some(first) = first_by_path.get(site.path.as_str()) {
            // Deleting is only safe when the repeat binds exactly what the
            // first occurrence binds.
            let same_binding = first.import.as_ref().map(|f| f.alias.as_deref())
                == Some(site.alias.as_deref());
            let target = if site.grouped { &decl.span } else { &site.decl_span };
            let mut finding = Finding::new(
                FindingKind::ImportDuplicate,
                Severity::Medium,
                decl.file.clone(),
                decl.line(),
                format!(
                    "import {:?} already appears on line {}",
                    site.path,
                    first.line()
                ),
            )
            .with_name(site.path.clone())
            .with_locations(vec![
                Location::new(first.file.clone(), first.line()),
                Location::new(decl.file.clone(), decl.line()),
            ]);
            if same_binding {
                finding = finding.with_suggestion("remove the repeated import");
                if occupies_whole_lines(&lines, target) {
                    finding = finding.with_edit(Edit::delete(target.start_line, target.end_line));
                }
                findings.push(finding);
                continue;
            }
            // The repeat binds its own name; keep checking it as an import.
            findings.push(
                finding.with_suggestion("import the package once and use a single name for it"),
            );
        } else {
            first_by_path.insert(site.path.as_str(), decl);
        }

        if !site.binds_qualifier() {
            continue;
        }

        let local = site.local_name();
        match first_by_name.get(&local) {
            Some(first)
                if site.alias.is_none()
                    && first.import.as_ref().is_some_and(|f| f.alias.is_none()) =>
            {
                let alias = synthesize_alias(&site.path, &taken);
                taken.insert(alias.clone());

                let mut finding = Finding::new(
                    FindingKind::ImportAliasConflict,
                    Severity::High,
                    decl.file.clone(),
                    decl.line(),
                    format!(
                        "import {:?} binds {} which is already bound by {:?}",
                        site.path,
                        local,
                        first.import.as_ref().map(|f| f.path.as_str()).unwrap_or("")
                    ),
                )
                .with_name(local.clone())
                .with_suggestion(format!("alias the import as {}", alias))
                .with_locations(vec![
                    Location::new(first.file.clone(), first.line()),
                    Location::new(decl.file.clone(), decl.line()),
                ]);
                let target = if site.grouped { &decl.span } else { &site.decl_span };
                if target.start_line == target.end_line && occupies_whole_lines(&lines, target) {
                    if let Some(edit) = alias_edit(&lines, &site.path_span, &alias) {
                        finding = finding.with_edit(edit);
                    }
                }
                findings.push(finding);
            }
            Some(_) => {}
            None => {
                first_by_name.insert(local.clone(), decl);
            }
        }

        if !facts.uses_qualifier(&local) {
            findings.push(
                Finding::new(
                    FindingKind::UnusedImport,
                    Severity::Low,
                    decl.file.clone(),
                    decl.line(),
                    format!("import {:?} is never used as {}", site.path, local),
                )
                .with_name(site.path.clone())
                .with_suggestion("remove the import or use it"),
            );
        }
    }

    findings
}

/// Alias for a colliding import: lower-cased parent segment plus the
/// capitalized package name, e.g. `pkg/fmt` becomes `pkgFmt`.
///
/// A single-segment path becomes `<segment>Pkg`. A numeric suffix is added
/// when the alias is already bound in the file.
pub fn synthesize_alias(path: &str, taken: &HashSet<String>) -> String {
    let name = sanitize(&default_package_name(path));
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && !is_major_version(s))
        .collect();

    let base = if segments.len() >= 2 {
        let parent = sanitize(&segments[segments.len() - 2].to_lowercase());
        format!("{}{}", parent, capitalize(&name))
    } else {
        format!("{}Pkg", name)
    };

    if !taken.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}

/// Whether only whitespace shares the lines covered by `span`.
fn occupies_whole_lines(lines: &[&str], span: &Span) -> bool {
    let (Some(first), Some(last)) = (
        lines.get(span.start_line.wrapping_sub(1)),
        lines.get(span.end_line.wrapping_sub(1)),
    ) else {
        return false;
    };
    let before = first.get(..span.start_col - 1).unwrap_or("x");
    let after = last.get(span.end_col - 1..).unwrap_or("x");
    before.trim().is_empty() && after.trim().is_empty()
}

/// Insert `alias ` in front of the import path literal.
fn alias_edit(lines: &[&str], path_span: &Span, alias: &str) -> Option<Edit> {
    let line = lines.get(path_span.start_line.checked_sub(1)?)?;
    let at = path_span.start_col.checked_sub(1)?;
    let (head, tail) = (line.get(..at)?, line.get(at..)?);
    Some(Edit::replace(
        path_span.start_line,
        path_span.start_line,
        format!("{}{} {}", head, alias, tail),
    ))
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1 && segment.starts_with('v') && segment[1..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::apply_edits;

    fn findings_for(text: &str) -> Vec<Finding> {
        let file = SourceFile::from_text("app/main.go", text);
        let facts = file.facts.clone().expect("fixture parses");
        analyze_file(&file, &facts)
    }

    fn of_kind(findings: &[Finding], kind: FindingKind) -> Vec<&Finding> {
        findings.iter().filter(|f| f.kind == kind).collect()
    }

    fn fixed(text: &str) -> String {
        let edits: Vec<Edit> = findings_for(text)
            .into_iter()
            .filter_map(|f| f.edit)
            .collect();
        apply_edits(text, &edits).unwrap()
    }

    #[test]
    fn test_synthesize_alias() {
        let none = HashSet::new();
        assert_eq!(synthesize_alias("pkg/fmt", &none), "pkgFmt");
        assert_eq!(synthesize_alias("fmt", &none), "fmtPkg");
        assert_eq!(synthesize_alias("github.com/go-chi/chi/v5", &none), "gochiChi");

        let taken: HashSet<String> = ["pkgFmt".to_string(), "pkgFmt2".to_string()].into();
        assert_eq!(synthesize_alias("pkg/fmt", &taken), "pkgFmt3");
    }

    #[test]
    fn test_exact_duplicate_in_group() {
        let text = "package main\n\nimport (\n\t\"pkg/fmt\"\n\t\"pkg/fmt\"\n)\n\nvar _ = fmt.Sprint\n";
        let findings = findings_for(text);
        let dups = of_kind(&findings, FindingKind::ImportDuplicate);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].line, 5);
        assert_eq!(dups[0].severity, Severity::Medium);
        assert_eq!(dups[0].edit, Some(Edit::delete(5, 5)));
        assert!(of_kind(&findings, FindingKind::UnusedImport).is_empty());

        assert_eq!(
            fixed(text),
            "package main\n\nimport (\n\t\"pkg/fmt\"\n)\n\nvar _ = fmt.Sprint\n"
        );
    }

    #[test]
    fn test_exact_duplicate_single_declarations() {
        let text = "package main\n\nimport \"os\"\nimport \"os\"\n\nvar _ = os.Args\n";
        assert_eq!(fixed(text), "package main\n\nimport \"os\"\n\nvar _ = os.Args\n");
    }

    #[test]
    fn test_alias_conflict_gets_alias() {
        let text = "package main\n\nimport (\n\t\"fmt\"\n\t\"pkg/fmt\"\n)\n\nvar _ = fmt.Sprint\n";
        let findings = findings_for(text);
        let conflicts = of_kind(&findings, FindingKind::ImportAliasConflict);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::High);
        assert_eq!(conflicts[0].line, 5);
        assert_eq!(conflicts[0].suggestion, "alias the import as pkgFmt");

        let rewritten = fixed(text);
        assert_eq!(
            rewritten,
            "package main\n\nimport (\n\t\"fmt\"\n\tpkgFmt \"pkg/fmt\"\n)\n\nvar _ = fmt.Sprint\n"
        );
        let again = findings_for(&rewritten);
        assert!(of_kind(&again, FindingKind::ImportAliasConflict).is_empty());
    }

    #[test]
    fn test_aliased_and_blank_imports_do_not_conflict() {
        let text = "package main\n\nimport (\n\t\"fmt\"\n\tpf \"pkg/fmt\"\n\t_ \"other/fmt\"\n)\n\nvar _ = fmt.Sprint\nvar _ = pf.Sprint\n";
        let findings = findings_for(text);
        assert!(findings.is_empty(), "{:?}", findings);
    }

    #[test]
    fn test_unused_import_reported_not_fixed() {
        let text = "package main\n\nimport \"strings\"\n";
        let findings = findings_for(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnusedImport);
        assert_eq!(findings[0].severity, Severity::Low);
        assert!(!findings[0].auto_fixable);
    }

    #[test]
    fn test_duplicate_with_other_name_is_not_deleted() {
        let text = "package main\n\nimport (\n\tf \"fmt\"\n\t\"fmt\"\n)\n\nfunc main() {\n\tf.Println(1)\n\tfmt.Println(2)\n}\n";
        let findings = findings_for(text);
        let dups = of_kind(&findings, FindingKind::ImportDuplicate);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].line, 5);
        assert!(!dups[0].auto_fixable);
        assert!(dups[0].edit.is_none());
        assert!(of_kind(&findings, FindingKind::UnusedImport).is_empty());
        assert_eq!(fixed(text), text);
    }

    #[test]
    fn test_blank_then_named_duplicate_is_not_deleted() {
        let text = "package main\n\nimport (\n\t_ \"embed\"\n\t\"embed\"\n)\n\nvar _ embed.FS\n";
        let findings = findings_for(text);
        let dups = of_kind(&findings, FindingKind::ImportDuplicate);
        assert_eq!(dups.len(), 1);
        assert!(dups[0].edit.is_none());
        assert_eq!(fixed(text), text);
    }

    #[test]
    fn test_repeated_blank_import_is_deleted() {
        let text = "package main\n\nimport (\n\t_ \"embed\"\n\t_ \"embed\"\n)\n";
        assert_eq!(fixed(text), "package main\n\nimport (\n\t_ \"embed\"\n)\n");
    }

    #[test]
    fn test_shared_line_is_not_auto_fixable() {
        let text = "package main\n\nimport \"os\"; import \"os\"\n\nvar _ = os.Args\n";
        let findings = findings_for(text);
        let dups = of_kind(&findings, FindingKind::ImportDuplicate);
        assert_eq!(dups.len(), 1);
        assert!(!dups[0].auto_fixable);
        assert!(dups[0].edit.is_none());
    }
}
