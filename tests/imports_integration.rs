//! Integration tests for the import-conflicts operation and its fixes.

mod common;

use std::fs;

use declcheck::detect::{FindingKind, Severity};
use declcheck::OperationOptions;

use common::{fixture, orchestrator};

fn force() -> OperationOptions {
    OperationOptions {
        force: true,
        ..Default::default()
    }
}

#[test]
fn test_repeated_import_is_removed() {
    let temp = fixture("imports");
    let path = temp.path().join("main.go");
    let (mut orch, _) = orchestrator(temp.path());

    let outcome = orch.execute("import-conflicts", &force()).unwrap();

    assert_eq!(outcome.fixes_applied, 1);
    assert_eq!(outcome.findings().len(), 1);
    assert_eq!(outcome.findings()[0].kind, FindingKind::ImportDuplicate);
    assert_eq!(outcome.findings()[0].severity, Severity::Medium);
    assert!(outcome.findings()[0].auto_fixable);

    let fixed = fs::read_to_string(&path).unwrap();
    assert_eq!(fixed.matches("\"pkg/fmt\"").count(), 1);
    assert!(fixed.contains("fmt.Println(\"hello\")"));
}

#[test]
fn test_fix_is_idempotent() {
    let temp = fixture("imports");
    let path = temp.path().join("main.go");
    let (mut orch, _) = orchestrator(temp.path());

    orch.execute("import-conflicts", &force()).unwrap();
    let once = fs::read_to_string(&path).unwrap();

    let second = orch.execute("import-conflicts", &force()).unwrap();
    assert_eq!(second.fixes_applied, 0);
    assert!(second.findings().is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), once);

    assert_eq!(orch.stats().runs, 2);
    assert_eq!(orch.stats().fixes_applied, 1);
}

#[test]
fn test_dry_run_leaves_bytes_untouched() {
    let temp = fixture("imports");
    let path = temp.path().join("main.go");
    let before = fs::read(&path).unwrap();
    let output = temp.path().join("report.json");
    let (mut orch, _) = orchestrator(temp.path());

    let outcome = orch
        .execute(
            "import-conflicts",
            &OperationOptions {
                force: true,
                dry_run: true,
                output: Some(output.clone()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(outcome.fixes_applied, 0);
    assert_eq!(outcome.findings().len(), 1);
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(!output.exists());
}

#[test]
fn test_without_force_nothing_changes() {
    let temp = fixture("imports");
    let path = temp.path().join("main.go");
    let before = fs::read(&path).unwrap();
    let (mut orch, _) = orchestrator(temp.path());

    let outcome = orch
        .execute("import-conflicts", &OperationOptions::default())
        .unwrap();

    assert_eq!(outcome.fixes_applied, 0);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_colliding_package_names_get_alias() {
    let temp = fixture("imports");
    let path = temp.path().join("main.go");
    fs::write(
        &path,
        "package main\n\nimport (\n\t\"fmt\"\n\t\"pkg/fmt\"\n)\n\nfunc main() {\n\tfmt.Println(\"hello\")\n}\n",
    )
    .unwrap();
    let (mut orch, _) = orchestrator(temp.path());

    let outcome = orch.execute("import-conflicts", &force()).unwrap();

    let conflict = outcome
        .findings()
        .iter()
        .find(|f| f.kind == FindingKind::ImportAliasConflict)
        .expect("alias conflict reported");
    assert_eq!(conflict.severity, Severity::High);
    assert_eq!(conflict.suggestion, "alias the import as pkgFmt");
    assert_eq!(conflict.line, 5);
    assert_eq!(outcome.fixes_applied, 1);

    let fixed = fs::read_to_string(&path).unwrap();
    assert!(fixed.contains("\tpkgFmt \"pkg/fmt\"\n"));
    assert!(fixed.contains("\t\"fmt\"\n"));
}

#[test]
fn test_unused_import_is_reported_not_fixed() {
    let temp = fixture("imports");
    let path = temp.path().join("main.go");
    let source = "package main\n\nimport \"os\"\n\nfunc main() {}\n";
    fs::write(&path, source).unwrap();
    let (mut orch, _) = orchestrator(temp.path());

    let outcome = orch.execute("import-conflicts", &force()).unwrap();

    assert_eq!(outcome.findings().len(), 1);
    assert_eq!(outcome.findings()[0].kind, FindingKind::UnusedImport);
    assert_eq!(outcome.findings()[0].severity, Severity::Low);
    assert_eq!(outcome.fixes_applied, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), source);
}

#[test]
fn test_force_keeps_repeats_that_bind_other_names() {
    let temp = fixture("imports");
    let path = temp.path().join("main.go");
    let source = "package main\n\nimport (\n\tf \"fmt\"\n\t\"fmt\"\n)\n\nfunc main() {\n\tf.Println(1)\n\tfmt.Println(2)\n}\n";
    fs::write(&path, source).unwrap();
    let (mut orch, _) = orchestrator(temp.path());

    let outcome = orch.execute("import-conflicts", &force()).unwrap();

    assert_eq!(outcome.findings().len(), 1);
    assert_eq!(outcome.findings()[0].kind, FindingKind::ImportDuplicate);
    assert!(!outcome.findings()[0].auto_fixable);
    assert_eq!(outcome.fixes_applied, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), source);
}

#[test]
fn test_force_keeps_named_import_after_blank_one() {
    let temp = fixture("imports");
    let path = temp.path().join("main.go");
    let source = "package main\n\nimport (\n\t_ \"embed\"\n\t\"embed\"\n)\n\nvar _ embed.FS\n";
    fs::write(&path, source).unwrap();
    let (mut orch, _) = orchestrator(temp.path());

    let outcome = orch.execute("import-conflicts", &force()).unwrap();

    assert_eq!(outcome.fixes_applied, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), source);
}
