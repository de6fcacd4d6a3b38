//! Fixture helpers shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use declcheck::{MemoryLogger, OperationRegistry, Orchestrator};
use tempfile::TempDir;

pub fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join("go")
}

/// Copy `testdata/go/<name>` into a fresh temporary directory.
///
/// Fixtures live under a `testdata` directory, which the walker skips below
/// the root, and fix tests rewrite files, so every test works on a copy.
pub fn fixture(name: &str) -> TempDir {
    let temp = TempDir::new().expect("should create temp dir");
    copy_dir(&testdata_path().join(name), temp.path());
    temp
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("should create fixture dir");
    for entry in fs::read_dir(from).expect("should read fixture dir") {
        let entry = entry.expect("should read fixture entry");
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("should copy fixture file");
        }
    }
}

/// An orchestrator over the built-in operations, logging into memory.
pub fn orchestrator(base_dir: &Path) -> (Orchestrator, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::new());
    let orch = Orchestrator::new(OperationRegistry::with_builtins())
        .with_base_dir(base_dir)
        .with_logger(logger.clone());
    (orch, logger)
}
