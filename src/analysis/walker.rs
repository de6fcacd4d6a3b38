//! Source tree walking: exclusion rules, reading, parsing and extraction.
//!
//! The walk is lazy and checks the cancel token before each file. A file
//! that cannot be read or parsed is still yielded, carrying its error, so
//! one bad file never stops the walk.

use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::analysis::{get_analyzer, FileFacts, SymbolTable};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Error, Result};

/// Directory names never descended into (below the root).
const EXCLUDED_DIRS: &[&str] = &[
    "vendor",
    "node_modules",
    "testdata",
    "test_data",
    "fixtures",
    "__fixtures__",
    "third_party",
];

/// File name suffixes of generated Go sources.
const GENERATED_SUFFIXES: &[&str] = &[".pb.go", "_gen.go", "_generated.go"];

lazy_static! {
    /// The Go toolchain's marker line for generated files.
    static ref GENERATED_HEADER: Regex =
        Regex::new(r"^// Code generated .* DO NOT EDIT\.$").unwrap();
}

/// Why a file produced no facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Parse {
        line: usize,
        column: usize,
        message: String,
    },
    Io(String),
}

/// One walked file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute (or root-joined) path on disk.
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated.
    pub rel_path: String,
    /// Raw text as read.
    pub text: String,
    /// Extracted facts, present when parsing succeeded.
    pub facts: Option<FileFacts>,
    pub error: Option<SourceError>,
    /// Carries a `Code generated ... DO NOT EDIT.` header.
    pub generated: bool,
}

impl SourceFile {
    fn failed(path: &Path, rel_path: String, error: SourceError) -> Self {
        Self {
            path: path.to_path_buf(),
            rel_path,
            text: String::new(),
            facts: None,
            error: Some(error),
            generated: false,
        }
    }

    /// Analyze in-memory text as if it were read from `rel_path`.
    pub fn from_text(rel_path: &str, text: &str) -> Self {
        analyze_text(Path::new(rel_path), rel_path.to_string(), text.to_string())
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self.error, Some(SourceError::Parse { .. }))
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self.error, Some(SourceError::Io(_)))
    }

    /// The file's failure as a run error, for reporting.
    pub fn failure(&self) -> Option<Error> {
        match self.error.as_ref()? {
            SourceError::Parse {
                line,
                column,
                message,
            } => Some(Error::Parse {
                path: format!("{}:{}:{}", self.rel_path, line, column),
                message: message.clone(),
            }),
            SourceError::Io(message) => Some(Error::io(
                self.path.clone(),
                std::io::Error::other(message.clone()),
            )),
        }
    }
}

/// Root path plus the rules deciding which files take part in a run.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
    config: Config,
}

impl SourceTree {
    pub fn new<P: AsRef<Path>>(root: P, config: &Config) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config: config.clone(),
        }
    }

    /// Whether a directory (below the root) is skipped entirely.
    pub fn is_excluded_dir(name: &str) -> bool {
        name.starts_with('.') || EXCLUDED_DIRS.contains(&name)
    }

    /// Whether a file takes part in the run, judged by its name and path.
    pub fn is_candidate(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !name.ends_with(".go") {
            return false;
        }
        if name.ends_with("_test.go") && !self.config.should_include_test_files() {
            return false;
        }
        if name.starts_with("zz_generated") || GENERATED_SUFFIXES.iter().any(|s| name.ends_with(s))
        {
            return false;
        }
        let rel = relative_path(&self.root, path);
        !self.config.is_path_excluded(Path::new(&rel))
    }

    /// Candidate paths in file-name order. Unreadable entries are still
    /// yielded so the read reports them.
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + Send + 'static {
        let tree = self.clone();
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !SourceTree::is_excluded_dir(&name)
            })
            .filter_map(move |entry| match entry {
                Ok(e) if e.file_type().is_file() && tree.is_candidate(e.path()) => {
                    Some(e.into_path())
                }
                Ok(_) => None,
                Err(err) => {
                    tracing::warn!("walk error: {}", err);
                    err.path().map(Path::to_path_buf)
                }
            })
    }

    /// Lazy walk yielding loaded files.
    pub fn walk(&self, cancel: &CancelToken) -> SourceWalker {
        SourceWalker {
            root: self.root.clone(),
            paths: Box::new(self.paths()),
            cancel: cancel.clone(),
            done: false,
        }
    }

    /// Load every candidate file, using `workers` threads for parse+extract.
    ///
    /// Results are sorted by relative path, so the outcome does not depend
    /// on scheduling.
    pub fn collect(&self, cancel: &CancelToken, workers: usize) -> Result<Vec<SourceFile>> {
        if workers <= 1 {
            return self.walk(cancel).collect();
        }

        let mut paths = Vec::new();
        for path in self.paths() {
            cancel.check()?;
            paths.push(path);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot start worker pool: {}", e)))?;

        let root = self.root.clone();
        let loaded: Result<Vec<SourceFile>> = pool.install(|| {
            paths
                .par_iter()
                .map(|p| {
                    cancel.check()?;
                    Ok(load_source(&root, p))
                })
                .collect()
        });

        let mut files: Vec<SourceFile> = loaded?.into_iter().filter(|f| !f.generated).collect();
        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(files)
    }
}

/// Iterator over walked files.
///
/// Yields `Err(Error::Cancelled)` once when cancelled, then ends.
pub struct SourceWalker {
    root: PathBuf,
    paths: Box<dyn Iterator<Item = PathBuf> + Send>,
    cancel: CancelToken,
    done: bool,
}

impl Iterator for SourceWalker {
    type Item = Result<SourceFile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let Some(path) = self.paths.next() else {
                self.done = true;
                return None;
            };
            if let Err(e) = self.cancel.check() {
                self.done = true;
                return Some(Err(e));
            }
            let source = load_source(&self.root, &path);
            if source.generated {
                tracing::debug!("skipping generated file {}", source.rel_path);
                continue;
            }
            return Some(Ok(source));
        }
    }
}

/// Read, parse and extract one file.
pub fn load_source(root: &Path, path: &Path) -> SourceFile {
    let rel_path = relative_path(root, path);

    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => return SourceFile::failed(path, rel_path, SourceError::Io(e.to_string())),
    };
    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => {
            return SourceFile::failed(path, rel_path, SourceError::Io("not valid UTF-8".into()))
        }
    };

    analyze_text(path, rel_path, text)
}

fn analyze_text(path: &Path, rel_path: String, text: String) -> SourceFile {
    let mut source = SourceFile {
        path: path.to_path_buf(),
        rel_path: rel_path.clone(),
        text,
        facts: None,
        error: None,
        generated: false,
    };
    if has_generated_header(&source.text) {
        source.generated = true;
        return source;
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let Some(analyzer) = get_analyzer(ext) else {
        source.error = Some(SourceError::Parse {
            line: 1,
            column: 1,
            message: format!("no analyzer for extension {:?}", ext),
        });
        return source;
    };

    let parsed = match analyzer.parse(Path::new(&rel_path), source.text.as_bytes()) {
        Ok(p) => p,
        Err(e) => {
            source.error = Some(SourceError::Parse {
                line: 1,
                column: 1,
                message: e.to_string(),
            });
            return source;
        }
    };

    if let Some((line, column)) = parsed.first_error() {
        source.error = Some(SourceError::Parse {
            line,
            column,
            message: format!("syntax error at {}:{}", line, column),
        });
        return source;
    }

    let dir = Path::new(&rel_path)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();

    match analyzer.extract_facts(&parsed, &dir) {
        Ok(facts) => source.facts = Some(facts),
        Err(e) => {
            source.error = Some(SourceError::Parse {
                line: 1,
                column: 1,
                message: e.to_string(),
            })
        }
    }
    source
}

/// Files of one run plus the symbol table built over them.
#[derive(Debug, Default)]
pub struct SourceSet {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
    pub symbols: SymbolTable,
}

impl SourceSet {
    /// Build the symbol table through a single aggregation point.
    pub fn new(root: PathBuf, files: Vec<SourceFile>) -> Self {
        let symbols = files
            .iter()
            .filter_map(|f| f.facts.as_ref())
            .flat_map(|facts| facts.declarations.iter().cloned())
            .collect();
        Self {
            root,
            files,
            symbols,
        }
    }

    /// Files that parsed successfully, with their facts.
    pub fn parsed(&self) -> impl Iterator<Item = (&SourceFile, &FileFacts)> {
        self.files
            .iter()
            .filter_map(|f| f.facts.as_ref().map(|facts| (f, facts)))
    }
}

/// Path relative to `root`, `/`-separated. A file root maps to its name.
pub fn relative_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().replace('\\', "/"),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string()),
    }
}

/// Go's convention for generated files: a line comment before the package
/// clause matching `// Code generated ... DO NOT EDIT.`.
fn has_generated_header(text: &str) -> bool {
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("package ") {
            return false;
        }
        if GENERATED_HEADER.is_match(trimmed) {
            return true;
        }
    }
    false
}
