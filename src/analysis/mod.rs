//! AST-backed source analysis.
//!
//! Turns Go files into facts the analyzers consume:
//! - Declarations (record and interface types, aliases, functions, methods)
//! - Imports, with the layout needed to rewrite them
//! - Identifier uses (qualifiers, type references)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ SourceTree      │────▶│ GoAnalyzer   │────▶│ FileFacts     │
//! │ (walk, exclude) │     │ (tree-sitter)│     │ (Declarations,│
//! └─────────────────┘     └──────────────┘     │  References)  │
//!                                              └───────────────┘
//!                                                      │
//!                                                      ▼
//!                                              ┌───────────────┐
//!                                              │ SourceSet     │
//!                                              │ (SymbolTable) │
//!                                              └───────────────┘
//! ```

mod facts;
mod go;
mod symbols;
mod traits;
mod walker;

pub use facts::{
    default_package_name, Declaration, DeclarationKind, FileFacts, ImportSite, Member, Reference,
    Span,
};
pub use go::{namespace, GoAnalyzer};
pub use symbols::SymbolTable;
pub use traits::{LanguageAnalyzer, ParsedFile};
pub use walker::{
    load_source, relative_path, SourceError, SourceFile, SourceSet, SourceTree, SourceWalker,
};

use once_cell::sync::OnceCell;

/// Static storage for the Go analyzer.
static GO_ANALYZER: OnceCell<GoAnalyzer> = OnceCell::new();

/// Get the analyzer for a file extension (without the dot).
pub fn get_analyzer(ext: &str) -> Option<&'static dyn LanguageAnalyzer> {
    let go = GO_ANALYZER.get_or_init(GoAnalyzer::new);
    if go.handles_extension(ext) {
        return Some(go);
    }
    None
}
