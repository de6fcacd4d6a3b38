//! Parser adapter traits.

use std::path::Path;

use super::FileFacts;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// This is kept separate from FileFacts to allow reusing the tree
/// for multiple analysis passes without re-parsing.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path relative to the walk root.
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// First syntax error position, if the tree has one.
    pub fn first_error(&self) -> Option<(usize, usize)> {
        let root = self.tree.root_node();
        if !root.has_error() {
            return None;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                let pos = node.start_position();
                return Some((pos.row + 1, pos.column + 1));
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        Some((1, 1))
    }
}

/// Language-specific parser adapter.
///
/// Turns one file's text into a syntax tree, then into declarations and
/// references.
///
/// # Thread Safety
///
/// Note: tree_sitter::Parser is not Sync, so implementations should
/// create parsers as needed or use thread-local storage.
pub trait LanguageAnalyzer: Send + Sync {
    /// Returns the language identifier (e.g., "go").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Returns an error if parsing fails completely (e.g., wrong language).
    /// Partial parse errors are still returned as a valid tree with ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Extract all facts from a parsed file.
    ///
    /// `dir` is the file's directory relative to the walk root and scopes
    /// the package namespace.
    fn extract_facts(&self, parsed: &ParsedFile, dir: &str) -> anyhow::Result<FileFacts>;

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
