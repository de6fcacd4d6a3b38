//! Fact structures extracted from AST analysis.

use std::fmt;

use serde::Serialize;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Kind of declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclarationKind {
    /// `type T struct { ... }`
    Struct,
    /// `type T interface { ... }`
    Interface,
    /// `type T = U` or `type T U` with a non-struct, non-interface underlying type
    Alias,
    Function,
    Method,
    Import,
}

impl DeclarationKind {
    /// Convert to a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Struct => "record-type",
            DeclarationKind::Interface => "interface-type",
            DeclarationKind::Alias => "alias",
            DeclarationKind::Function => "function",
            DeclarationKind::Method => "method",
            DeclarationKind::Import => "import",
        }
    }

    /// Type declarations take part in duplicate detection.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            DeclarationKind::Struct | DeclarationKind::Interface | DeclarationKind::Alias
        )
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named member of a type: struct field or interface method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

/// Layout of an import spec, needed to rewrite it.
#[derive(Debug, Clone)]
pub struct ImportSite {
    /// Unquoted import path.
    pub path: String,
    /// Explicit local name (`_` and `.` included).
    pub alias: Option<String>,
    /// Span of the string literal holding the path.
    pub path_span: Span,
    /// Span of the enclosing `import` declaration.
    pub decl_span: Span,
    /// Whether the import sits inside an `import ( ... )` group.
    pub grouped: bool,
}

impl ImportSite {
    /// The identifier this import binds in the file.
    pub fn local_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => default_package_name(&self.path),
        }
    }

    /// Blank and dot imports do not bind a qualifier.
    pub fn binds_qualifier(&self) -> bool {
        !matches!(self.alias.as_deref(), Some("_") | Some("."))
    }
}

/// A declaration extracted from source code.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// The declaration name. For imports this is the local name.
    pub name: String,
    /// The kind of declaration.
    pub kind: DeclarationKind,
    /// File path relative to the walk root.
    pub file: String,
    /// Package clause name.
    pub package: String,
    /// Directory plus package name, the identity of "same package".
    pub namespace: String,
    /// Source span for the entire declaration.
    pub span: Span,
    /// Structural fingerprint used for equivalence.
    pub signature: String,
    /// For methods: the receiver type (e.g., "Config" for `func (c *Config) Validate()`).
    pub receiver: Option<String>,
    /// Struct fields or interface methods.
    pub members: Vec<Member>,
    /// Present for imports.
    pub import: Option<ImportSite>,
}

impl Declaration {
    pub fn line(&self) -> usize {
        self.span.start_line
    }
}

/// An identifier use found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

/// All facts extracted from a single file.
#[derive(Debug, Clone)]
pub struct FileFacts {
    /// File path relative to the walk root.
    pub path: String,
    /// Package/module name (if applicable).
    pub package: Option<String>,
    /// Declarations in source order, imports included.
    pub declarations: Vec<Declaration>,
    /// Operands of selector expressions (`fmt` in `fmt.Println`).
    pub qualifiers: Vec<Reference>,
    /// Package qualifiers of qualified types (`http` in `*http.Request`).
    pub qualified_types: Vec<Reference>,
    /// Unqualified type identifiers in type positions.
    pub type_refs: Vec<Reference>,
    /// Names bound by type parameter lists.
    pub type_params: Vec<String>,
}

impl FileFacts {
    /// Create empty facts for a file.
    pub fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            package: None,
            declarations: Vec::new(),
            qualifiers: Vec::new(),
            qualified_types: Vec::new(),
            type_refs: Vec::new(),
            type_params: Vec::new(),
        }
    }

    /// Find a declaration by name.
    pub fn find_declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Find declarations by kind.
    pub fn declarations_by_kind(&self, kind: DeclarationKind) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(move |d| d.kind == kind)
    }

    /// Import declarations in source order.
    pub fn imports(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations_by_kind(DeclarationKind::Import)
    }

    /// Whether the file has an `import . "pkg"`.
    pub fn has_dot_import(&self) -> bool {
        self.imports()
            .filter_map(|d| d.import.as_ref())
            .any(|i| i.alias.as_deref() == Some("."))
    }

    /// Whether `name` is used as a qualifier anywhere in the file.
    pub fn uses_qualifier(&self, name: &str) -> bool {
        self.qualifiers
            .iter()
            .chain(self.qualified_types.iter())
            .any(|r| r.name == name)
    }
}

/// The package name Go assumes for an import path without an alias.
///
/// Takes the last path segment, skipping `/vN` major-version segments, and
/// strips `.vN` suffixes (`gopkg.in/yaml.v3`) and a `go-` prefix.
pub fn default_package_name(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 {
        if let Some(last) = segments.last() {
            if is_major_version(last) {
                segments.pop();
            }
        }
    }

    let last = segments.last().copied().unwrap_or(path);
    let mut name = last;
    if let Some(idx) = name.rfind(".v") {
        if name[idx + 2..].chars().all(|c| c.is_ascii_digit()) && idx + 2 < name.len() {
            name = &name[..idx];
        }
    }
    let name = name.strip_prefix("go-").unwrap_or(name);
    name.replace(['-', '.'], "_")
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}
