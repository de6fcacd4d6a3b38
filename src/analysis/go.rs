//! Go language analyzer using tree-sitter.
//!
//! Extracts:
//! - Type declarations (struct, interface, aliases and other named types)
//!   with structural signatures
//! - Function and method declarations
//! - Imports, including their layout for rewriting
//! - Qualifier and type references for usage checks

use std::collections::HashSet;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::{
    Declaration, DeclarationKind, FileFacts, ImportSite, LanguageAnalyzer, Member, ParsedFile,
    Reference, Span,
};

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
(import_spec
  name: (_)? @alias
  path: (_) @path
) @spec
"#;

/// Tree-sitter query for package declaration.
const PACKAGE_QUERY: &str = r#"
(package_clause
  (package_identifier) @package_name
)
"#;

/// Go language analyzer.
pub struct GoAnalyzer {
    language: Language,
}

impl GoAnalyzer {
    /// Create a new Go analyzer.
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Create a new parser for this thread.
    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    /// Extract the package name from a parsed file.
    fn extract_package(&self, parsed: &ParsedFile) -> Option<String> {
        let query = Query::new(&self.language, PACKAGE_QUERY).ok()?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return Some(parsed.node_text(capture.node).to_string());
                }
            }
        }
        None
    }

    /// Extract top-level type, function and method declarations in source order.
    fn extract_declarations(&self, parsed: &ParsedFile, scope: &Scope) -> Vec<Declaration> {
        let root = parsed.tree.root_node();
        let mut declarations = Vec::new();
        let mut cursor = root.walk();

        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "type_declaration" => {
                    let mut inner = node.walk();
                    for spec in node.named_children(&mut inner) {
                        if let Some(decl) = self.type_declaration(parsed, scope, spec) {
                            declarations.push(decl);
                        }
                    }
                }
                "function_declaration" | "method_declaration" => {
                    if let Some(decl) = self.function_declaration(parsed, scope, node) {
                        declarations.push(decl);
                    }
                }
                _ => {}
            }
        }

        declarations
    }

    fn type_declaration(&self, parsed: &ParsedFile, scope: &Scope, spec: Node) -> Option<Declaration> {
        if spec.kind() != "type_spec" && spec.kind() != "type_alias" {
            return None;
        }
        let name = parsed.node_text(spec.child_by_field_name("name")?).to_string();
        let ty = spec.child_by_field_name("type")?;
        let type_params = spec
            .child_by_field_name("type_parameters")
            .map(|p| canonical(parsed, p))
            .unwrap_or_default();

        let (kind, body, members) = match (spec.kind(), ty.kind()) {
            ("type_spec", "struct_type") => {
                let (body, members) = self.struct_shape(parsed, ty);
                (DeclarationKind::Struct, body, members)
            }
            ("type_spec", "interface_type") => {
                let (body, members) = self.interface_shape(parsed, ty);
                (DeclarationKind::Interface, body, members)
            }
            ("type_alias", _) => (
                DeclarationKind::Alias,
                format!("= {}", canonical(parsed, ty)),
                Vec::new(),
            ),
            _ => (
                DeclarationKind::Alias,
                format!("type {}", canonical(parsed, ty)),
                Vec::new(),
            ),
        };

        let signature = if type_params.is_empty() {
            body
        } else {
            format!("{} {}", type_params, body)
        };

        Some(scope.declaration(name, kind, Span::from_node(spec), signature, None, members))
    }

    fn function_declaration(
        &self,
        parsed: &ParsedFile,
        scope: &Scope,
        node: Node,
    ) -> Option<Declaration> {
        let name = parsed.node_text(node.child_by_field_name("name")?).to_string();
        let shape = fn_shape(parsed, node);

        let (kind, receiver, signature) = if node.kind() == "method_declaration" {
            let receiver = node
                .child_by_field_name("receiver")
                .and_then(|r| first_descendant(r, "type_identifier"))
                .map(|n| parsed.node_text(n).to_string());
            let signature = format!("{}.{}", receiver.as_deref().unwrap_or("?"), shape);
            (DeclarationKind::Method, receiver, signature)
        } else {
            let type_params = node
                .child_by_field_name("type_parameters")
                .map(|p| format!("{} ", canonical(parsed, p)))
                .unwrap_or_default();
            (DeclarationKind::Function, None, format!("{}{}", type_params, shape))
        };

        Some(scope.declaration(name, kind, Span::from_node(node), signature, receiver, Vec::new()))
    }

    /// Ordered field shapes of a struct plus its named fields.
    fn struct_shape(&self, parsed: &ParsedFile, struct_node: Node) -> (String, Vec<Member>) {
        let mut shapes = Vec::new();
        let mut members = Vec::new();

        let Some(list) = first_child(struct_node, "field_declaration_list") else {
            return ("struct{}".to_string(), members);
        };

        let mut cursor = list.walk();
        for field in list.named_children(&mut cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }

            let mut name_cursor = field.walk();
            let names: Vec<Node> = field.children_by_field_name("name", &mut name_cursor).collect();

            if names.is_empty() {
                // Embedded field: keep a leading `*` if present, drop the tag.
                let mut parts = Vec::new();
                let mut c = field.walk();
                if c.goto_first_child() {
                    loop {
                        if c.field_name() != Some("tag") {
                            let text = canonical(parsed, c.node());
                            if !text.is_empty() {
                                parts.push(text);
                            }
                        }
                        if !c.goto_next_sibling() {
                            break;
                        }
                    }
                }
                shapes.push(parts.join(" "));
                continue;
            }

            let ty = field
                .child_by_field_name("type")
                .map(|t| canonical(parsed, t))
                .unwrap_or_default();
            for name in names {
                let pos = name.start_position();
                let text = parsed.node_text(name).to_string();
                shapes.push(format!("{} {}", text, ty));
                members.push(Member {
                    name: text,
                    line: pos.row + 1,
                    column: pos.column + 1,
                });
            }
        }

        (format!("struct{{{}}}", shapes.join(";")), members)
    }

    /// Method set of an interface. Element order does not matter.
    fn interface_shape(&self, parsed: &ParsedFile, iface: Node) -> (String, Vec<Member>) {
        let mut shapes = Vec::new();
        let mut members = Vec::new();
        let mut cursor = iface.walk();

        for elem in iface.named_children(&mut cursor) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name_node) = elem.child_by_field_name("name") else {
                        continue;
                    };
                    let name = parsed.node_text(name_node).to_string();
                    shapes.push(format!("{}{}", name, fn_shape(parsed, elem)));
                    let pos = name_node.start_position();
                    members.push(Member {
                        name,
                        line: pos.row + 1,
                        column: pos.column + 1,
                    });
                }
                "comment" => {}
                _ => shapes.push(canonical(parsed, elem)),
            }
        }

        shapes.sort();
        (format!("interface{{{}}}", shapes.join(";")), members)
    }

    /// Extract imports in source order, duplicates included.
    fn extract_imports(&self, parsed: &ParsedFile, scope: &Scope) -> anyhow::Result<Vec<Declaration>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();
        let mut seen_specs = HashSet::new();

        while let Some(m) = matches.next() {
            let mut path_node = None;
            let mut alias = None;
            let mut spec_node = None;

            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                match name {
                    "path" => path_node = Some(capture.node),
                    "alias" => alias = Some(parsed.node_text(capture.node).to_string()),
                    "spec" => spec_node = Some(capture.node),
                    _ => {}
                }
            }

            let (Some(path_node), Some(spec)) = (path_node, spec_node) else {
                continue;
            };
            if !seen_specs.insert(spec.start_byte()) {
                continue;
            }

            let path = parsed
                .node_text(path_node)
                .trim_matches(|c| c == '"' || c == '`')
                .to_string();
            if path.is_empty() {
                continue;
            }

            let parent = spec.parent();
            let grouped = parent.is_some_and(|p| p.kind() == "import_spec_list");
            let decl_node = if grouped { parent.and_then(|p| p.parent()) } else { parent };
            let decl_span = Span::from_node(decl_node.unwrap_or(spec));

            let site = ImportSite {
                path: path.clone(),
                alias,
                path_span: Span::from_node(path_node),
                decl_span,
                grouped,
            };
            let mut decl = scope.declaration(
                site.local_name(),
                DeclarationKind::Import,
                Span::from_node(spec),
                path,
                None,
                Vec::new(),
            );
            decl.import = Some(site);
            imports.push(decl);
        }

        imports.sort_by_key(|d| d.span.start_byte);
        Ok(imports)
    }

    /// Collect qualifier uses, type references and locally scoped type names.
    fn extract_references(&self, parsed: &ParsedFile, facts: &mut FileFacts) {
        let root = parsed.tree.root_node();
        let mut stack = vec![root];
        let mut scoped = HashSet::new();

        while let Some(node) = stack.pop() {
            let mut skip: Option<Node> = None;

            match node.kind() {
                "comment" => continue,
                "selector_expression" => {
                    if let Some(op) = node.child_by_field_name("operand") {
                        if op.kind() == "identifier" {
                            facts.qualifiers.push(reference(parsed, op));
                        }
                    }
                }
                "qualified_type" => {
                    if let Some(pkg) = node.child_by_field_name("package") {
                        facts.qualified_types.push(reference(parsed, pkg));
                    }
                    // The type name belongs to the other package.
                    continue;
                }
                "type_identifier" => {
                    facts.type_refs.push(reference(parsed, node));
                    continue;
                }
                "type_spec" | "type_alias" => {
                    skip = node.child_by_field_name("name");
                    let top_level = node
                        .parent()
                        .and_then(|p| p.parent())
                        .is_some_and(|gp| gp.kind() == "source_file");
                    if !top_level {
                        if let Some(name) = skip {
                            scoped.insert(parsed.node_text(name).to_string());
                        }
                    }
                }
                "type_parameter_declaration" => {
                    let mut c = node.walk();
                    for name in node.children_by_field_name("name", &mut c) {
                        scoped.insert(parsed.node_text(name).to_string());
                    }
                }
                "method_declaration" => {
                    // Receiver type arguments (`func (l *List[T])`) bind type parameters.
                    skip = node.child_by_field_name("receiver");
                    if let Some(receiver) = skip {
                        for args in descendants(receiver, "type_arguments") {
                            for ident in descendants(args, "type_identifier") {
                                scoped.insert(parsed.node_text(ident).to_string());
                            }
                        }
                    }
                }
                _ => {}
            }

            let mut cursor = node.walk();
            let children: Vec<Node> = node
                .children(&mut cursor)
                .filter(|c| skip.map_or(true, |s| s.id() != c.id()))
                .collect();
            stack.extend(children.into_iter().rev());
        }

        let mut scoped: Vec<String> = scoped.into_iter().collect();
        scoped.sort();
        facts.type_params = scoped;
    }
}

impl Default for GoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for GoAnalyzer {
    fn language_id(&self) -> &'static str {
        "go"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Go source: {}", path.display()))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn extract_facts(&self, parsed: &ParsedFile, dir: &str) -> anyhow::Result<FileFacts> {
        let package = self.extract_package(parsed);
        let scope = Scope {
            file: parsed.path.clone(),
            package: package.clone().unwrap_or_default(),
            namespace: namespace(dir, package.as_deref().unwrap_or("")),
        };

        let mut declarations = self.extract_imports(parsed, &scope)?;
        declarations.extend(self.extract_declarations(parsed, &scope));
        declarations.sort_by_key(|d| d.span.start_byte);

        let mut facts = FileFacts::empty(&parsed.path);
        facts.package = package;
        facts.declarations = declarations;
        self.extract_references(parsed, &mut facts);

        Ok(facts)
    }
}

/// Namespace key: directory relative to the root plus package name.
pub fn namespace(dir: &str, package: &str) -> String {
    let dir = if dir.is_empty() { "." } else { dir };
    format!("{}:{}", dir, package)
}

/// File-level context shared by every declaration of one file.
struct Scope {
    file: String,
    package: String,
    namespace: String,
}

impl Scope {
    fn declaration(
        &self,
        name: String,
        kind: DeclarationKind,
        span: Span,
        signature: String,
        receiver: Option<String>,
        members: Vec<Member>,
    ) -> Declaration {
        Declaration {
            name,
            kind,
            file: self.file.clone(),
            package: self.package.clone(),
            namespace: self.namespace.clone(),
            span,
            signature,
            receiver,
            members,
            import: None,
        }
    }
}

fn reference(parsed: &ParsedFile, node: Node) -> Reference {
    let pos = node.start_position();
    Reference {
        name: parsed.node_text(node).to_string(),
        line: pos.row + 1,
        column: pos.column + 1,
    }
}

/// Token sequence of a subtree with comments and separators dropped.
///
/// Two declarations that differ only in whitespace, comments or line
/// breaks produce the same string.
fn canonical(parsed: &ParsedFile, node: Node) -> String {
    let mut tokens = Vec::new();
    collect_tokens(parsed, node, &mut tokens);
    tokens.join(" ")
}

fn collect_tokens<'a>(parsed: &'a ParsedFile, node: Node, out: &mut Vec<&'a str>) {
    match node.kind() {
        "comment" => {}
        "interpreted_string_literal" | "raw_string_literal" | "rune_literal" => {
            out.push(parsed.node_text(node));
        }
        _ if node.child_count() == 0 => {
            let text = parsed.node_text(node).trim();
            if !text.is_empty() && text != ";" {
                out.push(text);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_tokens(parsed, child, out);
            }
        }
    }
}

/// Parameter types of a `parameter_list`, names dropped.
fn param_shape(parsed: &ParsedFile, list: Node) -> String {
    let mut parts = Vec::new();
    let mut cursor = list.walk();

    for param in list.named_children(&mut cursor) {
        match param.kind() {
            "parameter_declaration" => {
                let ty = param
                    .child_by_field_name("type")
                    .map(|t| canonical(parsed, t))
                    .unwrap_or_default();
                let mut c = param.walk();
                let count = param.children_by_field_name("name", &mut c).count().max(1);
                for _ in 0..count {
                    parts.push(ty.clone());
                }
            }
            "variadic_parameter_declaration" => {
                let ty = param
                    .child_by_field_name("type")
                    .map(|t| canonical(parsed, t))
                    .unwrap_or_default();
                parts.push(format!("...{}", ty));
            }
            "comment" => {}
            _ => parts.push(canonical(parsed, param)),
        }
    }

    format!("({})", parts.join(","))
}

/// `(params)(results)` of a function, method or interface method.
fn fn_shape(parsed: &ParsedFile, node: Node) -> String {
    let params = node
        .child_by_field_name("parameters")
        .map(|p| param_shape(parsed, p))
        .unwrap_or_else(|| "()".to_string());
    let result = match node.child_by_field_name("result") {
        Some(r) if r.kind() == "parameter_list" => param_shape(parsed, r),
        Some(r) => format!("({})", canonical(parsed, r)),
        None => "()".to_string(),
    };
    format!("{}{}", params, result)
}

fn first_child<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|n| n.kind() == kind);
    found
}

fn first_descendant<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    descendants(node, kind).into_iter().next()
}

/// All descendants of `kind` in document order.
fn descendants<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == kind {
            found.push(n);
        }
        let mut cursor = n.walk();
        let children: Vec<Node> = n.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts_for(source: &str) -> FileFacts {
        let analyzer = GoAnalyzer::new();
        let parsed = analyzer
            .parse(Path::new("test.go"), source.as_bytes())
            .unwrap();
        analyzer.extract_facts(&parsed, "").unwrap()
    }

    #[test]
    fn test_extract_package() {
        let analyzer = GoAnalyzer::new();
        let parsed = analyzer.parse(Path::new("test.go"), b"package main\n").unwrap();
        assert_eq!(analyzer.extract_package(&parsed), Some("main".to_string()));
    }

    #[test]
    fn test_extract_types() {
        let source = r#"
package models

type User struct {
    ID   int
    Name string `json:"name"`
}

type Store interface {
    Get(id int) (*User, error)
}

type UserID = int

type Names []string
"#;
        let facts = facts_for(source);
        let user = facts.find_declaration("User").unwrap();
        assert_eq!(user.kind, DeclarationKind::Struct);
        assert_eq!(user.signature, "struct{ID int;Name string}");
        assert_eq!(user.members.len(), 2);
        assert_eq!(user.namespace, ".:models");
        assert_eq!(user.line(), 4);

        let store = facts.find_declaration("Store").unwrap();
        assert_eq!(store.kind, DeclarationKind::Interface);
        assert_eq!(store.signature, "interface{Get(int)(* User,error)}");

        assert_eq!(facts.find_declaration("UserID").unwrap().signature, "= int");
        assert_eq!(facts.find_declaration("Names").unwrap().signature, "type [ ] string");
    }

    #[test]
    fn test_signature_ignores_formatting() {
        let compact = facts_for("package a\ntype User struct { ID int; Name string }\n");
        let spread = facts_for(
            "package a\n\n// User is a user.\ntype User struct {\n\tID   int // key\n\n\tName   string\n}\n",
        );
        assert_eq!(
            compact.find_declaration("User").unwrap().signature,
            spread.find_declaration("User").unwrap().signature
        );
    }

    #[test]
    fn test_signature_distinguishes_shapes() {
        let a = facts_for("package a\ntype User struct { ID int }\n");
        let b = facts_for("package a\ntype User struct { ID string }\n");
        assert_ne!(
            a.find_declaration("User").unwrap().signature,
            b.find_declaration("User").unwrap().signature
        );
    }

    #[test]
    fn test_extract_functions_and_methods() {
        let source = r#"
package main

func helper(a, b int) (int, error) {
    return a + b, nil
}

func (c *Config) Validate() error {
    return nil
}
"#;
        let facts = facts_for(source);
        let helper = facts.find_declaration("helper").unwrap();
        assert_eq!(helper.kind, DeclarationKind::Function);
        assert_eq!(helper.signature, "(int,int)(int,error)");

        let validate = facts.find_declaration("Validate").unwrap();
        assert_eq!(validate.kind, DeclarationKind::Method);
        assert_eq!(validate.receiver, Some("Config".to_string()));
    }

    #[test]
    fn test_extract_imports_keeps_duplicates() {
        let source = r#"
package main

import (
    "fmt"
    "pkg/fmt"
    "pkg/fmt"
    log "github.com/sirupsen/logrus"
    _ "embed"
)

import "os"
"#;
        let facts = facts_for(source);
        let imports: Vec<_> = facts.imports().collect();
        assert_eq!(imports.len(), 6);

        let paths: Vec<&str> = imports.iter().map(|d| d.signature.as_str()).collect();
        assert_eq!(
            paths,
            vec!["fmt", "pkg/fmt", "pkg/fmt", "github.com/sirupsen/logrus", "embed", "os"]
        );

        let logrus = imports[3].import.as_ref().unwrap();
        assert_eq!(logrus.alias.as_deref(), Some("log"));
        assert_eq!(imports[3].name, "log");
        assert!(logrus.grouped);

        let os = imports[5].import.as_ref().unwrap();
        assert!(!os.grouped);
        assert_eq!(imports[5].line(), 12);
        assert_eq!(os.decl_span.start_line, 12);
    }

    #[test]
    fn test_extract_references() {
        let source = r#"
package main

import (
    "fmt"
    "net/http"
)

type Box[T any] struct {
    Item T
}

func handle(w http.ResponseWriter, r *http.Request) Response {
    type local struct{}
    var _ local
    fmt.Println(r.URL)
    return Response{}
}
"#;
        let facts = facts_for(source);
        assert!(facts.uses_qualifier("fmt"));
        assert!(facts.uses_qualifier("http"));
        assert!(!facts.uses_qualifier("os"));

        let refs: Vec<&str> = facts.type_refs.iter().map(|r| r.name.as_str()).collect();
        assert!(refs.contains(&"Response"));
        assert!(refs.contains(&"T"));
        assert!(!refs.contains(&"Box"));
        assert!(!refs.contains(&"ResponseWriter"));
        assert!(facts.type_params.contains(&"T".to_string()));
        assert!(facts.type_params.contains(&"local".to_string()));
    }

    #[test]
    fn test_namespace_key() {
        assert_eq!(namespace("", "main"), ".:main");
        assert_eq!(namespace("internal/db", "db"), "internal/db:db");
    }
}
