//! Per-run symbol table.

use std::collections::BTreeMap;

use crate::analysis::{Declaration, DeclarationKind};

/// Name to declarations, each list in discovery order.
///
/// Entries sharing a name are not assumed equal; callers compare
/// signatures to decide equivalence.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    entries: BTreeMap<String, Vec<Declaration>>,
    len: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declaration under its name.
    pub fn insert(&mut self, decl: Declaration) {
        self.entries.entry(decl.name.clone()).or_default().push(decl);
        self.len += 1;
    }

    /// All declarations with this name, in discovery order.
    pub fn get(&self, name: &str) -> &[Declaration] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declarations with this name, optionally restricted to one kind.
    pub fn find(&self, name: &str, kind: Option<DeclarationKind>) -> Vec<&Declaration> {
        self.get(name)
            .iter()
            .filter(|d| kind.map_or(true, |k| d.kind == k))
            .collect()
    }

    /// Whether any declaration of `name` lives in `namespace`.
    pub fn declared_in(&self, name: &str, namespace: &str) -> bool {
        self.get(name)
            .iter()
            .any(|d| d.namespace == namespace && d.kind != DeclarationKind::Import)
    }

    /// Names in sorted order with their declarations.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Declaration])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Total number of declarations.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<Declaration> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = Declaration>>(iter: I) -> Self {
        let mut table = SymbolTable::new();
        for decl in iter {
            table.insert(decl);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Span;

    fn decl(name: &str, file: &str, namespace: &str, kind: DeclarationKind) -> Declaration {
        Declaration {
            name: name.to_string(),
            kind,
            file: file.to_string(),
            package: "models".to_string(),
            namespace: namespace.to_string(),
            span: Span {
                start_byte: 0,
                end_byte: 1,
                start_line: 1,
                start_col: 1,
                end_line: 1,
                end_col: 2,
            },
            signature: "struct{}".to_string(),
            receiver: None,
            members: Vec::new(),
            import: None,
        }
    }

    #[test]
    fn test_discovery_order_is_kept() {
        let table: SymbolTable = vec![
            decl("User", "b.go", "b:models", DeclarationKind::Struct),
            decl("Order", "a.go", "a:models", DeclarationKind::Struct),
            decl("User", "a.go", "a:models", DeclarationKind::Struct),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.len(), 3);
        let users: Vec<&str> = table.get("User").iter().map(|d| d.file.as_str()).collect();
        assert_eq!(users, vec!["b.go", "a.go"]);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Order", "User"]);
    }

    #[test]
    fn test_find_and_declared_in() {
        let mut table = SymbolTable::new();
        table.insert(decl("fmt", "a.go", "a:models", DeclarationKind::Import));
        table.insert(decl("User", "a.go", "a:models", DeclarationKind::Struct));

        assert_eq!(table.find("User", Some(DeclarationKind::Struct)).len(), 1);
        assert!(table.find("User", Some(DeclarationKind::Interface)).is_empty());
        assert!(table.declared_in("User", "a:models"));
        assert!(!table.declared_in("fmt", "a:models"));
        assert!(table.get("Missing").is_empty());
    }
}
