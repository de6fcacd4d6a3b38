//! Package dependency graph and import cycles.
//!
//! Packages are directories. Imports are classified against `go.mod`:
//! standard library, packages of this module, and everything else. Only
//! edges between packages of this module can form a cycle.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::{SourceSet, Span};
use crate::config::Config;
use crate::operation::Detector;

use super::{sort_findings, Finding, FindingKind, Location, Severity};

/// The parts of a `go.mod` the graph needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoModule {
    /// Module path (e.g., "github.com/acme/shop")
    pub path: String,
    /// Required modules: module path → version
    pub requires: BTreeMap<String, String>,
}

impl GoModule {
    /// Find the nearest `go.mod` at or above `start` (a directory or a file).
    ///
    /// Returns the module root alongside the parsed module. A `go.mod` that
    /// does not parse ends the search.
    pub fn discover(start: &Path) -> Option<(PathBuf, Self)> {
        let start = fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
        let first = if start.is_file() {
            start.parent()?
        } else {
            start.as_path()
        };

        for dir in first.ancestors() {
            let manifest = dir.join("go.mod");
            if !manifest.is_file() {
                continue;
            }
            let content = match fs::read_to_string(&manifest) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("cannot read {}: {}", manifest.display(), e);
                    return None;
                }
            };
            return match Self::parse(&content) {
                Ok(module) => Some((dir.to_path_buf(), module)),
                Err(e) => {
                    tracing::warn!("ignoring {}: {}", manifest.display(), e);
                    None
                }
            };
        }
        None
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut module = GoModule::default();
        let mut in_require_block = false;

        for line in content.lines() {
            let line = line.split("//").next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            if let Some(path) = line.strip_prefix("module ") {
                module.path = path.trim().trim_matches('"').to_string();
                continue;
            }
            if line == "require (" {
                in_require_block = true;
                continue;
            }
            if line == ")" {
                in_require_block = false;
                continue;
            }

            let entry = match line.strip_prefix("require ") {
                Some(rest) => Some(rest),
                None if in_require_block => Some(line),
                None => None,
            };
            if let Some(entry) = entry {
                let mut parts = entry.split_whitespace();
                if let Some(path) = parts.next() {
                    let version = parts.next().unwrap_or("").to_string();
                    module.requires.insert(path.to_string(), version);
                }
            }
        }

        if module.path.is_empty() {
            anyhow::bail!("no module declaration found");
        }
        Ok(module)
    }

    /// Directory of a package inside this module, `.` for the module root.
    pub fn local_dir(&self, import_path: &str) -> Option<String> {
        if import_path == self.path {
            return Some(".".to_string());
        }
        import_path
            .strip_prefix(&self.path)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
    }
}

/// Standard library paths have no dot in their first element.
pub fn is_stdlib(import_path: &str) -> bool {
    let first = import_path.split('/').next().unwrap_or("");
    !first.contains('.')
}

/// Imports of one package, classified.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageNode {
    pub files: usize,
    pub stdlib: BTreeSet<String>,
    /// Directories of this module's packages.
    pub local: BTreeSet<String>,
    pub external: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyGraph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Package directory → imports.
    pub packages: BTreeMap<String, PackageNode>,
    /// Each cycle as a directory path that returns to its start.
    pub cycles: Vec<Vec<String>>,
}

/// Where a local import edge was written, for reporting.
#[derive(Debug, Clone)]
struct EdgeSite {
    file: String,
    span: Span,
}

struct Built {
    graph: DependencyGraph,
    sites: HashMap<(String, String), EdgeSite>,
}

/// Detector behind the `dependency-graph` operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencyCycles;

impl Detector for DependencyCycles {
    fn id(&self) -> &'static str {
        "dependency-graph"
    }

    fn description(&self) -> &'static str {
        "Builds the package import graph and reports import cycles between local packages"
    }

    fn detect(&self, sources: &SourceSet, _config: &Config) -> Vec<Finding> {
        detect_dependency_cycles(sources)
    }

    fn detect_with_graph(
        &self,
        sources: &SourceSet,
        _config: &Config,
    ) -> (Vec<Finding>, Option<DependencyGraph>) {
        let built = build(sources);
        let findings = cycle_findings(&built);
        (findings, Some(built.graph))
    }
}

pub fn build_dependency_graph(sources: &SourceSet) -> DependencyGraph {
    build(sources).graph
}

pub fn detect_dependency_cycles(sources: &SourceSet) -> Vec<Finding> {
    cycle_findings(&build(sources))
}

fn cycle_findings(built: &Built) -> Vec<Finding> {
    let mut findings = Vec::new();

    for cycle in &built.graph.cycles {
        let locations: Vec<Location> = cycle
            .windows(2)
            .filter_map(|pair| built.sites.get(&(pair[0].clone(), pair[1].clone())))
            .map(|site| Location::new(site.file.clone(), site.span.start_line))
            .collect();
        let Some(primary) = locations.first().cloned() else {
            continue;
        };
        let path = cycle.join(" -> ");
        findings.push(
            Finding::new(
                FindingKind::DependencyCycle,
                Severity::High,
                primary.file,
                primary.line,
                format!("packages import each other in a cycle: {}", path),
            )
            .with_name(path)
            .with_suggestion("move the shared declarations into a package both can import")
            .with_locations(locations),
        );
    }

    sort_findings(&mut findings);
    findings
}

fn build(sources: &SourceSet) -> Built {
    let discovered = GoModule::discover(&sources.root);
    let prefix = discovered
        .as_ref()
        .map(|(root, _)| target_prefix(&sources.root, root))
        .unwrap_or_default();
    let module = discovered.map(|(_, module)| module);

    let mut graph = DependencyGraph {
        module: module.as_ref().map(|m| m.path.clone()),
        ..Default::default()
    };
    let mut sites = HashMap::new();

    for (file, facts) in sources.parsed() {
        let dir = package_dir(&prefix, &file.rel_path);
        let node = graph.packages.entry(dir.clone()).or_default();
        node.files += 1;

        for site in facts.imports().filter_map(|d| d.import.as_ref()) {
            let local = module.as_ref().and_then(|m| m.local_dir(&site.path));
            match local {
                Some(target) => {
                    sites
                        .entry((dir.clone(), target.clone()))
                        .or_insert_with(|| EdgeSite {
                            file: file.rel_path.clone(),
                            span: site.path_span.clone(),
                        });
                    node.local.insert(target);
                }
                None if is_stdlib(&site.path) => {
                    node.stdlib.insert(site.path.clone());
                }
                None => {
                    node.external.insert(site.path.clone());
                }
            }
        }
    }

    graph.cycles = find_cycles(&graph.packages);
    Built { graph, sites }
}

/// Directory of the walk target relative to the module root, `/`-separated
/// and empty at the root itself.
fn target_prefix(target: &Path, module_root: &Path) -> String {
    let target = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
    let dir = if target.is_file() {
        target.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        target
    };
    dir.strip_prefix(module_root)
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

/// Package key of a file: its directory under the module root, `.` for the
/// root itself.
fn package_dir(prefix: &str, rel_path: &str) -> String {
    let parent = Path::new(rel_path)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    let dir = match (prefix.is_empty(), parent.is_empty()) {
        (true, _) => parent,
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, parent),
    };
    if dir.is_empty() {
        ".".to_string()
    } else {
        dir
    }
}

/// One cycle per strongly connected component of local edges, starting at
/// the component's smallest directory.
fn find_cycles(packages: &BTreeMap<String, PackageNode>) -> Vec<Vec<String>> {
    let edges: BTreeMap<&str, Vec<&str>> = packages
        .iter()
        .map(|(dir, node)| {
            let targets: Vec<&str> = node
                .local
                .iter()
                .map(String::as_str)
                .filter(|t| packages.contains_key(*t))
                .collect();
            (dir.as_str(), targets)
        })
        .collect();

    let mut cycles = Vec::new();
    for component in strongly_connected(&edges) {
        let Some(start) = component.iter().min().copied() else {
            continue;
        };
        let is_cycle = component.len() > 1 || edges[start].contains(&start);
        if !is_cycle {
            continue;
        }
        let members: BTreeSet<&str> = component.iter().copied().collect();
        if let Some(path) = shortest_return(&edges, &members, start) {
            cycles.push(path.into_iter().map(str::to_string).collect());
        }
    }
    cycles.sort();
    cycles
}

/// Tarjan's algorithm.
fn strongly_connected<'a>(edges: &BTreeMap<&'a str, Vec<&'a str>>) -> Vec<Vec<&'a str>> {
    struct State<'a> {
        index: usize,
        indices: HashMap<&'a str, usize>,
        low: HashMap<&'a str, usize>,
        stack: Vec<&'a str>,
        on_stack: BTreeSet<&'a str>,
        components: Vec<Vec<&'a str>>,
    }

    fn visit<'a>(v: &'a str, edges: &BTreeMap<&'a str, Vec<&'a str>>, s: &mut State<'a>) {
        s.indices.insert(v, s.index);
        s.low.insert(v, s.index);
        s.index += 1;
        s.stack.push(v);
        s.on_stack.insert(v);

        for &w in edges.get(v).map(Vec::as_slice).unwrap_or(&[]) {
            if !s.indices.contains_key(w) {
                visit(w, edges, s);
                let low = s.low[v].min(s.low[w]);
                s.low.insert(v, low);
            } else if s.on_stack.contains(w) {
                let low = s.low[v].min(s.indices[w]);
                s.low.insert(v, low);
            }
        }

        if s.low[v] == s.indices[v] {
            let mut component = Vec::new();
            while let Some(w) = s.stack.pop() {
                s.on_stack.remove(w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            s.components.push(component);
        }
    }

    let mut state = State {
        index: 0,
        indices: HashMap::new(),
        low: HashMap::new(),
        stack: Vec::new(),
        on_stack: BTreeSet::new(),
        components: Vec::new(),
    };
    for &v in edges.keys() {
        if !state.indices.contains_key(v) {
            visit(v, edges, &mut state);
        }
    }
    state.components
}

/// Shortest path from `start` back to itself inside `members`.
fn shortest_return<'a>(
    edges: &BTreeMap<&'a str, Vec<&'a str>>,
    members: &BTreeSet<&'a str>,
    start: &'a str,
) -> Option<Vec<&'a str>> {
    let mut previous: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(v) = queue.pop_front() {
        for &w in &edges[v] {
            if !members.contains(w) {
                continue;
            }
            if w == start {
                let mut back = Vec::new();
                let mut cur = v;
                while cur != start {
                    back.push(cur);
                    cur = previous[cur];
                }
                back.reverse();
                let mut path = vec![start];
                path.extend(back);
                path.push(start);
                return Some(path);
            }
            if !previous.contains_key(w) && w != start {
                previous.insert(w, v);
                queue.push_back(w);
            }
        }
    }
    None
}
