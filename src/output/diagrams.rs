// Diagram generation
//
// A `DiagramModel` is built once from a finished module tree and is then
// only read. Generators turn a scope of that model (a module and its
// descendants) into a Mermaid graph block plus click-link targets.

use crate::analysis::{ModuleId, ModuleStats, ModuleTree};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as EdgeDirection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Kinds of diagram a run can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramKind {
    ClassGraph,
    ComponentTree,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 2] = [DiagramKind::ClassGraph, DiagramKind::ComponentTree];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace('-', "_").as_str() {
            "class_graph" | "classes" | "class" => Some(Self::ClassGraph),
            "component_tree" | "components" | "component" => Some(Self::ComponentTree),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ClassGraph => "class_graph",
            Self::ComponentTree => "component_tree",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::ClassGraph => "Class graph",
            Self::ComponentTree => "Component tree",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mermaid layout direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    TB,
    LR,
    BT,
    RL,
}

impl Direction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "TB" | "TD" => Some(Self::TB),
            "LR" => Some(Self::LR),
            "BT" => Some(Self::BT),
            "RL" => Some(Self::RL),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TB => "TB",
            Self::LR => "LR",
            Self::BT => "BT",
            Self::RL => "RL",
        };
        f.write_str(s)
    }
}

/// Hands out diagram node ids in traversal order.
///
/// Module ids come from one counter (`m0`, `m1`, ...). Class ids are scoped
/// to their module and file (`c<module>_<file>_<n>`), so appending a class to
/// the end of a file never renumbers any existing node.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_module: usize,
    class_counters: HashMap<(usize, usize), usize>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next module id; returns the ordinal and the rendered id
    pub fn module(&mut self) -> (usize, String) {
        let ordinal = self.next_module;
        self.next_module += 1;
        (ordinal, format!("m{}", ordinal))
    }

    /// Next class id within a module ordinal and file ordinal
    pub fn class(&mut self, module: usize, file: usize) -> String {
        let counter = self.class_counters.entry((module, file)).or_insert(0);
        let id = format!("c{}_{}_{}", module, file, counter);
        *counter += 1;
        id
    }
}

/// Payload of a diagram node
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramNodeKind {
    Module {
        module: ModuleId,
        path: String,
        stats: ModuleStats,
        /// Documentation file for the module, relative to the output root
        doc_path: Option<PathBuf>,
    },
    Class {
        name: String,
        loc: usize,
        method_count: usize,
        anchor: String,
        doc_path: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNode {
    /// Stable identifier used in the rendered graph
    pub id: String,
    pub kind: DiagramNodeKind,
}

/// Containment edge kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    ChildModule,
    Class,
}

/// Node and edge sets derived from a module tree
#[derive(Debug)]
pub struct DiagramModel {
    graph: DiGraph<DiagramNode, Containment>,
    modules: HashMap<ModuleId, NodeIndex>,
    root: NodeIndex,
}

impl DiagramModel {
    /// Build the model. `module_file` is the per-module document name; every
    /// module with classes gets its document at `<module dir>/<module_file>`.
    pub fn build(tree: &ModuleTree, module_file: &str, ids: &mut IdAllocator) -> Self {
        let mut graph = DiGraph::new();
        let mut modules = HashMap::new();
        let mut ordinals = HashMap::new();

        let order = tree.subtree(tree.root().id);

        // All module ids first, so class additions never shift them
        for &module_id in &order {
            let module = tree.get(module_id);
            let (ordinal, id) = ids.module();
            let doc_path = module
                .has_content()
                .then(|| module.relative_dir().join(module_file));
            let ix = graph.add_node(DiagramNode {
                id,
                kind: DiagramNodeKind::Module {
                    module: module_id,
                    path: module.display_name().to_string(),
                    stats: module.stats,
                    doc_path,
                },
            });
            if let Some(parent) = module.parent.and_then(|p| modules.get(&p)) {
                graph.add_edge(*parent, ix, Containment::ChildModule);
            }
            modules.insert(module_id, ix);
            ordinals.insert(module_id, ordinal);
        }

        for &module_id in &order {
            let module = tree.get(module_id);
            let module_ix = modules[&module_id];
            let ordinal = ordinals[&module_id];
            let doc_path = module.relative_dir().join(module_file);

            let mut file_ordinal = 0;
            let mut current_file: Option<&Path> = None;
            for class in &module.classes {
                match current_file {
                    Some(f) if f == class.file.as_path() => {}
                    Some(_) => {
                        file_ordinal += 1;
                        current_file = Some(&class.file);
                    }
                    None => current_file = Some(&class.file),
                }
                let ix = graph.add_node(DiagramNode {
                    id: ids.class(ordinal, file_ordinal),
                    kind: DiagramNodeKind::Class {
                        name: class.name.clone(),
                        loc: class.loc,
                        method_count: class.method_count,
                        anchor: class.anchor(),
                        doc_path: doc_path.clone(),
                    },
                });
                graph.add_edge(module_ix, ix, Containment::Class);
            }
        }

        let root = modules[&tree.root().id];
        Self {
            graph,
            modules,
            root,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, ix: NodeIndex) -> &DiagramNode {
        &self.graph[ix]
    }

    pub fn module_node(&self, module: ModuleId) -> Option<NodeIndex> {
        self.modules.get(&module).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Targets of `ix` along edges of one kind, in insertion order
    pub fn contained(&self, ix: NodeIndex, kind: Containment) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges_directed(ix, EdgeDirection::Outgoing)
            .filter(|e| *e.weight() == kind)
            .map(|e| e.target())
            .collect();
        out.sort();
        out
    }

    /// Node ids in allocation order
    pub fn ids(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|ix| self.graph[ix].id.as_str())
            .collect()
    }

    fn has_content(&self, ix: NodeIndex) -> bool {
        match &self.graph[ix].kind {
            DiagramNodeKind::Module { stats, .. } => stats.class_count > 0,
            DiagramNodeKind::Class { .. } => true,
        }
    }
}

/// Options for one generator invocation
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub direction: Direction,
    /// Where the embedding document will live, relative to the output root
    pub artifact_path: PathBuf,
}

impl GeneratorOptions {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            direction: Direction::default(),
            artifact_path: artifact_path.into(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    fn link_to(&self, target: &Path, anchor: Option<&str>) -> String {
        let from_dir = self.artifact_path.parent().unwrap_or_else(|| Path::new(""));
        let mut link = relative_link(from_dir, target);
        if let Some(a) = anchor {
            link.push('#');
            link.push_str(a);
        }
        link
    }
}

/// One generated diagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Output path relative to the output root
    pub path: PathBuf,
    pub kind: DiagramKind,
    /// Mermaid source
    pub diagram: String,
    /// Node id to navigation link
    pub links: BTreeMap<String, String>,
}

/// Turns a scope of a [`DiagramModel`] into one diagram
pub trait Generator: Send + Sync {
    fn kind(&self) -> DiagramKind;
    fn generate(
        &self,
        model: &DiagramModel,
        scope: ModuleId,
        options: &GeneratorOptions,
    ) -> GeneratedArtifact;
}

/// Generator for a diagram kind
pub fn generator_for(kind: DiagramKind) -> Box<dyn Generator> {
    match kind {
        DiagramKind::ClassGraph => Box::new(ClassGraphGenerator),
        DiagramKind::ComponentTree => Box::new(ComponentTreeGenerator),
    }
}

/// Nested subgraph per module with its classes inside
pub struct ClassGraphGenerator;

impl Generator for ClassGraphGenerator {
    fn kind(&self) -> DiagramKind {
        DiagramKind::ClassGraph
    }

    fn generate(
        &self,
        model: &DiagramModel,
        scope: ModuleId,
        options: &GeneratorOptions,
    ) -> GeneratedArtifact {
        let mut lines = vec![format!("graph {}", options.direction)];
        let mut clicks = Vec::new();
        let mut links = BTreeMap::new();

        if let Some(start) = model.module_node(scope) {
            emit_subgraph(model, start, 1, options, &mut lines, &mut clicks, &mut links);
        }

        lines.extend(clicks);
        GeneratedArtifact {
            path: options.artifact_path.clone(),
            kind: self.kind(),
            diagram: lines.join("\n"),
            links,
        }
    }
}

fn emit_subgraph(
    model: &DiagramModel,
    ix: NodeIndex,
    depth: usize,
    options: &GeneratorOptions,
    lines: &mut Vec<String>,
    clicks: &mut Vec<String>,
    links: &mut BTreeMap<String, String>,
) {
    let node = model.node(ix);
    let DiagramNodeKind::Module { path, stats, .. } = &node.kind else {
        return;
    };
    let indent = "    ".repeat(depth);

    lines.push(format!(
        "{}subgraph {}[\"{}<br/>{}\"]",
        indent,
        node.id,
        escape_label(path),
        stats_label(stats)
    ));

    for class_ix in model.contained(ix, Containment::Class) {
        let class = model.node(class_ix);
        if let DiagramNodeKind::Class {
            name,
            loc,
            method_count,
            anchor,
            doc_path,
        } = &class.kind
        {
            lines.push(format!(
                "{}    {}[\"{}<br/>{}\"]",
                indent,
                class.id,
                escape_label(name),
                pluralize(*loc, "line", "lines")
            ));
            let link = options.link_to(doc_path, Some(anchor));
            clicks.push(format!(
                "    click {} \"{}\" \"{}: {}, {}\"",
                class.id,
                link,
                escape_label(name),
                pluralize(*loc, "line", "lines"),
                pluralize(*method_count, "method", "methods")
            ));
            links.insert(class.id.clone(), link);
        }
    }

    for child in model.contained(ix, Containment::ChildModule) {
        if model.has_content(child) {
            emit_subgraph(model, child, depth + 1, options, lines, clicks, links);
        }
    }

    lines.push(format!("{}end", indent));
}

/// One node per module, parent/child edges only
pub struct ComponentTreeGenerator;

impl Generator for ComponentTreeGenerator {
    fn kind(&self) -> DiagramKind {
        DiagramKind::ComponentTree
    }

    fn generate(
        &self,
        model: &DiagramModel,
        scope: ModuleId,
        options: &GeneratorOptions,
    ) -> GeneratedArtifact {
        let mut lines = vec![format!("graph {}", options.direction)];
        let mut edges = Vec::new();
        let mut clicks = Vec::new();
        let mut links = BTreeMap::new();

        let mut stack: Vec<NodeIndex> = model.module_node(scope).into_iter().collect();
        while let Some(ix) = stack.pop() {
            let node = model.node(ix);
            let DiagramNodeKind::Module {
                path,
                stats,
                doc_path,
                ..
            } = &node.kind
            else {
                continue;
            };

            lines.push(format!(
                "    {}[\"{}<br/>{}\"]",
                node.id,
                escape_label(path),
                stats_label(stats)
            ));

            if let Some(doc) = doc_path {
                let link = options.link_to(doc, None);
                clicks.push(format!(
                    "    click {} \"{}\" \"{}: {}\"",
                    node.id,
                    link,
                    escape_label(path),
                    stats_label(stats)
                ));
                links.insert(node.id.clone(), link);
            }

            let children: Vec<NodeIndex> = model
                .contained(ix, Containment::ChildModule)
                .into_iter()
                .filter(|&c| model.has_content(c))
                .collect();
            for &child in &children {
                edges.push(format!("    {} --> {}", node.id, model.node(child).id));
            }
            stack.extend(children.into_iter().rev());
        }

        lines.extend(edges);
        lines.extend(clicks);
        GeneratedArtifact {
            path: options.artifact_path.clone(),
            kind: self.kind(),
            diagram: lines.join("\n"),
            links,
        }
    }
}

fn stats_label(stats: &ModuleStats) -> String {
    format!(
        "{} | {}",
        pluralize(stats.class_count, "class", "classes"),
        pluralize(stats.total_loc, "line", "lines")
    )
}

pub(crate) fn pluralize(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else {
        format!("{} {}", n, plural)
    }
}

/// Mermaid labels are double-quoted; quotes and angle brackets use entity codes
fn escape_label(s: &str) -> String {
    s.replace('"', "#quot;")
        .replace('<', "#lt;")
        .replace('>', "#gt;")
}

/// `/`-separated link from a directory to a file, both relative to the same root
pub fn relative_link(from_dir: &Path, target: &Path) -> String {
    fn parts(p: &Path) -> Vec<String> {
        p.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect()
    }

    let from = parts(from_dir);
    let to = parts(target);
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = vec!["..".to_string(); from.len() - common];
    segments.extend(to[common..].iter().cloned());
    segments.join("/")
}
