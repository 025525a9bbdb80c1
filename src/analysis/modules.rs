// Module aggregation
//
// Groups classes by the directory of their owning file into a tree that
// mirrors the filesystem, then rolls statistics up from the leaves. Nodes
// live in an arena ordered by their normalized path components, which is a
// pre-order walk with lexicographically sorted children: every parent sits
// before its descendants, so one reverse pass over the arena is enough to
// compute rollups.

use crate::parser::{ClassEntity, SourceFile, Warning};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

/// Index of a module in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub usize);

/// Whether a directory is a package (has an entry-point file) or a plain directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Package,
    #[default]
    Directory,
}

impl ModuleKind {
    /// File names that mark their directory as a package
    pub fn is_package_marker(file_name: &str) -> bool {
        matches!(
            file_name,
            "__init__.py"
                | "index.js"
                | "index.jsx"
                | "index.mjs"
                | "index.cjs"
                | "index.ts"
                | "index.tsx"
        )
    }
}

/// Rolled-up statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleStats {
    pub class_count: usize,
    pub total_loc: usize,
    pub method_count: usize,
}

impl ModuleStats {
    pub fn of_classes(classes: &[ClassEntity]) -> Self {
        Self {
            class_count: classes.len(),
            total_loc: classes.iter().map(|c| c.loc).sum(),
            method_count: classes.iter().map(|c| c.method_count).sum(),
        }
    }

    pub fn add(&mut self, other: &ModuleStats) {
        self.class_count += other.class_count;
        self.total_loc += other.total_loc;
        self.method_count += other.method_count;
    }

    pub fn avg_loc(&self) -> f64 {
        if self.class_count == 0 {
            0.0
        } else {
            self.total_loc as f64 / self.class_count as f64
        }
    }
}

/// A directory-shaped aggregation unit
#[derive(Debug, Clone, Serialize)]
pub struct ModuleNode {
    pub id: ModuleId,
    /// Display path, `/`-separated (e.g. `pkg/sub`); empty for a synthetic multi-root top
    pub path: String,
    /// Last path component
    pub name: String,
    /// Normalized identity (lower-cased path)
    pub key: String,
    pub kind: ModuleKind,
    /// Classes declared directly in files of this directory
    pub classes: Vec<ClassEntity>,
    pub children: Vec<ModuleId>,
    pub parent: Option<ModuleId>,
    /// Stats of the direct classes only
    pub own: ModuleStats,
    /// Stats of this node plus all descendants
    pub stats: ModuleStats,
}

impl ModuleNode {
    pub fn has_content(&self) -> bool {
        self.stats.class_count > 0
    }

    /// Directory of this module relative to an output root
    pub fn relative_dir(&self) -> PathBuf {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    pub fn display_name(&self) -> &str {
        if self.path.is_empty() {
            "."
        } else {
            &self.path
        }
    }
}

/// A scanned root and the label its module path starts with
#[derive(Debug, Clone, PartialEq, Eq)]
struct RootEntry {
    path: PathBuf,
    label: String,
}

/// Immutable module hierarchy
#[derive(Debug, Clone)]
pub struct ModuleTree {
    nodes: Vec<ModuleNode>,
    index: BTreeMap<String, ModuleId>,
    roots: Vec<RootEntry>,
}

impl ModuleTree {
    pub fn root(&self) -> &ModuleNode {
        &self.nodes[0]
    }

    pub fn get(&self, id: ModuleId) -> &ModuleNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> &[ModuleNode] {
        &self.nodes
    }

    /// Look up a module by display path, ignoring case
    pub fn find(&self, path: &str) -> Option<&ModuleNode> {
        self.index
            .get(&path.trim_matches('/').to_lowercase())
            .map(|&id| self.get(id))
    }

    pub fn children(&self, id: ModuleId) -> impl Iterator<Item = &ModuleNode> {
        self.get(id).children.iter().map(move |&c| self.get(c))
    }

    /// Pre-order ids of the subtree rooted at `id`
    pub fn subtree(&self, id: ModuleId) -> Vec<ModuleId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.get(next).children.iter().rev().copied());
        }
        out
    }

    /// Module a class belongs to, derived from its file's directory
    pub fn module_of(&self, class: &ClassEntity) -> Option<&ModuleNode> {
        let dir = class.file.parent()?;
        let comps = module_components(&self.roots, dir)?;
        self.index.get(&normalize(&comps)).map(|&id| self.get(id))
    }

    pub fn all_classes(&self) -> impl Iterator<Item = &ClassEntity> {
        self.nodes.iter().flat_map(|n| n.classes.iter())
    }
}

/// Result of aggregation
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub tree: ModuleTree,
    pub warnings: Vec<Warning>,
}

/// Builds a [`ModuleTree`] from analyzed files
pub struct ModuleAggregator {
    roots: Vec<RootEntry>,
}

impl ModuleAggregator {
    /// `roots` should be canonical absolute paths, the same ones discovery used
    pub fn new(roots: &[PathBuf]) -> Self {
        let mut seen = BTreeSet::new();
        let roots = roots
            .iter()
            .filter(|r| seen.insert((*r).clone()))
            .map(|r| RootEntry {
                path: r.clone(),
                label: r
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| ".".to_string()),
            })
            .collect();
        Self { roots }
    }

    pub fn build(&self, files: &[SourceFile], classes: &[ClassEntity]) -> Aggregation {
        let mut warnings = Vec::new();

        let mut slots: BTreeMap<Vec<String>, Slot> = BTreeMap::new();

        let top = self.top_components();
        ensure(&mut slots, &top, top.len());

        for class in classes {
            let dir = class.file.parent().unwrap_or_else(|| Path::new(""));
            let comps = match module_components(&self.roots, dir) {
                Some(c) => c,
                None => {
                    warn!(
                        "{} is outside every root; attaching its classes to the top module",
                        class.file.display()
                    );
                    top.clone()
                }
            };
            let slot = ensure(&mut slots, &comps, top.len());
            slot.dirs.insert(dir.to_path_buf());
            slot.classes.push(class.clone());
        }

        for file in files {
            let is_marker = file
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, ModuleKind::is_package_marker);
            if !is_marker {
                continue;
            }
            let Some(dir) = file.path.parent() else {
                continue;
            };
            if let Some(comps) = module_components(&self.roots, dir) {
                let key: Vec<String> = comps.iter().map(|c| c.to_lowercase()).collect();
                if let Some(slot) = slots.get_mut(&key) {
                    slot.package = true;
                }
            }
        }

        // Arena in key order: pre-order with sorted children
        let mut nodes: Vec<ModuleNode> = Vec::with_capacity(slots.len());
        let mut index: BTreeMap<String, ModuleId> = BTreeMap::new();
        let mut by_key: BTreeMap<Vec<String>, ModuleId> = BTreeMap::new();

        for (key, mut slot) in slots {
            let id = ModuleId(nodes.len());

            let name = if slot.spellings.len() > 1 {
                let canonical = key.last().cloned().unwrap_or_default();
                let variants: Vec<&str> = slot.spellings.iter().map(|s| s.as_str()).collect();
                let message = format!(
                    "directories differing only in case ({}) merged as '{}'",
                    variants.join(", "),
                    canonical
                );
                let location = slot
                    .dirs
                    .iter()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(slot.comps.join("/")));
                warn!("{}: {}", location.display(), message);
                warnings.push(Warning::conflict(location, message));
                canonical
            } else {
                slot.comps.last().cloned().unwrap_or_default()
            };

            let parent = if key.is_empty() || key.len() <= top.len() {
                None
            } else {
                by_key.get(&key[..key.len() - 1]).copied()
            };

            let path = match parent {
                Some(p) if !nodes[p.0].path.is_empty() => format!("{}/{}", nodes[p.0].path, name),
                Some(_) => name.clone(),
                None => slot.comps.join("/"),
            };

            slot.classes.sort_by(|a, b| {
                (&a.file, a.start_line, &a.name, a.end_line, a.loc, a.method_count).cmp(&(
                    &b.file,
                    b.start_line,
                    &b.name,
                    b.end_line,
                    b.loc,
                    b.method_count,
                ))
            });
            let own = ModuleStats::of_classes(&slot.classes);

            if let Some(p) = parent {
                nodes[p.0].children.push(id);
            }
            let normalized = normalize(&key);
            index.insert(normalized.clone(), id);
            by_key.insert(key, id);

            nodes.push(ModuleNode {
                id,
                path,
                name,
                key: normalized,
                kind: if slot.package {
                    ModuleKind::Package
                } else {
                    ModuleKind::Directory
                },
                classes: slot.classes,
                children: Vec::new(),
                parent,
                own,
                stats: own,
            });
        }

        // Children always follow their parent in the arena
        for i in (0..nodes.len()).rev() {
            if let Some(parent) = nodes[i].parent {
                let stats = nodes[i].stats;
                nodes[parent.0].stats.add(&stats);
            }
        }

        Aggregation {
            tree: ModuleTree {
                nodes,
                index,
                roots: self.roots.clone(),
            },
            warnings,
        }
    }

    /// Path components of the tree's root node
    fn top_components(&self) -> Vec<String> {
        match self.roots.as_slice() {
            [single] => vec![single.label.clone()],
            _ => Vec::new(),
        }
    }
}

/// Accumulator for one normalized directory during a build
struct Slot {
    comps: Vec<String>,
    spellings: BTreeSet<String>,
    dirs: BTreeSet<PathBuf>,
    classes: Vec<ClassEntity>,
    package: bool,
}

fn ensure<'a>(
    slots: &'a mut BTreeMap<Vec<String>, Slot>,
    comps: &[String],
    from: usize,
) -> &'a mut Slot {
    // Every prefix down from the top node exists, so intermediates get nodes
    for len in from..comps.len() {
        insert_slot(slots, &comps[..len]);
    }
    insert_slot(slots, comps)
}

fn insert_slot<'a>(
    slots: &'a mut BTreeMap<Vec<String>, Slot>,
    comps: &[String],
) -> &'a mut Slot {
    let key: Vec<String> = comps.iter().map(|c| c.to_lowercase()).collect();
    let slot = slots.entry(key).or_insert_with(|| Slot {
        comps: comps.to_vec(),
        spellings: BTreeSet::new(),
        dirs: BTreeSet::new(),
        classes: Vec::new(),
        package: false,
    });
    if let Some(last) = comps.last() {
        slot.spellings.insert(last.clone());
    }
    slot
}

/// Module path components of a directory: the label of the innermost root
/// containing it followed by the directory's path below that root. With
/// several roots every path hangs off an unnamed top node.
fn module_components(roots: &[RootEntry], dir: &Path) -> Option<Vec<String>> {
    let root = roots
        .iter()
        .filter(|r| dir.starts_with(&r.path))
        .max_by_key(|r| r.path.components().count())?;

    let mut comps = vec![root.label.clone()];
    let rest = dir.strip_prefix(&root.path).ok()?;
    for component in rest.components() {
        if let Component::Normal(part) = component {
            comps.push(part.to_string_lossy().to_string());
        }
    }
    Some(comps)
}

fn normalize(comps: &[String]) -> String {
    comps
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>()
        .join("/")
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn class_strategy() -> impl Strategy<Value = ClassEntity> {
        (
            prop::collection::vec(prop::sample::select(vec!["a", "b", "C", "c", "d"]), 0..4),
            0usize..200,
            0usize..20,
            1usize..500,
        )
            .prop_map(|(dirs, loc, methods, line)| {
                let mut file = PathBuf::from("/root/proj");
                for d in &dirs {
                    file.push(d);
                }
                file.push("f.py");
                ClassEntity {
                    name: format!("K{}", line),
                    file,
                    loc,
                    method_count: methods,
                    start_line: line,
                    end_line: line + loc,
                }
            })
    }

    fn check_rollups(tree: &ModuleTree) -> Result<(), TestCaseError> {
        for node in tree.nodes() {
            let children: Vec<&ModuleNode> = tree.children(node.id).collect();
            let direct_loc: usize = node.classes.iter().map(|c| c.loc).sum();
            let child_loc: usize = children.iter().map(|c| c.stats.total_loc).sum();
            prop_assert_eq!(node.stats.total_loc, direct_loc + child_loc);

            let child_classes: usize = children.iter().map(|c| c.stats.class_count).sum();
            prop_assert_eq!(node.stats.class_count, node.classes.len() + child_classes);

            let direct_methods: usize = node.classes.iter().map(|c| c.method_count).sum();
            let child_methods: usize = children.iter().map(|c| c.stats.method_count).sum();
            prop_assert_eq!(node.stats.method_count, direct_methods + child_methods);

            for child in children {
                prop_assert_eq!(child.parent, Some(node.id));
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn rollup_matches_direct_plus_children(classes in prop::collection::vec(class_strategy(), 0..40)) {
            let agg = ModuleAggregator::new(&[PathBuf::from("/root/proj")]).build(&[], &classes);
            check_rollups(&agg.tree)?;

            let total: usize = classes.iter().map(|c| c.loc).sum();
            prop_assert_eq!(agg.tree.root().stats.total_loc, total);
            prop_assert_eq!(agg.tree.all_classes().count(), classes.len());
        }

        #[test]
        fn build_is_deterministic(classes in prop::collection::vec(class_strategy(), 0..20)) {
            let aggregator = ModuleAggregator::new(&[PathBuf::from("/root/proj")]);
            let mut reversed = classes.clone();
            reversed.reverse();
            let a = aggregator.build(&[], &classes).tree;
            let b = aggregator.build(&[], &reversed).tree;
            let paths_a: Vec<&str> = a.nodes().iter().map(|n| n.path.as_str()).collect();
            let paths_b: Vec<&str> = b.nodes().iter().map(|n| n.path.as_str()).collect();
            prop_assert_eq!(paths_a, paths_b);
            for (x, y) in a.nodes().iter().zip(b.nodes()) {
                prop_assert_eq!(&x.classes, &y.classes);
            }
        }
    }
}
