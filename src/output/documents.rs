// Document assembly
//
// Decides where each document lives in the output tree and fills the
// template contexts from the module tree and the generated diagrams.

use crate::analysis::{ModuleId, ModuleKind, ModuleNode, ModuleTree};
use crate::error::Result;
use crate::output::diagrams::{relative_link, GeneratedArtifact};
use crate::output::templates::{
    ClassView, DiagramView, ModuleDocument, ModuleLink, OverviewDocument, StatsView,
    TemplateEngine,
};
use crate::parser::Warning;
use std::path::{Path, PathBuf};

/// File names of the generated documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub overview_file: String,
    pub module_file: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            overview_file: "overview.md".to_string(),
            module_file: "module.md".to_string(),
        }
    }
}

/// A document to produce: its scope in the tree and its output path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTarget {
    pub scope: ModuleId,
    pub path: PathBuf,
    pub overview: bool,
}

impl OutputLayout {
    pub fn overview_path(&self) -> PathBuf {
        PathBuf::from(&self.overview_file)
    }

    /// Path mirroring the module's directory under the output root
    pub fn module_path(&self, module: &ModuleNode) -> PathBuf {
        module.relative_dir().join(&self.module_file)
    }

    /// The overview first, then every module that has classes, in tree order
    pub fn targets(&self, tree: &ModuleTree) -> Vec<DocumentTarget> {
        let root = tree.root();
        let mut targets = vec![DocumentTarget {
            scope: root.id,
            path: self.overview_path(),
            overview: true,
        }];
        targets.extend(
            tree.subtree(root.id)
                .into_iter()
                .map(|id| tree.get(id))
                .filter(|m| m.has_content())
                .map(|m| DocumentTarget {
                    scope: m.id,
                    path: self.module_path(m),
                    overview: false,
                }),
        );
        targets
    }
}

/// Run facts shown in the overview
#[derive(Debug, Clone, Default)]
pub struct OverviewInfo {
    pub title: String,
    pub roots: Vec<PathBuf>,
    pub languages: Vec<String>,
    pub files_discovered: usize,
    pub files_analyzed: usize,
    pub warnings: Vec<Warning>,
}

/// A rendered document ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Relative to the output root
    pub path: PathBuf,
    pub content: String,
}

pub struct DocumentRenderer {
    engine: TemplateEngine,
    layout: OutputLayout,
}

impl DocumentRenderer {
    pub fn new(layout: OutputLayout) -> Result<Self> {
        Ok(Self {
            engine: TemplateEngine::new()?,
            layout,
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn render(
        &self,
        tree: &ModuleTree,
        target: &DocumentTarget,
        artifacts: &[GeneratedArtifact],
        info: &OverviewInfo,
    ) -> Result<RenderedDocument> {
        let content = if target.overview {
            self.engine
                .render_overview(&self.overview_document(tree, target, artifacts, info))?
        } else {
            self.engine
                .render_module(&self.module_document(tree, target, artifacts))?
        };
        Ok(RenderedDocument {
            path: target.path.clone(),
            content,
        })
    }

    fn module_document(
        &self,
        tree: &ModuleTree,
        target: &DocumentTarget,
        artifacts: &[GeneratedArtifact],
    ) -> ModuleDocument {
        let module = tree.get(target.scope);
        let from_dir = target.path.parent().unwrap_or_else(|| Path::new(""));

        let children = tree
            .children(module.id)
            .filter(|c| c.has_content())
            .map(|c| self.link(c, from_dir))
            .collect();

        let classes = module
            .classes
            .iter()
            .map(|c| ClassView {
                name: c.name.clone(),
                anchor: c.anchor(),
                file: c
                    .file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                start_line: c.start_line,
                end_line: c.end_line,
                loc: c.loc,
                methods: c.method_count,
            })
            .collect();

        ModuleDocument {
            title: if module.name.is_empty() {
                module.display_name().to_string()
            } else {
                module.name.clone()
            },
            path: module.display_name().to_string(),
            kind: match module.kind {
                ModuleKind::Package => "package".to_string(),
                ModuleKind::Directory => "directory".to_string(),
            },
            stats: StatsView::from(&module.stats),
            diagrams: diagram_views(artifacts),
            children,
            classes,
        }
    }

    fn overview_document(
        &self,
        tree: &ModuleTree,
        target: &DocumentTarget,
        artifacts: &[GeneratedArtifact],
        info: &OverviewInfo,
    ) -> OverviewDocument {
        let root = tree.root();
        let from_dir = target.path.parent().unwrap_or_else(|| Path::new(""));

        let modules = tree
            .subtree(root.id)
            .into_iter()
            .map(|id| tree.get(id))
            .filter(|m| m.has_content())
            .map(|m| self.link(m, from_dir))
            .collect();

        OverviewDocument {
            title: info.title.clone(),
            roots: info
                .roots
                .iter()
                .map(|r| r.display().to_string())
                .collect(),
            languages: info.languages.clone(),
            files_discovered: info.files_discovered,
            files_analyzed: info.files_analyzed,
            stats: StatsView::from(&root.stats),
            diagrams: diagram_views(artifacts),
            modules,
            warnings: info.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }

    fn link(&self, module: &ModuleNode, from_dir: &Path) -> ModuleLink {
        ModuleLink {
            path: module.display_name().to_string(),
            link: relative_link(from_dir, &self.layout.module_path(module)),
            classes: module.stats.class_count,
            total_loc: module.stats.total_loc,
        }
    }
}

fn diagram_views(artifacts: &[GeneratedArtifact]) -> Vec<DiagramView> {
    artifacts
        .iter()
        .map(|a| DiagramView {
            title: a.kind.title().to_string(),
            kind: a.kind.name().to_string(),
            body: a.diagram.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ModuleAggregator;
    use crate::output::diagrams::{
        ClassGraphGenerator, DiagramModel, Generator, GeneratorOptions, IdAllocator,
    };
    use crate::parser::ClassEntity;

    fn class(file: &str, name: &str, loc: usize) -> ClassEntity {
        ClassEntity {
            name: name.to_string(),
            file: PathBuf::from(file),
            loc,
            method_count: 2,
            start_line: 1,
            end_line: loc + 1,
        }
    }

    fn tree() -> ModuleTree {
        ModuleAggregator::new(&[PathBuf::from("/src/pkg")])
            .build(
                &[],
                &[
                    class("/src/pkg/a.py", "Alpha", 10),
                    class("/src/pkg/a.py", "Beta", 5),
                    class("/src/pkg/sub/b.js", "Gamma", 8),
                ],
            )
            .tree
    }

    #[test]
    fn test_targets() {
        let tree = tree();
        let targets = OutputLayout::default().targets(&tree);
        let paths: Vec<PathBuf> = targets.iter().map(|t| t.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("overview.md"),
                PathBuf::from("pkg/module.md"),
                PathBuf::from("pkg/sub/module.md"),
            ]
        );
        assert!(targets[0].overview);
    }

    #[test]
    fn test_targets_skip_empty_modules() {
        let tree = ModuleAggregator::new(&[PathBuf::from("/src/pkg")])
            .build(&[], &[class("/src/pkg/deep/er/x.py", "X", 3)])
            .tree;
        let targets = OutputLayout::default().targets(&tree);
        // overview, pkg, pkg/deep, pkg/deep/er all carry the class via rollup
        assert_eq!(targets.len(), 4);

        let empty = ModuleAggregator::new(&[PathBuf::from("/src/pkg")])
            .build(&[], &[])
            .tree;
        assert_eq!(OutputLayout::default().targets(&empty).len(), 1);
    }

    #[test]
    fn test_render_module_document() {
        let tree = tree();
        let model = DiagramModel::build(&tree, "module.md", &mut IdAllocator::new());
        let layout = OutputLayout::default();
        let renderer = DocumentRenderer::new(layout.clone()).unwrap();
        let target = layout.targets(&tree).remove(1);
        let artifact = ClassGraphGenerator.generate(
            &model,
            target.scope,
            &GeneratorOptions::new(&target.path),
        );

        let doc = renderer
            .render(&tree, &target, &[artifact], &OverviewInfo::default())
            .unwrap();
        assert_eq!(doc.path, PathBuf::from("pkg/module.md"));
        assert!(doc.content.contains("# pkg"));
        assert!(doc.content.contains("- [pkg/sub](sub/module.md): 1 class, 8 lines"));
        assert!(doc.content.contains("### Alpha"));
        assert!(doc.content.contains("`a.py`"));
        assert!(!doc.content.contains("### Gamma"));
        assert!(doc.content.contains("click c0_0_0 \"module.md#alpha\""));
    }

    #[test]
    fn test_render_overview_document() {
        let tree = tree();
        let layout = OutputLayout::default();
        let renderer = DocumentRenderer::new(layout.clone()).unwrap();
        let target = layout.targets(&tree).remove(0);
        let info = OverviewInfo {
            title: "pkg".to_string(),
            roots: vec![PathBuf::from("/src/pkg")],
            languages: vec!["python".to_string(), "javascript".to_string()],
            files_discovered: 2,
            files_analyzed: 2,
            warnings: vec![],
        };

        let doc = renderer.render(&tree, &target, &[], &info).unwrap();
        assert_eq!(doc.path, PathBuf::from("overview.md"));
        assert!(doc.content.contains("| [pkg](pkg/module.md) | 3 | 23 |"));
        assert!(doc.content.contains("| [pkg/sub](pkg/sub/module.md) | 1 | 8 |"));
        assert!(doc.content.contains("Languages: python, javascript"));
        assert!(!doc.content.contains("## Warnings"));
    }
}
