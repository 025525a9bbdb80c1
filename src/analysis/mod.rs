// Analysis pipeline
//
// Discover -> Analyze -> Aggregate -> Generate -> Write. Each phase hands an
// owned or borrowed-immutable value to the next; nothing mutable crosses a
// phase boundary.

pub mod discovery;
pub mod modules;

pub use discovery::*;
pub use modules::*;

use crate::config::{CliOverrides, Config, ResolvedConfig};
use crate::error::Result;
use crate::output::{
    generator_for, ArtifactWriter, DiagramKind, DiagramModel, DocumentRenderer, GeneratedArtifact,
    Generator, GeneratorOptions, IdAllocator, OutputLayout, OverviewInfo, RenderedDocument,
};
use crate::parser::{Analysis, AnalyzerRegistry, ClassEntity, Language, SourceFile, Warning};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Counts and warnings of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub files_discovered: usize,
    pub files_analyzed: usize,
    pub classes_found: usize,
    pub modules: usize,
    pub warnings: Vec<Warning>,
    pub artifacts_written: Vec<PathBuf>,
    pub diagram_kinds: Vec<DiagramKind>,
    pub output_dir: PathBuf,
}

impl RunSummary {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts_written.len()
    }
}

/// Result of analyzing one discovered file
struct FileOutcome {
    source: Option<SourceFile>,
    analysis: Analysis,
}

/// Orchestrates a run from configuration to written artifacts
pub struct Pipeline {
    config: Config,
    registry: AnalyzerRegistry,
    verbose: bool,
}

impl Pipeline {
    /// Create a pipeline with the default analyzers
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: AnalyzerRegistry::new(),
            verbose: false,
        })
    }

    pub fn with_registry(mut self, registry: AnalyzerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Show a progress bar while analyzing
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve the effective configuration without analyzing or writing
    /// anything
    pub fn show_config(&self) -> Result<ResolvedConfig> {
        let roots = self.canonical_roots()?;
        let discovery = self.discover(&roots)?;
        Ok(self.config.resolve(&discovery.files))
    }

    /// Run every phase and write the artifacts
    pub fn run(&self) -> Result<RunSummary> {
        let roots = self.canonical_roots()?;

        let DiscoveryResult {
            files: discovered,
            warnings: mut warnings,
        } = self.discover(&roots)?;
        let resolved = self.config.resolve(&discovered);
        info!(
            "Discovered {} files ({})",
            discovered.len(),
            resolved
                .languages
                .iter()
                .map(|l| l.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let outcomes = self.analyze(&discovered);
        let mut sources = Vec::new();
        let mut classes: Vec<ClassEntity> = Vec::new();
        for outcome in outcomes {
            warnings.extend(outcome.analysis.warnings);
            classes.extend(outcome.analysis.classes);
            if let Some(source) = outcome.source {
                sources.push(source);
            }
        }
        info!("Analyzed {} files, found {} classes", sources.len(), classes.len());

        let aggregation = ModuleAggregator::new(&roots).build(&sources, &classes);
        warnings.extend(aggregation.warnings);
        let tree = aggregation.tree;
        debug!("Built module tree with {} modules", tree.len());

        for warning in &warnings {
            warn!("{}", warning);
        }

        let layout = OutputLayout {
            overview_file: resolved.overview_file.clone(),
            module_file: resolved.module_file.clone(),
        };
        let model = DiagramModel::build(&tree, &layout.module_file, &mut IdAllocator::new());
        let targets = layout.targets(&tree);

        let generators: Vec<Box<dyn Generator>> = resolved
            .diagram_kinds
            .iter()
            .map(|&kind| generator_for(kind))
            .collect();
        let per_kind: Vec<Vec<GeneratedArtifact>> = generators
            .par_iter()
            .map(|generator| {
                targets
                    .iter()
                    .map(|target| {
                        let options = GeneratorOptions::new(&target.path)
                            .with_direction(resolved.direction);
                        generator.generate(&model, target.scope, &options)
                    })
                    .collect()
            })
            .collect();
        debug!(
            "Generated {} diagrams for {} documents",
            per_kind.iter().map(Vec::len).sum::<usize>(),
            targets.len()
        );

        let info = OverviewInfo {
            title: overview_title(&tree),
            roots: roots.clone(),
            languages: resolved.languages.iter().map(|l| l.to_string()).collect(),
            files_discovered: discovered.len(),
            files_analyzed: sources.len(),
            warnings: warnings.clone(),
        };
        let renderer = DocumentRenderer::new(layout)?;
        let documents = targets
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let artifacts: Vec<GeneratedArtifact> =
                    per_kind.iter().map(|artifacts| artifacts[i].clone()).collect();
                renderer.render(&tree, target, &artifacts, &info)
            })
            .collect::<Result<Vec<RenderedDocument>>>()?;

        let writer = ArtifactWriter::new(&resolved.output_directory);
        let artifacts_written = writer.write_all(&documents)?;
        info!(
            "Wrote {} artifacts to {}",
            artifacts_written.len(),
            writer.output_dir().display()
        );

        Ok(RunSummary {
            files_discovered: discovered.len(),
            files_analyzed: sources.len(),
            classes_found: classes.len(),
            modules: tree.len(),
            warnings,
            artifacts_written,
            diagram_kinds: resolved.diagram_kinds,
            output_dir: resolved.output_directory,
        })
    }

    fn canonical_roots(&self) -> Result<Vec<PathBuf>> {
        let mut roots = Vec::new();
        for root in &self.config.discovery.roots {
            let root = canonical_root(root)?;
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        Ok(roots)
    }

    /// Discovered files that have a registered analyzer
    fn discover(&self, roots: &[PathBuf]) -> Result<DiscoveryResult> {
        SourceDiscovery::new(
            &self.config.discovery.pattern,
            &self.config.discovery.exclude,
        )?
        .with_languages(self.config.discovery.languages.as_deref())
        .with_extensions(self.registry.extension_map())
        .with_follow_links(self.config.discovery.follow_links)
        .discover(roots)
    }

    /// Read and analyze every file on the rayon pool, in input order
    fn analyze(&self, files: &[DiscoveredFile]) -> Vec<FileOutcome> {
        let progress = if self.verbose {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let outcomes = files
            .par_iter()
            .map(|file| {
                let outcome = self.analyze_file(file);
                if let Some(ref pb) = progress {
                    pb.inc(1);
                }
                outcome
            })
            .collect();

        if let Some(pb) = progress {
            pb.finish_with_message("Analysis complete");
        }

        outcomes
    }

    fn analyze_file(&self, file: &DiscoveredFile) -> FileOutcome {
        let path = file.path.as_path();
        match SourceFile::read_as(path, file.language) {
            Ok(source) => {
                let analysis = self.registry.analyze(&source);
                debug!(
                    "{}: {} classes, {} warnings",
                    path.display(),
                    analysis.classes.len(),
                    analysis.warnings.len()
                );
                FileOutcome {
                    source: Some(source),
                    analysis,
                }
            }
            Err(e) => FileOutcome {
                source: None,
                analysis: Analysis {
                    classes: Vec::new(),
                    warnings: vec![Warning::read(path, e.to_string())],
                },
            },
        }
    }
}

fn overview_title(tree: &ModuleTree) -> String {
    let root = tree.root();
    if root.name.is_empty() {
        "Architecture overview".to_string()
    } else {
        format!("{} architecture", root.name)
    }
}

/// Run the whole pipeline with defaults for everything not given
pub fn run(
    roots: &[PathBuf],
    pattern: &str,
    languages: Option<&[Language]>,
    diagram_kinds: Option<&[DiagramKind]>,
    output_dir: &Path,
) -> Result<RunSummary> {
    let mut config = Config::default();
    config.merge_cli(CliOverrides {
        roots: roots.to_vec(),
        pattern: Some(pattern.to_string()),
        languages: languages.map(<[Language]>::to_vec).unwrap_or_default(),
        diagrams: diagram_kinds.map(<[DiagramKind]>::to_vec).unwrap_or_default(),
        output: Some(output_dir.to_path_buf()),
        ..CliOverrides::default()
    });
    Pipeline::new(config)?.run()
}
