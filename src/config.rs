use crate::analysis::{languages_of, DiscoveredFile};
use crate::error::{Error, Result};
use crate::output::{DiagramKind, Direction};
use crate::parser::Language;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "designmap.toml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub diagrams: DiagramConfig,
    pub output: OutputConfig,
}

/// Which files to analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub roots: Vec<PathBuf>,
    /// Glob matched against paths relative to each root
    pub pattern: String,
    pub exclude: Vec<String>,
    /// Inferred from discovered files when unset
    pub languages: Option<Vec<Language>>,
    pub follow_links: bool,
}

/// Diagram settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// Both kinds when unset
    pub kinds: Option<Vec<DiagramKind>>,
    pub direction: Direction,
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub overview_file: String,
    pub module_file: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            pattern: "**/*".to_string(),
            exclude: vec![
                "**/node_modules".to_string(),
                "**/.git".to_string(),
                "**/__pycache__".to_string(),
                "**/venv".to_string(),
                "**/.venv".to_string(),
                "**/dist".to_string(),
                "**/build".to_string(),
            ],
            languages: None,
            follow_links: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./designmap-docs"),
            overview_file: "overview.md".to_string(),
            module_file: "module.md".to_string(),
        }
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub roots: Vec<PathBuf>,
    pub pattern: Option<String>,
    pub languages: Vec<Language>,
    pub diagrams: Vec<DiagramKind>,
    pub output: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub direction: Option<Direction>,
    pub follow_links: bool,
}

/// Effective configuration of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub roots: Vec<PathBuf>,
    pub pattern: String,
    pub exclude: Vec<String>,
    pub languages: Vec<Language>,
    pub diagram_kinds: Vec<DiagramKind>,
    pub direction: Direction,
    pub output_directory: PathBuf,
    pub overview_file: String,
    pub module_file: String,
    pub follow_links: bool,
}

impl ResolvedConfig {
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::PathNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit config file, else `designmap.toml` in the working
    /// directory when present, else defaults
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if !cli.roots.is_empty() {
            self.discovery.roots = cli.roots;
        }

        if let Some(pattern) = cli.pattern {
            self.discovery.pattern = pattern;
        }

        if !cli.languages.is_empty() {
            self.discovery.languages = Some(cli.languages);
        }

        if !cli.exclude.is_empty() {
            self.discovery.exclude.extend(cli.exclude);
        }

        if cli.follow_links {
            self.discovery.follow_links = true;
        }

        if !cli.diagrams.is_empty() {
            self.diagrams.kinds = Some(cli.diagrams);
        }

        if let Some(direction) = cli.direction {
            self.diagrams.direction = direction;
        }

        if let Some(out) = cli.output {
            self.output.directory = out;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.discovery.roots.is_empty() {
            return Err(Error::config_validation("at least one root is required"));
        }

        if self.discovery.pattern.trim().is_empty() {
            return Err(Error::config_validation("pattern cannot be empty"));
        }
        Pattern::new(&self.discovery.pattern)?;
        for exclude in &self.discovery.exclude {
            Pattern::new(exclude)?;
        }

        if matches!(&self.discovery.languages, Some(l) if l.is_empty()) {
            return Err(Error::config_validation("languages cannot be an empty list"));
        }
        if matches!(&self.diagrams.kinds, Some(k) if k.is_empty()) {
            return Err(Error::config_validation("diagram kinds cannot be an empty list"));
        }

        for (field, name) in [
            ("overview_file", &self.output.overview_file),
            ("module_file", &self.output.module_file),
        ] {
            if name.trim().is_empty() {
                return Err(Error::config_validation(format!("{} cannot be empty", field)));
            }
            if name.contains('/') || name.contains('\\') {
                return Err(Error::config_validation(format!(
                    "{} must be a file name, not a path: {}",
                    field, name
                )));
            }
        }
        if self.output.overview_file == self.output.module_file {
            return Err(Error::config_validation(
                "overview_file and module_file must differ",
            ));
        }

        Ok(())
    }

    /// Effective configuration for a set of discovered files. Languages are
    /// inferred from the files when unset; diagram kinds default to all.
    pub fn resolve(&self, discovered: &[DiscoveredFile]) -> ResolvedConfig {
        let languages = match &self.discovery.languages {
            Some(l) => l.iter().copied().collect::<BTreeSet<_>>().into_iter().collect(),
            None => languages_of(discovered),
        };
        let diagram_kinds = match &self.diagrams.kinds {
            Some(k) => k.iter().copied().collect::<BTreeSet<_>>().into_iter().collect(),
            None => DiagramKind::ALL.to_vec(),
        };

        ResolvedConfig {
            roots: self.discovery.roots.clone(),
            pattern: self.discovery.pattern.clone(),
            exclude: self.discovery.exclude.clone(),
            languages,
            diagram_kinds,
            direction: self.diagrams.direction,
            output_directory: self.output.directory.clone(),
            overview_file: self.output.overview_file.clone(),
            module_file: self.output.module_file.clone(),
            follow_links: self.discovery.follow_links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn discovered(path: &str, language: Language) -> DiscoveredFile {
        DiscoveredFile {
            path: PathBuf::from(path),
            root: PathBuf::from("/src"),
            language,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.discovery.roots, vec![PathBuf::from(".")]);
        assert_eq!(config.discovery.pattern, "**/*");
        assert!(config.discovery.languages.is_none());
        assert!(config.diagrams.kinds.is_none());
        assert_eq!(config.diagrams.direction, Direction::TB);
        assert_eq!(config.output.overview_file, "overview.md");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[discovery]
roots = ["src", "web"]
pattern = "**/*.py"
languages = ["python"]

[diagrams]
kinds = ["component_tree"]
direction = "LR"

[output]
directory = "docs/arch"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.discovery.roots.len(), 2);
        assert_eq!(config.discovery.pattern, "**/*.py");
        assert_eq!(config.discovery.languages, Some(vec![Language::Python]));
        assert_eq!(config.diagrams.kinds, Some(vec![DiagramKind::ComponentTree]));
        assert_eq!(config.diagrams.direction, Direction::LR);
        assert_eq!(config.output.directory, PathBuf::from("docs/arch"));
        // Unset fields keep their defaults
        assert_eq!(config.output.module_file, "module.md");
        assert!(!config.discovery.exclude.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/designmap.toml"));
        assert!(matches!(result, Err(Error::PathNotFound(_))));
    }

    #[test]
    fn test_load_unknown_direction() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[diagrams]\ndirection = \"UP\"").unwrap();
        assert!(matches!(Config::load(file.path()), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_validation_empty_pattern() {
        let mut config = Config::default();
        config.discovery.pattern = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bad_exclude() {
        let mut config = Config::default();
        config.discovery.exclude.push("[".to_string());
        assert!(matches!(config.validate(), Err(Error::GlobPattern(_))));
    }

    #[test]
    fn test_validation_file_names() {
        let mut config = Config::default();
        config.output.module_file = "overview.md".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.module_file = "docs/module.md".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.overview_file = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_lists() {
        let mut config = Config::default();
        config.discovery.languages = Some(vec![]);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.diagrams.kinds = Some(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_cli() {
        let mut config = Config::default();
        let excludes = config.discovery.exclude.len();
        config.merge_cli(CliOverrides {
            roots: vec![PathBuf::from("pkg")],
            pattern: Some("**/*.js".to_string()),
            languages: vec![Language::JavaScript],
            diagrams: vec![DiagramKind::ClassGraph],
            output: Some(PathBuf::from("/custom/output")),
            exclude: vec!["**/fixtures".to_string()],
            direction: Some(Direction::RL),
            follow_links: true,
        });

        assert_eq!(config.discovery.roots, vec![PathBuf::from("pkg")]);
        assert_eq!(config.discovery.pattern, "**/*.js");
        assert_eq!(config.discovery.languages, Some(vec![Language::JavaScript]));
        assert_eq!(config.discovery.exclude.len(), excludes + 1);
        assert!(config.discovery.follow_links);
        assert_eq!(config.diagrams.kinds, Some(vec![DiagramKind::ClassGraph]));
        assert_eq!(config.diagrams.direction, Direction::RL);
        assert_eq!(config.output.directory, PathBuf::from("/custom/output"));
    }

    #[test]
    fn test_merge_cli_empty_keeps_file_values() {
        let mut config = Config::default();
        config.diagrams.kinds = Some(vec![DiagramKind::ComponentTree]);
        let before = config.clone();
        config.merge_cli(CliOverrides::default());
        assert_eq!(config, before);
    }

    #[test]
    fn test_resolve_infers_languages() {
        let config = Config::default();
        let files = vec![
            discovered("/src/b.ts", Language::TypeScript),
            discovered("/src/a.py", Language::Python),
        ];
        let resolved = config.resolve(&files);
        assert_eq!(resolved.languages, vec![Language::Python, Language::TypeScript]);
        assert_eq!(resolved.diagram_kinds, DiagramKind::ALL.to_vec());
    }

    #[test]
    fn test_resolve_explicit_values() {
        let mut config = Config::default();
        config.discovery.languages = Some(vec![Language::JavaScript, Language::JavaScript]);
        config.diagrams.kinds = Some(vec![DiagramKind::ComponentTree]);
        let resolved = config.resolve(&[discovered("/src/a.py", Language::Python)]);
        assert_eq!(resolved.languages, vec![Language::JavaScript]);
        assert_eq!(resolved.diagram_kinds, vec![DiagramKind::ComponentTree]);
    }

    #[test]
    fn test_resolved_to_toml() {
        let resolved = Config::default().resolve(&[]);
        let text = resolved.to_toml().unwrap();
        assert!(text.contains("pattern = "));
        assert!(text.contains("**/*"));
        assert!(text.contains("\"TB\""));
        assert!(text.contains("class_graph"));
        assert!(text.contains("overview.md"));
    }
}
