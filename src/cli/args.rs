//! CLI argument parsing

use crate::config::CliOverrides;
use crate::output::{DiagramKind, Direction};
use crate::parser::Language;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate architecture diagrams from multi-language source trees
#[derive(Parser, Debug)]
#[command(name = "designmap")]
#[command(about = "Generate architecture diagrams from multi-language source trees")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze source roots and write diagram documents
    Generate {
        #[command(flatten)]
        options: RunOptions,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        /// List every warning instead of only counting them
        #[arg(long)]
        show_warnings: bool,

        /// Show a progress bar while analyzing
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the effective configuration without writing anything
    Config {
        #[command(flatten)]
        options: RunOptions,

        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Root directories to scan (defaults to the config file, else ".")
    pub roots: Vec<PathBuf>,

    /// Glob matched against paths relative to each root
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Languages to analyze (can be repeated)
    #[arg(short, long = "language", value_parser = parse_language)]
    pub languages: Vec<Language>,

    /// Diagram kinds to generate (can be repeated)
    #[arg(short, long = "diagram", value_parser = parse_diagram)]
    pub diagrams: Vec<DiagramKind>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Glob patterns to exclude (can be repeated)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Diagram layout direction (TB, LR, BT, RL)
    #[arg(long, value_parser = parse_direction)]
    pub direction: Option<Direction>,

    /// Follow symbolic links while walking roots
    #[arg(long)]
    pub follow_links: bool,

    /// Config file path (defaults to ./designmap.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl RunOptions {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            roots: self.roots.clone(),
            pattern: self.pattern.clone(),
            languages: self.languages.clone(),
            diagrams: self.diagrams.clone(),
            output: self.output.clone(),
            exclude: self.exclude.clone(),
            direction: self.direction,
            follow_links: self.follow_links,
        }
    }
}

fn parse_language(s: &str) -> Result<Language, String> {
    Language::from_name(s).ok_or_else(|| {
        format!(
            "unknown language '{}' (expected one of: {})",
            s,
            Language::ALL.map(|l| l.name()).join(", ")
        )
    })
}

fn parse_diagram(s: &str) -> Result<DiagramKind, String> {
    DiagramKind::from_name(s).ok_or_else(|| {
        format!(
            "unknown diagram kind '{}' (expected one of: {})",
            s,
            DiagramKind::ALL.map(|k| k.name()).join(", ")
        )
    })
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    Direction::from_name(s).ok_or_else(|| format!("unknown direction '{}' (expected TB, LR, BT or RL)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let args = Args::try_parse_from(["designmap", "generate"]).unwrap();
        assert_eq!(args.log_level, "warn");
        match args.command {
            Command::Generate {
                options,
                json,
                show_warnings,
                verbose,
            } => {
                assert!(options.roots.is_empty());
                assert!(options.pattern.is_none());
                assert!(options.languages.is_empty());
                assert!(!json);
                assert!(!show_warnings);
                assert!(!verbose);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_generate_with_options() {
        let args = Args::try_parse_from([
            "designmap", "generate", "./src", "./web",
            "--pattern", "**/*.ts",
            "--language", "ts",
            "--language", "python",
            "--diagram", "component-tree",
            "--output", "/tmp/docs",
            "--exclude", "**/fixtures",
            "--direction", "lr",
            "--config", "custom.toml",
            "--json",
            "--show-warnings",
            "--verbose",
            "--log-level", "debug",
        ])
        .unwrap();

        assert_eq!(args.log_level, "debug");
        match args.command {
            Command::Generate {
                options,
                json,
                show_warnings,
                verbose,
            } => {
                assert_eq!(options.roots, vec![PathBuf::from("./src"), PathBuf::from("./web")]);
                assert_eq!(options.pattern.as_deref(), Some("**/*.ts"));
                assert_eq!(options.languages, vec![Language::TypeScript, Language::Python]);
                assert_eq!(options.diagrams, vec![DiagramKind::ComponentTree]);
                assert_eq!(options.output, Some(PathBuf::from("/tmp/docs")));
                assert_eq!(options.exclude, vec!["**/fixtures".to_string()]);
                assert_eq!(options.direction, Some(Direction::LR));
                assert_eq!(options.config, Some(PathBuf::from("custom.toml")));
                assert!(json && show_warnings && verbose);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_unknown_language_rejected() {
        let result = Args::try_parse_from(["designmap", "generate", "--language", "cobol"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_diagram_rejected() {
        let result = Args::try_parse_from(["designmap", "config", "--diagram", "sequence"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_command() {
        let args = Args::try_parse_from(["designmap", "config", "pkg", "--json"]).unwrap();
        match args.command {
            Command::Config { options, json } => {
                assert_eq!(options.roots, vec![PathBuf::from("pkg")]);
                assert!(json);
            }
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_overrides() {
        let options = RunOptions {
            roots: vec![PathBuf::from("a")],
            diagrams: vec![DiagramKind::ClassGraph],
            follow_links: true,
            ..RunOptions::default()
        };
        let overrides = options.overrides();
        assert_eq!(overrides.roots, vec![PathBuf::from("a")]);
        assert_eq!(overrides.diagrams, vec![DiagramKind::ClassGraph]);
        assert!(overrides.follow_links);
        assert!(overrides.output.is_none());
    }
}
