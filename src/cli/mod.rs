//! CLI module for designmap

mod args;

pub use args::{Args, Command, RunOptions};

use crate::analysis::{Pipeline, RunSummary};
use crate::config::Config;
use crate::error::Result;
use log::error;
use std::process::ExitCode;

/// Warnings printed before the list is cut off
const WARNING_PREVIEW: usize = 5;

/// Run a parsed command line
pub fn run(args: Args) -> ExitCode {
    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(options: &RunOptions) -> Result<Config> {
    let mut cfg = Config::locate(options.config.as_deref())?;
    // CLI takes precedence
    cfg.merge_cli(options.overrides());
    Ok(cfg)
}

fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Generate {
            options,
            json,
            show_warnings,
            verbose,
        } => {
            let cfg = load_config(&options)?;
            let pipeline = Pipeline::new(cfg)?.with_verbose(verbose && !json);
            let summary = pipeline.run()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", format_summary(&summary, show_warnings));
            }
            Ok(())
        }

        Command::Config { options, json } => {
            let cfg = load_config(&options)?;
            let resolved = Pipeline::new(cfg)?.show_config()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                print!("{}", resolved.to_toml()?);
            }
            Ok(())
        }
    }
}

/// Human-readable end-of-run summary
pub fn format_summary(summary: &RunSummary, show_warnings: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Discovered {} files, analyzed {}\n",
        summary.files_discovered, summary.files_analyzed
    ));
    out.push_str(&format!(
        "Found {} classes in {} modules\n",
        summary.classes_found, summary.modules
    ));
    out.push_str(&format!(
        "Wrote {} artifacts to {}\n",
        summary.artifact_count(),
        summary.output_dir.display()
    ));

    if summary.warnings.is_empty() {
        return out;
    }

    out.push_str(&format!("\nWarnings ({}):\n", summary.warning_count()));
    let shown = if show_warnings {
        summary.warnings.len()
    } else {
        WARNING_PREVIEW.min(summary.warnings.len())
    };
    for warning in &summary.warnings[..shown] {
        out.push_str(&format!("  {}\n", warning));
    }
    if shown < summary.warnings.len() {
        out.push_str(&format!(
            "  ... and {} more (use --show-warnings to list all)\n",
            summary.warnings.len() - shown
        ));
    }

    out
}
