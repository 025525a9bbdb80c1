//! designmap - Generate architecture diagrams from source trees
//!
//! Walks Python, JavaScript and TypeScript sources, extracts classes with
//! line and method counts, rolls them up into a directory-shaped module
//! tree, and writes Mermaid class graphs and component trees as Markdown
//! documents that link back to per-class sections.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;

// Re-export main types
pub use analysis::{run, Pipeline, RunSummary};
pub use config::Config;
pub use error::{Error, Result};
