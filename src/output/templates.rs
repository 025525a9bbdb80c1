// Template engine for the Markdown documents that embed diagrams

use crate::analysis::ModuleStats;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

/// Template engine wrapping Tera with custom filters and templates
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Create a new template engine with embedded templates
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("module.md", include_str!("../../templates/module.md.tera")),
            ("overview.md", include_str!("../../templates/overview.md.tera")),
        ])?;

        tera.register_filter("pluralize", pluralize);

        Ok(Self { tera })
    }

    /// Render a per-module document
    pub fn render_module(&self, doc: &ModuleDocument) -> Result<String> {
        let mut context = Context::new();
        context.insert("doc", doc);
        Ok(self.tera.render("module.md", &context)?)
    }

    /// Render the overview document
    pub fn render_overview(&self, doc: &OverviewDocument) -> Result<String> {
        let mut context = Context::new();
        context.insert("doc", doc);
        Ok(self.tera.render("overview.md", &context)?)
    }
}

/// Statistics as shown in a document
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsView {
    pub classes: usize,
    pub total_loc: usize,
    pub avg_loc: String,
    pub methods: usize,
}

impl From<&ModuleStats> for StatsView {
    fn from(stats: &ModuleStats) -> Self {
        Self {
            classes: stats.class_count,
            total_loc: stats.total_loc,
            avg_loc: format!("{:.1}", stats.avg_loc()),
            methods: stats.method_count,
        }
    }
}

/// One embedded diagram
#[derive(Debug, Clone, Serialize)]
pub struct DiagramView {
    pub title: String,
    pub kind: String,
    pub body: String,
}

/// A link to another module document
#[derive(Debug, Clone, Serialize)]
pub struct ModuleLink {
    pub path: String,
    pub link: String,
    pub classes: usize,
    pub total_loc: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassView {
    pub name: String,
    pub anchor: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub loc: usize,
    pub methods: usize,
}

/// Context for `module.md`
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDocument {
    pub title: String,
    pub path: String,
    pub kind: String,
    pub stats: StatsView,
    pub diagrams: Vec<DiagramView>,
    pub children: Vec<ModuleLink>,
    pub classes: Vec<ClassView>,
}

/// Context for `overview.md`
#[derive(Debug, Clone, Serialize)]
pub struct OverviewDocument {
    pub title: String,
    pub roots: Vec<String>,
    pub languages: Vec<String>,
    pub files_discovered: usize,
    pub files_analyzed: usize,
    pub stats: StatsView,
    pub diagrams: Vec<DiagramView>,
    pub modules: Vec<ModuleLink>,
    pub warnings: Vec<String>,
}

/// Pluralize a word based on count
fn pluralize(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let count = value.as_u64().unwrap_or(0);
    let singular = args
        .get("singular")
        .and_then(|v| v.as_str())
        .unwrap_or("item");
    let default_plural = format!("{}s", singular);
    let plural = args
        .get("plural")
        .and_then(|v| v.as_str())
        .unwrap_or(&default_plural);

    if count == 1 {
        Ok(Value::String(format!("{} {}", count, singular)))
    } else {
        Ok(Value::String(format!("{} {}", count, plural)))
    }
}
