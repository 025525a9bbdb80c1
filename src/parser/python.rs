// Python analyzer using tree-sitter
//
// Walks the syntax tree for class definitions at any depth. Line spans come
// straight from node positions; methods are the function definitions that
// sit directly in the class body.

use crate::error::{Error, Result};
use crate::parser::ast::*;
use crate::parser::Analyzer;
use tree_sitter::{Node, Parser};

/// Precise analyzer for Python source files
pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// tree-sitter parsers are not `Sync`, so each analysis builds its own
    fn parser() -> Result<Parser> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::parser(format!("Failed to set Python language: {}", e)))?;
        Ok(parser)
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn analyze(&self, file: &SourceFile) -> Analysis {
        let mut analysis = Analysis::default();

        let mut parser = match Self::parser() {
            Ok(p) => p,
            Err(e) => {
                analysis.warnings.push(Warning::parse(&file.path, 1, e.to_string()));
                return analysis;
            }
        };

        let Some(tree) = parser.parse(&file.text, None) else {
            analysis
                .warnings
                .push(Warning::parse(&file.path, 1, "parser produced no syntax tree"));
            return analysis;
        };

        let lines: Vec<&str> = file.text.lines().collect();
        let mut walker = ClassWalker {
            file,
            source: file.text.as_bytes(),
            lines: &lines,
            analysis: &mut analysis,
        };
        walker.visit(&tree.root_node());

        analysis
    }
}

struct ClassWalker<'a> {
    file: &'a SourceFile,
    source: &'a [u8],
    lines: &'a [&'a str],
    analysis: &'a mut Analysis,
}

impl ClassWalker<'_> {
    fn visit(&mut self, node: &Node) {
        if node.is_error() || node.is_missing() {
            let line = node.start_position().row + 1;
            self.analysis.warnings.push(Warning::parse(
                &self.file.path,
                line,
                "syntax error; construct skipped",
            ));
            return;
        }

        if node.kind() == "class_definition" {
            self.visit_class(node);
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(&child);
        }
    }

    fn visit_class(&mut self, node: &Node) {
        let line_start = node.start_position().row + 1;
        let line_end = node.end_position().row + 1;

        if node.has_error() {
            let label = class_name(node, self.source).unwrap_or_else(|| "<unnamed>".to_string());
            self.analysis.warnings.push(Warning::parse(
                &self.file.path,
                line_start,
                format!("syntax error in class {}; class skipped", label),
            ));
            return;
        }

        let Some(name) = class_name(node, self.source) else {
            self.analysis.warnings.push(Warning::parse(
                &self.file.path,
                line_start,
                "class definition without a name",
            ));
            return;
        };

        let mut nested = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            collect_nested_spans(&body, &mut nested);
        }

        self.analysis.classes.push(ClassEntity {
            name,
            file: self.file.path.clone(),
            loc: count_class_loc(self.lines, line_start, line_end, &nested),
            method_count: count_methods(node),
            start_line: line_start,
            end_line: line_end,
        });
    }
}

fn class_name(node: &Node, source: &[u8]) -> Option<String> {
    let name = node.child_by_field_name("name")?;
    name.utf8_text(source).ok().map(|s| s.to_string())
}

/// Direct function definitions in the class body, decorated or not
fn count_methods(class: &Node) -> usize {
    let Some(body) = class.child_by_field_name("body") else {
        return 0;
    };

    let mut cursor = body.walk();
    body.children(&mut cursor)
        .filter(|child| match child.kind() {
            "function_definition" => true,
            "decorated_definition" => child
                .child_by_field_name("definition")
                .map_or(false, |def| def.kind() == "function_definition"),
            _ => false,
        })
        .count()
}

/// Line spans of every class nested anywhere below `node`
fn collect_nested_spans(node: &Node, spans: &mut Vec<(usize, usize)>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "class_definition" {
            spans.push((child.start_position().row + 1, child.end_position().row + 1));
        } else {
            collect_nested_spans(&child, spans);
        }
    }
}
