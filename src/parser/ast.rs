// Structural model extracted from source files
//
// These types are produced by analyzers and consumed by the aggregator.
// They are never mutated after creation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Languages with a registered analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
}

impl Language {
    /// All supported languages, in a stable order
    pub const ALL: [Language; 3] = [Language::Python, Language::JavaScript, Language::TypeScript];

    /// Detect language from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TypeScript),
            _ => None,
        }
    }

    /// Detect language from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse a user-supplied language name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "javascript" | "js" => Some(Self::JavaScript),
            "typescript" | "ts" => Some(Self::TypeScript),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A source file read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    pub language: Language,
    /// Raw file contents
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, language: Language, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language,
            text: text.into(),
        }
    }

    /// Read a file from disk, detecting its language from the extension
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let language = Language::from_path(path).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("no analyzer for {}", path.display()),
            )
        })?;
        Self::read_as(path, language)
    }

    /// Read a file from disk whose language is already known
    pub fn read_as(path: &Path, language: Language) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(path, language, text))
    }
}

/// A class (or class-like type) declared in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntity {
    pub name: String,
    /// Path of the owning file
    pub file: PathBuf,
    /// Non-blank lines in the span, excluding nested classes
    pub loc: usize,
    pub method_count: usize,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
}

impl ClassEntity {
    /// Documentation anchor used by click links
    pub fn anchor(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Category of a non-fatal problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A construct could not be extracted
    Parse,
    /// The source file could not be read
    Read,
    /// Two directories collapsed into one module identity
    AggregationConflict,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parse => "parse",
            Self::Read => "read",
            Self::AggregationConflict => "aggregation-conflict",
        };
        f.write_str(s)
    }
}

/// A non-fatal problem recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub path: PathBuf,
    pub line: Option<usize>,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: Some(line),
            kind: WarningKind::Parse,
            message: message.into(),
        }
    }

    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
            kind: WarningKind::Read,
            message: message.into(),
        }
    }

    pub fn conflict(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
            kind: WarningKind::AggregationConflict,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(
                f,
                "{}:{}: [{}] {}",
                self.path.display(),
                line,
                self.kind,
                self.message
            ),
            None => write!(f, "{}: [{}] {}", self.path.display(), self.kind, self.message),
        }
    }
}

/// Output of analyzing a single file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    pub classes: Vec<ClassEntity>,
    pub warnings: Vec<Warning>,
}

impl Analysis {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.warnings.is_empty()
    }
}

/// Count lines of a class span: non-blank lines in `start..=end` that do not
/// fall inside any of the `nested` spans. Line numbers are 1-based.
pub fn count_class_loc(
    lines: &[&str],
    start: usize,
    end: usize,
    nested: &[(usize, usize)],
) -> usize {
    (start..=end)
        .filter(|&n| !nested.iter().any(|&(s, e)| n >= s && n <= e))
        .filter(|&n| {
            lines
                .get(n.saturating_sub(1))
                .map_or(false, |line| !line.trim().is_empty())
        })
        .count()
}
