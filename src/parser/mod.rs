// Per-language analyzers that turn one source file into class records

pub mod ast;
mod javascript;
mod python;
mod scan;

pub use ast::*;
pub use javascript::HeuristicAnalyzer;
pub use python::PythonAnalyzer;

use std::collections::BTreeMap;
use std::path::Path;

/// Extracts class records from a single source file.
///
/// Implementations must not fail on malformed input: anything that cannot
/// be extracted becomes a [`Warning`] in the returned [`Analysis`].
pub trait Analyzer: Send + Sync {
    fn language(&self) -> Language;
    fn extensions(&self) -> &[&str];
    fn analyze(&self, file: &SourceFile) -> Analysis;
}

/// Extension-keyed analyzer registry. Later registrations take precedence
/// over earlier ones for the same extension or language.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// Registry with every built-in analyzer
    pub fn new() -> Self {
        Self {
            analyzers: vec![
                Box::new(PythonAnalyzer::new()),
                Box::new(HeuristicAnalyzer::new(Language::JavaScript)),
                Box::new(HeuristicAnalyzer::new(Language::TypeScript)),
            ],
        }
    }

    /// Empty registry, for hosts that register their own analyzers
    pub fn empty() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn find(&self, path: &Path) -> Option<&dyn Analyzer> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.analyzers
            .iter()
            .rev()
            .find(|a| a.extensions().contains(&ext.as_str()))
            .map(|a| a.as_ref())
    }

    pub fn for_language(&self, language: Language) -> Option<&dyn Analyzer> {
        self.analyzers
            .iter()
            .rev()
            .find(|a| a.language() == language)
            .map(|a| a.as_ref())
    }

    /// Language of the analyzer that handles each registered extension
    pub fn extension_map(&self) -> BTreeMap<String, Language> {
        let mut map = BTreeMap::new();
        for analyzer in &self.analyzers {
            for ext in analyzer.extensions() {
                map.insert(ext.to_lowercase(), analyzer.language());
            }
        }
        map
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut langs: Vec<Language> = self.analyzers.iter().map(|a| a.language()).collect();
        langs.sort();
        langs.dedup();
        langs
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        self.analyzers
            .iter()
            .flat_map(|a| a.extensions().iter().copied())
            .collect()
    }

    /// Analyze a file with the analyzer registered for its extension, falling
    /// back to the one registered for its language
    pub fn analyze(&self, file: &SourceFile) -> Analysis {
        match self
            .find(&file.path)
            .or_else(|| self.for_language(file.language))
        {
            Some(analyzer) => analyzer.analyze(file),
            None => Analysis::default(),
        }
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_extension() {
        let registry = AnalyzerRegistry::new();
        let py = registry.find(Path::new("pkg/a.py")).unwrap();
        assert_eq!(py.language(), Language::Python);
        let ts = registry.find(Path::new("web/App.TSX")).unwrap();
        assert_eq!(ts.language(), Language::TypeScript);
        assert!(registry.find(Path::new("README.md")).is_none());
        assert!(registry.find(Path::new("Makefile")).is_none());
    }

    #[test]
    fn test_languages_sorted() {
        let registry = AnalyzerRegistry::new();
        assert_eq!(
            registry.languages(),
            vec![Language::Python, Language::JavaScript, Language::TypeScript]
        );
    }

    #[test]
    fn test_empty_registry_yields_nothing() {
        let registry = AnalyzerRegistry::empty();
        let file = SourceFile::new("a.py", Language::Python, "class A:\n    pass\n");
        assert!(registry.analyze(&file).is_empty());
        assert!(registry.supported_extensions().is_empty());
    }

    #[test]
    fn test_register_custom_analyzer() {
        struct Fixed;
        impl Analyzer for Fixed {
            fn language(&self) -> Language {
                Language::Python
            }
            fn extensions(&self) -> &[&str] {
                &["py"]
            }
            fn analyze(&self, file: &SourceFile) -> Analysis {
                Analysis {
                    classes: vec![ClassEntity {
                        name: "Fixed".to_string(),
                        file: file.path.clone(),
                        loc: 1,
                        method_count: 0,
                        start_line: 1,
                        end_line: 1,
                    }],
                    warnings: Vec::new(),
                }
            }
        }

        let mut registry = AnalyzerRegistry::empty();
        registry.register(Box::new(Fixed));
        let file = SourceFile::new("x.py", Language::Python, "");
        assert_eq!(registry.analyze(&file).classes[0].name, "Fixed");
    }

    struct Named {
        name: &'static str,
        extensions: &'static [&'static str],
    }

    impl Analyzer for Named {
        fn language(&self) -> Language {
            Language::Python
        }
        fn extensions(&self) -> &[&str] {
            self.extensions
        }
        fn analyze(&self, file: &SourceFile) -> Analysis {
            Analysis {
                classes: vec![ClassEntity {
                    name: self.name.to_string(),
                    file: file.path.clone(),
                    loc: 1,
                    method_count: 0,
                    start_line: 1,
                    end_line: 1,
                }],
                warnings: Vec::new(),
            }
        }
    }

    #[test]
    fn test_analyze_dispatches_by_extension() {
        let mut registry = AnalyzerRegistry::empty();
        registry.register(Box::new(Named {
            name: "ByLanguage",
            extensions: &["py"],
        }));
        registry.register(Box::new(Named {
            name: "ByExtension",
            extensions: &["pyx"],
        }));

        let cython = SourceFile::new("fast.pyx", Language::Python, "");
        assert_eq!(registry.analyze(&cython).classes[0].name, "ByExtension");

        let plain = SourceFile::new("slow.py", Language::Python, "");
        assert_eq!(registry.analyze(&plain).classes[0].name, "ByLanguage");

        // No analyzer claims the extension, so the language decides
        let stub = SourceFile::new("types.pyi", Language::Python, "");
        assert_eq!(registry.analyze(&stub).classes[0].name, "ByExtension");
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Box::new(Named {
            name: "Override",
            extensions: &["py"],
        }));
        let file = SourceFile::new("a.py", Language::Python, "class A:\n    pass\n");
        assert_eq!(registry.analyze(&file).classes[0].name, "Override");
        assert_eq!(registry.extension_map().get("pyx"), None);
        assert_eq!(registry.extension_map().get("ts"), Some(&Language::TypeScript));
    }
}
