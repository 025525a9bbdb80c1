// Source discovery
//
// Walks each root, keeps files whose path relative to the root matches the
// include pattern, skips excluded paths, and keeps only extensions that have
// a registered analyzer for one of the requested languages. Entries the walk
// cannot read become warnings.

use crate::error::{Error, Result};
use crate::parser::{Language, Warning};
use glob::{MatchOptions, Pattern};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file selected for analysis
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredFile {
    /// Absolute path
    pub path: PathBuf,
    /// The root it was found under
    pub root: PathBuf,
    pub language: Language,
}

/// Files selected under a set of roots
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub files: Vec<DiscoveredFile>,
    /// Directories or entries the walk could not read
    pub warnings: Vec<Warning>,
}

/// Enumerates analyzable files under a set of roots
pub struct SourceDiscovery {
    include: Pattern,
    exclude: Vec<Pattern>,
    languages: Option<BTreeSet<Language>>,
    /// Extension to language; the built-in table when unset
    extensions: Option<BTreeMap<String, Language>>,
    follow_links: bool,
}

impl SourceDiscovery {
    pub fn new(pattern: &str, exclude: &[String]) -> Result<Self> {
        let include = Pattern::new(pattern)?;
        let exclude = exclude
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            include,
            exclude,
            languages: None,
            extensions: None,
            follow_links: false,
        })
    }

    /// Restrict discovery to these languages
    pub fn with_languages(mut self, languages: Option<&[Language]>) -> Self {
        self.languages = languages.map(|l| l.iter().copied().collect());
        self
    }

    /// Classify files by this extension table, usually
    /// [`AnalyzerRegistry::extension_map`](crate::parser::AnalyzerRegistry::extension_map)
    pub fn with_extensions(mut self, extensions: BTreeMap<String, Language>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Discover files under every root, sorted by path
    pub fn discover(&self, roots: &[PathBuf]) -> Result<DiscoveryResult> {
        let mut result = DiscoveryResult::default();
        for root in roots {
            self.discover_root(root, &mut result)?;
        }
        result.files.sort();
        result.files.dedup_by(|a, b| a.path == b.path);
        Ok(result)
    }

    fn discover_root(&self, root: &Path, result: &mut DiscoveryResult) -> Result<()> {
        let root = canonical_root(root)?;

        let walker = WalkDir::new(&root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !self.is_excluded(entry.path(), &root)
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e.path().unwrap_or(&root).to_path_buf();
                    warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    result.warnings.push(Warning::read(path, e.to_string()));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(language) = self.language_of(path) else {
                continue;
            };
            if let Some(langs) = &self.languages {
                if !langs.contains(&language) {
                    continue;
                }
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            if !self.include.matches_path_with(relative, MATCH_OPTIONS) {
                continue;
            }

            debug!("Discovered {} ({})", path.display(), language);
            result.files.push(DiscoveredFile {
                path: path.to_path_buf(),
                root: root.clone(),
                language,
            });
        }

        Ok(())
    }

    fn language_of(&self, path: &Path) -> Option<Language> {
        match &self.extensions {
            Some(table) => {
                let ext = path.extension()?.to_str()?.to_lowercase();
                table.get(&ext).copied()
            }
            None => Language::from_path(path),
        }
    }

    fn is_excluded(&self, path: &Path, root: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.exclude
            .iter()
            .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
    }
}

/// Canonicalize a root so that module paths and ownership checks agree
pub fn canonical_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(Error::PathNotFound(root.to_path_buf()));
    }
    Ok(root.canonicalize()?)
}

/// Languages present in a discovered file set
pub fn languages_of(files: &[DiscoveredFile]) -> Vec<Language> {
    let set: BTreeSet<Language> = files.iter().map(|f| f.language).collect();
    set.into_iter().collect()
}
