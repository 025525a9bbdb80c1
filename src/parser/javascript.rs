// Heuristic JavaScript/TypeScript analyzer
//
// No grammar is bundled for these languages, so classes are found by
// scanning for the `class` keyword over a copy of the source with comments
// and literals blanked out (see `scan::mask_source`). A class body runs from
// the first `{` after the declaration to the brace that brings the depth
// back to zero.
//
// Known false negatives:
// - a `{` between the class name and its body (e.g. `extends mixin({ ... })`
//   or object types in generic arguments) is taken as the body start
// - regex literals containing braces are not masked
// - computed method names (`[Symbol.iterator]() {}`) and method signatures
//   whose generic parameter list spans several lines are not counted

use crate::parser::ast::*;
use crate::parser::scan::{line_of, line_starts, mask_source};
use crate::parser::Analyzer;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Upper bound on bytes examined per file by the brace scanner
pub const MAX_SCAN_BYTES: usize = 16 * 1024 * 1024;

/// How far past a member start the member patterns may look
const MEMBER_WINDOW: usize = 512;

lazy_static! {
    static ref CLASS_KEYWORD: Regex = Regex::new(r"\bclass\b").unwrap();

    /// Name after the `class` keyword
    static ref CLASS_NAME: Regex = Regex::new(r"^\s+([A-Za-z_$][\w$]*)").unwrap();

    /// `const Foo = `, `exports.Foo = `, `Foo: ` immediately before `class`
    static ref ASSIGNED_NAME: Regex = Regex::new(
        r"(?:(?:const|let|var)\s+)?([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*[:=]\s*$"
    ).unwrap();

    /// Method shorthand: `foo(`, `static async *bar<T>(`, `get baz(`
    static ref METHOD_DECL: Regex = Regex::new(
        r"^(?:(?:public|private|protected|static|async|readonly|abstract|override|declare|get|set)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*)\s*\??\s*(?:<[^>{}]*>)?\s*\("
    ).unwrap();

    /// Function-valued field: `foo = () =>`, `bar = async x =>`, `baz = function`
    static ref FUNCTION_FIELD: Regex = Regex::new(
        r"^(?:(?:public|private|protected|static|readonly|override|declare)\s+)*(#?[A-Za-z_$][\w$]*)\s*(?::[^=;{}]*)?=\s*(?:async\s+)?(?:function\b|(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=;{}]*)?=>)"
    ).unwrap();
}

/// Words that can precede `(` at member position without being a method
const NON_METHOD_WORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "new", "function", "class", "super",
    "typeof", "await", "yield", "delete", "void",
];

/// Keywords that can follow `class` in place of a name
const CLASS_HEADER_WORDS: &[&str] = &["extends", "implements"];

/// Heuristic analyzer for brace-delimited languages without a bundled parser
pub struct HeuristicAnalyzer {
    language: Language,
}

impl HeuristicAnalyzer {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl Analyzer for HeuristicAnalyzer {
    fn language(&self) -> Language {
        self.language
    }

    fn extensions(&self) -> &[&str] {
        match self.language {
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            _ => &["js", "jsx", "mjs", "cjs"],
        }
    }

    fn analyze(&self, file: &SourceFile) -> Analysis {
        let mut analysis = Analysis::default();

        let text = if file.text.len() > MAX_SCAN_BYTES {
            let mut cut = MAX_SCAN_BYTES;
            while !file.text.is_char_boundary(cut) {
                cut -= 1;
            }
            analysis.warnings.push(Warning::parse(
                &file.path,
                1,
                format!("file exceeds {} bytes; scan truncated", MAX_SCAN_BYTES),
            ));
            &file.text[..cut]
        } else {
            file.text.as_str()
        };

        let masked = mask_source(text);
        let starts = line_starts(&masked);
        let lines: Vec<&str> = text.lines().collect();
        let braces = match_braces(&masked);

        let decls = find_class_decls(&masked, &starts);
        let mut bodies: Vec<(ClassDecl, usize, usize)> = Vec::new();

        for decl in decls {
            let Some(open) = masked[decl.header_end..].find('{').map(|i| decl.header_end + i) else {
                analysis.warnings.push(Warning::parse(
                    &file.path,
                    decl.line,
                    format!("class {} has no body", decl.name),
                ));
                continue;
            };
            match braces.get(&open) {
                Some(&close) => bodies.push((decl, open, close)),
                None => analysis.warnings.push(Warning::parse(
                    &file.path,
                    decl.line,
                    format!(
                        "unterminated class body for {}; brace depth never returned to zero",
                        decl.name
                    ),
                )),
            }
        }

        for (decl, open, close) in &bodies {
            let start_line = decl.line;
            let end_line = line_of(&starts, *close);

            // Lines shared with this class's header or closing brace stay counted here
            let nested: Vec<(usize, usize)> = bodies
                .iter()
                .filter(|(_, o, c)| o > open && c < close)
                .map(|(d, _, c)| {
                    let inner_end = line_of(&starts, *c);
                    (d.line.max(start_line + 1), inner_end.min(end_line.saturating_sub(1)))
                })
                .filter(|(s, e)| s <= e)
                .collect();

            analysis.classes.push(ClassEntity {
                name: decl.name.clone(),
                file: file.path.clone(),
                loc: count_class_loc(&lines, start_line, end_line, &nested),
                method_count: count_members(&masked, *open, *close),
                start_line,
                end_line,
            });
        }

        analysis
    }
}

#[derive(Debug, Clone)]
struct ClassDecl {
    name: String,
    line: usize,
    /// Offset just past the keyword and name
    header_end: usize,
}

/// Locate `class` keywords that introduce a declaration or expression
fn find_class_decls(masked: &str, starts: &[usize]) -> Vec<ClassDecl> {
    let mut decls = Vec::new();

    for m in CLASS_KEYWORD.find_iter(masked) {
        let before = masked[..m.start()].chars().next_back();
        if matches!(before, Some('.') | Some('$') | Some('#')) {
            continue;
        }

        let rest = &masked[m.end()..];
        let next = rest.trim_start().chars().next();
        if matches!(
            next,
            Some(':') | Some('=') | Some('(') | Some(')') | Some(',') | Some(';') | Some('.') | None
        ) {
            continue;
        }

        let line = line_of(starts, m.start());
        let mut header_end = m.end();
        let mut declared = None;
        if let Some(caps) = CLASS_NAME.captures(rest) {
            let word = &caps[1];
            if !CLASS_HEADER_WORDS.contains(&word) {
                declared = Some(word.to_string());
                header_end = m.end() + caps.get(0).map_or(0, |g| g.end());
            }
        }

        let line_prefix = &masked[starts[line - 1]..m.start()];
        let assigned = ASSIGNED_NAME.captures(line_prefix).and_then(|caps| {
            caps.get(1)
                .and_then(|g| g.as_str().rsplit('.').next())
                .map(|s| s.to_string())
        });

        let name = assigned
            .or(declared)
            .unwrap_or_else(|| format!("anonymous_L{}", line));

        decls.push(ClassDecl {
            name,
            line,
            header_end,
        });
    }

    decls
}

/// Pair every `{` with its closing `}` in one pass; unmatched opens are absent
fn match_braces(masked: &str) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    let mut stack = Vec::new();
    for (i, b) in masked.bytes().enumerate() {
        match b {
            b'{' => stack.push(i),
            b'}' => {
                if let Some(open) = stack.pop() {
                    pairs.insert(open, i);
                }
            }
            _ => {}
        }
    }
    pairs
}

/// Count function-like members declared at depth one inside a class body
fn count_members(masked: &str, open: usize, close: usize) -> usize {
    let bytes = masked.as_bytes();
    let mut candidates = BTreeSet::new();
    let mut depth = 1usize;

    candidates.insert(skip_whitespace(bytes, open + 1, close));
    for i in (open + 1)..close {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 1 && matches!(bytes[i], b'\n' | b';' | b'}') {
            candidates.insert(skip_whitespace(bytes, i + 1, close));
        }
    }

    candidates
        .into_iter()
        .filter(|&pos| pos < close)
        .filter(|&pos| {
            let mut end = (pos + MEMBER_WINDOW).min(close);
            while !masked.is_char_boundary(end) {
                end -= 1;
            }
            is_function_member(&masked[pos..end])
        })
        .count()
}

fn is_function_member(member: &str) -> bool {
    if let Some(caps) = METHOD_DECL.captures(member) {
        let name = caps[1].trim_start_matches('#');
        if !NON_METHOD_WORDS.contains(&name) {
            return true;
        }
    }
    FUNCTION_FIELD.is_match(member)
}

fn skip_whitespace(bytes: &[u8], mut pos: usize, limit: usize) -> usize {
    while pos < limit && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}
