// Lexical helpers for the heuristic analyzer
//
// `mask_source` blanks out comments and string/template literal contents so
// that declaration patterns and brace counting only ever see code. The
// masked text has the same byte length and line structure as the input.

/// Scanner state while masking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    Str(char),
    Template,
    /// Inside `${ ... }`, with the count of open braces
    Interpolation(usize),
}

/// Replace comment and literal contents with spaces, keeping newlines and
/// byte offsets intact. Quote characters themselves are kept so literals
/// still separate tokens.
///
/// Template literals are masked whole. Their `${...}` interpolations are
/// scanned with code rules, so strings, comments and nested templates inside
/// them cannot unbalance the closing `}`.
pub fn mask_source(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut stack = vec![Mode::Code];
    let mut chars = source.chars().peekable();

    fn blank(out: &mut String, c: char) {
        if c == '\n' {
            out.push('\n');
        } else {
            for _ in 0..c.len_utf8() {
                out.push(' ');
            }
        }
    }

    fn emit(out: &mut String, c: char, hidden: bool) {
        if hidden {
            blank(out, c);
        } else {
            out.push(c);
        }
    }

    fn set_top(stack: &mut [Mode], mode: Mode) {
        if let Some(top) = stack.last_mut() {
            *top = mode;
        }
    }

    while let Some(c) = chars.next() {
        let mode = stack.last().copied().unwrap_or(Mode::Code);
        let in_template = stack.contains(&Mode::Template);

        match mode {
            Mode::Code | Mode::Interpolation(_) => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    stack.push(Mode::LineComment);
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    stack.push(Mode::BlockComment);
                }
                '"' | '\'' => {
                    emit(&mut out, c, in_template);
                    stack.push(Mode::Str(c));
                }
                '`' => {
                    emit(&mut out, c, in_template);
                    stack.push(Mode::Template);
                }
                '{' | '}' if in_template => {
                    blank(&mut out, c);
                    match (mode, c) {
                        (Mode::Interpolation(depth), '{') => {
                            set_top(&mut stack, Mode::Interpolation(depth + 1))
                        }
                        (Mode::Interpolation(0), '}') => {
                            stack.pop();
                        }
                        (Mode::Interpolation(depth), '}') => {
                            set_top(&mut stack, Mode::Interpolation(depth - 1))
                        }
                        _ => {}
                    }
                }
                _ => emit(&mut out, c, in_template),
            },
            Mode::LineComment => {
                blank(&mut out, c);
                if c == '\n' {
                    stack.pop();
                }
            }
            Mode::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    stack.pop();
                } else {
                    blank(&mut out, c);
                }
            }
            Mode::Str(quote) => {
                if c == '\\' {
                    blank(&mut out, c);
                    if let Some(escaped) = chars.next() {
                        blank(&mut out, escaped);
                    }
                } else if c == quote {
                    emit(&mut out, c, in_template);
                    stack.pop();
                } else if c == '\n' {
                    // Unterminated string literal; recover at end of line
                    out.push('\n');
                    stack.pop();
                } else {
                    blank(&mut out, c);
                }
            }
            Mode::Template => {
                if c == '\\' {
                    blank(&mut out, c);
                    if let Some(escaped) = chars.next() {
                        blank(&mut out, escaped);
                    }
                } else if c == '$' && chars.peek() == Some(&'{') {
                    chars.next();
                    out.push_str("  ");
                    stack.push(Mode::Interpolation(0));
                } else if c == '`' {
                    stack.pop();
                    emit(&mut out, c, stack.contains(&Mode::Template));
                } else {
                    blank(&mut out, c);
                }
            }
        }
    }

    out
}

/// Byte offset of the start of every line
pub fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based line number containing byte `offset`
pub fn line_of(starts: &[usize], offset: usize) -> usize {
    match starts.binary_search(&offset) {
        Ok(idx) => idx + 1,
        Err(idx) => idx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_preserves_length_and_lines() {
        let src = "let a = \"{\"; // }\n/* { */ b = `x${y}z`;\n";
        let masked = mask_source(src);
        assert_eq!(masked.len(), src.len());
        assert_eq!(masked.lines().count(), src.lines().count());
        assert!(!masked.contains('{'));
        assert!(!masked.contains('}'));
    }

    #[test]
    fn test_mask_keeps_code_braces() {
        let masked = mask_source("class A { m() { return '}'; } }");
        assert_eq!(masked.matches('{').count(), 2);
        assert_eq!(masked.matches('}').count(), 2);
    }

    #[test]
    fn test_mask_escaped_quote() {
        let masked = mask_source(r#"x = "a\"{"; y = {}"#);
        assert_eq!(masked.matches('{').count(), 1);
    }

    #[test]
    fn test_mask_nested_template() {
        let masked = mask_source("t = `a ${ {k: `b${c}`}.k } d`; { }");
        assert_eq!(masked.matches('{').count(), 1);
        assert_eq!(masked.matches('}').count(), 1);
    }

    #[test]
    fn test_mask_string_inside_interpolation() {
        let src = "const s = `${flag ? \"{\" : \"\"}`;\nclass After {\n  m() {}\n}\n";
        let masked = mask_source(src);
        assert_eq!(masked.len(), src.len());
        assert!(masked.contains("class After {"));
        assert_eq!(masked.matches('{').count(), 2);
        assert_eq!(masked.matches('}').count(), 2);
    }

    #[test]
    fn test_mask_template_inside_interpolation() {
        let src = "const s = `${ `}` }`;\nclass After {\n  m() {}\n}\n";
        let masked = mask_source(src);
        assert!(masked.contains("class After {"));
        assert!(masked.starts_with("const s = `"));
        assert!(masked.lines().next().unwrap().ends_with("`;"));
        assert_eq!(masked.matches('{').count(), 2);
    }

    #[test]
    fn test_mask_comment_inside_interpolation() {
        let masked = mask_source("t = `${ a /* } */ }`; {}");
        assert_eq!(masked.matches('{').count(), 1);
        assert_eq!(masked.matches('}').count(), 1);
        assert!(masked.ends_with("`; {}"));
    }

    #[test]
    fn test_mask_multibyte() {
        let src = "s = \"héllo {\"; {}";
        let masked = mask_source(src);
        assert_eq!(masked.len(), src.len());
        assert_eq!(masked.matches('{').count(), 1);
    }

    #[test]
    fn test_unterminated_string_recovers_at_newline() {
        let masked = mask_source("x = 'oops\nclass A {}\n");
        assert!(masked.contains("class A {}"));
    }

    #[test]
    fn test_line_of() {
        let text = "ab\ncd\n\nef";
        let starts = line_starts(text);
        assert_eq!(line_of(&starts, 0), 1);
        assert_eq!(line_of(&starts, 2), 1);
        assert_eq!(line_of(&starts, 3), 2);
        assert_eq!(line_of(&starts, 6), 3);
        assert_eq!(line_of(&starts, 7), 4);
    }
}
