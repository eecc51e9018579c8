//! JavaScript / TypeScript extraction
//!
//! A single lexical pass classifies every byte as code, comment or string
//! literal and records the brace depth before it. Regexes then run over a
//! copy with comments blanked, and matches are accepted only when they start
//! in code at the expected depth.

use super::{line_of_offset, line_starts, LanguageParser};
use crate::models::{Component, ComponentKind};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

static CLASS_DECL: OnceLock<Regex> = OnceLock::new();
static METHOD_DECL: OnceLock<Regex> = OnceLock::new();
static FUNCTION_DECL: OnceLock<Regex> = OnceLock::new();
static FUNCTION_EXPR: OnceLock<Regex> = OnceLock::new();
static ARROW_FN: OnceLock<Regex> = OnceLock::new();
static VARIABLE_DECL: OnceLock<Regex> = OnceLock::new();
static IMPORT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn class_decl() -> &'static Regex {
    CLASS_DECL.get_or_init(|| Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)[^{;]*\{").unwrap())
}

fn method_decl() -> &'static Regex {
    METHOD_DECL.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:(?:static|async|get|set|public|private|protected|readonly|override)\s+)*\*?(#?[A-Za-z_$][\w$]*)\s*(?:<[^>\n]*>)?\([^)]*\)\s*(?::[^{;\n]*)?\{",
        )
        .unwrap()
    })
}

fn function_decl() -> &'static Regex {
    FUNCTION_DECL.get_or_init(|| {
        Regex::new(r"\bfunction\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>\n]*>)?\(").unwrap()
    })
}

fn function_expr() -> &'static Regex {
    FUNCTION_EXPR.get_or_init(|| {
        Regex::new(
            r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=\n]+)?=\s*(?:async\s+)?function\b",
        )
        .unwrap()
    })
}

fn arrow_fn() -> &'static Regex {
    ARROW_FN.get_or_init(|| {
        Regex::new(
            r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=\n]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=\n]+)?=>",
        )
        .unwrap()
    })
}

fn variable_decl() -> &'static Regex {
    VARIABLE_DECL.get_or_init(|| {
        Regex::new(r"(?m)^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)").unwrap()
    })
}

fn import_patterns() -> &'static [Regex] {
    IMPORT_PATTERNS.get_or_init(|| {
        [
            // ES6 imports, including side-effect `import './x'`
            r#"\bimport\s+(?:type\s+)?(?:[\w$*{}\s,]+?\s+from\s+)?['"]([^'"\n]+)['"]"#,
            // Dynamic imports
            r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#,
            // CommonJS
            r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#,
            // Re-exports
            r#"\bexport\s+(?:type\s+)?(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s+['"]([^'"\n]+)['"]"#,
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

const NOT_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteKind {
    Code,
    Comment,
    Str,
}

/// Lexically classified source
struct JsSource {
    /// Source with comment bytes replaced by spaces (newlines kept)
    stripped: String,
    kinds: Vec<ByteKind>,
    /// Brace depth before each byte
    depth: Vec<u32>,
    line_starts: Vec<usize>,
}

impl JsSource {
    fn new(content: &str) -> Self {
        let bytes = content.as_bytes();
        let mut stripped = bytes.to_vec();
        let mut kinds = vec![ByteKind::Code; bytes.len()];
        let mut depth = vec![0u32; bytes.len()];
        let mut current: u32 = 0;
        let mut i = 0;

        while i < bytes.len() {
            depth[i] = current;
            let b = bytes[i];
            let next = bytes.get(i + 1).copied();
            match b {
                b'/' if next == Some(b'/') => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        kinds[i] = ByteKind::Comment;
                        stripped[i] = b' ';
                        depth[i] = current;
                        i += 1;
                    }
                    continue;
                }
                b'/' if next == Some(b'*') => {
                    let start = i;
                    i += 2;
                    while i < bytes.len() && !(bytes[i - 1] == b'*' && bytes[i] == b'/' && i > start + 2) {
                        i += 1;
                    }
                    let end = (i + 1).min(bytes.len());
                    for j in start..end {
                        kinds[j] = ByteKind::Comment;
                        depth[j] = current;
                        if stripped[j] != b'\n' {
                            stripped[j] = b' ';
                        }
                    }
                    i = end;
                    continue;
                }
                b'"' | b'\'' | b'`' => {
                    let quote = b;
                    kinds[i] = ByteKind::Str;
                    i += 1;
                    while i < bytes.len() {
                        kinds[i] = ByteKind::Str;
                        depth[i] = current;
                        if bytes[i] == b'\\' {
                            if i + 1 < bytes.len() {
                                kinds[i + 1] = ByteKind::Str;
                                depth[i + 1] = current;
                            }
                            i += 2;
                            continue;
                        }
                        if bytes[i] == quote || (bytes[i] == b'\n' && quote != b'`') {
                            break;
                        }
                        i += 1;
                    }
                    i += 1;
                    continue;
                }
                b'{' => current += 1,
                b'}' => current = current.saturating_sub(1),
                _ => {}
            }
            i += 1;
        }

        Self {
            stripped: String::from_utf8_lossy(&stripped).into_owned(),
            kinds,
            depth,
            line_starts: line_starts(content),
        }
    }

    fn is_code(&self, offset: usize) -> bool {
        self.kinds.get(offset) == Some(&ByteKind::Code)
    }

    fn depth_at(&self, offset: usize) -> u32 {
        self.depth.get(offset).copied().unwrap_or(0)
    }

    fn line(&self, offset: usize) -> u32 {
        line_of_offset(&self.line_starts, offset)
    }

    /// Offset of the `}` closing the brace opened at `open`.
    fn matching_brace(&self, open: usize) -> Option<usize> {
        let inner = self.depth_at(open) + 1;
        let bytes = self.stripped.as_bytes();
        (open + 1..bytes.len())
            .find(|&j| bytes[j] == b'}' && self.is_code(j) && self.depth_at(j) == inner)
    }

    /// First code `{` at or after `from` sitting at `depth`.
    fn next_open_brace(&self, from: usize, depth: u32) -> Option<usize> {
        let bytes = self.stripped.as_bytes();
        (from..bytes.len())
            .find(|&j| bytes[j] == b'{' && self.is_code(j) && self.depth_at(j) == depth)
    }

    /// Last line of a block opened at `open`, or `fallback` if unbalanced.
    fn block_end_line(&self, open: usize, fallback: u32) -> u32 {
        self.matching_brace(open)
            .map(|close| self.line(close))
            .unwrap_or(fallback)
    }

    fn last_line(&self) -> u32 {
        self.line_starts.len() as u32
    }
}

/// Top-level function components, sorted by position
fn top_level_functions(source: &JsSource, file_path: &str) -> Vec<Component> {
    let text = source.stripped.as_str();
    let mut found: Vec<(usize, Component)> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for (pattern, is_arrow) in [(function_decl(), false), (function_expr(), false), (arrow_fn(), true)] {
        for caps in pattern.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let start = whole.start();
            if !source.is_code(start) || source.depth_at(start) != 0 {
                continue;
            }
            if !seen.insert(name.as_str().to_string()) {
                continue;
            }
            let start_line = source.line(start);
            let end_line = if is_arrow {
                let after = text[whole.end()..].trim_start();
                let open = text.len() - after.len();
                if after.starts_with('{') {
                    source.block_end_line(open, start_line)
                } else {
                    start_line
                }
            } else {
                match source.next_open_brace(whole.end(), 0) {
                    Some(open) => source.block_end_line(open, source.last_line()),
                    None => start_line,
                }
            };
            found.push((
                start,
                Component::new(
                    file_path,
                    name.as_str(),
                    name.as_str(),
                    ComponentKind::Function,
                    start_line,
                    end_line,
                ),
            ));
        }
    }

    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, c)| c).collect()
}

fn top_level_classes(source: &JsSource, file_path: &str) -> Vec<(usize, Component)> {
    let text = source.stripped.as_str();
    let mut classes = Vec::new();

    for caps in class_decl().captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let start = whole.start();
        if !source.is_code(start) || source.depth_at(start) != 0 {
            continue;
        }
        let open = whole.end() - 1;
        let close = source.matching_brace(open);
        let start_line = source.line(start);
        let end_line = close.map(|c| source.line(c)).unwrap_or(source.last_line());

        let mut class = Component::new(
            file_path,
            name.as_str(),
            name.as_str(),
            ComponentKind::Class,
            start_line,
            end_line,
        );

        if let Some(close) = close {
            let body_depth = source.depth_at(open) + 1;
            let body = &text[open + 1..close];
            for m in method_decl().captures_iter(body) {
                let (Some(whole), Some(method)) = (m.get(0), m.get(1)) else {
                    continue;
                };
                let method_name = method.as_str();
                if NOT_METHODS.contains(&method_name) {
                    continue;
                }
                let name_offset = open + 1 + method.start();
                if !source.is_code(name_offset) || source.depth_at(name_offset) != body_depth {
                    continue;
                }
                let method_open = open + 1 + whole.end() - 1;
                let method_start = source.line(name_offset);
                class.components.push(Component::new(
                    file_path,
                    &format!("{}.{}", class.name, method_name),
                    method_name,
                    ComponentKind::Method,
                    method_start,
                    source.block_end_line(method_open, method_start),
                ));
            }
        }
        classes.push((start, class));
    }
    classes
}

/// Heuristic extractor for JavaScript and TypeScript sources
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaScriptParser;

impl LanguageParser for JavaScriptParser {
    fn extract_components(&self, file_path: &str, content: &str) -> Vec<Component> {
        let source = JsSource::new(content);
        let mut components: Vec<(u32, Component)> = top_level_classes(&source, file_path)
            .into_iter()
            .map(|(_, c)| (c.line_start, c))
            .collect();
        components.extend(
            top_level_functions(&source, file_path)
                .into_iter()
                .map(|c| (c.line_start, c)),
        );
        components.sort_by_key(|(line, _)| *line);
        components.into_iter().map(|(_, c)| c).collect()
    }

    fn extract_imports(&self, content: &str) -> Vec<String> {
        let source = JsSource::new(content);
        let mut found: Vec<(usize, String)> = Vec::new();
        for pattern in import_patterns() {
            for caps in pattern.captures_iter(&source.stripped) {
                let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if source.is_code(whole.start()) {
                    found.push((whole.start(), spec.as_str().to_string()));
                }
            }
        }
        found.sort_by_key(|(offset, _)| *offset);
        found.into_iter().map(|(_, spec)| spec).collect()
    }

    fn comment_lines(&self, content: &str) -> usize {
        let source = JsSource::new(content);
        let bytes = content.as_bytes();
        let mut count = 0;
        for (idx, &start) in source.line_starts.iter().enumerate() {
            let end = source
                .line_starts
                .get(idx + 1)
                .map(|next| next - 1)
                .unwrap_or(bytes.len());
            let mut has_comment = false;
            let mut has_code = false;
            for j in start..end {
                match source.kinds[j] {
                    ByteKind::Comment => has_comment = true,
                    _ if !bytes[j].is_ascii_whitespace() => has_code = true,
                    _ => {}
                }
            }
            if has_comment && !has_code {
                count += 1;
            }
        }
        count
    }

    fn top_level_identifiers(&self, content: &str) -> usize {
        let source = JsSource::new(content);
        let functions: FxHashSet<String> = top_level_functions(&source, "")
            .into_iter()
            .map(|c| c.name)
            .collect();
        let classes = top_level_classes(&source, "").len();

        let variables = variable_decl()
            .captures_iter(&source.stripped)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                (source.is_code(whole.start()) && source.depth_at(whole.start()) == 0)
                    .then(|| name.as_str().to_string())
            })
            .filter(|name| !functions.contains(name))
            .count();

        classes + functions.len() + variables
    }

    fn semantic_text(&self, content: &str) -> String {
        static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();
        static BLOCK_COMMENT: OnceLock<Regex> = OnceLock::new();
        static FUNCTION_NAME: OnceLock<Regex> = OnceLock::new();
        static CLASS_NAME: OnceLock<Regex> = OnceLock::new();
        static IMPORT_FROM: OnceLock<Regex> = OnceLock::new();

        let line_comment = LINE_COMMENT.get_or_init(|| Regex::new(r"//\s*(.+)").unwrap());
        let block_comment = BLOCK_COMMENT.get_or_init(|| Regex::new(r"(?s)/\*(.*?)\*/").unwrap());
        let function_name = FUNCTION_NAME.get_or_init(|| {
            Regex::new(
                r"(?:function\s+(\w+)|(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?(?:function|\([^)]*\)\s*=>))",
            )
            .unwrap()
        });
        let class_name = CLASS_NAME.get_or_init(|| Regex::new(r"\bclass\s+(\w+)").unwrap());
        let import_from = IMPORT_FROM
            .get_or_init(|| Regex::new(r#"import\s+[^;]+from\s+['"]([^'"]+)['"]"#).unwrap());

        let mut parts: Vec<String> = Vec::new();
        parts.extend(line_comment.captures_iter(content).map(|c| c[1].trim().to_string()));
        parts.extend(block_comment.captures_iter(content).map(|c| c[1].trim().to_string()));
        for caps in function_name.captures_iter(content) {
            if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
                parts.push(format!("function {}", name.as_str()));
            }
        }
        parts.extend(class_name.captures_iter(content).map(|c| format!("class {}", &c[1])));
        parts.extend(import_from.captures_iter(content).map(|c| format!("imports from {}", &c[1])));
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"// Widget rendering
import React from 'react';
import { helper } from './utils';
import './styles.css';
const lazy = () => import("./lazy");
const fs = require('fs');
export * from '../shared';

/* block
   comment */
export class Widget extends Base {
  constructor(props) {
    super(props);
  }

  render() {
    if (this.ok) {
      return helper("{");
    }
    return null;
  }
}

function build(options) {
  return new Widget(options);
}

export const VERSION = "1.0";
const handler = async (event) => {
  return event;
};
"#;

    #[test]
    fn test_extract_imports_in_source_order() {
        let imports = JavaScriptParser.extract_imports(SAMPLE);
        assert_eq!(
            imports,
            vec!["react", "./utils", "./styles.css", "./lazy", "fs", "../shared"]
        );
    }

    #[test]
    fn test_imports_in_comments_and_strings_are_ignored() {
        let content = "// import a from './a';\nconst s = \"require('./b')\";\n/* import './c' */\n";
        assert!(JavaScriptParser.extract_imports(content).is_empty());
    }

    #[test]
    fn test_extract_components() {
        let components = JavaScriptParser.extract_components("w.js", SAMPLE);
        let summary: Vec<(String, u32, u32)> = components
            .iter()
            .flat_map(|c| c.flatten())
            .map(|c| (c.id.clone(), c.line_start, c.line_end))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("w.js:lazy".to_string(), 5, 5),
                ("w.js:Widget".to_string(), 11, 22),
                ("w.js:Widget.constructor".to_string(), 12, 14),
                ("w.js:Widget.render".to_string(), 16, 21),
                ("w.js:build".to_string(), 24, 26),
                ("w.js:handler".to_string(), 29, 31),
            ]
        );
    }

    #[test]
    fn test_comment_lines() {
        // line comment + two block comment lines
        assert_eq!(JavaScriptParser.comment_lines(SAMPLE), 3);
    }

    #[test]
    fn test_top_level_identifiers() {
        // Widget, lazy, build, handler, fs, VERSION
        assert_eq!(JavaScriptParser.top_level_identifiers(SAMPLE), 6);
    }

    #[test]
    fn test_semantic_text() {
        let text = JavaScriptParser.semantic_text(SAMPLE);
        assert!(text.contains("Widget rendering"));
        assert!(text.contains("class Widget"));
        assert!(text.contains("function build"));
        assert!(text.contains("imports from ./utils"));
    }
}
