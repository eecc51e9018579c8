//! Python extraction
//!
//! Works on an indentation model of the file: each physical line is tagged
//! with its indent, whether it begins a new logical line, and its code with
//! comments dropped and string literals blanked. Blocks end at the next
//! logical line indented at or left of their header.

use super::LanguageParser;
use crate::models::{Component, ComponentKind};
use regex::Regex;
use std::sync::OnceLock;

static DEF_HEADER: OnceLock<Regex> = OnceLock::new();
static CLASS_HEADER: OnceLock<Regex> = OnceLock::new();
static ASSIGNMENT: OnceLock<Regex> = OnceLock::new();
static FROM_IMPORT: OnceLock<Regex> = OnceLock::new();
static DOTTED_NAME: OnceLock<Regex> = OnceLock::new();

fn def_header() -> &'static Regex {
    DEF_HEADER.get_or_init(|| Regex::new(r"^(?:async\s+)?def\s+(\w+)").unwrap())
}

fn class_header() -> &'static Regex {
    CLASS_HEADER.get_or_init(|| Regex::new(r"^class\s+(\w+)").unwrap())
}

fn assignment() -> &'static Regex {
    ASSIGNMENT.get_or_init(|| Regex::new(r"^([A-Za-z_]\w*)\s*(?::[^=]+)?=(?:[^=]|$)").unwrap())
}

fn from_import() -> &'static Regex {
    FROM_IMPORT.get_or_init(|| Regex::new(r"^from\s+([\w./]+)\s+import\s+(.+)$").unwrap())
}

fn dotted_name() -> &'static Regex {
    DOTTED_NAME.get_or_init(|| Regex::new(r"^[A-Za-z_][\w.]*$").unwrap())
}

/// One physical line of a Python file
#[derive(Debug)]
struct SourceLine<'a> {
    text: &'a str,
    /// Comments removed, string literals replaced by `""`
    code: String,
    indent: usize,
    /// Begins a new logical line (not inside brackets, strings or after `\`)
    clean_start: bool,
    /// Part of a triple-quoted string
    in_string: bool,
}

impl SourceLine<'_> {
    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Starts a statement that carries code.
    fn is_statement(&self) -> bool {
        self.clean_start && !self.code.trim().is_empty()
    }

    fn statement(&self) -> &str {
        self.code.trim_start()
    }
}

fn indent_width(text: &str) -> usize {
    let mut col = 0;
    for c in text.chars() {
        match c {
            ' ' => col += 1,
            '\t' => col = (col / 8 + 1) * 8,
            _ => break,
        }
    }
    col
}

fn scan(content: &str) -> Vec<SourceLine<'_>> {
    let mut lines = Vec::new();
    let mut triple: Option<&'static str> = None;
    let mut depth: i32 = 0;
    let mut continued = false;

    for text in content.lines() {
        let clean_start = triple.is_none() && depth == 0 && !continued;
        let mut in_string = triple.is_some();
        let mut code = String::new();
        let mut i = 0;

        while i < text.len() {
            let rest = &text[i..];
            if let Some(quote) = triple {
                match rest.find(quote) {
                    Some(pos) => {
                        i += pos + quote.len();
                        triple = None;
                        continue;
                    }
                    None => break,
                }
            }
            if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
                let quote = if rest.starts_with("\"\"\"") { "\"\"\"" } else { "'''" };
                triple = Some(quote);
                in_string = true;
                code.push_str("\"\"");
                i += quote.len();
                continue;
            }
            let Some(c) = rest.chars().next() else { break };
            match c {
                '#' => break,
                '"' | '\'' => {
                    i = skip_string(text, i, c);
                    code.push_str("\"\"");
                    continue;
                }
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = (depth - 1).max(0),
                _ => {}
            }
            code.push(c);
            i += c.len_utf8();
        }

        continued = triple.is_none() && code.trim_end().ends_with('\\');
        lines.push(SourceLine {
            text,
            code,
            indent: indent_width(text),
            clean_start,
            in_string,
        });
    }
    lines
}

/// Byte index just past a single-line string literal opened at `start`.
fn skip_string(text: &str, start: usize, quote: char) -> usize {
    let mut escaped = false;
    for (offset, c) in text[start + 1..].char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return start + 1 + offset + c.len_utf8();
        }
    }
    text.len()
}

/// Index of the last line belonging to the block headed at `header`,
/// searching no further than `limit` (exclusive).
fn block_end(lines: &[SourceLine], header: usize, limit: usize) -> usize {
    let indent = lines[header].indent;
    let mut last = header;
    for (idx, line) in lines.iter().enumerate().take(limit).skip(header + 1) {
        if line.is_blank() {
            continue;
        }
        if line.is_statement() && line.indent <= indent {
            break;
        }
        if !line.clean_start || line.indent > indent {
            last = idx;
        }
    }
    last
}

fn extract_methods(
    lines: &[SourceLine],
    file_path: &str,
    class: &mut Component,
    header: usize,
    end: usize,
) {
    let class_indent = lines[header].indent;
    let body_indent = lines[header + 1..=end]
        .iter()
        .find(|l| l.is_statement() && l.indent > class_indent)
        .map(|l| l.indent);
    let Some(body_indent) = body_indent else {
        return;
    };

    for idx in header + 1..=end {
        let line = &lines[idx];
        if !line.is_statement() || line.indent != body_indent {
            continue;
        }
        if let Some(caps) = def_header().captures(line.statement()) {
            let name = &caps[1];
            let method_end = block_end(lines, idx, end + 1);
            class.components.push(Component::new(
                file_path,
                &format!("{}.{}", class.name, name),
                name,
                ComponentKind::Method,
                idx as u32 + 1,
                method_end as u32 + 1,
            ));
        }
    }
}

/// Parse one logical import statement into module specifiers.
fn parse_import_statement(statement: &str, out: &mut Vec<String>) {
    let statement = statement.trim();
    if let Some(caps) = from_import().captures(statement) {
        let module = &caps[1];
        if module.chars().all(|c| c == '.') {
            for name in imported_names(&caps[2]) {
                if name == "*" {
                    out.push(module.to_string());
                } else if dotted_name().is_match(&name) {
                    out.push(format!("{}{}", module, name));
                }
            }
        } else {
            out.push(module.to_string());
        }
    } else if let Some(rest) = statement.strip_prefix("import ") {
        for name in imported_names(rest) {
            if dotted_name().is_match(&name) {
                out.push(name);
            }
        }
    }
}

/// Names of an import list, with parentheses and `as` aliases removed.
fn imported_names(list: &str) -> Vec<String> {
    list.replace(['(', ')', '\\'], " ")
        .split(',')
        .filter_map(|item| item.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Heuristic extractor for Python sources
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonParser;

impl LanguageParser for PythonParser {
    fn extract_components(&self, file_path: &str, content: &str) -> Vec<Component> {
        let lines = scan(content);
        let mut components = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if !line.is_statement() || line.indent != 0 {
                continue;
            }
            let statement = line.statement();
            if let Some(caps) = class_header().captures(statement) {
                let name = &caps[1];
                let end = block_end(&lines, idx, lines.len());
                let mut class = Component::new(
                    file_path,
                    name,
                    name,
                    ComponentKind::Class,
                    idx as u32 + 1,
                    end as u32 + 1,
                );
                if end > idx {
                    extract_methods(&lines, file_path, &mut class, idx, end);
                }
                components.push(class);
            } else if let Some(caps) = def_header().captures(statement) {
                let name = &caps[1];
                let end = block_end(&lines, idx, lines.len());
                components.push(Component::new(
                    file_path,
                    name,
                    name,
                    ComponentKind::Function,
                    idx as u32 + 1,
                    end as u32 + 1,
                ));
            }
        }
        components
    }

    fn extract_imports(&self, content: &str) -> Vec<String> {
        let lines = scan(content);
        let mut statements: Vec<String> = Vec::new();
        let mut current = String::new();

        for line in &lines {
            if line.clean_start && !current.is_empty() {
                statements.push(std::mem::take(&mut current));
            }
            if line.clean_start || !current.is_empty() {
                current.push(' ');
                current.push_str(line.code.trim().trim_end_matches('\\'));
            }
        }
        if !current.is_empty() {
            statements.push(current);
        }

        let mut imports = Vec::new();
        for logical in &statements {
            for statement in logical.split(';') {
                parse_import_statement(statement, &mut imports);
            }
        }
        imports
    }

    fn comment_lines(&self, content: &str) -> usize {
        scan(content)
            .iter()
            .filter(|l| l.in_string || l.text.trim_start().starts_with('#'))
            .count()
    }

    fn top_level_identifiers(&self, content: &str) -> usize {
        scan(content)
            .iter()
            .filter(|l| l.is_statement() && l.indent == 0)
            .filter(|l| {
                let s = l.statement();
                class_header().is_match(s) || def_header().is_match(s) || assignment().is_match(s)
            })
            .count()
    }

    fn extract_calls(&self, content: &str, components: &[Component]) -> Vec<(String, String)> {
        let lines = scan(content);
        let all: Vec<&Component> = components.iter().flat_map(|c| c.flatten()).collect();

        let callees: Vec<(&Component, Regex)> = all
            .iter()
            .filter_map(|c| {
                Regex::new(&format!(r"\b{}\s*\(", regex::escape(&c.name)))
                    .ok()
                    .map(|re| (*c, re))
            })
            .collect();

        let mut calls = Vec::new();
        for caller in all.iter().filter(|c| {
            matches!(c.kind, ComponentKind::Function | ComponentKind::Method)
        }) {
            // Body only; the header would match same-named callees
            let start = caller.line_start as usize;
            let end = (caller.line_end as usize).min(lines.len());
            if start >= end {
                continue;
            }
            let body: Vec<&str> = lines[start..end].iter().map(|l| l.code.as_str()).collect();
            let body = body.join("\n");

            for (callee, pattern) in &callees {
                if callee.id == caller.id {
                    continue;
                }
                for _ in pattern.find_iter(&body) {
                    calls.push((caller.id.clone(), callee.id.clone()));
                }
            }
        }
        calls
    }

    fn semantic_text(&self, content: &str) -> String {
        static DOCSTRING: OnceLock<Regex> = OnceLock::new();
        static COMMENT: OnceLock<Regex> = OnceLock::new();
        static DEF_NAME: OnceLock<Regex> = OnceLock::new();
        static CLASS_NAME: OnceLock<Regex> = OnceLock::new();
        static IMPORT_LINE: OnceLock<Regex> = OnceLock::new();

        let docstring = DOCSTRING.get_or_init(|| Regex::new(r#"(?s)"""(.*?)""""#).unwrap());
        let comment = COMMENT.get_or_init(|| Regex::new(r"#\s*(.+)").unwrap());
        let def_name = DEF_NAME.get_or_init(|| Regex::new(r"\bdef\s+(\w+)").unwrap());
        let class_name = CLASS_NAME.get_or_init(|| Regex::new(r"\bclass\s+(\w+)").unwrap());
        let import_line = IMPORT_LINE.get_or_init(|| {
            Regex::new(r"(?m)^\s*(?:from\s+(\S+)\s+)?import\s+([^\n]+)").unwrap()
        });

        let mut parts: Vec<String> = Vec::new();
        parts.extend(docstring.captures_iter(content).map(|c| c[1].trim().to_string()));
        parts.extend(comment.captures_iter(content).map(|c| c[1].trim().to_string()));
        parts.extend(def_name.captures_iter(content).map(|c| format!("function {}", &c[1])));
        parts.extend(class_name.captures_iter(content).map(|c| format!("class {}", &c[1])));
        for caps in import_line.captures_iter(content) {
            if let Some(module) = caps.get(1) {
                parts.push(format!("imports from {}", module.as_str()));
            }
            parts.push(format!("imports {}", caps[2].trim()));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#""""Service module."""
import os
from .models import User

MAX_RETRIES = 3


class UserService:
    """Manages users."""

    def __init__(self, repo):
        self.repo = repo

    def find(self, name):
        # look the user up
        return self.repo.get(name)

    async def refresh(self):
        return self.find("me")


def build_service(
    repo,
):
    return UserService(repo)


async def main():
    service = build_service(None)
    service.refresh()
"#;

    fn names(components: &[Component]) -> Vec<(String, u32, u32)> {
        components
            .iter()
            .flat_map(|c| c.flatten())
            .map(|c| (c.id.clone(), c.line_start, c.line_end))
            .collect()
    }

    #[test]
    fn test_extracts_classes_methods_and_functions() {
        let components = PythonParser.extract_components("svc.py", SAMPLE);
        assert_eq!(
            names(&components),
            vec![
                ("svc.py:UserService".to_string(), 8, 19),
                ("svc.py:UserService.__init__".to_string(), 11, 12),
                ("svc.py:UserService.find".to_string(), 14, 16),
                ("svc.py:UserService.refresh".to_string(), 18, 19),
                ("svc.py:build_service".to_string(), 22, 25),
                ("svc.py:main".to_string(), 28, 30),
            ]
        );
        assert_eq!(components[0].kind, ComponentKind::Class);
        assert_eq!(components[0].components[2].kind, ComponentKind::Method);
        assert_eq!(components[1].kind, ComponentKind::Function);
    }

    #[test]
    fn test_single_line_function() {
        let components = PythonParser.extract_components("a.py", "def f(): return 1\nx = f()\n");
        assert_eq!(names(&components), vec![("a.py:f".to_string(), 1, 1)]);
    }

    #[test]
    fn test_docstring_at_column_zero_does_not_end_block() {
        let content = "def f():\n    \"\"\"\nDoc at column zero.\n\"\"\"\n    return 1\n";
        let components = PythonParser.extract_components("a.py", content);
        assert_eq!(names(&components), vec![("a.py:f".to_string(), 1, 5)]);
    }

    #[test]
    fn test_extract_imports() {
        let content = r#"import os, sys as system
import utils.helpers
from ..models.user import User
from . import b, c as sea
from .. import *
from pkg import (
    one,
    two,
)
x = 1; import json
# import commented_out
s = "import not_an_import"
def f():
    from lazy import thing
"#;
        let imports = PythonParser.extract_imports(content);
        assert_eq!(
            imports,
            vec![
                "os",
                "sys",
                "utils.helpers",
                "..models.user",
                ".b",
                ".c",
                "..",
                "pkg",
                "json",
                "lazy",
            ]
        );
    }

    #[test]
    fn test_repeated_imports_are_reported_per_occurrence() {
        let imports = PythonParser.extract_imports("import b\nimport b\n");
        assert_eq!(imports, vec!["b", "b"]);
    }

    #[test]
    fn test_metrics() {
        assert_eq!(PythonParser.comment_lines(SAMPLE), 3);
        // MAX_RETRIES, UserService, build_service, main
        assert_eq!(PythonParser.top_level_identifiers(SAMPLE), 4);
    }

    #[test]
    fn test_extract_calls_counts_call_sites() {
        let components = PythonParser.extract_components("svc.py", SAMPLE);
        let calls = PythonParser.extract_calls(SAMPLE, &components);

        assert!(calls.contains(&(
            "svc.py:UserService.refresh".to_string(),
            "svc.py:UserService.find".to_string()
        )));
        assert!(calls.contains(&(
            "svc.py:build_service".to_string(),
            "svc.py:UserService".to_string()
        )));
        assert!(calls.contains(&("svc.py:main".to_string(), "svc.py:build_service".to_string())));
        assert!(calls.contains(&(
            "svc.py:main".to_string(),
            "svc.py:UserService.refresh".to_string()
        )));
        assert!(!calls.iter().any(|(caller, callee)| caller == callee));
    }

    #[test]
    fn test_semantic_text() {
        let text = PythonParser.semantic_text(SAMPLE);
        assert!(text.contains("Service module."));
        assert!(text.contains("class UserService"));
        assert!(text.contains("function build_service"));
        assert!(text.contains("imports from .models"));
    }
}
