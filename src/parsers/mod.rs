//! Heuristic source analysis
//!
//! Line-oriented extractors for components (classes, functions, methods),
//! import specifiers, intra-file calls and per-file metrics. Input they
//! cannot make sense of is skipped, never reported as an error.

pub mod javascript;
pub mod python;

use crate::models::{Component, FileMetrics};
use regex::Regex;
use std::sync::OnceLock;

/// Bytes inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 1024;

/// Language family of a file, keyed on extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Other,
}

impl Language {
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(|e| e.to_ascii_lowercase()).as_deref() {
            Some("py") | Some("pyi") => Language::Python,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            Some("ts") | Some("tsx") => Language::TypeScript,
            _ => Language::Other,
        }
    }

    pub fn from_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        Self::from_extension(crate::models::extension_of(name).as_deref())
    }

    /// JavaScript and TypeScript share import semantics.
    pub fn is_javascript_like(self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }
}

/// A per-language extraction strategy
pub trait LanguageParser: Send + Sync {
    /// Top-level components, with methods nested one level under classes.
    fn extract_components(&self, file_path: &str, content: &str) -> Vec<Component>;

    /// Raw import specifiers, in source order, one entry per occurrence.
    fn extract_imports(&self, content: &str) -> Vec<String>;

    fn comment_lines(&self, content: &str) -> usize;

    fn top_level_identifiers(&self, content: &str) -> usize;

    /// `(caller_id, callee_id)` pairs, one per call site.
    fn extract_calls(&self, _content: &str, _components: &[Component]) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Names, comments and docstrings that describe what the file is about.
    fn semantic_text(&self, content: &str) -> String;
}

/// Parser for a language, if one exists.
pub fn parser_for(language: Language) -> Option<&'static dyn LanguageParser> {
    static PYTHON: python::PythonParser = python::PythonParser;
    static JAVASCRIPT: javascript::JavaScriptParser = javascript::JavaScriptParser;

    match language {
        Language::Python => Some(&PYTHON),
        Language::JavaScript | Language::TypeScript => Some(&JAVASCRIPT),
        Language::Other => None,
    }
}

/// Everything content analysis learns about one file
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    pub components: Vec<Component>,
    pub imports: Vec<String>,
    pub calls: Vec<(String, String)>,
    pub metrics: FileMetrics,
}

/// Analyze a decoded file. Languages without a parser get line metrics only.
pub fn analyze_source(file_path: &str, content: &str) -> FileAnalysis {
    let mut metrics = FileMetrics {
        lines_of_code: Some(content.lines().count()),
        empty_lines: Some(content.lines().filter(|l| l.trim().is_empty()).count()),
        ..Default::default()
    };

    let Some(parser) = parser_for(Language::from_path(file_path)) else {
        return FileAnalysis {
            metrics,
            ..Default::default()
        };
    };

    metrics.comment_lines = Some(parser.comment_lines(content));
    metrics.top_level_identifiers = Some(parser.top_level_identifiers(content));

    let components = parser.extract_components(file_path, content);
    let imports = parser.extract_imports(content);
    let calls = parser.extract_calls(content, &components);

    FileAnalysis {
        components,
        imports,
        calls,
        metrics,
    }
}

/// Text handed to the embedding provider for a file.
pub fn semantic_text(file_path: &str, content: &str) -> String {
    match parser_for(Language::from_path(file_path)) {
        Some(parser) => parser.semantic_text(content),
        None => generic_semantic_text(content),
    }
}

/// Comments and definition names for languages without a dedicated parser.
pub fn generic_semantic_text(content: &str) -> String {
    static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();
    static BLOCK_COMMENT: OnceLock<Regex> = OnceLock::new();
    static DEFINITION: OnceLock<Regex> = OnceLock::new();

    let line_comment = LINE_COMMENT.get_or_init(|| Regex::new(r"(?://|#)\s*(.+)").unwrap());
    let block_comment = BLOCK_COMMENT.get_or_init(|| Regex::new(r"(?s)/\*(.*?)\*/").unwrap());
    let definition = DEFINITION.get_or_init(|| {
        Regex::new(r"(?i)\b(?:function|def|fn|class|struct)\s+(\w+)").unwrap()
    });

    let mut parts: Vec<String> = Vec::new();
    parts.extend(line_comment.captures_iter(content).map(|c| c[1].trim().to_string()));
    parts.extend(block_comment.captures_iter(content).map(|c| c[1].trim().to_string()));
    parts.extend(definition.captures_iter(content).map(|c| format!("defines {}", &c[1])));
    parts.join(" ")
}

/// A NUL byte near the start marks a file as binary.
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of_offset(line_starts: &[usize], offset: usize) -> u32 {
    match line_starts.binary_search(&offset) {
        Ok(idx) => idx as u32 + 1,
        Err(idx) => idx as u32,
    }
}

/// Byte offsets at which each line starts.
pub(crate) fn line_starts(content: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(content.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_path("src/app.py"), Language::Python);
        assert_eq!(Language::from_path("web/App.JSX"), Language::JavaScript);
        assert_eq!(Language::from_path("web/index.tsx"), Language::TypeScript);
        assert_eq!(Language::from_path("README.md"), Language::Other);
        assert_eq!(Language::from_path("Makefile"), Language::Other);
        assert!(Language::TypeScript.is_javascript_like());
    }

    #[test]
    fn test_is_binary() {
        assert!(is_binary(b"\x89PNG\r\n\x1a\n\0\0\0"));
        assert!(!is_binary(b"plain text\n"));
        let mut late_nul = vec![b'a'; 2048];
        late_nul[1500] = 0;
        assert!(!is_binary(&late_nul));
    }

    #[test]
    fn test_line_of_offset() {
        let content = "ab\ncd\n\nef";
        let starts = line_starts(content);
        assert_eq!(line_of_offset(&starts, 0), 1);
        assert_eq!(line_of_offset(&starts, 1), 1);
        assert_eq!(line_of_offset(&starts, 3), 2);
        assert_eq!(line_of_offset(&starts, 7), 4);
    }

    #[test]
    fn test_analyze_source_other_language_has_line_metrics_only() {
        let analysis = analyze_source("notes.txt", "one\n\nthree\n");
        assert_eq!(analysis.metrics.lines_of_code, Some(3));
        assert_eq!(analysis.metrics.empty_lines, Some(1));
        assert_eq!(analysis.metrics.comment_lines, None);
        assert!(analysis.components.is_empty());
        assert!(analysis.imports.is_empty());
    }

    #[test]
    fn test_generic_semantic_text() {
        let text = generic_semantic_text("// parse input\nfn parse() {}\nstruct Token;\n");
        assert!(text.contains("parse input"));
        assert!(text.contains("defines parse"));
        assert!(text.contains("defines Token"));
    }
}
