//! Import resolution
//!
//! Maps a raw import specifier, as written in a source file, to the
//! inventory ids it refers to. Resolution never fails: anything that cannot
//! be mapped (external packages, the standard library, paths outside the
//! repository) resolves to an empty list.

use crate::inventory::NodeLookup;
use crate::models::parent_of;
use crate::parsers::Language;

/// Top-level standard-library modules; imports of these are never probed.
const PYTHON_STDLIB: &[&str] = &[
    "abc", "argparse", "array", "ast", "asyncio", "base64", "bisect", "builtins", "calendar",
    "collections", "concurrent", "contextlib", "copy", "csv", "ctypes", "dataclasses",
    "datetime", "decimal", "difflib", "email", "enum", "errno", "fnmatch", "fractions",
    "functools", "gc", "getpass", "glob", "gzip", "hashlib", "heapq", "hmac", "html", "http",
    "importlib", "inspect", "io", "ipaddress", "itertools", "json", "logging", "math",
    "mimetypes", "multiprocessing", "operator", "os", "pathlib", "pickle", "platform",
    "pprint", "queue", "random", "re", "secrets", "select", "shlex", "shutil", "signal",
    "socket", "sqlite3", "ssl", "stat", "statistics", "string", "struct", "subprocess", "sys",
    "tempfile", "textwrap", "threading", "time", "timeit", "traceback", "types", "typing",
    "unittest", "urllib", "uuid", "warnings", "weakref", "xml", "zipfile", "zlib",
];

/// JS/TS extension probes, in priority order
const JS_PROBES: &[&str] = &[
    ".js",
    ".jsx",
    ".ts",
    ".tsx",
    "/index.js",
    "/index.jsx",
    "/index.ts",
    "/index.tsx",
];

/// Resolves import specifiers against a set of known ids
pub struct ImportResolver<'a, L: NodeLookup + ?Sized> {
    nodes: &'a L,
}

impl<'a, L: NodeLookup + ?Sized> ImportResolver<'a, L> {
    pub fn new(nodes: &'a L) -> Self {
        Self { nodes }
    }

    /// Ids the specifier refers to, in priority order, without duplicates.
    pub fn resolve_import(&self, specifier: &str, source_file: &str, language: Language) -> Vec<String> {
        let specifier = specifier.trim();
        if specifier.is_empty() {
            return Vec::new();
        }
        match language {
            Language::Python => self.resolve_python(specifier, source_file),
            Language::JavaScript | Language::TypeScript => self
                .resolve_javascript(specifier, source_file)
                .into_iter()
                .collect(),
            Language::Other => Vec::new(),
        }
    }

    fn resolve_python(&self, specifier: &str, source_file: &str) -> Vec<String> {
        if specifier.starts_with('.') {
            self.resolve_python_relative(specifier, source_file)
        } else {
            self.resolve_python_absolute(specifier, source_file)
        }
    }

    fn resolve_python_relative(&self, specifier: &str, source_file: &str) -> Vec<String> {
        // `..pkg` and path-style `../pkg` both count two dots
        let prefix_len = specifier
            .find(|c: char| c != '.' && c != '/')
            .unwrap_or(specifier.len());
        let dots = specifier[..prefix_len].matches('.').count();
        let remainder = module_path(&specifier[prefix_len..]);

        let mut base = parent_of(source_file).unwrap_or("");
        for _ in 1..dots {
            if base.is_empty() {
                return Vec::new();
            }
            base = parent_of(base).unwrap_or("");
        }

        let candidates = if remainder.is_empty() {
            let mut candidates = Vec::new();
            if !base.is_empty() {
                candidates.push(base.to_string());
            }
            candidates.push(join(base, "__init__.py"));
            candidates
        } else {
            module_candidates(&join(base, &remainder))
        };
        self.existing(candidates)
    }

    fn resolve_python_absolute(&self, specifier: &str, source_file: &str) -> Vec<String> {
        let first = specifier.split('.').next().unwrap_or(specifier);
        if PYTHON_STDLIB.contains(&first) {
            return Vec::new();
        }

        let path = module_path(specifier);
        if path.is_empty() {
            return Vec::new();
        }

        let mut candidates = module_candidates(&path);
        if let Some(dir) = parent_of(source_file) {
            candidates.extend(module_candidates(&join(dir, &path)));
        }
        let resolved = self.existing(candidates);
        if !resolved.is_empty() {
            return resolved;
        }

        self.resolve_python_subpackage(&path)
    }

    /// Files ending in the module path under some existing package directory.
    fn resolve_python_subpackage(&self, path: &str) -> Vec<String> {
        let suffixes = [format!("/{}.py", path), format!("/{}/__init__.py", path)];
        let mut matches: Vec<String> = self
            .nodes
            .ids()
            .filter_map(|id| {
                suffixes.iter().find_map(|suffix| {
                    let prefix = id.strip_suffix(suffix.as_str())?;
                    self.nodes.contains(prefix).then(|| id.to_string())
                })
            })
            .collect();
        matches.sort();
        matches.dedup();
        matches
    }

    fn resolve_javascript(&self, specifier: &str, source_file: &str) -> Option<String> {
        let base = if let Some(rooted) = specifier.strip_prefix('/') {
            normalize("", rooted)?
        } else if specifier.starts_with("./") || specifier.starts_with("../") {
            normalize(parent_of(source_file).unwrap_or(""), specifier)?
        } else {
            // Bare and scoped package specifiers
            return None;
        };

        if base.is_empty() {
            return None;
        }
        if self.nodes.contains(&base) && !self.is_directory_like(&base) {
            return Some(base);
        }
        JS_PROBES
            .iter()
            .map(|probe| format!("{}{}", base, probe))
            .find(|candidate| self.nodes.contains(candidate))
    }

    /// Whether an id is a directory prefix of some other known id.
    fn is_directory_like(&self, id: &str) -> bool {
        let prefix = format!("{}/", id);
        self.nodes.ids().any(|other| other.starts_with(&prefix))
    }

    fn existing(&self, candidates: Vec<String>) -> Vec<String> {
        let mut resolved: Vec<String> = Vec::new();
        for candidate in candidates {
            if self.nodes.contains(&candidate) && !resolved.contains(&candidate) {
                resolved.push(candidate);
            }
        }
        resolved
    }
}

/// `a.b.c` → `a/b/c`; path separators are kept, empty segments dropped.
fn module_path(module: &str) -> String {
    module
        .split(['.', '/'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// `<path>.py`, `<path>/__init__.py`, `<path>`
fn module_candidates(path: &str) -> Vec<String> {
    vec![
        format!("{}.py", path),
        format!("{}/__init__.py", path),
        path.to_string(),
    ]
}

fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", base, rest)
    }
}

/// Lexically resolve `relative` against `base`; `None` when it escapes the
/// repository root.
fn normalize(base: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
