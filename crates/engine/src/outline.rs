//! Regex-based structural analyzer
//!
//! Extracts a coarse outline of a source file: the module itself, the
//! classes and functions it defines and the modules it imports. Subjects are
//! derived from the project-relative path so every fact is traceable to its
//! owning file:
//!
//! ```text
//! (src/app.py, type, Module)
//! (src/app.py, language, python)
//! (src/app.py, defines, src/app.py#main)
//! (src/app.py#main, type, Function)
//! (src/app.py, imports, os.path)
//! ```
//!
//! Files in unrecognized languages only get a `type File` fact.

use crate::analyzer::{AnalysisError, Analyzer};
use gl_core::{Fact, FactSet};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default size limit for analyzed files (8 MiB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 8 * 1024 * 1024;

/// Languages with outline patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Go,
    Java,
}

impl Language {
    /// Detect the language from a file extension
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_str()?;
        match ext {
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "go" => Some(Language::Go),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
        }
    }

    const ALL: [Language; 6] = [
        Language::Python,
        Language::Rust,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Java,
    ];
}

// Each pattern captures the defined or imported name in group 1.

const PYTHON_CLASSES: &[&str] = &[r"(?m)^[ \t]*class[ \t]+([A-Za-z_]\w*)"];
const PYTHON_FUNCTIONS: &[&str] = &[r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)"];
const PYTHON_IMPORTS: &[&str] = &[
    r"(?m)^[ \t]*import[ \t]+([\w.]+)",
    r"(?m)^[ \t]*from[ \t]+([\w.]+)[ \t]+import\b",
];

const RUST_CLASSES: &[&str] =
    &[r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:struct|enum|trait|union)[ \t]+([A-Za-z_]\w*)"];
const RUST_FUNCTIONS: &[&str] = &[
    r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:const[ \t]+)?(?:async[ \t]+)?(?:unsafe[ \t]+)?(?:extern[ \t]+\S+[ \t]+)?fn[ \t]+([A-Za-z_]\w*)",
];
const RUST_IMPORTS: &[&str] = &[r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?use[ \t]+([\w:]+)"];

const JS_CLASSES: &[&str] =
    &[r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:abstract[ \t]+)?class[ \t]+([A-Za-z_$][\w$]*)"];
const JS_FUNCTIONS: &[&str] = &[
    r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function\*?[ \t]*([A-Za-z_$][\w$]*)",
    r"(?m)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*=[ \t]*(?:async[ \t]*)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)[ \t]*=>",
];
const JS_IMPORTS: &[&str] = &[
    r#"(?m)^[ \t]*import[ \t]+(?:[^'";]*?[ \t]+from[ \t]+)?['"]([^'"]+)['"]"#,
    r#"require\([ \t]*['"]([^'"]+)['"][ \t]*\)"#,
];

const TS_CLASSES: &[&str] = &[
    r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:abstract[ \t]+)?class[ \t]+([A-Za-z_$][\w$]*)",
    r"(?m)^[ \t]*(?:export[ \t]+)?interface[ \t]+([A-Za-z_$][\w$]*)",
];

const GO_CLASSES: &[&str] = &[r"(?m)^type[ \t]+([A-Za-z_]\w*)[ \t]+(?:struct|interface)\b"];
const GO_FUNCTIONS: &[&str] = &[r"(?m)^func[ \t]+(?:\([^)]*\)[ \t]*)?([A-Za-z_]\w*)"];
const GO_IMPORTS: &[&str] = &[r#"(?m)^import[ \t]+(?:[\w.]+[ \t]+)?"([^"]+)""#];

const JAVA_CLASSES: &[&str] = &[
    r"(?m)^[ \t]*(?:(?:public|private|protected|abstract|final|static|sealed)[ \t]+)*(?:class|interface|enum|record)[ \t]+([A-Za-z_]\w*)",
];
const JAVA_IMPORTS: &[&str] = &[r"(?m)^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]+(?:\.\*)?)[ \t]*;"];

/// Compiled patterns for one language
#[derive(Debug, Default)]
struct Grammar {
    classes: Vec<Regex>,
    functions: Vec<Regex>,
    imports: Vec<Regex>,
}

impl Grammar {
    fn for_language(language: Language) -> Self {
        let (classes, functions, imports) = match language {
            Language::Python => (PYTHON_CLASSES, PYTHON_FUNCTIONS, PYTHON_IMPORTS),
            Language::Rust => (RUST_CLASSES, RUST_FUNCTIONS, RUST_IMPORTS),
            Language::JavaScript => (JS_CLASSES, JS_FUNCTIONS, JS_IMPORTS),
            Language::TypeScript => (TS_CLASSES, JS_FUNCTIONS, JS_IMPORTS),
            Language::Go => (GO_CLASSES, GO_FUNCTIONS, GO_IMPORTS),
            Language::Java => (JAVA_CLASSES, &[][..], JAVA_IMPORTS),
        };

        Self {
            classes: compile(classes),
            functions: compile(functions),
            imports: compile(imports),
        }
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Skipping invalid outline pattern {}: {}", pattern, e);
                None
            }
        })
        .collect()
}

/// Collect capture group 1 of every match
fn captures<'a>(patterns: &'a [Regex], content: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    patterns.iter().flat_map(move |re| {
        re.captures_iter(content)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
    })
}

/// Structural analyzer reading files below a project root
#[derive(Debug)]
pub struct OutlineAnalyzer {
    root: PathBuf,
    max_file_bytes: u64,
    grammars: BTreeMap<Language, Grammar>,
}

impl OutlineAnalyzer {
    /// Create an analyzer resolving paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let grammars = Language::ALL
            .iter()
            .map(|&lang| (lang, Grammar::for_language(lang)))
            .collect();

        Self {
            root: root.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            grammars,
        }
    }

    /// Set the size limit for analyzed files
    pub fn with_max_file_bytes(mut self, limit: u64) -> Self {
        self.max_file_bytes = limit;
        self
    }

    /// Outline already-decoded content
    pub fn outline(&self, path: &str, content: &str) -> FactSet {
        let mut facts = FactSet::new();

        let Some(language) = Language::from_path(path) else {
            facts.insert(Fact::new(path, "type", "File"));
            return facts;
        };

        facts.insert(Fact::new(path, "type", "Module"));
        facts.insert(Fact::new(path, "language", language.name()));

        let Some(grammar) = self.grammars.get(&language) else {
            return facts;
        };

        for name in captures(&grammar.classes, content) {
            define(&mut facts, path, name, "Class");
        }
        for name in captures(&grammar.functions, content) {
            define(&mut facts, path, name, "Function");
        }
        for target in captures(&grammar.imports, content) {
            facts.insert(Fact::new(path, "imports", target));
        }

        facts
    }
}

fn define(facts: &mut FactSet, path: &str, name: &str, kind: &str) {
    let subject = format!("{}#{}", path, name);
    facts.insert(Fact::new(path, "defines", subject.as_str()));
    facts.insert(Fact::new(subject, "type", kind));
}

impl Analyzer for OutlineAnalyzer {
    fn analyze(&self, path: &str) -> Result<FactSet, AnalysisError> {
        let full = self.root.join(path);

        let size = fs::metadata(&full)?.len();
        if size > self.max_file_bytes {
            return Err(AnalysisError::TooLarge {
                size,
                limit: self.max_file_bytes,
            });
        }

        let bytes = fs::read(&full)?;
        let content = String::from_utf8(bytes).map_err(|_| AnalysisError::NotUtf8)?;
        Ok(self.outline(path, &content))
    }

    fn name(&self) -> &str {
        "outline"
    }
}
