//! Widget source directory scanning.
//!
//! ```text
//! <widget-dir>/
//!   <Name>.kt | <Name>.java | <Name>.rs   primary source, Name = capitalized dir name
//!   src/**/*.{kt,java,rs}                 additional sources
//!   lib/*                                 per-widget classpath / link entries
//!   out/**                                compiler output
//!   skin.css                              stylesheet, reloaded without compiling
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use thiserror::Error;

pub const OUTPUT_DIR: &str = "out";
pub const LIBRARY_DIR: &str = "lib";
pub const SOURCE_DIR: &str = "src";
pub const SKIN_FILE: &str = "skin.css";

/// Language of a widget's sources. One per directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceLanguage {
    Kotlin,
    Java,
    Rust,
}

impl SourceLanguage {
    pub const ALL: [Self; 3] = [Self::Kotlin, Self::Java, Self::Rust];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Kotlin => "kt",
            Self::Java => "java",
            Self::Rust => "rs",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|lang| lang.extension() == ext)
    }

    /// Whether `path` is compiler output for this language.
    pub fn is_artifact(self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        match self {
            Self::Kotlin | Self::Java => ext == "class",
            Self::Rust => ext == std::env::consts::DLL_EXTENSION,
        }
    }

    /// JVM languages declare packages; Rust widgets are addressed by name.
    pub fn has_packages(self) -> bool {
        matches!(self, Self::Kotlin | Self::Java)
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Kotlin => "Kotlin",
            Self::Java => "Java",
            Self::Rust => "Rust",
        })
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("mixed-language sources in `{dir}`: {languages}")]
    MixedLanguage { dir: PathBuf, languages: String },

    #[error("missing primary source `{expected}`")]
    MissingPrimary { expected: PathBuf },

    #[error("package mismatch in `{file}`: expected `{expected}`, found `{found}`")]
    PackageMismatch {
        file: PathBuf,
        expected: String,
        found: String,
    },

    #[error("failed to read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

/// A widget directory with at least one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSource {
    pub dir: PathBuf,
    /// Capitalized directory name, also the primary file stem.
    pub name: String,
    pub language: SourceLanguage,
    pub primary: PathBuf,
    /// All sources including the primary, sorted.
    pub sources: Vec<PathBuf>,
    pub package: Option<String>,
}

/// Widget name for a directory: its file name with the first letter uppercased.
pub fn widget_name(dir: &Path) -> String {
    let raw = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => raw,
    }
}

impl WidgetSource {
    /// Scan a widget directory. `Ok(None)` means there is nothing to build.
    pub fn scan(dir: &Path) -> Result<Option<Self>, SourceError> {
        let sources = collect_sources(dir);
        if sources.is_empty() {
            return Ok(None);
        }

        let mut languages: Vec<_> = sources
            .iter()
            .filter_map(|p| SourceLanguage::from_path(p))
            .collect();
        languages.sort();
        languages.dedup();
        let language = match languages.as_slice() {
            [single] => *single,
            _ => {
                return Err(SourceError::MixedLanguage {
                    dir: dir.to_path_buf(),
                    languages: languages
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        };

        let name = widget_name(dir);
        let primary = dir.join(format!("{name}.{}", language.extension()));
        if !primary.is_file() {
            return Err(SourceError::MissingPrimary { expected: primary });
        }

        let package = if language.has_packages() {
            let package = read_package(&primary)?;
            check_packages(&sources, &primary, package.as_deref())?;
            package
        } else {
            None
        };

        Ok(Some(Self {
            dir: dir.to_path_buf(),
            name,
            language,
            primary,
            sources,
            package,
        }))
    }

    /// Fully-qualified type name: `package.Name` or plain `Name`.
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(package) if !package.is_empty() => format!("{package}.{}", self.name),
            _ => self.name.clone(),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.join(OUTPUT_DIR)
    }

    /// Files in `lib/`, sorted.
    pub fn libraries(&self) -> Vec<PathBuf> {
        list_libraries(&self.dir)
    }
}

pub fn list_libraries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir.join(LIBRARY_DIR)) else {
        return Vec::new();
    };
    let mut libs: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    libs.sort();
    libs
}

/// Source files directly in `dir` plus everything under `src/`.
fn collect_sources(dir: &Path) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file() && SourceLanguage::from_path(p).is_some())
                .collect()
        })
        .unwrap_or_default();

    let src = dir.join(SOURCE_DIR);
    if src.is_dir() {
        sources.extend(
            WalkDir::new(&src)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path())
                .filter(|p| SourceLanguage::from_path(p).is_some()),
        );
    }

    sources.sort();
    sources
}

/// First `package a.b.c` declaration in a JVM source file.
fn read_package(path: &Path) -> Result<Option<String>, SourceError> {
    let content =
        fs::read_to_string(path).map_err(|e| SourceError::Io(path.to_path_buf(), e))?;
    Ok(parse_package(&content))
}

pub(crate) fn parse_package(content: &str) -> Option<String> {
    content.lines().map(str::trim).find_map(|line| {
        let rest = line.strip_prefix("package ")?;
        let package = rest.trim().trim_end_matches(';').trim();
        (!package.is_empty()).then(|| package.to_string())
    })
}

/// Every source must live in the primary package or one of its sub-packages.
fn check_packages(
    sources: &[PathBuf],
    primary: &Path,
    expected: Option<&str>,
) -> Result<(), SourceError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let nested = format!("{expected}.");

    for source in sources.iter().filter(|s| s.as_path() != primary) {
        let found = read_package(source)?.unwrap_or_default();
        if found != expected && !found.starts_with(&nested) {
            return Err(SourceError::PackageMismatch {
                file: source.clone(),
                expected: expected.to_string(),
                found: if found.is_empty() {
                    "<default>".to_string()
                } else {
                    found
                },
            });
        }
    }
    Ok(())
}
