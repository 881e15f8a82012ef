//! Compiler invocation.
//!
//! One external compiler process per build, awaited under a wall-clock
//! timeout. The child is spawned with `kill_on_drop`, so a timeout, a
//! cancelled worker, or shutdown all terminate it: no orphaned compilers.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;

use super::source::{SourceLanguage, WidgetSource};
use crate::config::CompilersConfig;
use crate::debug;

/// Inputs of one compiler run beyond the widget's own sources.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub compilers: CompilersConfig,
    /// Application classpath entries.
    pub classpath: Vec<PathBuf>,
    pub encoding: String,
    pub timeout: Duration,
}

/// Successful compiler run.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{language} compiler `{program}` not found")]
    CompilerNotFound {
        language: SourceLanguage,
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to prepare `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("compiler exited with {}", .code.map_or_else(|| "signal".to_string(), |c| format!("code {c}")))]
    Failed {
        code: Option<i32>,
        diagnostics: String,
    },

    #[error("compiler timed out after {after:?}")]
    Timeout { after: Duration },
}

impl CompileError {
    /// Captured compiler output, if any.
    pub fn diagnostics(&self) -> &str {
        match self {
            Self::Failed { diagnostics, .. } => diagnostics,
            _ => "",
        }
    }
}

/// Compiler program for `language` from config.
fn program_for(language: SourceLanguage, compilers: &CompilersConfig) -> &str {
    match language {
        SourceLanguage::Kotlin => &compilers.kotlin,
        SourceLanguage::Java => &compilers.java,
        SourceLanguage::Rust => &compilers.rust,
    }
}

/// Classpath: application entries, then `lib/`, then previously compiled output.
fn classpath(source: &WidgetSource, options: &CompileOptions) -> Vec<PathBuf> {
    options
        .classpath
        .iter()
        .cloned()
        .chain(source.libraries())
        .chain(std::iter::once(source.output_dir()))
        .collect()
}

fn join_classpath(entries: &[PathBuf]) -> OsString {
    std::env::join_paths(entries).unwrap_or_else(|_| {
        // An entry contained the separator; fall back to lossy joining.
        let sep = if cfg!(windows) { ";" } else { ":" };
        entries
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(sep)
            .into()
    })
}

/// Arguments for the language's compiler.
pub fn compiler_args(source: &WidgetSource, options: &CompileOptions) -> Vec<OsString> {
    let out = source.output_dir();
    let mut args: Vec<OsString> = Vec::new();

    match source.language {
        SourceLanguage::Kotlin => {
            args.extend(["-d".into(), out.into_os_string()]);
            args.extend(["-cp".into(), join_classpath(&classpath(source, options))]);
            args.push("-nowarn".into());
            args.extend(source.sources.iter().map(|p| p.clone().into_os_string()));
        }
        SourceLanguage::Java => {
            args.extend(["-d".into(), out.into_os_string()]);
            args.extend(["-cp".into(), join_classpath(&classpath(source, options))]);
            args.extend(["-encoding".into(), options.encoding.clone().into()]);
            args.extend(source.sources.iter().map(|p| p.clone().into_os_string()));
        }
        SourceLanguage::Rust => {
            let crate_name = source.name.to_lowercase();
            let artifact = out.join(format!(
                "{}{crate_name}.{}",
                std::env::consts::DLL_PREFIX,
                std::env::consts::DLL_EXTENSION
            ));
            args.extend(["--crate-type".into(), "cdylib".into()]);
            args.extend(["--crate-name".into(), crate_name.into()]);
            args.extend(["--edition".into(), "2024".into()]);
            args.extend(["-C".into(), "opt-level=2".into()]);
            let mut deps = OsString::from("dependency=");
            deps.push(source.dir.join(super::source::LIBRARY_DIR));
            args.extend(["-L".into(), deps]);
            args.extend(["-o".into(), artifact.into_os_string()]);
            // rustc follows `mod` declarations from the primary file
            args.push(source.primary.clone().into_os_string());
        }
    }
    args
}

/// Remove and recreate the output directory.
fn reset_output(dir: &Path) -> Result<(), CompileError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| CompileError::Io(dir.to_path_buf(), e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| CompileError::Io(dir.to_path_buf(), e))
}

/// Compile `source` into its output directory.
pub async fn compile(
    source: &WidgetSource,
    options: &CompileOptions,
) -> Result<CompileOutput, CompileError> {
    let program = program_for(source.language, &options.compilers);
    let resolved = which::which(program).map_err(|e| CompileError::CompilerNotFound {
        language: source.language,
        program: program.to_string(),
        source: e,
    })?;

    reset_output(&source.output_dir())?;

    let args = compiler_args(source, options);
    debug!("compile"; "{} {:?}", resolved.display(), args);

    let started = Instant::now();
    let child = Command::new(&resolved)
        .args(&args)
        .current_dir(&source.dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CompileError::Io(resolved.clone(), e))?;

    // On timeout the wait future is dropped with the child, which kills it.
    let output = match tokio::time::timeout(options.timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| CompileError::Io(resolved.clone(), e))?,
        Err(_) => {
            return Err(CompileError::Timeout {
                after: options.timeout,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        Ok(CompileOutput {
            stdout,
            stderr,
            duration: started.elapsed(),
        })
    } else {
        let diagnostics = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Err(CompileError::Failed {
            code: output.status.code(),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn options() -> CompileOptions {
        CompileOptions {
            compilers: CompilersConfig::default(),
            classpath: vec![PathBuf::from("/app/player.jar")],
            encoding: "UTF-8".into(),
            timeout: Duration::from_secs(90),
        }
    }

    fn source(lang_file: &str, content: &str) -> (tempfile::TempDir, WidgetSource) {
        let root = tempfile::TempDir::new().unwrap();
        let dir = root.path().join("Clock");
        fs::create_dir_all(dir.join("lib")).unwrap();
        fs::write(dir.join(lang_file), content).unwrap();
        fs::write(dir.join("lib/time.jar"), b"").unwrap();
        let source = WidgetSource::scan(&dir).unwrap().unwrap();
        (root, source)
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_java_args() {
        let (_root, source) = source("Clock.java", "package a;\nclass Clock {}");
        let args = strings(&compiler_args(&source, &options()));

        assert_eq!(args[0], "-d");
        assert!(args[1].ends_with("out"));
        assert_eq!(args[2], "-cp");
        assert!(args[3].starts_with("/app/player.jar"));
        assert!(args[3].contains("time.jar"));
        assert!(args.contains(&"-encoding".to_string()));
        assert!(args.last().unwrap().ends_with("Clock.java"));
    }

    #[test]
    fn test_rust_args_produce_cdylib() {
        let (_root, source) = source("Clock.rs", "");
        let args = strings(&compiler_args(&source, &options()));

        assert!(args.windows(2).any(|w| w == ["--crate-type", "cdylib"]));
        assert!(args.windows(2).any(|w| w == ["--crate-name", "clock"]));
        let out = args.iter().position(|a| a == "-o").unwrap();
        assert!(args[out + 1].ends_with(std::env::consts::DLL_EXTENSION));
    }

    #[tokio::test]
    async fn test_missing_compiler() {
        let (_root, source) = source("Clock.kt", "class Clock");
        let mut options = options();
        options.compilers.kotlin = "quaver-no-such-compiler".into();

        let err = compile(&source, &options).await.unwrap_err();
        assert!(matches!(err, CompileError::CompilerNotFound { .. }));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> String {
            let path = dir.join("fake-compiler.sh");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn test_nonzero_exit_captures_diagnostics() {
            let (root, source) = source("Clock.kt", "class Clock");
            let mut options = options();
            options.compilers.kotlin = script(root.path(), "echo 'Clock.kt:1: error' >&2\nexit 3");

            let err = compile(&source, &options).await.unwrap_err();
            match err {
                CompileError::Failed { code, diagnostics } => {
                    assert_eq!(code, Some(3));
                    assert!(diagnostics.contains("Clock.kt:1: error"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_timeout_kills_compiler() {
            let (root, source) = source("Clock.kt", "class Clock");
            let mut options = options();
            options.compilers.kotlin = script(root.path(), "sleep 30");
            options.timeout = Duration::from_millis(200);

            let started = Instant::now();
            let err = compile(&source, &options).await.unwrap_err();
            assert!(matches!(err, CompileError::Timeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[tokio::test]
        async fn test_success_recreates_output() {
            let (root, source) = source("Clock.kt", "class Clock");
            let stale = source.output_dir().join("Old.class");
            fs::create_dir_all(source.output_dir()).unwrap();
            fs::write(&stale, b"").unwrap();

            let mut options = options();
            options.compilers.kotlin = script(root.path(), "echo compiled");

            let output = compile(&source, &options).await.unwrap();
            assert_eq!(output.stdout.trim(), "compiled");
            assert!(!stale.exists());
            assert!(source.output_dir().is_dir());
        }
    }
}
