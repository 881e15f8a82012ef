//! Mtime-based staleness detection for widget builds.
//!
//! Sources and compiler output are both on local disk and the output is only
//! ever written by the compiler, so timestamps are reliable here:
//!
//! - no artifacts in `out/` → stale
//! - newest source (plus `lib/` in developer mode) newer than newest artifact → stale
//! - otherwise → fresh

use std::path::Path;
use std::time::SystemTime;

use jwalk::WalkDir;

use super::source::{SourceLanguage, WidgetSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Stale,
    Fresh,
}

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Newest mtime among `paths` (unreadable entries ignored).
pub fn newest_mtime<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<SystemTime> {
    paths.into_iter().filter_map(get_mtime).max()
}

/// Newest mtime among compiler artifacts under `output_dir`.
pub fn newest_artifact_mtime(output_dir: &Path, language: SourceLanguage) -> Option<SystemTime> {
    if !output_dir.is_dir() {
        return None;
    }
    WalkDir::new(output_dir)
        .skip_hidden(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|p| language.is_artifact(p))
        .filter_map(|p| get_mtime(&p))
        .max()
}

/// Decide whether `source` must be recompiled.
pub fn check(source: &WidgetSource, developer_mode: bool) -> Staleness {
    let Some(newest_artifact) = newest_artifact_mtime(&source.output_dir(), source.language)
    else {
        return Staleness::Stale;
    };

    let libraries = if developer_mode {
        source.libraries()
    } else {
        Vec::new()
    };

    let newest_input = newest_mtime(
        source
            .sources
            .iter()
            .chain(libraries.iter())
            .map(|p| p.as_path()),
    );

    match newest_input {
        Some(input) if input > newest_artifact => Staleness::Stale,
        _ => Staleness::Fresh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn fixture() -> (tempfile::TempDir, WidgetSource) {
        let root = tempfile::TempDir::new().unwrap();
        let dir = root.path().join("Clock");
        fs::create_dir_all(dir.join("out")).unwrap();
        fs::create_dir_all(dir.join("lib")).unwrap();
        fs::write(dir.join("Clock.kt"), "class Clock").unwrap();
        let source = WidgetSource::scan(&dir).unwrap().unwrap();
        (root, source)
    }

    #[test]
    fn test_no_artifacts_is_stale() {
        let (_root, source) = fixture();
        assert_eq!(check(&source, false), Staleness::Stale);
    }

    #[test]
    fn test_staleness_monotonic() {
        let (_root, source) = fixture();
        let class = source.output_dir().join("Clock.class");
        fs::write(&class, b"").unwrap();

        let base = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&source.primary, base);
        set_mtime(&class, base + Duration::from_secs(10));
        assert_eq!(check(&source, false), Staleness::Fresh);

        // Equal mtimes are still fresh
        set_mtime(&source.primary, base + Duration::from_secs(10));
        assert_eq!(check(&source, false), Staleness::Fresh);

        // Touch source strictly after the newest class file
        set_mtime(&source.primary, base + Duration::from_secs(11));
        assert_eq!(check(&source, false), Staleness::Stale);
    }

    #[test]
    fn test_libraries_only_count_in_developer_mode() {
        let (_root, source) = fixture();
        let class = source.output_dir().join("Clock.class");
        let jar = source.dir.join("lib/extra.jar");
        fs::write(&class, b"").unwrap();
        fs::write(&jar, b"").unwrap();

        let base = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&source.primary, base);
        set_mtime(&class, base + Duration::from_secs(10));
        set_mtime(&jar, base + Duration::from_secs(20));

        assert_eq!(check(&source, false), Staleness::Fresh);
        assert_eq!(check(&source, true), Staleness::Stale);
    }

    #[test]
    fn test_nested_artifacts_count() {
        let (_root, source) = fixture();
        let nested = source.output_dir().join("player/widgets/Clock.class");
        fs::create_dir_all(nested.parent().unwrap()).unwrap();
        fs::write(&nested, b"").unwrap();

        let base = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&source.primary, base);
        set_mtime(&nested, base + Duration::from_secs(1));
        assert_eq!(check(&source, false), Staleness::Fresh);
    }
}
