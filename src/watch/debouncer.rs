use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;

/// Per-directory debouncer: each widget directory has its own window, so a
/// busy directory never delays another one.
pub(super) struct Debouncer {
    window: Duration,
    groups: FxHashMap<PathBuf, Pending>,
}

struct Pending {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Instant,
}

impl Debouncer {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            groups: FxHashMap::default(),
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Record one change of `path` inside directory `group`:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → nothing happened
    /// - otherwise the first event wins
    pub(super) fn add(&mut self, group: PathBuf, path: PathBuf, kind: ChangeKind) {
        if is_temp_file(&path) {
            return;
        }
        let pending = self.groups.entry(group).or_insert_with(|| Pending {
            changes: FxHashMap::default(),
            last_event: Instant::now(),
        });
        pending.last_event = Instant::now();

        let Some(&existing) = pending.changes.get(&path) else {
            crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
            pending.changes.insert(path, kind);
            return;
        };

        match (existing, kind) {
            (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                crate::debug!("watch"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                pending.changes.insert(path, kind);
            }
            (ChangeKind::Modified, ChangeKind::Removed) => {
                crate::debug!("watch"; "upgrade modified->removed: {}", path.display());
                pending.changes.insert(path, ChangeKind::Removed);
            }
            (ChangeKind::Created, ChangeKind::Removed) => {
                crate::debug!("watch"; "discard created+removed: {}", path.display());
                pending.changes.remove(&path);
            }
            _ => {}
        }
    }

    /// Changes of every directory whose window has elapsed, sorted by path.
    /// A directory whose changes cancelled out still counts as ready and
    /// yields nothing.
    pub(super) fn take_ready(&mut self) -> Vec<(PathBuf, ChangeKind)> {
        let window = self.window;
        let ready: Vec<PathBuf> = self
            .groups
            .iter()
            .filter(|(_, p)| p.last_event.elapsed() >= window)
            .map(|(dir, _)| dir.clone())
            .collect();

        let mut changes: Vec<_> = ready
            .into_iter()
            .filter_map(|dir| self.groups.remove(&dir))
            .flat_map(|p| p.changes)
            .collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        changes
    }

    /// Precise sleep duration until the next directory becomes ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        self.groups
            .values()
            .map(|p| self.window.saturating_sub(p.last_event.elapsed()))
            .min()
            .unwrap_or(Duration::from_secs(86400))
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> Debouncer {
        Debouncer::new(Duration::ZERO)
    }

    #[test]
    fn test_restore_after_remove() {
        let mut d = instant();
        d.add("/w/clock".into(), "/w/clock/Clock.kt".into(), ChangeKind::Removed);
        d.add("/w/clock".into(), "/w/clock/Clock.kt".into(), ChangeKind::Created);
        assert_eq!(
            d.take_ready(),
            vec![(PathBuf::from("/w/clock/Clock.kt"), ChangeKind::Created)]
        );
    }

    #[test]
    fn test_created_then_removed_cancels() {
        let mut d = instant();
        d.add("/w/clock".into(), "/w/clock/scratch.kt".into(), ChangeKind::Created);
        d.add("/w/clock".into(), "/w/clock/scratch.kt".into(), ChangeKind::Removed);
        assert!(d.take_ready().is_empty());
        assert!(d.is_empty());
    }

    #[test]
    fn test_modified_then_removed_upgrades() {
        let mut d = instant();
        d.add("/w/clock".into(), "/w/clock/skin.css".into(), ChangeKind::Modified);
        d.add("/w/clock".into(), "/w/clock/skin.css".into(), ChangeKind::Modified);
        d.add("/w/clock".into(), "/w/clock/skin.css".into(), ChangeKind::Removed);
        assert_eq!(
            d.take_ready(),
            vec![(PathBuf::from("/w/clock/skin.css"), ChangeKind::Removed)]
        );
    }

    #[test]
    fn test_temp_files_ignored() {
        let mut d = instant();
        d.add("/w/clock".into(), "/w/clock/Clock.kt~".into(), ChangeKind::Modified);
        d.add("/w/clock".into(), "/w/clock/.Clock.kt.swp".into(), ChangeKind::Modified);
        assert!(d.is_empty());
    }

    #[test]
    fn test_directories_have_separate_windows() {
        let mut d = Debouncer::new(Duration::from_millis(50));
        d.add("/w/clock".into(), "/w/clock/Clock.kt".into(), ChangeKind::Modified);
        std::thread::sleep(Duration::from_millis(80));
        d.add("/w/player".into(), "/w/player/Player.kt".into(), ChangeKind::Modified);

        // Only the quiet directory is ready
        assert_eq!(
            d.take_ready(),
            vec![(PathBuf::from("/w/clock/Clock.kt"), ChangeKind::Modified)]
        );
        assert!(!d.is_empty());
        assert!(d.sleep_duration() <= Duration::from_millis(50));
    }

    #[test]
    fn test_idle_sleeps_long() {
        assert!(instant().sleep_duration() >= Duration::from_secs(3600));
    }
}
