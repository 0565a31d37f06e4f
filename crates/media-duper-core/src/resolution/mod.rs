pub mod decision;

pub use decision::{Decision, DecisionSource, DuplicatePair, FixedPolicy, ScriptedDecisions};

use crate::clock::Clock;
use crate::error::{ActionError, StoreError};
use crate::storage::FingerprintStore;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// What actually happened to a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Deleted(PathBuf),
    Moved { from: PathBuf, to: PathBuf },
    KeptBoth,
    Aborted,
}

/// Carries out keep/delete/relocate decisions against the filesystem and the store.
///
/// The filesystem change always happens first. A record is only touched once the
/// file is gone or in its new place, so a failed action leaves both untouched.
pub struct ResolutionEngine<'a> {
    store: &'a FingerprintStore,
    clock: &'a dyn Clock,
    destination: Option<PathBuf>,
    elevated_delete: bool,
}

impl<'a> ResolutionEngine<'a> {
    pub fn new(store: &'a FingerprintStore, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            destination: None,
            elevated_delete: false,
        }
    }

    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_elevated_delete(mut self, enabled: bool) -> Self {
        self.elevated_delete = enabled;
        self
    }

    pub fn apply(
        &self,
        pair: &DuplicatePair,
        decision: Decision,
    ) -> Result<Resolution, ActionError> {
        match decision {
            Decision::KeepFirst => self.delete(&pair.second),
            Decision::KeepSecond => self.delete(&pair.first),
            Decision::KeepBoth => {
                debug!(
                    "Keeping both {} and {}",
                    pair.first.display(),
                    pair.second.display()
                );
                Ok(Resolution::KeptBoth)
            }
            Decision::Relocate => self.relocate(&pair.second),
            Decision::Abort => Ok(Resolution::Aborted),
        }
    }

    fn delete(&self, path: &Path) -> Result<Resolution, ActionError> {
        remove_file(path, self.elevated_delete).map_err(|source| ActionError::Delete {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Deleted {}", path.display());

        let key = path.to_string_lossy();
        if let Err(e) = self.store.delete(&key) {
            // The file is already gone; a leftover record is only a stale cache entry.
            error!("Deleted {} but could not drop its record: {}", path.display(), e);
        }
        Ok(Resolution::Deleted(path.to_path_buf()))
    }

    fn relocate(&self, from: &Path) -> Result<Resolution, ActionError> {
        let destination = self
            .destination
            .as_deref()
            .ok_or_else(|| ActionError::NoDestination {
                path: from.to_path_buf(),
            })?;

        let move_error = |to: &Path, source: io::Error| ActionError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        };

        fs::create_dir_all(destination).map_err(|e| move_error(destination, e))?;

        let file_name = from.file_name().ok_or_else(|| {
            move_error(
                destination,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
        let target = relocation_target(destination, file_name, self.clock);

        let from_key = from.to_string_lossy();
        let target_key = target.to_string_lossy();

        let conflict = |source: StoreError| ActionError::Conflict {
            from: from.to_path_buf(),
            to: target.clone(),
            source,
        };

        match self.store.lookup_by_path(&target_key) {
            Ok(Some(_)) => {
                return Err(conflict(StoreError::Conflict {
                    path: target_key.into_owned(),
                }))
            }
            Ok(None) => {}
            Err(e) => return Err(conflict(e)),
        }

        move_file(from, &target).map_err(|e| move_error(&target, e))?;

        if let Err(e) = self.store.rename(&from_key, &target_key) {
            warn!(
                "Record update failed after moving {}, moving it back: {}",
                from.display(),
                e
            );
            if let Err(back) = move_file(&target, from) {
                error!(
                    "Could not move {} back to {}: {}",
                    target.display(),
                    from.display(),
                    back
                );
            }
            return Err(conflict(e));
        }

        info!("Moved {} to {}", from.display(), target.display());
        Ok(Resolution::Moved {
            from: from.to_path_buf(),
            to: target,
        })
    }
}

/// First free name for `file_name` inside `destination`.
///
/// `clip.mp4` stays as is when free, then becomes `clip_20240102030405.mp4`,
/// then `clip_20240102030405_1.mp4`, `clip_20240102030405_2.mp4` and so on.
pub fn relocation_target(destination: &Path, file_name: &OsStr, clock: &dyn Clock) -> PathBuf {
    let plain = destination.join(file_name);
    if !plain.exists() {
        return plain;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = clock.now().format("%Y%m%d%H%M%S").to_string();

    let stamped = destination.join(format!("{}_{}{}", stem, stamp, ext));
    if !stamped.exists() {
        return stamped;
    }

    let mut n: u32 = 1;
    loop {
        let candidate = destination.join(format!("{}_{}_{}{}", stem, stamp, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn remove_file(path: &Path, elevated: bool) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if elevated && e.kind() == io::ErrorKind::PermissionDenied => {
            let guard = write_guard(path);
            warn!(
                "Permission denied deleting {}, making {} writable and retrying",
                path.display(),
                guard.display()
            );
            let original = fs::metadata(&guard)?.permissions();
            fs::set_permissions(&guard, writable(original.clone()))?;
            let result = fs::remove_file(path);
            // Whatever is still on disk gets its old permissions back.
            if guard.exists() {
                if let Err(restore) = fs::set_permissions(&guard, original) {
                    error!(
                        "Could not restore permissions on {}: {}",
                        guard.display(),
                        restore
                    );
                }
            }
            result
        }
        other => other,
    }
}

// Unlinking on Unix needs write access to the directory, not to the file.
#[cfg(unix)]
fn write_guard(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(not(unix))]
fn write_guard(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(unix)]
fn writable(mut perms: fs::Permissions) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    perms.set_mode(perms.mode() | 0o200);
    perms
}

#[cfg(not(unix))]
fn writable(mut perms: fs::Permissions) -> fs::Permissions {
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    perms
}

/// Rename, or copy then remove when the rename cannot cross filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if is_cross_device(&e) => {
            debug!(
                "{} and {} are on different devices, copying",
                from.display(),
                to.display()
            );
            if let Err(copy_err) = fs::copy(from, to) {
                let _ = fs::remove_file(to);
                return Err(copy_err);
            }
            if let Err(remove_err) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(remove_err);
            }
            Ok(())
        }
        other => other,
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    #[cfg(windows)]
    const NOT_SAME_DEVICE: i32 = 17; // ERROR_NOT_SAME_DEVICE
    #[cfg(not(windows))]
    const NOT_SAME_DEVICE: i32 = 18; // EXDEV
    err.raw_os_error() == Some(NOT_SAME_DEVICE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::media::{Fingerprint, MediaKind, PerceptualHash};
    use crate::storage::MediaRecord;
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    fn clock() -> FixedClock {
        FixedClock(Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    }

    fn record(path: &Path) -> MediaRecord {
        MediaRecord {
            id: 0,
            path: path.to_string_lossy().into_owned(),
            full_identity: "abc".to_string(),
            partial_identity: None,
            media_kind: MediaKind::Photo,
            fingerprint: Fingerprint::new(vec![PerceptualHash::new(vec![1, 2])]),
            processed_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn pair(first: &Path, second: &Path) -> DuplicatePair {
        DuplicatePair {
            first: first.to_path_buf(),
            first_kind: MediaKind::Photo,
            second: second.to_path_buf(),
            second_kind: MediaKind::Photo,
            distance: 0.0,
        }
    }

    #[test]
    fn test_relocation_target_free_name() {
        let tmp = tempdir().unwrap();
        let target = relocation_target(tmp.path(), OsStr::new("clip.mp4"), &clock());
        assert_eq!(target, tmp.path().join("clip.mp4"));
    }

    #[test]
    fn test_relocation_target_disambiguates() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("clip.mp4"), b"x").unwrap();
        let target = relocation_target(tmp.path(), OsStr::new("clip.mp4"), &clock());
        assert_eq!(target, tmp.path().join("clip_20240102030405.mp4"));

        fs::write(&target, b"x").unwrap();
        let target = relocation_target(tmp.path(), OsStr::new("clip.mp4"), &clock());
        assert_eq!(target, tmp.path().join("clip_20240102030405_1.mp4"));

        fs::write(&target, b"x").unwrap();
        let target = relocation_target(tmp.path(), OsStr::new("clip.mp4"), &clock());
        assert_eq!(target, tmp.path().join("clip_20240102030405_2.mp4"));
    }

    #[test]
    fn test_relocation_target_without_extension() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("notes"), b"x").unwrap();
        let target = relocation_target(tmp.path(), OsStr::new("notes"), &clock());
        assert_eq!(target, tmp.path().join("notes_20240102030405"));
    }

    #[test]
    fn test_keep_second_deletes_first() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        let store = FingerprintStore::open_in_memory().unwrap();
        store.put(&record(&a)).unwrap();
        store.put(&record(&b)).unwrap();
        let clock = clock();
        let engine = ResolutionEngine::new(&store, &clock);

        let outcome = engine.apply(&pair(&a, &b), Decision::KeepSecond).unwrap();
        assert_eq!(outcome, Resolution::Deleted(a.clone()));
        assert!(!a.exists());
        assert!(b.exists());
        assert!(store.lookup_by_path(&a.to_string_lossy()).unwrap().is_none());
        assert!(store.lookup_by_path(&b.to_string_lossy()).unwrap().is_some());
    }

    #[test]
    fn test_keep_both_and_abort_touch_nothing() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        let store = FingerprintStore::open_in_memory().unwrap();
        let clock = clock();
        let engine = ResolutionEngine::new(&store, &clock);

        assert_eq!(
            engine.apply(&pair(&a, &b), Decision::KeepBoth).unwrap(),
            Resolution::KeptBoth
        );
        assert_eq!(
            engine.apply(&pair(&a, &b), Decision::Abort).unwrap(),
            Resolution::Aborted
        );
        assert!(a.exists() && b.exists());
    }

    #[test]
    fn test_relocate_without_destination_fails() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        let store = FingerprintStore::open_in_memory().unwrap();
        let clock = clock();
        let engine = ResolutionEngine::new(&store, &clock);

        let err = engine.apply(&pair(&a, &b), Decision::Relocate).unwrap_err();
        assert!(matches!(err, ActionError::NoDestination { .. }));
        assert!(b.exists());
    }

    #[test]
    fn test_relocate_creates_destination_and_renames_record() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        let dest = tmp.path().join("dupes/nested");

        let store = FingerprintStore::open_in_memory().unwrap();
        store.put(&record(&b)).unwrap();
        let clock = clock();
        let engine = ResolutionEngine::new(&store, &clock).with_destination(Some(dest.clone()));

        let outcome = engine.apply(&pair(&a, &b), Decision::Relocate).unwrap();
        let moved = dest.join("b.jpg");
        assert_eq!(
            outcome,
            Resolution::Moved {
                from: b.clone(),
                to: moved.clone()
            }
        );
        assert!(!b.exists());
        assert_eq!(fs::read(&moved).unwrap(), b"b");
        assert!(store.lookup_by_path(&b.to_string_lossy()).unwrap().is_none());
        assert!(store
            .lookup_by_path(&moved.to_string_lossy())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_relocate_refuses_stale_record_at_target() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        let dest = tmp.path().join("dupes");

        let store = FingerprintStore::open_in_memory().unwrap();
        store.put(&record(&b)).unwrap();
        // A record for a file that is no longer on disk still owns the name.
        store.put(&record(&dest.join("b.jpg"))).unwrap();
        let clock = clock();
        let engine = ResolutionEngine::new(&store, &clock).with_destination(Some(dest.clone()));

        let err = engine.apply(&pair(&a, &b), Decision::Relocate).unwrap_err();
        assert!(matches!(err, ActionError::Conflict { .. }));
        assert!(b.exists());
        assert!(!dest.join("b.jpg").exists());
        assert!(store.lookup_by_path(&b.to_string_lossy()).unwrap().is_some());
    }

    #[test]
    fn test_relocate_moves_file_back_when_record_update_fails() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        let dest = tmp.path().join("dupes");

        let db = crate::storage::Database::open_in_memory().unwrap();
        db.connection()
            .execute_batch(
                "CREATE TRIGGER refuse_path_change BEFORE UPDATE OF path ON media_record
                 BEGIN SELECT RAISE(ABORT, 'path is frozen'); END;",
            )
            .unwrap();
        let store = FingerprintStore::new(db);
        store.put(&record(&b)).unwrap();
        let clock = clock();
        let engine = ResolutionEngine::new(&store, &clock).with_destination(Some(dest.clone()));

        let err = engine.apply(&pair(&a, &b), Decision::Relocate).unwrap_err();
        assert!(matches!(
            err,
            ActionError::Conflict {
                source: StoreError::Database(_),
                ..
            }
        ));
        assert_eq!(fs::read(&b).unwrap(), b"b");
        assert!(!dest.join("b.jpg").exists());
        assert!(store.lookup_by_path(&b.to_string_lossy()).unwrap().is_some());
    }

    #[test]
    fn test_elevated_delete_removes_read_only_file() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        let mut perms = fs::metadata(&b).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&b, perms).unwrap();

        let store = FingerprintStore::open_in_memory().unwrap();
        store.put(&record(&b)).unwrap();
        let clock = clock();
        let engine = ResolutionEngine::new(&store, &clock).with_elevated_delete(true);

        let outcome = engine.apply(&pair(&a, &b), Decision::KeepFirst).unwrap();
        assert_eq!(outcome, Resolution::Deleted(b.clone()));
        assert!(!b.exists());
        assert!(store.lookup_by_path(&b.to_string_lossy()).unwrap().is_none());
    }

    #[cfg(unix)]
    mod read_only_directory {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn mode(path: &Path) -> u32 {
            fs::metadata(path).unwrap().permissions().mode() & 0o777
        }

        fn set_mode(path: &Path, mode: u32) {
            fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
        }

        /// Locks `dir` and reports whether the lock actually binds this process.
        /// Privileged users ignore directory permissions.
        fn lock(dir: &Path) -> bool {
            set_mode(dir, 0o555);
            let check = dir.join(".write_check");
            if fs::write(&check, b"").is_ok() {
                let _ = fs::remove_file(&check);
                set_mode(dir, 0o755);
                return false;
            }
            true
        }

        fn setup() -> (tempfile::TempDir, PathBuf, PathBuf, PathBuf) {
            let tmp = tempdir().unwrap();
            let locked = tmp.path().join("locked");
            fs::create_dir(&locked).unwrap();
            let a = tmp.path().join("a.jpg");
            let b = locked.join("b.jpg");
            fs::write(&a, b"a").unwrap();
            fs::write(&b, b"b").unwrap();
            (tmp, locked, a, b)
        }

        #[test]
        fn test_delete_in_read_only_directory_fails_without_elevation() {
            let (_tmp, locked, a, b) = setup();
            if !lock(&locked) {
                return;
            }

            let store = FingerprintStore::open_in_memory().unwrap();
            store.put(&record(&b)).unwrap();
            let clock = clock();
            let engine = ResolutionEngine::new(&store, &clock);

            let err = engine.apply(&pair(&a, &b), Decision::KeepFirst).unwrap_err();
            assert!(matches!(err, ActionError::Delete { .. }));
            assert!(b.exists());
            assert_eq!(mode(&locked), 0o555);
            assert!(store.lookup_by_path(&b.to_string_lossy()).unwrap().is_some());
            set_mode(&locked, 0o755);
        }

        #[test]
        fn test_elevated_delete_unlocks_directory_and_restores_it() {
            let (_tmp, locked, a, b) = setup();
            if !lock(&locked) {
                return;
            }

            let store = FingerprintStore::open_in_memory().unwrap();
            let clock = clock();
            let engine = ResolutionEngine::new(&store, &clock).with_elevated_delete(true);

            let outcome = engine.apply(&pair(&a, &b), Decision::KeepFirst).unwrap();
            assert_eq!(outcome, Resolution::Deleted(b.clone()));
            assert!(!b.exists());
            assert_eq!(mode(&locked), 0o555);
            set_mode(&locked, 0o755);
        }
    }

    #[test]
    fn test_move_file_plain_rename() {
        let tmp = tempdir().unwrap();
        let from = tmp.path().join("from.bin");
        let to = tmp.path().join("to.bin");
        fs::write(&from, b"payload").unwrap();
        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"payload");
    }
}
