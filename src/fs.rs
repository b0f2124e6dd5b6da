//! Filesystem primitives: recursive removal and filtered tree copy.
use std::fs;
use std::io;
use std::path::Path;

use filetime::FileTime;

use crate::error::InstallError;
use crate::filter::ExclusionPatternSet;

/// Counters collected while copying (or planning to copy) one tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Regular files written.
    pub files: usize,
    /// Directories created, including the destination root.
    pub dirs: usize,
    /// Entries skipped because their name matched an exclusion pattern.
    pub excluded: usize,
}

impl CopyStats {
    /// Add another tree's counters to these.
    pub const fn merge(&mut self, other: Self) {
        self.files += other.files;
        self.dirs += other.dirs;
        self.excluded += other.excluded;
    }
}

/// Whether anything (file, directory or dangling symlink) exists at `path`.
///
/// Only a missing entry counts as absent; any other lookup failure means the
/// path cannot be cleared.
///
/// # Errors
///
/// Returns [`InstallError::FilesystemRemovalFailed`] if `path` cannot be
/// inspected, for example when a parent directory is not searchable.
pub fn entry_exists(path: &Path) -> Result<bool, InstallError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(InstallError::FilesystemRemovalFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Remove `path` and everything below it.
///
/// Symlinks and plain files are unlinked rather than followed.  Returns
/// `Ok(false)` when nothing exists at `path`.
///
/// # Errors
///
/// Returns [`InstallError::FilesystemRemovalFailed`] if the path cannot be
/// inspected or cannot be removed; part of the tree may already be gone.
pub fn remove_tree(path: &Path) -> Result<bool, InstallError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(InstallError::FilesystemRemovalFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|source| InstallError::FilesystemRemovalFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Recursively copy `src` to `dst`, skipping excluded entries.
///
/// `dst` and any missing ancestors are created.  Every file and directory
/// name is checked against `filter`; a matching directory is skipped with
/// its whole subtree.  Symlinks within the source tree are *followed*, so
/// their targets are materialised in the destination.  Permissions and
/// access/modification times of copied files are preserved.
///
/// The copy is not transactional: on error, whatever was written so far
/// remains on disk.
///
/// # Errors
///
/// Returns [`InstallError::CopyFailed`] naming the entry being processed when
/// a directory cannot be read or created or a file cannot be copied.
pub fn copy_tree(
    src: &Path,
    dst: &Path,
    filter: &ExclusionPatternSet,
) -> Result<CopyStats, InstallError> {
    let mut stats = CopyStats::default();
    copy_dir(src, dst, filter, &mut stats)?;
    Ok(stats)
}

fn copy_dir(
    src: &Path,
    dst: &Path,
    filter: &ExclusionPatternSet,
    stats: &mut CopyStats,
) -> Result<(), InstallError> {
    fs::create_dir_all(dst).map_err(|e| copy_failed(src, dst, e))?;
    stats.dirs += 1;

    for entry in sorted_entries(src).map_err(|e| copy_failed(src, dst, e))? {
        let name = entry.file_name();
        if filter.is_excluded(&name) {
            tracing::debug!("excluded {}", entry.path().display());
            stats.excluded += 1;
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);
        if src_path.is_dir() {
            copy_dir(&src_path, &dst_path, filter, stats)?;
        } else {
            copy_file(&src_path, &dst_path).map_err(|e| copy_failed(&src_path, &dst_path, e))?;
            stats.files += 1;
        }
    }
    Ok(())
}

/// Count what [`copy_tree`] would copy without writing anything.
///
/// # Errors
///
/// Returns [`InstallError::CopyFailed`] if a source directory cannot be read.
pub fn plan_copy(
    src: &Path,
    dst: &Path,
    filter: &ExclusionPatternSet,
) -> Result<CopyStats, InstallError> {
    let mut stats = CopyStats::default();
    plan_dir(src, dst, filter, &mut stats)?;
    Ok(stats)
}

fn plan_dir(
    src: &Path,
    dst: &Path,
    filter: &ExclusionPatternSet,
    stats: &mut CopyStats,
) -> Result<(), InstallError> {
    stats.dirs += 1;
    for entry in sorted_entries(src).map_err(|e| copy_failed(src, dst, e))? {
        let name = entry.file_name();
        if filter.is_excluded(&name) {
            stats.excluded += 1;
            continue;
        }
        let src_path = entry.path();
        if src_path.is_dir() {
            plan_dir(&src_path, &dst.join(&name), filter, stats)?;
        } else {
            stats.files += 1;
        }
    }
    Ok(())
}

/// Directory entries sorted by name so copies and logs are deterministic.
fn sorted_entries(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);
    Ok(entries)
}

/// Copy file contents and permissions, then carry over timestamps.
fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let meta = fs::metadata(src)?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
}

fn copy_failed(from: &Path, to: &Path, source: io::Error) -> InstallError {
    InstallError::CopyFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    // -----------------------------------------------------------------------
    // copy_tree
    // -----------------------------------------------------------------------

    #[test]
    fn copies_files_and_subdirectories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&src.path().join("a.h"), "aaa");
        write(&src.path().join("sub/b.h"), "bbb");

        let target = dst.path().join("include").join("aquila");
        let stats = copy_tree(src.path(), &target, &ExclusionPatternSet::default()).unwrap();

        assert_eq!(fs::read_to_string(target.join("a.h")).unwrap(), "aaa");
        assert_eq!(fs::read_to_string(target.join("sub/b.h")).unwrap(), "bbb");
        assert_eq!(
            stats,
            CopyStats {
                files: 2,
                dirs: 2,
                excluded: 0
            }
        );
    }

    #[test]
    fn skips_every_default_pattern_and_keeps_the_rest() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        for name in [
            ".svnignore",
            "Dtw.cpp",
            "aquila.rc",
            "aquila.pro",
            "Makefile.Release",
            "debug",
            "release",
            "obj",
            "objd",
            "object_script.aquila.Debug",
        ] {
            write(&src.path().join(name), "x");
        }
        write(&src.path().join("Dtw.h"), "header");

        let target = dst.path().join("out");
        let stats = copy_tree(src.path(), &target, &ExclusionPatternSet::default()).unwrap();

        let copied: Vec<_> = fs::read_dir(&target)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(copied, vec![std::ffi::OsString::from("Dtw.h")]);
        assert_eq!(stats.excluded, 10);
    }

    #[test]
    fn excluded_directory_skips_whole_subtree() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&src.path().join("release/libAquila.a"), "lib");
        write(&src.path().join("release/nested/readme.txt"), "doc");
        write(&src.path().join("libAquila.a"), "lib");

        let target = dst.path().join("lib");
        copy_tree(src.path(), &target, &ExclusionPatternSet::default()).unwrap();

        assert!(target.join("libAquila.a").exists());
        assert!(!target.join("release").exists());
    }

    #[test]
    fn preserves_modification_time() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let file = src.path().join("libAquila.a");
        write(&file, "lib");
        let stamp = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&file, stamp).unwrap();

        let target = dst.path().join("lib");
        copy_tree(src.path(), &target, &ExclusionPatternSet::default()).unwrap();

        let meta = fs::metadata(target.join("libAquila.a")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), stamp);
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinks_in_source() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&src.path().join("real/libAquila.so.2"), "so");
        std::os::unix::fs::symlink(
            src.path().join("real/libAquila.so.2"),
            src.path().join("libAquila.so"),
        )
        .unwrap();

        let target = dst.path().join("lib");
        copy_tree(src.path(), &target, &ExclusionPatternSet::default()).unwrap();

        let copied = target.join("libAquila.so");
        assert!(!copied.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(copied).unwrap(), "so");
    }

    #[test]
    fn missing_source_is_copy_failed() {
        let dst = tempfile::tempdir().unwrap();
        let missing = dst.path().join("nope");
        let err = copy_tree(&missing, &dst.path().join("out"), &ExclusionPatternSet::default())
            .unwrap_err();
        assert!(matches!(err, InstallError::CopyFailed { ref from, .. } if *from == missing));
    }

    // -----------------------------------------------------------------------
    // plan_copy
    // -----------------------------------------------------------------------

    #[test]
    fn plan_copy_counts_without_writing() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(&src.path().join("a.h"), "a");
        write(&src.path().join("obj/a.o"), "o");
        write(&src.path().join("sub/b.h"), "b");

        let target = dst.path().join("out");
        let stats = plan_copy(src.path(), &target, &ExclusionPatternSet::default()).unwrap();

        assert_eq!(
            stats,
            CopyStats {
                files: 2,
                dirs: 2,
                excluded: 1
            }
        );
        assert!(!target.exists());
    }

    // -----------------------------------------------------------------------
    // remove_tree
    // -----------------------------------------------------------------------

    #[test]
    fn remove_tree_deletes_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("aquila");
        write(&root.join("lib/old.so"), "old");
        assert!(remove_tree(&root).unwrap());
        assert!(!root.exists());
    }

    #[test]
    fn remove_tree_noop_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_tree(&dir.path().join("absent")).unwrap());
    }

    #[test]
    fn remove_tree_removes_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("aquila");
        write(&file, "not a directory");
        assert!(remove_tree(&file).unwrap());
        assert!(file.symlink_metadata().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn remove_tree_unlinks_symlink_without_touching_target() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        write(&real.join("keep.txt"), "keep");
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(remove_tree(&link).unwrap());
        assert!(link.symlink_metadata().is_err());
        assert!(real.join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn unsearchable_parent_is_an_error_not_absence() {
        if !perms::enforced() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        write(&locked.join("aquila/old.so"), "old");
        perms::set_mode(&locked, 0o000);

        let target = locked.join("aquila");
        let exists = entry_exists(&target);
        let removed = remove_tree(&target);
        perms::set_mode(&locked, 0o755);

        assert!(matches!(exists, Err(InstallError::FilesystemRemovalFailed { .. })));
        assert!(matches!(removed, Err(InstallError::FilesystemRemovalFailed { .. })));
        assert!(target.join("old.so").exists());
    }

    #[test]
    fn entry_exists_distinguishes_present_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("here"), "x");
        assert!(entry_exists(&dir.path().join("here")).unwrap());
        assert!(!entry_exists(&dir.path().join("gone")).unwrap());
    }

    #[test]
    fn merge_adds_counters() {
        let mut total = CopyStats {
            files: 1,
            dirs: 1,
            excluded: 0,
        };
        total.merge(CopyStats {
            files: 2,
            dirs: 3,
            excluded: 4,
        });
        assert_eq!(
            total,
            CopyStats {
                files: 3,
                dirs: 4,
                excluded: 4
            }
        );
    }
}
