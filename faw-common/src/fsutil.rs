//! Forced-removal filesystem helpers
//!
//! Session folders arrive from webcam capture clients that sometimes mark
//! frames read-only. Removal therefore retries once after forcing permissive
//! access; any other failure propagates to the caller.

use std::fs;
use std::io;
use std::path::Path;

/// Remove a file, retrying once with permissive access on PermissionDenied.
///
/// A file that is already gone counts as removed.
pub fn force_remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            make_permissive(path);
            if let Some(parent) = path.parent() {
                make_permissive(parent);
            }
            fs::remove_file(path)
        }
        Err(e) => Err(e),
    }
}

/// Recursively remove a directory, retrying once with permissive access
/// applied to the whole tree on PermissionDenied.
pub fn force_remove_dir_all(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            make_tree_permissive(path);
            fs::remove_dir_all(path)
        }
        Err(e) => Err(e),
    }
}

/// Best-effort permissive access on a single path.
fn make_permissive(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o777));
    }
    #[cfg(not(unix))]
    {
        if let Ok(metadata) = fs::metadata(path) {
            let mut permissions = metadata.permissions();
            permissions.set_readonly(false);
            let _ = fs::set_permissions(path, permissions);
        }
    }
}

fn make_tree_permissive(path: &Path) {
    make_permissive(path);
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let child = entry.path();
            if child.is_dir() {
                make_tree_permissive(&child);
            } else {
                make_permissive(&child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("frame.jpg");
        fs::write(&file, b"jpeg bytes").unwrap();

        force_remove_file(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn missing_file_counts_as_removed() {
        let dir = tempfile::tempdir().unwrap();
        force_remove_file(&dir.path().join("gone.jpg")).unwrap();
    }

    #[test]
    fn removes_readonly_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("frame.png");
        fs::write(&file, b"png bytes").unwrap();

        let mut permissions = fs::metadata(&file).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&file, permissions).unwrap();

        force_remove_file(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn removes_tree_with_readonly_contents() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("abc123_group7");
        fs::create_dir(&session).unwrap();
        let file = session.join("frame.jpg");
        fs::write(&file, b"jpeg bytes").unwrap();

        let mut permissions = fs::metadata(&file).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&file, permissions).unwrap();

        force_remove_dir_all(&session).unwrap();
        assert!(!session.exists());
    }

    #[test]
    fn missing_dir_counts_as_removed() {
        let dir = tempfile::tempdir().unwrap();
        force_remove_dir_all(&dir.path().join("gone_dir")).unwrap();
    }
}
