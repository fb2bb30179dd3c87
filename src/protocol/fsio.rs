//! Atomic file writes.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use crate::error::BridgeError;

/// Write `bytes` to `path` atomically.
///
/// 1. Write to a temporary sibling in the same directory (same filesystem,
///    so the rename cannot degrade to copy+delete).
/// 2. fsync the temporary file.
/// 3. Rename (atomic on POSIX) over the target path.
///
/// A reader polling `path` therefore observes either nothing or the complete
/// contents, never a torn write. Last writer wins on rewrite.
///
/// # Errors
/// Returns [`BridgeError::Io`] on any filesystem failure.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BridgeError> {
    let dir = path.parent().ok_or_else(|| {
        BridgeError::Io(std::io::Error::other(format!(
            "no parent directory for {}",
            path.display()
        )))
    })?;
    let file_name = path.file_name().ok_or_else(|| {
        BridgeError::Io(std::io::Error::other(format!(
            "no file name in {}",
            path.display()
        )))
    })?;

    let tmp_path = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_complete_contents() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("record.json");
        write_atomic(&path, b"{\"ok\":true}").expect("write");
        assert_eq!(fs::read(&path).expect("read"), b"{\"ok\":true}");
    }

    #[test]
    fn rewrite_replaces_not_appends() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("record.json");
        write_atomic(&path, b"first version, long").expect("write");
        write_atomic(&path, b"second").expect("rewrite");
        assert_eq!(fs::read(&path).expect("read"), b"second");
    }

    #[test]
    fn no_temp_sibling_left_behind() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("record.json");
        write_atomic(&path, b"x").expect("write");
        let names: Vec<_> = fs::read_dir(tmp.path())
            .expect("read dir")
            .filter_map(|e| e.ok().map(|e| e.file_name()))
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("record.json")]);
    }
}
