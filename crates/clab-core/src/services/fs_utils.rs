use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{ClabError, Result};

/// Mode used for every directory bind-mounted into a node.
pub const LAB_DIR_MODE: u32 = 0o777;

/// Create `path` and any missing parents. An existing directory is not an error.
pub fn create_directory(path: &Path, mode: u32) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder
        .create(path)
        .map_err(|source| ClabError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })
}

/// Byte-exact copy, replacing `dst` if present. Parent directories of `dst`
/// are created when missing. `dst` gets default permissions rather than the
/// mode of `src`, so a read-only source can be staged again on the next run.
/// Copying a file onto itself is a no-op.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let (Ok(a), Ok(b)) = (src.canonicalize(), dst.canonicalize()) {
        if a == b {
            tracing::debug!("CopyFile src {} and dst are the same file", src.display());
            return Ok(());
        }
    }

    let copy = || -> std::io::Result<u64> {
        let mut reader = File::open(src)?;
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = File::create(dst)?;
        let n = io::copy(&mut reader, &mut writer)?;
        writer.sync_all()?;
        Ok(n)
    };
    let bytes = copy().map_err(|source| ClabError::FileCopy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        "CopyFile src {} -> dst {} succeeded ({bytes} bytes)",
        src.display(),
        dst.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn create_directory_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("config");
        create_directory(&target, LAB_DIR_MODE).unwrap();
        create_directory(&target, LAB_DIR_MODE).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn copy_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.lic");
        fs::write(&src, b"first").unwrap();
        let dst = dir.path().join("node/config/license.conf");

        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"first");

        fs::write(&src, b"second").unwrap();
        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"second");
    }

    #[cfg(unix)]
    #[test]
    fn read_only_source_can_be_copied_again() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("r1.lic");
        fs::write(&src, b"license").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o444)).unwrap();
        let dst = dir.path().join("lab/r1/config/license.conf");

        copy_file(&src, &dst).unwrap();
        let mode = fs::metadata(&dst).unwrap().permissions().mode();
        assert_ne!(mode & 0o200, 0, "dst mode {mode:o} is not owner-writable");

        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"license");
    }

    #[test]
    fn copy_onto_itself_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.conf");
        fs::write(&path, b"precious").unwrap();

        copy_file(&path, &path).unwrap();
        // Same file reached through a different spelling.
        copy_file(&path, &dir.path().join(".").join("license.conf")).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"precious");
    }

    #[test]
    fn copy_missing_source_names_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("absent");
        let dst = dir.path().join("out");
        let err = copy_file(&src, &dst).unwrap_err();
        match &err {
            ClabError::FileCopy { src: s, dst: d, .. } => {
                assert_eq!(s, &src);
                assert_eq!(d, &dst);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains(&src.display().to_string()));
        assert!(message.contains(&dst.display().to_string()));
    }
}
