//! Local file assets
//!
//! A directory is staged by fingerprinting its contents. The fingerprint
//! names the archive object the bucket deployment copies from, so changed
//! plugins or requirements produce a new object key and a redeploy.
//! Archiving and uploading the object is left to the asset publisher, which
//! reads the template's `Assets` metadata. Symbolic links are not followed.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{StackError, StackResult};

/// A staged directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    source: PathBuf,
    fingerprint: String,
    file_count: usize,
}

impl Asset {
    /// Fingerprint every file under `dir`
    pub fn stage(dir: impl AsRef<Path>) -> StackResult<Self> {
        let dir = dir.as_ref();
        let io_err = |source| StackError::Asset {
            path: dir.to_path_buf(),
            source,
        };

        if !fs::metadata(dir).map_err(io_err)?.is_dir() {
            return Err(io_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "asset source is not a directory",
            )));
        }

        let mut files = Vec::new();
        collect_files(dir, dir, &mut files).map_err(io_err)?;
        files.sort();

        let mut hasher = Sha256::new();
        for relative in &files {
            let contents = fs::read(dir.join(relative)).map_err(io_err)?;
            hasher.update(relative.as_bytes());
            hasher.update([0u8]);
            hasher.update(&contents);
            hasher.update([0u8]);
        }
        let fingerprint = hex::encode(hasher.finalize());

        info!(
            source = %dir.display(),
            files = files.len(),
            fingerprint = %fingerprint,
            "Staged asset"
        );

        Ok(Self {
            source: dir.to_path_buf(),
            fingerprint,
            file_count: files.len(),
        })
    }

    /// An asset staged elsewhere with a known fingerprint
    pub fn prestaged(source: impl Into<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fingerprint: fingerprint.into(),
            file_count: 0,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Key of the zipped asset in the assets bucket
    pub fn object_key(&self) -> String {
        format!("{}.zip", self.fingerprint)
    }
}

/// Relative paths of all files below `dir`, `/`-separated
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_symlink() {
            continue;
        }
        if file_type.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(relative);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_stage_fingerprints_contents() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "plugins.zip", "zip-bytes");
        write(dir.path(), "nested/readme.txt", "hello");

        let asset = Asset::stage(dir.path()).unwrap();
        assert_eq!(asset.file_count(), 2);
        assert_eq!(asset.fingerprint().len(), 64);
        assert_eq!(asset.object_key(), format!("{}.zip", asset.fingerprint()));

        // Same contents, same fingerprint
        assert_eq!(Asset::stage(dir.path()).unwrap().fingerprint(), asset.fingerprint());

        write(dir.path(), "nested/readme.txt", "changed");
        assert_ne!(Asset::stage(dir.path()).unwrap().fingerprint(), asset.fingerprint());
    }

    #[test]
    fn test_stage_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("requirements");

        match Asset::stage(&missing) {
            Err(StackError::Asset { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected asset error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_skips_symlinks() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "plugins.zip", "zip-bytes");
        let before = Asset::stage(dir.path()).unwrap();

        // A link back to the root would loop forever if followed
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("plugins.zip"),
            dir.path().join("alias.zip"),
        )
        .unwrap();

        let after = Asset::stage(dir.path()).unwrap();
        assert_eq!(after.file_count(), 1);
        assert_eq!(after.fingerprint(), before.fingerprint());
    }

    #[test]
    fn test_stage_rejects_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "requirements.txt", "apache-airflow");

        assert!(Asset::stage(dir.path().join("requirements.txt")).is_err());
    }
}
