//! Storage backend for individual key material files.

use anyhow::{Context, Result, anyhow};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Who may read a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Public keys; default permissions.
    Public,
    /// Private keys and tokens; owner read/write only on Unix.
    Secret,
}

/// A single file holding one piece of key material.
///
/// `Storage` reads the file whole and replaces it whole; there are no
/// partial updates.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
    visibility: Visibility,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>, visibility: Visibility) -> Self {
        Self {
            path: path.into(),
            visibility,
        }
    }

    pub fn public(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Visibility::Public)
    }

    pub fn secret(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Visibility::Secret)
    }

    /// Loads the entire file into memory.
    ///
    /// The raw I/O error is returned so callers can classify it.
    pub fn load(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Loads the file as UTF-8 text.
    pub fn load_string(&self) -> io::Result<String> {
        let bytes = self.load()?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Saves data to the file using an atomic write.
    ///
    /// Data goes to a randomly named temporary file in the same directory,
    /// which is synced and then renamed over the target. A crash leaves
    /// either the old or the new file, never a torn one.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let tmp_path = self.random_tmp_path()?;

        // fail if the temp name is somehow taken
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        if self.visibility == Visibility::Secret {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut tmp_file = options
            .open(&tmp_path)
            .context("failed to create temporary file")?;

        let written = tmp_file
            .write_all(data)
            .and_then(|()| tmp_file.sync_all());
        drop(tmp_file);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).with_context(|| format!("failed to write {}", tmp_path.display()));
        }

        if let Err(e) = self.atomic_replace(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Some(parent) = self.path.parent() {
            let dir = File::open(parent)?;
            // directory fsync is unsupported on some platforms
            let _ = dir.sync_all();
        }

        debug!(path = %self.path.display(), bytes = data.len(), "file saved");
        Ok(())
    }

    /// Temporary sibling path: `filename.tmp.<randomhex>`.
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut buf = [0u8; 8];
        fill(&mut buf).map_err(|_| anyhow!("OS random generator unavailable"))?;

        let file_name = self
            .path
            .file_name()
            .with_context(|| format!("{} has no file name", self.path.display()))?
            .to_string_lossy();

        let tmp_name = format!("{}.tmp.{}", file_name, hex::encode(buf));

        Ok(self.path.with_file_name(tmp_name))
    }

    /// Replaces the target through `ReplaceFileW`, which keeps the swap
    /// atomic and written through. It needs an existing target, so a first
    /// write is a plain rename.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.path.exists() {
            fs::rename(tmp_path, &self.path).with_context(|| {
                format!("failed to move key file into {}", self.path.display())
            })?;
            return Ok(());
        }

        let wide = |p: &Path| -> Vec<u16> {
            p.as_os_str().encode_wide().chain(std::iter::once(0)).collect()
        };
        let target = wide(&self.path);
        let replacement = wide(tmp_path);

        // SAFETY: both buffers are NUL-terminated UTF-16 and outlive the call;
        // the optional backup and reserved arguments are null.
        let replaced = unsafe {
            ReplaceFileW(
                target.as_ptr(),
                replacement.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };
        if replaced == 0 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("failed to replace key file {}", self.path.display()));
        }

        Ok(())
    }

    /// On Unix, `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        fs::rename(tmp_path, &self.path)
            .with_context(|| format!("failed to move key file into {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_returns_written_data() {
        let dir = tempdir().unwrap();
        let storage = Storage::public(dir.path().join("sig.rsa.pub.pem"));

        storage.save(b"-----BEGIN PUBLIC KEY-----").unwrap();

        assert_eq!(storage.load().unwrap(), b"-----BEGIN PUBLIC KEY-----");
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = Storage::public(dir.path().join("missing.pem"));

        let err = storage.load().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn load_string_rejects_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setup.token");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = Storage::secret(path).load_string().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn save_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pem");

        assert!(!path.exists());
        Storage::public(path.clone()).save(b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn tmp_names_are_unique_siblings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pem");
        let storage = Storage::public(path.clone());

        let a = storage.random_tmp_path().unwrap();
        let b = storage.random_tmp_path().unwrap();

        assert_ne!(a, b);
        assert_ne!(a, path);
        assert_eq!(a.parent(), path.parent());
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pem");
        let storage = Storage::public(path.clone());

        storage.save(b"first").unwrap();
        storage.save(b"second").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"second");
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let storage = Storage::public(dir.path().join("a.pem"));
        storage.save(b"data").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries, vec!["a.pem"]);
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("keys").join("a.pem");

        Storage::public(nested.clone()).save(b"data").unwrap();

        assert!(nested.exists());
    }

    #[cfg(unix)]
    #[test]
    fn secret_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("sig.rsa.prv.pem");
        Storage::secret(path.clone()).save(b"secret").unwrap();

        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
