use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Write bytes to a file so that readers never observe a partial file
    ///
    /// The content is written to a temporary file in the target directory,
    /// flushed to disk and then renamed over the destination.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temporary file in: {:?}", parent))?;
        temp.write_all(content)
            .with_context(|| format!("Failed to write temporary file for: {:?}", path))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to sync temporary file for: {:?}", path))?;
        temp.persist(path)
            .with_context(|| format!("Failed to move file into place: {:?}", path))?;

        Ok(())
    }

    /// Async variant of `write_atomic`, runs on the blocking thread pool
    pub async fn write_atomic_async(path: PathBuf, content: bytes::Bytes) -> Result<()> {
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &content))
            .await
            .context("File write task panicked")?
    }

    /// Reduce a provider file reference to a plain file name
    ///
    /// Returns `None` for references without a usable final component.
    pub fn safe_file_name(reference: &str) -> Option<String> {
        let name = reference
            .rsplit(['/', '\\'])
            .next()?
            .split(['?', '#'])
            .next()?
            .trim();

        if name.is_empty() || name == "." || name == ".." {
            return None;
        }
        Some(name.to_string())
    }
}
