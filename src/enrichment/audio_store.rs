use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::errors::EnrichmentError;
use crate::file_utils::FileManager;

// @module: Content store for synthesized narration

/// Directory holding one audio file per slide
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // @returns: Deterministic file name for a slide
    pub fn file_name(slide_id: i64) -> String {
        format!("{}.mp3", slide_id)
    }

    pub fn path_for(&self, slide_id: i64) -> PathBuf {
        self.root.join(Self::file_name(slide_id))
    }

    /// Durably write a slide's audio and return the stored file name
    ///
    /// The file is complete on disk when this returns, so a row referencing
    /// it can be committed afterwards.
    pub async fn save(&self, slide_id: i64, audio: Bytes) -> Result<String, EnrichmentError> {
        FileManager::write_atomic_async(self.path_for(slide_id), audio)
            .await
            .map_err(|e| EnrichmentError::Storage(format!("{:#}", e)))?;

        Ok(Self::file_name(slide_id))
    }
}
