/*!
 * Derived content for scraped slides.
 *
 * - `pipeline`: the TEXT and AUDIO passes
 * - `worker_pool`: CPU pool for language separation
 * - `audio_store`: file store for synthesized narration
 */

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod audio_store;
pub mod pipeline;
pub mod worker_pool;

pub use audio_store::AudioStore;
pub use pipeline::{EnrichmentPipeline, PassReport, PipelineOptions};
pub use worker_pool::WorkerPool;

/// Derived artifact computed by a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Language-separated slide text
    Text,
    /// Synthesized narration of the formatted text
    Audio,
}

impl ArtifactKind {
    /// Slide column the artifact is computed from
    pub fn source_field(&self) -> &'static str {
        match self {
            ArtifactKind::Text => "content",
            ArtifactKind::Audio => "formatted_content",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Text => write!(f, "TEXT"),
            ArtifactKind::Audio => write!(f, "AUDIO"),
        }
    }
}
