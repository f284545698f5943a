/*!
 * Common test utilities for the prawko test suite
 */

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use prawko::database::{ModuleRecord, Repository, SlideRecord};
use prawko::enrichment::{AudioStore, EnrichmentPipeline, PipelineOptions};
use prawko::providers::VoiceSelector;
use prawko::text_separator::{LanguageDetector, TextBucket, TextSeparator};

// Re-export the mock synthesizer module
pub mod log_capture;
pub mod mock_synthesizer;

/// Install the capturing test logger once; later calls are no-ops
pub fn init_logger() {
    log_capture::install();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Deterministic detector: a fixed table of English and Polish phrases
pub fn table_detector() -> Arc<dyn LanguageDetector> {
    Arc::new(|text: &str| -> Option<String> {
        match text {
            "Hello" | "Stop sign" | "Give way" | "Turn left" => Some("en".to_string()),
            "Cześć" | "Znak stop" | "Ustąp pierwszeństwa" | "Skręć w lewo" => Some("pl".to_string()),
            "Hallo" => Some("de".to_string()),
            _ => None,
        }
    })
}

/// Separator for the en/pl pair backed by `table_detector`
pub fn test_separator() -> TextSeparator {
    TextSeparator::new(table_detector(), "en", "pl").expect("valid language pair")
}

/// In-memory repository holding module 1
pub async fn repository_with_module() -> Result<Repository> {
    let repository = Repository::new_in_memory()?;
    repository
        .upsert_module(&ModuleRecord {
            id: 1,
            module_number: 1,
            name: "Road signs".to_string(),
            subjects_number: 1,
        })
        .await?;
    Ok(repository)
}

/// Slide of module 1
pub fn slide(id: i64, content: &str, formatted_content: Option<&str>) -> SlideRecord {
    SlideRecord {
        id,
        subject_id: 100,
        lesson_number: id,
        name: format!("Slide {}", id),
        content: content.to_string(),
        formatted_content: formatted_content.map(str::to_string),
        module_id: Some(1),
    }
}

/// Insert the given slides
pub async fn seed_slides(repository: &Repository, slides: &[SlideRecord]) -> Result<()> {
    for slide in slides {
        repository.upsert_slide(slide).await?;
    }
    Ok(())
}

/// Pipeline options writing audio below `audio_root`
pub fn pipeline_options(audio_root: &Path, concurrency_limit: usize) -> PipelineOptions {
    PipelineOptions {
        concurrency_limit,
        worker_threads: Some(1),
        stored_bucket: TextBucket::Secondary,
        voice: VoiceSelector::Name("Antoni".to_string()),
        audio_store: AudioStore::new(audio_root),
    }
}

/// Pipeline over `repository` with the table separator
pub fn pipeline(repository: &Repository, options: PipelineOptions) -> Result<EnrichmentPipeline> {
    EnrichmentPipeline::new(repository.clone(), test_separator(), options)
}
