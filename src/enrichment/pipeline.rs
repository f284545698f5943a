/*!
 * Enrichment pipeline.
 *
 * A pass selects every slide lacking one derived artifact, drops the
 * slides whose source field is empty, computes the artifact for the rest
 * under a fixed concurrency limit and persists each result as soon as it
 * is ready. Per-slide failures are logged and skipped; the slide stays
 * eligible for the next pass. Only selection failures and failures that
 * affect the whole pass (like an unknown voice) end the run.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::Semaphore;

use crate::app_config::Config;
use crate::database::{Repository, SlideRecord};
use crate::errors::EnrichmentError;
use crate::providers::{SpeechSynthesizer, Voice, VoiceSelector};
use crate::text_separator::{TextBucket, TextSeparator};

use super::ArtifactKind;
use super::audio_store::AudioStore;
use super::worker_pool::WorkerPool;

/// Tunables of the pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum number of artifact computations in flight
    pub concurrency_limit: usize,
    /// Worker pool size, host parallelism when `None`
    pub worker_threads: Option<usize>,
    /// Separated bucket stored as formatted content
    pub stored_bucket: TextBucket,
    /// Voice used by the audio pass
    pub voice: VoiceSelector,
    /// Audio content store
    pub audio_store: AudioStore,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency_limit: config.enrichment.concurrency_limit,
            worker_threads: config.enrichment.worker_threads,
            stored_bucket: config.enrichment.stored_bucket,
            voice: VoiceSelector::from_config(&config.speech),
            audio_store: AudioStore::new(&config.enrichment.save_folder),
        }
    }
}

/// Outcome counters of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub kind: ArtifactKind,
    /// Slides returned by the selection query
    pub selected: usize,
    /// Slides dropped for an empty source field
    pub skipped: usize,
    /// Artifacts persisted
    pub succeeded: usize,
    /// Slides whose computation or write failed
    pub failed: usize,
}

impl PassReport {
    fn new(kind: ArtifactKind, selected: usize) -> Self {
        Self {
            kind,
            selected,
            skipped: 0,
            succeeded: 0,
            failed: 0,
        }
    }

    /// Slides submitted for computation
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl std::fmt::Display for PassReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pass: {} selected, {} skipped, {} enriched, {} failed",
            self.kind, self.selected, self.skipped, self.succeeded, self.failed
        )
    }
}

/// Orchestrates the TEXT and AUDIO passes
pub struct EnrichmentPipeline {
    repository: Repository,
    separator: Arc<TextSeparator>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    workers: WorkerPool,
    options: PipelineOptions,
}

impl EnrichmentPipeline {
    /// Create a pipeline; the worker pool is built here and kept for its lifetime
    pub fn new(repository: Repository, separator: TextSeparator, options: PipelineOptions) -> Result<Self> {
        if options.concurrency_limit == 0 {
            return Err(anyhow!("Concurrency limit must be at least 1"));
        }

        Ok(Self {
            repository,
            separator: Arc::new(separator),
            synthesizer: None,
            workers: WorkerPool::new(options.worker_threads)?,
            options,
        })
    }

    /// Attach the speech synthesizer needed by the audio pass
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Run one pass
    pub async fn run(&self, kind: ArtifactKind) -> Result<PassReport> {
        self.run_with_progress(kind, |_, _| {}).await
    }

    /// Run one pass, reporting `(completed, total)` after every computed slide
    pub async fn run_with_progress<P>(&self, kind: ArtifactKind, progress: P) -> Result<PassReport>
    where
        P: Fn(usize, usize) + Send + Sync,
    {
        match kind {
            ArtifactKind::Text => self.run_text(&progress).await,
            ArtifactKind::Audio => self.run_audio(&progress).await,
        }
    }

    async fn run_text(&self, progress: &(dyn Fn(usize, usize) + Send + Sync)) -> Result<PassReport> {
        let selected = self
            .repository
            .slides_missing_formatted_content()
            .await
            .context("Failed to select slides without formatted content")?;

        let mut report = PassReport::new(ArtifactKind::Text, selected.len());
        let slides = Self::filter_sources(selected, ArtifactKind::Text, &mut report);
        info!("Separating text of {} slides", slides.len());

        self.process(slides, &mut report, progress, |slide| self.enrich_text(slide))
            .await;

        info!("{}", report);
        Ok(report)
    }

    async fn run_audio(&self, progress: &(dyn Fn(usize, usize) + Send + Sync)) -> Result<PassReport> {
        let synthesizer = self
            .synthesizer
            .clone()
            .ok_or_else(|| anyhow!("Audio pass requires a speech synthesizer"))?;

        let selected = self
            .repository
            .slides_missing_audio()
            .await
            .context("Failed to select slides without audio")?;

        let mut report = PassReport::new(ArtifactKind::Audio, selected.len());
        let slides = Self::filter_sources(selected, ArtifactKind::Audio, &mut report);
        if slides.is_empty() {
            info!("{}", report);
            return Ok(report);
        }

        let voice = synthesizer
            .resolve_voice(&self.options.voice)
            .await
            .with_context(|| format!("Failed to resolve voice by {}", self.options.voice))?;
        info!("Synthesizing {} slides with voice {}", slides.len(), voice.name);

        let voice = &voice;
        let synthesizer = synthesizer.as_ref();
        self.process(slides, &mut report, progress, |slide| {
            self.enrich_audio(slide, synthesizer, voice)
        })
        .await;

        info!("{}", report);
        Ok(report)
    }

    /// Drop slides whose source field is empty, keeping selection order
    fn filter_sources(selected: Vec<SlideRecord>, kind: ArtifactKind, report: &mut PassReport) -> Vec<SlideRecord> {
        let mut kept = Vec::with_capacity(selected.len());

        for slide in selected {
            let empty = match kind {
                ArtifactKind::Text => slide.content.trim().is_empty(),
                ArtifactKind::Audio => !slide.has_formatted_content(),
            };

            if empty {
                let reason = EnrichmentError::EmptySourceField {
                    slide_id: slide.id,
                    field: kind.source_field(),
                };
                warn!("Skipping: {}", reason);
                report.skipped += 1;
            } else {
                kept.push(slide);
            }
        }

        kept
    }

    /// Run `enrich` for every slide with at most `concurrency_limit` in flight
    async fn process<'a, F, Fut>(
        &'a self,
        slides: Vec<SlideRecord>,
        report: &mut PassReport,
        progress: &(dyn Fn(usize, usize) + Send + Sync),
        enrich: F,
    ) where
        F: Fn(SlideRecord) -> Fut,
        Fut: std::future::Future<Output = Result<(), EnrichmentError>> + 'a,
    {
        let total = slides.len();
        let limit = self.options.concurrency_limit;
        let semaphore = Arc::new(Semaphore::new(limit));
        let completed = AtomicUsize::new(0);
        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        stream::iter(slides)
            .map(|slide| {
                let semaphore = semaphore.clone();
                let slide_id = slide.id;
                let work = enrich(slide);
                let (completed, succeeded, failed) = (&completed, &succeeded, &failed);

                async move {
                    let result = match semaphore.acquire_owned().await {
                        Ok(_permit) => work.await,
                        Err(e) => Err(EnrichmentError::Worker(e.to_string())),
                    };

                    // each slide is logged as soon as it settles
                    match result {
                        Ok(()) => {
                            succeeded.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            Self::log_failure(slide_id, &e);
                            failed.fetch_add(1, Ordering::SeqCst);
                        }
                    }

                    let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(current, total);
                }
            })
            .buffer_unordered(limit)
            .collect::<Vec<()>>()
            .await;

        report.succeeded += succeeded.load(Ordering::SeqCst);
        report.failed += failed.load(Ordering::SeqCst);
    }

    fn log_failure(slide_id: i64, error: &EnrichmentError) {
        match error {
            EnrichmentError::Provider(provider_error) if !provider_error.details().is_empty() => {
                for detail in provider_error.details() {
                    error!("{}", detail);
                }
                error!("Slide {} skipped after provider error", slide_id);
            }
            other => error!("Slide {} skipped: {}", slide_id, other),
        }
    }

    async fn enrich_text(&self, slide: SlideRecord) -> Result<(), EnrichmentError> {
        let separator = self.separator.clone();
        let bucket = self.options.stored_bucket;
        let content = slide.content;

        let formatted = self
            .workers
            .run(move || separator.separate(&content).into_bucket(bucket))
            .await?;

        let updated = self
            .repository
            .update_formatted_content(slide.id, &formatted)
            .await
            .map_err(|e| EnrichmentError::Storage(format!("{:#}", e)))?;

        if !updated {
            warn!("Slide {} disappeared before its formatted content was stored", slide.id);
        }
        debug!("Slide {} formatted ({} chars)", slide.id, formatted.chars().count());
        Ok(())
    }

    async fn enrich_audio(
        &self,
        slide: SlideRecord,
        synthesizer: &dyn SpeechSynthesizer,
        voice: &Voice,
    ) -> Result<(), EnrichmentError> {
        let text = slide.formatted_content.unwrap_or_default();
        let audio = synthesizer.synthesize(&text, voice).await?;

        // file before row: a crash in between leaves an orphan file only
        let file_name = self.options.audio_store.save(slide.id, audio).await?;

        self.repository
            .insert_audio_dubbing(slide.id, &file_name)
            .await
            .map_err(|e| EnrichmentError::Storage(format!("{:#}", e)))?;

        debug!("Slide {} narrated into {}", slide.id, file_name);
        Ok(())
    }
}
