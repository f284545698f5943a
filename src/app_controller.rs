use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::app_config::Config;
use crate::bot::{BotHandlers, BotRunner};
use crate::database::{DatabaseConnection, DatabaseStats, Repository};
use crate::enrichment::{ArtifactKind, EnrichmentPipeline, PassReport, PipelineOptions};
use crate::file_utils::FileManager;
use crate::providers::course_api::{CourseApi, Session};
use crate::providers::elevenlabs::ElevenLabs;
use crate::providers::telegram::TelegramClient;
use crate::providers::{SpeechSynthesizer, Voice, VoiceSelector};
use crate::scraper::{ScrapeReport, Scraper};
use crate::text_separator::TextSeparator;

// @module: Application controller wiring configuration to the commands

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn open_repository(&self) -> Result<Repository> {
        let connection = DatabaseConnection::new(&self.config.database.path)?;
        Ok(Repository::new(connection))
    }

    /// Copy the course tree from the provider into the database
    pub async fn scrape(&self) -> Result<ScrapeReport> {
        self.config.require_course_credentials()?;

        let api = CourseApi::new(&self.config.course_api);
        let session = match self.config.course_api.session_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => {
                info!("Using configured session token");
                Session::from_token(token)
            }
            None => api
                .authenticate(&self.config.course_api.username, &self.config.course_api.password)
                .await
                .context("Failed to log in to the course provider")?,
        };

        if self.config.scrape.download_images {
            FileManager::ensure_dir(&self.config.scrape.image_folder)?;
        }

        let scraper = Scraper::new(api, self.open_repository()?, &self.config.scrape);
        scraper.run(&session).await
    }

    /// Run one enrichment pass with a progress bar
    pub async fn enrich(&self, kind: ArtifactKind) -> Result<PassReport> {
        let separator = TextSeparator::with_whatlang(
            &self.config.enrichment.primary_language,
            &self.config.enrichment.secondary_language,
        )?;
        let mut pipeline = EnrichmentPipeline::new(
            self.open_repository()?,
            separator,
            PipelineOptions::from_config(&self.config),
        )?;

        if kind == ArtifactKind::Audio {
            self.config.require_speech_key()?;
            FileManager::ensure_dir(&self.config.enrichment.save_folder)?;
            pipeline = pipeline.with_synthesizer(Arc::new(ElevenLabs::new(&self.config.speech)));
        }

        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} slides ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message(kind.to_string());

        let bar = progress_bar.clone();
        let report = pipeline
            .run_with_progress(kind, move |current, total| {
                bar.set_length(total as u64);
                bar.set_position(current as u64);
            })
            .await;

        progress_bar.finish_and_clear();
        let report = report?;

        if report.failed > 0 {
            warn!("{} slides failed and stay eligible for the next run", report.failed);
        }
        Ok(report)
    }

    /// Stream one slide's narration into a file
    ///
    /// # Returns
    /// * `Result<u64>` - Number of audio bytes written
    pub async fn speak(&self, slide_id: i64, output: &Path) -> Result<u64> {
        self.config.require_speech_key()?;

        let slide = self
            .open_repository()?
            .get_slide(slide_id)
            .await?
            .ok_or_else(|| anyhow!("Slide {} does not exist", slide_id))?;

        let text = slide
            .formatted_content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| anyhow!("Slide {} has no formatted content, run `enrich text` first", slide_id))?;

        let client = ElevenLabs::new(&self.config.speech);
        let voice = client
            .resolve_voice(&VoiceSelector::from_config(&self.config.speech))
            .await?;

        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        FileManager::ensure_dir(parent)?;

        // the output path only appears once the whole payload is on disk
        let temp_file = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
        let mut file = tokio::fs::File::from_std(
            temp_file
                .reopen()
                .context("Failed to open temporary audio file")?,
        );

        let written = client.synthesize_into(&text, &voice, &mut file).await?;
        drop(file);
        temp_file
            .persist(output)
            .with_context(|| format!("Failed to write output file: {:?}", output))?;

        info!("Wrote {} bytes of audio to {:?}", written, output);
        Ok(written)
    }

    /// Voice catalog of the speech provider
    pub async fn voices(&self) -> Result<Vec<Voice>> {
        self.config.require_speech_key()?;
        Ok(ElevenLabs::new(&self.config.speech).list_voices().await?)
    }

    /// Run the chat bot until interrupted
    pub async fn run_bot(&self) -> Result<()> {
        self.config.require_bot_token()?;

        let client = TelegramClient::new(
            &self.config.bot.api_url,
            &self.config.bot.token,
            self.config.bot.poll_timeout_secs,
        );
        let handlers = BotHandlers::new(self.open_repository()?, self.config.bot.page_size);

        BotRunner::new(client, handlers).run().await
    }

    /// Row counts of the database
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.open_repository()?.connection().stats()
    }
}
