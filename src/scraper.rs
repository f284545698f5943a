/*!
 * Scrape step: course provider to database.
 *
 * Walks modules, their subjects and the subjects' slides, upserting every
 * record. Re-running a scrape is safe: unchanged slides keep their derived
 * content and attachment sets are replaced, not appended.
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use crate::app_config::ScrapeConfig;
use crate::database::{AttachmentRecord, ModuleRecord, Repository, SlideRecord, SubjectRecord};
use crate::file_utils::FileManager;
use crate::providers::course_api::{AttachmentPayload, CourseApi, Session, SlidePayload};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "svg"];

/// Counters of one scrape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub modules: usize,
    pub subjects: usize,
    pub slides: usize,
    /// Slides fetched individually because their listed content was empty
    pub refetched: usize,
    /// Individual fetches answered with an error payload
    pub refetch_failures: usize,
    pub attachments: usize,
    pub images_downloaded: usize,
    pub image_failures: usize,
}

impl std::fmt::Display for ScrapeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} modules, {} subjects, {} slides ({} refetched, {} failed), {} attachments, {} images ({} failed)",
            self.modules,
            self.subjects,
            self.slides,
            self.refetched,
            self.refetch_failures,
            self.attachments,
            self.images_downloaded,
            self.image_failures
        )
    }
}

/// Copies the course tree into the repository
pub struct Scraper {
    api: CourseApi,
    repository: Repository,
    download_images: bool,
    image_folder: PathBuf,
}

impl Scraper {
    pub fn new(api: CourseApi, repository: Repository, config: &ScrapeConfig) -> Self {
        Self {
            api,
            repository,
            download_images: config.download_images,
            image_folder: config.image_folder.clone(),
        }
    }

    /// Run a full scrape with an authenticated session
    ///
    /// Listing failures end the scrape; failures of single slides or
    /// images are logged and counted.
    pub async fn run(&self, session: &Session) -> Result<ScrapeReport> {
        let mut report = ScrapeReport::default();

        let modules = self
            .api
            .list_modules(session)
            .await
            .context("Failed to list course modules")?;
        info!("Scraping {} modules", modules.len());

        for module in &modules {
            self.repository.upsert_module(&ModuleRecord::from(module)).await?;
            report.modules += 1;

            let subjects = self
                .api
                .list_subjects(session, module.id)
                .await
                .with_context(|| format!("Failed to list subjects of module {}", module.id))?;

            for subject in &subjects {
                self.repository.upsert_subject(&SubjectRecord::from(subject)).await?;
                report.subjects += 1;

                let slides = self
                    .api
                    .list_slides(session, subject.id)
                    .await
                    .with_context(|| format!("Failed to list slides of subject {}", subject.id))?;
                debug!("Subject {} '{}' has {} slides", subject.id, subject.name, slides.len());

                for listed in slides {
                    let slide = self.complete_slide(session, subject.id, listed, &mut report).await;
                    self.store_slide(session, module.id, &slide, &mut report).await?;
                }
            }
        }

        info!("Scrape finished: {}", report);
        Ok(report)
    }

    /// Refetch a slide whose listed content is empty
    async fn complete_slide(
        &self,
        session: &Session,
        subject_id: i64,
        listed: SlidePayload,
        report: &mut ScrapeReport,
    ) -> SlidePayload {
        if !listed.content.trim().is_empty() {
            return listed;
        }

        report.refetched += 1;
        match self.api.get_slide(session, subject_id, listed.id).await {
            Ok(full) => full,
            Err(e) => {
                for detail in e.details() {
                    error!("{}", detail);
                }
                warn!("Slide {} kept as listed: {}", listed.id, e);
                report.refetch_failures += 1;
                listed
            }
        }
    }

    async fn store_slide(
        &self,
        session: &Session,
        module_id: i64,
        slide: &SlidePayload,
        report: &mut ScrapeReport,
    ) -> Result<()> {
        self.repository
            .upsert_slide(&SlideRecord::from_payload(slide, module_id))
            .await
            .with_context(|| format!("Failed to store slide {}", slide.id))?;
        report.slides += 1;

        let attachments = slide.attachments();
        let records: Vec<AttachmentRecord> = attachments
            .iter()
            .map(|a| AttachmentRecord::from_payload(a, slide.id))
            .collect();
        report.attachments += self.repository.replace_attachments(slide.id, &records).await?;

        if self.download_images {
            for attachment in attachments.iter().filter(|a| is_image(a)) {
                match self.download_image(session, &attachment.file).await {
                    Ok(true) => report.images_downloaded += 1,
                    Ok(false) => {}
                    Err(e) => {
                        error!("Image {} of slide {} failed: {:#}", attachment.file, slide.id, e);
                        report.image_failures += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// Fetch one image unless it is already on disk
    ///
    /// # Returns
    /// * `Result<bool>` - Whether a file was written
    async fn download_image(&self, session: &Session, reference: &str) -> Result<bool> {
        let Some(name) = FileManager::safe_file_name(reference) else {
            warn!("Ignoring attachment reference without a file name: {:?}", reference);
            return Ok(false);
        };

        let target = self.image_folder.join(name);
        if FileManager::file_exists(&target) {
            return Ok(false);
        }

        let bytes = self.api.get_image(session, reference).await?;
        FileManager::write_atomic_async(target, bytes).await?;
        Ok(true)
    }
}

/// Whether an attachment refers to an image file
fn is_image(attachment: &AttachmentPayload) -> bool {
    if attachment.file.trim().is_empty() {
        return false;
    }
    if attachment.attachment_type.to_lowercase().contains("image") {
        return true;
    }

    attachment
        .file
        .rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
