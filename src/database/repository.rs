/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, OptionalExtension, Row};

use super::connection::DatabaseConnection;
use super::models::{AttachmentRecord, AudioDubbingRecord, ModuleRecord, SlideRecord, SubjectRecord};

const SLIDE_COLUMNS: &str =
    "s.id, s.subject_id, s.lesson_number, s.name, s.content, s.formatted_content, s.module_id";

fn parse_slide_row(row: &Row) -> rusqlite::Result<SlideRecord> {
    Ok(SlideRecord {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        lesson_number: row.get(2)?,
        name: row.get(3)?,
        content: row.get(4)?,
        formatted_content: row.get(5)?,
        module_id: row.get(6)?,
    })
}

fn parse_module_row(row: &Row) -> rusqlite::Result<ModuleRecord> {
    Ok(ModuleRecord {
        id: row.get(0)?,
        module_number: row.get(1)?,
        name: row.get(2)?,
        subjects_number: row.get(3)?,
    })
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection handle
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Scrape writes
    // =========================================================================

    /// Insert or update a module
    pub async fn upsert_module(&self, module: &ModuleRecord) -> Result<()> {
        let module = module.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO modules (id, module_number, name, subjects_number)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(id) DO UPDATE SET
                        module_number = excluded.module_number,
                        name = excluded.name,
                        subjects_number = excluded.subjects_number
                    "#,
                    params![module.id, module.module_number, module.name, module.subjects_number],
                )?;
                Ok(())
            })
            .await
    }

    /// Insert or update a subject
    pub async fn upsert_subject(&self, subject: &SubjectRecord) -> Result<()> {
        let subject = subject.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO subjects (id, name, slides_number)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        slides_number = excluded.slides_number
                    "#,
                    params![subject.id, subject.name, subject.slides_number],
                )?;
                Ok(())
            })
            .await
    }

    /// Insert or update a slide
    ///
    /// Formatted content survives an update only when the raw content is
    /// unchanged; otherwise it is cleared so the text pass selects the slide
    /// again. The record's own `formatted_content` is used for new rows only.
    pub async fn upsert_slide(&self, slide: &SlideRecord) -> Result<()> {
        let slide = slide.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO slides (id, subject_id, lesson_number, name, content, formatted_content, module_id)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(id) DO UPDATE SET
                        subject_id = excluded.subject_id,
                        lesson_number = excluded.lesson_number,
                        name = excluded.name,
                        module_id = excluded.module_id,
                        formatted_content = CASE
                            WHEN slides.content = excluded.content THEN slides.formatted_content
                            ELSE NULL
                        END,
                        content = excluded.content
                    "#,
                    params![
                        slide.id,
                        slide.subject_id,
                        slide.lesson_number,
                        slide.name,
                        slide.content,
                        slide.formatted_content,
                        slide.module_id,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Replace the attachment set of a slide in one transaction
    pub async fn replace_attachments(&self, slide_id: i64, attachments: &[AttachmentRecord]) -> Result<usize> {
        let attachments = attachments.to_vec();

        self.db
            .transaction_async(move |tx| {
                tx.execute("DELETE FROM attachments WHERE slide_id = ?1", [slide_id])?;

                let mut stmt = tx.prepare(
                    "INSERT INTO attachments (name, type, file, autostart, slide_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for attachment in &attachments {
                    stmt.execute(params![
                        attachment.name,
                        attachment.attachment_type,
                        attachment.file,
                        attachment.autostart,
                        slide_id,
                    ])?;
                }

                Ok(attachments.len())
            })
            .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// List all modules ordered by module number
    pub async fn list_modules(&self) -> Result<Vec<ModuleRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, module_number, name, subjects_number FROM modules ORDER BY module_number, id",
                )?;
                let modules = stmt
                    .query_map([], parse_module_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(modules)
            })
            .await
    }

    /// Get a module by ID
    pub async fn get_module(&self, module_id: i64) -> Result<Option<ModuleRecord>> {
        self.db
            .execute_async(move |conn| {
                let module = conn
                    .query_row(
                        "SELECT id, module_number, name, subjects_number FROM modules WHERE id = ?1",
                        [module_id],
                        parse_module_row,
                    )
                    .optional()?;
                Ok(module)
            })
            .await
    }

    /// List all slides of a module in lesson order
    pub async fn list_slides_for_module(&self, module_id: i64) -> Result<Vec<SlideRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM slides s WHERE s.module_id = ?1 ORDER BY s.lesson_number, s.id",
                    SLIDE_COLUMNS
                ))?;
                let slides = stmt
                    .query_map([module_id], parse_slide_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(slides)
            })
            .await
    }

    /// Count the slides of a module
    pub async fn count_slides_for_module(&self, module_id: i64) -> Result<usize> {
        self.db
            .execute_async(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM slides WHERE module_id = ?1",
                    [module_id],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await
    }

    /// List one page of a module's slides
    ///
    /// Pages are 1-based; page 0 is treated as page 1.
    pub async fn list_slides_for_module_page(
        &self,
        module_id: i64,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<SlideRecord>> {
        let offset = page.saturating_sub(1) * page_size;

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    r#"
                    SELECT {} FROM slides s
                    WHERE s.module_id = ?1
                    ORDER BY s.lesson_number, s.id
                    LIMIT ?2 OFFSET ?3
                    "#,
                    SLIDE_COLUMNS
                ))?;
                let slides = stmt
                    .query_map(params![module_id, page_size as i64, offset as i64], parse_slide_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(slides)
            })
            .await
    }

    /// Get a slide by ID
    pub async fn get_slide(&self, slide_id: i64) -> Result<Option<SlideRecord>> {
        self.db
            .execute_async(move |conn| {
                let slide = conn
                    .query_row(
                        &format!("SELECT {} FROM slides s WHERE s.id = ?1", SLIDE_COLUMNS),
                        [slide_id],
                        parse_slide_row,
                    )
                    .optional()?;
                Ok(slide)
            })
            .await
    }

    /// List the attachments of a slide
    pub async fn list_attachments(&self, slide_id: i64) -> Result<Vec<AttachmentRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, type, file, autostart, slide_id FROM attachments WHERE slide_id = ?1 ORDER BY id",
                )?;
                let attachments = stmt
                    .query_map([slide_id], |row| {
                        Ok(AttachmentRecord {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            attachment_type: row.get(2)?,
                            file: row.get(3)?,
                            autostart: row.get(4)?,
                            slide_id: row.get(5)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(attachments)
            })
            .await
    }

    /// List all audio dubbings ordered by slide
    pub async fn list_audio_dubbings(&self) -> Result<Vec<AudioDubbingRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, audio, slide_id FROM audio_dubbings ORDER BY slide_id, id")?;
                let dubbings = stmt
                    .query_map([], |row| {
                        Ok(AudioDubbingRecord {
                            id: row.get(0)?,
                            audio: row.get(1)?,
                            slide_id: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(dubbings)
            })
            .await
    }

    // =========================================================================
    // Enrichment
    // =========================================================================

    /// Slides whose formatted content has not been computed yet
    pub async fn slides_missing_formatted_content(&self) -> Result<Vec<SlideRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM slides s WHERE s.formatted_content IS NULL ORDER BY s.id",
                    SLIDE_COLUMNS
                ))?;
                let slides = stmt
                    .query_map([], parse_slide_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                debug!("{} slides lack formatted content", slides.len());
                Ok(slides)
            })
            .await
    }

    /// Slides without any audio dubbing row
    pub async fn slides_missing_audio(&self) -> Result<Vec<SlideRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(&format!(
                    r#"
                    SELECT {} FROM slides s
                    LEFT JOIN audio_dubbings a ON a.slide_id = s.id
                    WHERE a.id IS NULL
                    ORDER BY s.id
                    "#,
                    SLIDE_COLUMNS
                ))?;
                let slides = stmt
                    .query_map([], parse_slide_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                debug!("{} slides lack audio", slides.len());
                Ok(slides)
            })
            .await
    }

    /// Store the formatted content of a slide
    ///
    /// # Returns
    /// * `Result<bool>` - Whether a slide row was updated
    pub async fn update_formatted_content(&self, slide_id: i64, formatted_content: &str) -> Result<bool> {
        let formatted_content = formatted_content.to_string();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    "UPDATE slides SET formatted_content = ?1 WHERE id = ?2",
                    params![formatted_content, slide_id],
                )?;
                Ok(updated > 0)
            })
            .await
    }

    /// Record the audio file of a slide
    ///
    /// # Returns
    /// * `Result<i64>` - The new row id
    pub async fn insert_audio_dubbing(&self, slide_id: i64, audio: &str) -> Result<i64> {
        let audio = audio.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO audio_dubbings (audio, slide_id) VALUES (?1, ?2)",
                    params![audio, slide_id],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }
}
