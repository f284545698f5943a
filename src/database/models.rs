/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};

use crate::providers::course_api::{AttachmentPayload, CourseModule, SlidePayload, Subject};

/// Top-level course unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: i64,
    pub module_number: i64,
    pub name: String,
    pub subjects_number: i64,
}

impl From<&CourseModule> for ModuleRecord {
    fn from(module: &CourseModule) -> Self {
        Self {
            id: module.id,
            module_number: module.module_number,
            name: module.name.clone(),
            subjects_number: module.subjects_number,
        }
    }
}

/// Grouping of slides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: i64,
    pub name: String,
    pub slides_number: i64,
}

impl From<&Subject> for SubjectRecord {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name.clone(),
            slides_number: subject.slides_number,
        }
    }
}

/// Atomic content unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    pub id: i64,
    pub subject_id: i64,
    pub lesson_number: i64,
    pub name: String,

    /// Raw markup as delivered by the provider
    pub content: String,

    /// Separated text, absent until the text pass has processed the slide
    pub formatted_content: Option<String>,

    /// Owning module
    pub module_id: Option<i64>,
}

impl SlideRecord {
    /// Build a record for a scraped slide, owned by `module_id`
    pub fn from_payload(payload: &SlidePayload, module_id: i64) -> Self {
        Self {
            id: payload.id,
            subject_id: payload.subject_id,
            lesson_number: payload.lesson_number,
            name: payload.name.clone(),
            content: payload.content.clone(),
            formatted_content: None,
            module_id: Some(module_id),
        }
    }

    /// Whether formatted content exists and is not blank
    pub fn has_formatted_content(&self) -> bool {
        self.formatted_content
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

/// Non-text asset of a slide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Row id, `None` before insertion
    pub id: Option<i64>,
    pub name: String,
    pub attachment_type: String,
    pub file: String,
    pub autostart: bool,
    pub slide_id: i64,
}

impl AttachmentRecord {
    pub fn from_payload(payload: &AttachmentPayload, slide_id: i64) -> Self {
        Self {
            id: None,
            name: payload.name.clone(),
            attachment_type: payload.attachment_type.clone(),
            file: payload.file.clone(),
            autostart: payload.autostart,
            slide_id,
        }
    }
}

/// Completion marker of the audio pass for one slide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDubbingRecord {
    pub id: i64,
    /// Audio file name inside the save folder
    pub audio: String,
    pub slide_id: i64,
}
