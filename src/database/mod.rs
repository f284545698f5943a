/*!
 * Database module for persistent storage of course content.
 *
 * This module provides SQLite-based persistence for:
 * - Modules, subjects and slides scraped from the course provider
 * - Slide attachments
 * - Derived artifacts (formatted content, audio dubbing markers)
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{AttachmentRecord, AudioDubbingRecord, ModuleRecord, SlideRecord, SubjectRecord};
pub use repository::Repository;
