/*!
 * # prawko
 *
 * A Rust library for collecting driving-course content and deriving
 * study material from it.
 *
 * ## Features
 *
 * - Scrape modules, subjects, slides and attachments from the course provider
 * - Separate bilingual slide markup into per-language text
 * - Narrate formatted slide text with ElevenLabs
 * - Browse the content through a Telegram bot
 * - SQLite persistence with idempotent scrapes and enrichment passes
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `text_separator`: Markup stripping and language bucketing
 * - `enrichment`: TEXT and AUDIO passes with bounded concurrency:
 *   - `enrichment::pipeline`: Selection, computation and persistence
 *   - `enrichment::worker_pool`: CPU pool for language separation
 *   - `enrichment::audio_store`: Audio file store
 * - `scraper`: Course provider to database
 * - `database`: SQLite connection, schema and repository
 * - `bot`: Keyboards and handlers of the chat bot
 * - `providers`: Client implementations for the external services:
 *   - `providers::course_api`: Course-content provider client
 *   - `providers::elevenlabs`: Speech synthesis client
 *   - `providers::telegram`: Telegram Bot API client
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod bot;
pub mod database;
pub mod enrichment;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod scraper;
pub mod text_separator;

// Re-export main types for easier usage
pub use app_config::Config;
pub use enrichment::{ArtifactKind, EnrichmentPipeline, PassReport};
pub use errors::{AppError, EnrichmentError, ErrorDetail, ProviderError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use text_separator::{SeparatedText, TextSeparator};
