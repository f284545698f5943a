use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::text_separator::TextBucket;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Course-content provider settings
    #[serde(default)]
    pub course_api: CourseApiConfig,

    /// Speech synthesis provider settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Enrichment pipeline settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Scrape step settings
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Chat bot settings
    #[serde(default)]
    pub bot: BotConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Database configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    // @field: SQLite database file
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Course-content provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CourseApiConfig {
    // @field: Account login
    #[serde(default = "String::new")]
    pub username: String,

    // @field: Account password
    #[serde(default = "String::new")]
    pub password: String,

    // @field: Pre-issued session token, skips the login call when set
    #[serde(default)]
    pub session_token: Option<String>,

    // @field: Login endpoint
    #[serde(default = "default_login_url")]
    pub login_url: String,

    // @field: Course endpoints base URL
    #[serde(default = "default_course_base_url")]
    pub base_url: String,

    // @field: Image files base URL
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    // @field: Teaching method code used for module and slide listings
    #[serde(default = "default_method_code")]
    pub method_code: u32,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CourseApiConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            session_token: None,
            login_url: default_login_url(),
            base_url: default_course_base_url(),
            image_base_url: default_image_base_url(),
            method_code: default_method_code(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Speech synthesis provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    /// API key for the service
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,

    /// Voice name to look up in the provider catalog
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Voice id, takes precedence over `voice` when set
    #[serde(default)]
    pub voice_id: Option<String>,

    /// Synthesis model identifier (provider default when unset)
    #[serde(default)]
    pub model_id: Option<String>,

    /// Voice stability (0.0 to 1.0)
    #[serde(default)]
    pub stability: f32,

    /// Similarity boost (0.0 to 1.0)
    #[serde(default)]
    pub similarity_boost: f32,

    /// Request timeout in seconds
    #[serde(default = "default_speech_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_speech_endpoint(),
            voice: default_voice(),
            voice_id: None,
            model_id: None,
            stability: 0.0,
            similarity_boost: 0.0,
            timeout_secs: default_speech_timeout_secs(),
        }
    }
}

/// Enrichment pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnrichmentConfig {
    /// Maximum number of artifact computations in flight at once
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Language detection threads (host parallelism when unset)
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Primary language code (ISO)
    #[serde(default = "default_primary_language")]
    pub primary_language: String,

    /// Secondary language code (ISO)
    #[serde(default = "default_secondary_language")]
    pub secondary_language: String,

    /// Which separated bucket is stored as the slide's formatted content
    #[serde(default)]
    pub stored_bucket: TextBucket,

    /// Directory receiving one audio file per slide
    #[serde(default = "default_save_folder")]
    pub save_folder: PathBuf,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            worker_threads: None,
            primary_language: default_primary_language(),
            secondary_language: default_secondary_language(),
            stored_bucket: TextBucket::default(),
            save_folder: default_save_folder(),
        }
    }
}

/// Scrape step configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScrapeConfig {
    /// Whether attachment images are downloaded during a scrape
    #[serde(default)]
    pub download_images: bool,

    /// Directory receiving downloaded images
    #[serde(default = "default_image_folder")]
    pub image_folder: PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            download_images: false,
            image_folder: default_image_folder(),
        }
    }
}

/// Chat bot configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BotConfig {
    /// Bot API token
    #[serde(default = "String::new")]
    pub token: String,

    /// Bot API base URL
    #[serde(default = "default_bot_api_url")]
    pub api_url: String,

    /// Slide buttons per keyboard page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Long polling timeout in seconds
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_bot_api_url(),
            page_size: default_page_size(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("prawko.db")
}

fn default_login_url() -> String {
    "https://api.testynaprawojazdy.eu/eprawko-rest/login/".to_string()
}

fn default_course_base_url() -> String {
    "https://api.testynaprawojazdy.eu/learning/course".to_string()
}

fn default_image_base_url() -> String {
    "https://eprawko.eu/platforma/_files".to_string()
}

fn default_method_code() -> u32 {
    196
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_speech_endpoint() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_voice() -> String {
    "Antoni".to_string()
}

fn default_speech_timeout_secs() -> u64 {
    120
}

fn default_concurrency_limit() -> usize {
    10
}

fn default_primary_language() -> String {
    "en".to_string()
}

fn default_secondary_language() -> String {
    "pl".to_string()
}

fn default_save_folder() -> PathBuf {
    PathBuf::from("files")
}

fn default_image_folder() -> PathBuf {
    PathBuf::from("images")
}

fn default_bot_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_poll_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Validate the configuration for consistency and required values
    ///
    /// Credentials are checked by the command that needs them, see the
    /// `require_*` methods.
    pub fn validate(&self) -> Result<()> {
        let primary = crate::language_utils::get_language_name(&self.enrichment.primary_language)?;
        let secondary = crate::language_utils::get_language_name(&self.enrichment.secondary_language)?;

        if crate::language_utils::language_codes_match(
            &self.enrichment.primary_language,
            &self.enrichment.secondary_language,
        ) {
            return Err(anyhow!(
                "Primary and secondary language must differ (both are {})",
                primary
            ));
        }
        log::debug!("Separating {} from {}", primary, secondary);

        if self.enrichment.concurrency_limit == 0 {
            return Err(anyhow!("Enrichment concurrency limit must be at least 1"));
        }

        if self.enrichment.worker_threads == Some(0) {
            return Err(anyhow!("Worker thread count must be at least 1 when set"));
        }

        if self.bot.page_size == 0 {
            return Err(anyhow!("Bot page size must be at least 1"));
        }

        if !(0.0..=1.0).contains(&self.speech.stability)
            || !(0.0..=1.0).contains(&self.speech.similarity_boost)
        {
            return Err(anyhow!("Voice stability and similarity boost must be within 0.0..=1.0"));
        }

        for (name, value) in [
            ("course_api.login_url", &self.course_api.login_url),
            ("course_api.base_url", &self.course_api.base_url),
            ("course_api.image_base_url", &self.course_api.image_base_url),
            ("speech.endpoint", &self.speech.endpoint),
            ("bot.api_url", &self.bot.api_url),
        ] {
            url::Url::parse(value).map_err(|e| anyhow!("Invalid URL in {}: {} ({})", name, value, e))?;
        }

        Ok(())
    }

    /// Ensure course-content credentials are present
    pub fn require_course_credentials(&self) -> Result<()> {
        let has_token = self
            .course_api
            .session_token
            .as_ref()
            .is_some_and(|t| !t.is_empty());

        if !has_token && (self.course_api.username.is_empty() || self.course_api.password.is_empty()) {
            return Err(anyhow!(
                "Course API username and password (or a session token) are required"
            ));
        }
        Ok(())
    }

    /// Ensure the speech provider API key is present
    pub fn require_speech_key(&self) -> Result<()> {
        if self.speech.api_key.is_empty() {
            return Err(anyhow!("Speech API key is required for audio synthesis"));
        }
        Ok(())
    }

    /// Ensure the bot token is present
    pub fn require_bot_token(&self) -> Result<()> {
        if self.bot.token.is_empty() {
            return Err(anyhow!("Bot token is required to run the bot"));
        }
        Ok(())
    }
}
