/*!
 * Provider implementations for the external services.
 *
 * This module contains client implementations for:
 * - the course-content learning platform (modules, subjects, slides, images)
 * - ElevenLabs text-to-speech
 * - the Telegram Bot API
 */

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::ProviderError;

pub mod course_api;
pub mod elevenlabs;
pub mod telegram;

pub use elevenlabs::{Voice, VoiceSelector};

/// Common trait for text-to-speech providers
///
/// The enrichment pipeline talks to speech synthesis only through this
/// trait, so tests can substitute an instrumented implementation.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Resolve a selector against the provider's voice catalog
    ///
    /// # Returns
    /// * `Err(ProviderError::VoiceNotFound)` if no catalog entry matches
    async fn resolve_voice(&self, selector: &VoiceSelector) -> Result<Voice, ProviderError>;

    /// Synthesize `text` with an already resolved voice
    ///
    /// # Returns
    /// * `Result<Bytes, ProviderError>` - The complete audio payload or the
    ///   provider's structured error list
    async fn synthesize(&self, text: &str, voice: &Voice) -> Result<Bytes, ProviderError>;
}
