/*!
 * Mock speech synthesizer for testing
 *
 * Returns predetermined audio without any network access and records how
 * many calls were in flight at the same time.
 */

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use prawko::errors::{ErrorDetail, ProviderError};
use prawko::providers::{SpeechSynthesizer, Voice, VoiceSelector};

/// Instrumented synthesizer
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    /// Texts that fail with a 422 payload
    failing_texts: HashSet<String>,
    /// Simulated synthesis latency
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    voice_lookups: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every synthesis call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make synthesis of `text` fail like the provider does for oversized input
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing_texts.insert(text.to_string());
        self
    }

    /// Highest number of simultaneous synthesis calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn voice_lookups(&self) -> usize {
        self.voice_lookups.load(Ordering::SeqCst)
    }

    /// Texts received, in call order
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    /// Audio returned for `text`
    pub fn audio_for(text: &str) -> Bytes {
        Bytes::from(format!("ID3:{}", text))
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn resolve_voice(&self, selector: &VoiceSelector) -> Result<Voice, ProviderError> {
        self.voice_lookups.fetch_add(1, Ordering::SeqCst);

        let voice = Voice {
            voice_id: "ErXwobaYiN019PkySvjV".to_string(),
            name: "Antoni".to_string(),
            category: Some("premade".to_string()),
            preview_url: None,
        };

        if selector.matches(&voice) {
            Ok(voice)
        } else {
            Err(ProviderError::VoiceNotFound(selector.to_string()))
        }
    }

    async fn synthesize(&self, text: &str, _voice: &Voice) -> Result<Bytes, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_texts.contains(text) {
            return Err(ProviderError::Api {
                status_code: 422,
                details: vec![ErrorDetail::new("text too long", "value_error")],
            });
        }

        Ok(Self::audio_for(text))
    }
}
