/*!
 * ElevenLabs text-to-speech client.
 *
 * Supports the voice catalog, buffered synthesis and streaming synthesis
 * into any async sink. Non-success responses are turned into
 * `ProviderError::Api` carrying the provider's error entries.
 */

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::app_config::SpeechConfig;
use crate::errors::{ErrorDetail, ProviderError};
use crate::providers::SpeechSynthesizer;

const API_KEY_HEADER: &str = "xi-api-key";

/// Voice catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// How a voice is picked from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSelector {
    Name(String),
    Id(String),
}

impl VoiceSelector {
    /// Whether `voice` satisfies this selector
    pub fn matches(&self, voice: &Voice) -> bool {
        match self {
            VoiceSelector::Name(name) => voice.name == *name,
            VoiceSelector::Id(id) => voice.voice_id == *id,
        }
    }

    /// Selector from configuration, the id wins over the name
    pub fn from_config(config: &SpeechConfig) -> Self {
        match config.voice_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => VoiceSelector::Id(id.to_string()),
            None => VoiceSelector::Name(config.voice.clone()),
        }
    }
}

impl fmt::Display for VoiceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceSelector::Name(name) => write!(f, "name '{}'", name),
            VoiceSelector::Id(id) => write!(f, "id '{}'", id),
        }
    }
}

/// Synthesis parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<Voice>,
}

#[derive(Debug, Deserialize)]
struct RawDetail {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<RawDetail> for ErrorDetail {
    fn from(raw: RawDetail) -> Self {
        ErrorDetail::new(
            raw.msg.or(raw.message).unwrap_or_default(),
            raw.error_type.or(raw.status).unwrap_or_else(|| "unknown".to_string()),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetailField {
    List(Vec<RawDetail>),
    Single(RawDetail),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    detail: DetailField,
}

/// Extract the error entries of a non-success response body
pub fn parse_error_details(body: &str) -> Vec<ErrorDetail> {
    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => match payload.detail {
            DetailField::List(entries) => entries.into_iter().map(ErrorDetail::from).collect(),
            DetailField::Single(entry) => vec![entry.into()],
            DetailField::Text(text) => vec![ErrorDetail::new(text, "unknown")],
        },
        Err(_) if body.trim().is_empty() => Vec::new(),
        Err(_) => vec![ErrorDetail::new(body.trim(), "unparsed")],
    }
}

/// ElevenLabs client
pub struct ElevenLabs {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API base URL
    endpoint: String,
    model_id: Option<String>,
    settings: VoiceSettings,
}

impl ElevenLabs {
    /// Create a new client from configuration
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model_id: config.model_id.clone().filter(|m| !m.is_empty()),
            settings: VoiceSettings {
                stability: config.stability,
                similarity_boost: config.similarity_boost,
            },
        }
    }

    /// Fetch the voice catalog
    pub async fn list_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/voices", self.endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let voices = response
            .json::<VoicesResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        debug!("Voice catalog has {} entries", voices.voices.len());
        Ok(voices.voices)
    }

    /// Synthesize `text` and write the audio into `sink` chunk by chunk
    ///
    /// # Returns
    /// * `Result<u64, ProviderError>` - Number of bytes written
    pub async fn synthesize_into<W>(&self, text: &str, voice: &Voice, sink: &mut W) -> Result<u64, ProviderError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut response = self.send_synthesis(text, voice).await?;
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk)
                .await
                .map_err(|e| ProviderError::RequestFailed(format!("Failed to write audio chunk: {}", e)))?;
            written += chunk.len() as u64;
        }
        sink.flush()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to flush audio sink: {}", e)))?;

        Ok(written)
    }

    async fn send_synthesis(&self, text: &str, voice: &Voice) -> Result<Response, ProviderError> {
        let request = SynthesisRequest {
            text,
            model_id: self.model_id.as_deref(),
            voice_settings: self.settings,
        };

        let response = self
            .client
            .post(format!("{}/text-to-speech/{}", self.endpoint, voice.voice_id))
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let details = parse_error_details(&body);
        error!("ElevenLabs API error ({}): {} entries", status, details.len());

        Err(ProviderError::Api {
            status_code: status.as_u16(),
            details,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabs {
    async fn resolve_voice(&self, selector: &VoiceSelector) -> Result<Voice, ProviderError> {
        self.list_voices()
            .await?
            .into_iter()
            .find(|voice| selector.matches(voice))
            .ok_or_else(|| ProviderError::VoiceNotFound(selector.to_string()))
    }

    async fn synthesize(&self, text: &str, voice: &Voice) -> Result<Bytes, ProviderError> {
        let response = self.send_synthesis(text, voice).await?;
        Ok(response.bytes().await?)
    }
}
