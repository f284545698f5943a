/*!
 * Client for the course-content learning platform.
 *
 * Authentication yields a `Session` which is passed explicitly to every
 * subsequent call. The client itself holds no credential state, so one
 * client can serve several sessions.
 */

use std::time::Duration;

use bytes::Bytes;
use log::{debug, error};
use reqwest::{Client, RequestBuilder, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::app_config::CourseApiConfig;
use crate::errors::{ErrorDetail, ProviderError};

/// Header carrying the session token
const SESSION_HEADER: &str = "jsessionid";

const ACCEPT: &str = "application/json, text/plain, */*";
const REFERER: &str = "https://www.testynaprawojazdy.eu/";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";

/// Account returned by the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Session token
    pub uuid: String,

    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub user_name: Option<String>,

    #[serde(default)]
    pub user_type: Option<String>,
}

/// Immutable per-session credential
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    user: Option<User>,
}

impl Session {
    /// Build a session from a pre-issued token without logging in
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: None,
        }
    }

    /// Session token attached to every request
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Account the session belongs to, when obtained through login
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

/// Top-level course unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: i64,
    pub module_number: i64,
    pub name: String,
    pub subjects_number: i64,
}

/// Grouping of slides within a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
    #[serde(rename = "slaidsNumber")]
    pub slides_number: i64,
}

/// Non-text asset of a slide as delivered by the provider
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttachmentPayload {
    pub name: String,
    pub attachment_type: String,
    pub file: String,
    pub autostart: bool,
}

/// Slide as delivered by the listing and single-slide endpoints
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidePayload {
    pub id: i64,
    pub subject_id: i64,
    #[serde(default)]
    pub course_module_id: Option<i64>,
    #[serde(default)]
    pub lesson_number: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, rename = "attachements")]
    attachments_raw: Option<serde_json::Value>,
}

impl SlidePayload {
    /// Attachments carried by the slide
    ///
    /// The provider sends either a JSON array or a string holding one;
    /// entries that are not objects are ignored.
    pub fn attachments(&self) -> Vec<AttachmentPayload> {
        let value = match &self.attachments_raw {
            Some(serde_json::Value::String(text)) if !text.trim().is_empty() => {
                match serde_json::from_str::<serde_json::Value>(text) {
                    Ok(value) => value,
                    Err(e) => {
                        debug!("Slide {} has unparsable attachments: {}", self.id, e);
                        return Vec::new();
                    }
                }
            }
            Some(value) => value.clone(),
            None => return Vec::new(),
        };

        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            object @ serde_json::Value::Object(_) => vec![object],
            _ => return Vec::new(),
        };

        entries
            .iter()
            .filter_map(|entry| entry.as_object())
            .map(|entry| {
                let text = |key: &str| {
                    entry
                        .get(key)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string()
                };
                let autostart = match entry.get("autostart") {
                    Some(serde_json::Value::Bool(flag)) => *flag,
                    Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
                    Some(serde_json::Value::String(s)) => matches!(s.as_str(), "1" | "true"),
                    _ => false,
                };
                AttachmentPayload {
                    name: text("name"),
                    attachment_type: text("type"),
                    file: text("file"),
                    autostart,
                }
            })
            .collect()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Error-shaped payload of the single-slide endpoint
#[derive(Debug, Deserialize)]
struct SlideErrorPayload {
    error: serde_json::Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

impl SlideErrorPayload {
    fn into_error(self, fallback_status: u16) -> ProviderError {
        let error_type = match &self.error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let message = self.message.unwrap_or_else(|| error_type.clone());
        ProviderError::Api {
            status_code: self.status.unwrap_or(fallback_status),
            details: vec![ErrorDetail::new(message, error_type)],
        }
    }
}

/// Course-content provider client
pub struct CourseApi {
    /// HTTP client for API requests
    client: Client,
    login_url: String,
    base_url: String,
    image_base_url: String,
    method_code: u32,
}

impl CourseApi {
    /// Create a new client from configuration
    pub fn new(config: &CourseApiConfig) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));
        headers.insert(header::REFERER, header::HeaderValue::from_static(REFERER));

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .default_headers(headers)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            login_url: config.login_url.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_base_url: config.image_base_url.trim_end_matches('/').to_string(),
            method_code: config.method_code,
        }
    }

    /// Log in with account credentials
    ///
    /// # Returns
    /// * `Err(ProviderError::AuthenticationFailed)` when the provider answers
    ///   with an empty or falsy body
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session, ProviderError> {
        let response = self
            .client
            .post(&self.login_url)
            .form(&[("userName", username), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Login failed with status {}", status);
            return Err(ProviderError::AuthenticationFailed);
        }

        let body = response.text().await?;
        let value: serde_json::Value = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| ProviderError::ParseError(e.to_string()))?
        };

        if is_falsy(&value) {
            return Err(ProviderError::AuthenticationFailed);
        }

        let user: User =
            serde_json::from_value(value).map_err(|e| ProviderError::ParseError(e.to_string()))?;
        if user.uuid.is_empty() {
            return Err(ProviderError::AuthenticationFailed);
        }
        debug!("Authenticated as {:?}", user.user_name);

        Ok(Session {
            token: user.uuid.clone(),
            user: Some(user),
        })
    }

    /// List the course modules of the configured teaching method
    pub async fn list_modules(&self, session: &Session) -> Result<Vec<CourseModule>, ProviderError> {
        let url = format!("{}/modules/{}", self.base_url, self.method_code);
        self.get_json(session, &url).await
    }

    /// List the subjects of a module
    pub async fn list_subjects(&self, session: &Session, module_id: i64) -> Result<Vec<Subject>, ProviderError> {
        let url = format!("{}/subjects/{}", self.base_url, module_id);
        self.get_json(session, &url).await
    }

    /// List the slides of a subject
    pub async fn list_slides(&self, session: &Session, subject_id: i64) -> Result<Vec<SlidePayload>, ProviderError> {
        let url = format!("{}/slaids/{}/{}", self.base_url, subject_id, self.method_code);
        self.get_json(session, &url).await
    }

    /// Fetch a single slide
    ///
    /// The provider answers errors with a payload carrying an `error` field,
    /// regardless of HTTP status; such payloads become `ProviderError::Api`.
    pub async fn get_slide(
        &self,
        session: &Session,
        subject_id: i64,
        slide_id: i64,
    ) -> Result<SlidePayload, ProviderError> {
        let url = format!("{}/slaid/{}/{}", self.base_url, subject_id, slide_id);
        let response = self.authorized(self.client.get(&url), session).send().await?;
        let status = response.status();
        let value: serde_json::Value = response.json().await?;

        if value.get("error").is_some_and(|e| !is_falsy(e)) {
            let payload: SlideErrorPayload =
                serde_json::from_value(value).map_err(|e| ProviderError::ParseError(e.to_string()))?;
            return Err(payload.into_error(status.as_u16()));
        }

        if !status.is_success() {
            return Err(ProviderError::Api {
                status_code: status.as_u16(),
                details: Vec::new(),
            });
        }

        serde_json::from_value(value).map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    /// Download an image by its file reference
    pub async fn get_image(&self, session: &Session, reference: &str) -> Result<Bytes, ProviderError> {
        let url = format!("{}/{}", self.image_base_url, reference.trim_start_matches('/'));
        let response = self.authorized(self.client.get(&url), session).send().await?;

        let status = response.status();
        if !status.is_success() {
            error!("Image {} could not be fetched ({})", reference, status);
            return Err(ProviderError::Api {
                status_code: status.as_u16(),
                details: Vec::new(),
            });
        }

        Ok(response.bytes().await?)
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        request.header(SESSION_HEADER, session.token())
    }

    async fn get_json<T: DeserializeOwned>(&self, session: &Session, url: &str) -> Result<T, ProviderError> {
        let response = self.authorized(self.client.get(url), session).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Course API error ({}): {}", status, error_text);
            return Err(ProviderError::Api {
                status_code: status.as_u16(),
                details: vec![ErrorDetail::new(error_text, "http_error")],
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

/// Mirror of the provider's notion of an empty answer
fn is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(flag) => !flag,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
    }
}
