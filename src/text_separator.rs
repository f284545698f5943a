/*!
 * Language separation for bilingual slide content.
 *
 * Slide content arrives as HTML where English and Polish sentences are
 * interleaved. This module strips the markup down to its text nodes, runs
 * language detection on every node independently and collects the nodes of
 * each configured language into its own bucket.
 *
 * Separation is a pure function of its input; a `TextSeparator` holds no
 * mutable state and can be shared across worker threads.
 */

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::language_utils;

/// Blocks whose content is never rendered as text
static NON_TEXT_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap()
});

/// Start, end and declaration tags
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?[A-Za-z][^>]*>|<![^>]*>|<\?[^>]*>").unwrap()
});

/// Statistical language identification for a single text unit
pub trait LanguageDetector: Send + Sync {
    /// Detect the language of `text`
    ///
    /// Returns an ISO 639 code in any of the forms understood by
    /// `language_utils`, or `None` when the detector cannot decide.
    fn detect(&self, text: &str) -> Option<String>;
}

impl<F> LanguageDetector for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn detect(&self, text: &str) -> Option<String> {
        self(text)
    }
}

/// Trigram based detector backed by `whatlang`
///
/// Detection on very short strings is approximate and may flip between
/// related languages.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        whatlang::detect_lang(text).map(|lang| lang.code().to_string())
    }
}

/// Which of the two separated buckets to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBucket {
    Primary,
    #[default]
    Secondary,
}

impl fmt::Display for TextBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextBucket::Primary => write!(f, "primary"),
            TextBucket::Secondary => write!(f, "secondary"),
        }
    }
}

/// Result of separating one text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeparatedText {
    /// Units detected as the primary language, space-joined
    pub primary: String,
    /// Units detected as the secondary language, space-joined
    pub secondary: String,
}

impl SeparatedText {
    /// Borrow one of the buckets
    pub fn bucket(&self, bucket: TextBucket) -> &str {
        match bucket {
            TextBucket::Primary => &self.primary,
            TextBucket::Secondary => &self.secondary,
        }
    }

    /// Take ownership of one of the buckets
    pub fn into_bucket(self, bucket: TextBucket) -> String {
        match bucket {
            TextBucket::Primary => self.primary,
            TextBucket::Secondary => self.secondary,
        }
    }
}

/// Splits markup into per-language text
#[derive(Clone)]
pub struct TextSeparator {
    detector: Arc<dyn LanguageDetector>,
    primary_language: String,
    secondary_language: String,
}

impl fmt::Debug for TextSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSeparator")
            .field("primary_language", &self.primary_language)
            .field("secondary_language", &self.secondary_language)
            .finish_non_exhaustive()
    }
}

impl TextSeparator {
    /// Create a separator for the given language pair
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        primary_language: &str,
        secondary_language: &str,
    ) -> Result<Self> {
        let primary_language = language_utils::normalize_to_part2t(primary_language)?;
        let secondary_language = language_utils::normalize_to_part2t(secondary_language)?;

        if primary_language == secondary_language {
            return Err(anyhow!(
                "Primary and secondary language must differ (both are {})",
                primary_language
            ));
        }

        Ok(Self {
            detector,
            primary_language,
            secondary_language,
        })
    }

    /// Create a separator backed by the `whatlang` detector
    pub fn with_whatlang(primary_language: &str, secondary_language: &str) -> Result<Self> {
        Self::new(Arc::new(WhatlangDetector), primary_language, secondary_language)
    }

    /// Separate raw slide markup into primary and secondary language text
    pub fn separate(&self, raw_text: &str) -> SeparatedText {
        let mut primary = String::new();
        let mut secondary = String::new();

        for unit in extract_text_units(raw_text) {
            let Some(code) = self.detector.detect(&unit) else {
                continue;
            };

            if language_utils::language_codes_match(&code, &self.primary_language) {
                primary.push(' ');
                primary.push_str(&unit);
            } else if language_utils::language_codes_match(&code, &self.secondary_language) {
                secondary.push(' ');
                secondary.push_str(&unit);
            }
        }

        SeparatedText {
            primary: primary.trim().to_string(),
            secondary: secondary.trim().to_string(),
        }
    }
}

/// Extract the stripped text nodes of a markup fragment in document order
///
/// Character references are decoded. Empty nodes are dropped. Comments and
/// the content of `script`/`style` elements are not text nodes.
pub fn extract_text_units(raw_text: &str) -> Vec<String> {
    let without_blocks = NON_TEXT_BLOCK_REGEX.replace_all(raw_text, "<!---->");

    TAG_REGEX
        .split(&without_blocks)
        .map(|segment| html_escape::decode_html_entities(segment).trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}
