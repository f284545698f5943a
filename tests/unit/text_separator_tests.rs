/*!
 * Tests for language separation of slide markup
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use prawko::text_separator::{
    LanguageDetector, SeparatedText, TextBucket, TextSeparator, extract_text_units,
};

use crate::common;

/// Separation of a typical slide keeps document order within each bucket
#[test]
fn test_separate_withBilingualSlide_shouldSplitByLanguage() {
    let separator = common::test_separator();
    let raw = r#"<div class="slide">
        <h2>Stop sign</h2><h2>Znak stop</h2>
        <p>Give way</p><p>Ustąp pierwszeństwa</p>
    </div>"#;

    let separated = separator.separate(raw);

    assert_eq!(separated.primary, "Stop sign Give way");
    assert_eq!(separated.secondary, "Znak stop Ustąp pierwszeństwa");
    assert_eq!(separated.bucket(TextBucket::Secondary), "Znak stop Ustąp pierwszeństwa");
}

/// Units of a third language and undecidable units are dropped
#[test]
fn test_separate_withThirdLanguage_shouldDropUnits() {
    let separated = common::test_separator().separate("<p>Hallo</p><p>Cześć</p><p>12</p>");
    assert_eq!(separated, SeparatedText {
        primary: String::new(),
        secondary: "Cześć".to_string(),
    });
}

/// Markup without text yields empty buckets
#[test]
fn test_separate_withOnlyMarkup_shouldYieldEmptyBuckets() {
    let separated = common::test_separator().separate("<div><br/><img src=\"a.png\"></div>");
    assert!(separated.primary.is_empty());
    assert!(separated.secondary.is_empty());
}

/// The detector is consulted once per text unit
#[test]
fn test_separate_shouldDetectEachUnitOnce() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let detector: Arc<dyn LanguageDetector> = Arc::new(move |_: &str| -> Option<String> {
        counter.fetch_add(1, Ordering::SeqCst);
        Some("pol".to_string())
    });
    let separator = TextSeparator::new(detector, "en", "pl")?;

    let separated = separator.separate("<p>a</p><p>b</p><!-- c --><p>d</p>");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(separated.secondary, "a b d");
    Ok(())
}

/// Language codes are accepted in any ISO form
#[test]
fn test_new_withThreeLetterCodes_shouldAccept() {
    assert!(TextSeparator::new(common::table_detector(), "eng", "pol").is_ok());
    assert!(TextSeparator::new(common::table_detector(), "en", "zz").is_err());
}

/// The statistical detector separates full sentences
#[test]
fn test_withWhatlang_onSentences_shouldSeparateLanguages() -> Result<()> {
    let separator = TextSeparator::with_whatlang("en", "pl")?;
    let raw = "<p>The driver must stop the vehicle before the stop line and give way to all vehicles on the road.</p>\
               <p>Kierujący pojazdem jest obowiązany zatrzymać pojazd przed linią zatrzymania i ustąpić pierwszeństwa wszystkim pojazdom.</p>";

    let separated = separator.separate(raw);

    assert!(separated.primary.starts_with("The driver must stop"));
    assert!(separated.secondary.starts_with("Kierujący pojazdem"));
    Ok(())
}

/// Nested inline markup splits text into separate units
#[test]
fn test_extractTextUnits_withNestedMarkup_shouldKeepDocumentOrder() {
    let units = extract_text_units("<p>Speed limit <strong>50</strong> km/h</p><p>&quot;Uwaga&quot;</p>");
    assert_eq!(units, vec!["Speed limit", "50", "km/h", "\"Uwaga\""]);
}

/// Named references outside the basic set decode to their characters
#[test]
fn test_extractTextUnits_withTypographicAndPolishEntities_shouldDecode() {
    let units = extract_text_units("<p>Don&rsquo;t overtake</p><p>Prze&sacute;cie</p><p>caf&eacute;</p>");

    assert_eq!(units, vec!["Don\u{2019}t overtake", "Prze\u{15b}cie", "caf\u{e9}"]);
}

/// Decoded units reach the detector and the buckets without raw references
#[test]
fn test_separate_withEncodedPolish_shouldBucketDecodedText() {
    let detector = Arc::new(|text: &str| -> Option<String> {
        Some(if text.contains('ś') || text.contains('ę') { "pl" } else { "en" }.to_string())
    });
    let separator = TextSeparator::new(detector, "en", "pl").unwrap();

    let separated = separator.separate("<p>Crossing</p><p>Przej&sacute;cie dla pieszych&nbsp;</p><p>Zwolnij &amp; uwa&zdot;aj</p>");

    assert_eq!(separated.primary, "Crossing Zwolnij & uważaj");
    assert_eq!(separated.secondary, "Przejście dla pieszych");
}
