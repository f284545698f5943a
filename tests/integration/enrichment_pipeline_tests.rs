/*!
 * Integration tests for the TEXT and AUDIO enrichment passes
 *
 * Runs the pipeline against an in-memory database, the table detector and
 * an instrumented synthesizer.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use prawko::app_config::SpeechConfig;
use prawko::enrichment::{ArtifactKind, AudioStore};
use prawko::errors::ProviderError;
use prawko::providers::VoiceSelector;
use prawko::providers::elevenlabs::ElevenLabs;
use prawko::text_separator::TextBucket;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, mock_synthesizer::MockSynthesizer};

/// The TEXT pass stores the secondary bucket and skips empty content
#[tokio::test]
async fn test_textPass_withMixedSlides_shouldStoreSecondaryText() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[
        common::slide(1, "<p>Hello</p><p>Cześć</p>", None),
        common::slide(2, "", None),
        common::slide(3, "<ul><li>Turn left</li><li>Skręć w lewo</li></ul>", None),
    ])
    .await?;

    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 10))?;
    let report = pipeline.run(ArtifactKind::Text).await?;

    assert_eq!(report.selected, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);

    let first = repository.get_slide(1).await?.expect("slide 1");
    assert_eq!(first.formatted_content.as_deref(), Some("Cześć"));
    let third = repository.get_slide(3).await?.expect("slide 3");
    assert_eq!(third.formatted_content.as_deref(), Some("Skręć w lewo"));

    // the empty slide stays eligible
    let second = repository.get_slide(2).await?.expect("slide 2");
    assert_eq!(second.formatted_content, None);
    Ok(())
}

/// Running the TEXT pass twice only processes the skipped slide again
#[tokio::test]
async fn test_textPass_runTwice_shouldBeIdempotent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[
        common::slide(1, "<p>Hello</p><p>Cześć</p>", None),
        common::slide(2, "", None),
    ])
    .await?;

    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 4))?;
    pipeline.run(ArtifactKind::Text).await?;
    let second = pipeline.run(ArtifactKind::Text).await?;

    assert_eq!(second.selected, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.processed(), 0);
    assert_eq!(
        repository.get_slide(1).await?.and_then(|s| s.formatted_content).as_deref(),
        Some("Cześć")
    );
    Ok(())
}

/// The primary bucket can be stored instead
#[tokio::test]
async fn test_textPass_withPrimaryBucket_shouldStorePrimaryText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[common::slide(1, "<p>Hello</p><p>Cześć</p>", None)]).await?;

    let mut options = common::pipeline_options(temp_dir.path(), 2);
    options.stored_bucket = TextBucket::Primary;
    common::pipeline(&repository, options)?.run(ArtifactKind::Text).await?;

    assert_eq!(
        repository.get_slide(1).await?.and_then(|s| s.formatted_content).as_deref(),
        Some("Hello")
    );
    Ok(())
}

/// Progress is reported once per computed slide
#[tokio::test]
async fn test_runWithProgress_shouldReportEveryCompletion() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    let slides: Vec<_> = (1..=6)
        .map(|id| common::slide(id, "<p>Cześć</p>", None))
        .collect();
    common::seed_slides(&repository, &slides).await?;

    let calls = AtomicUsize::new(0);
    let last_total = AtomicUsize::new(0);
    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 3))?;
    pipeline
        .run_with_progress(ArtifactKind::Text, |_, total| {
            calls.fetch_add(1, Ordering::SeqCst);
            last_total.store(total, Ordering::SeqCst);
        })
        .await?;

    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert_eq!(last_total.load(Ordering::SeqCst), 6);
    Ok(())
}

/// The AUDIO pass writes one file and one row per formatted slide
#[tokio::test]
async fn test_audioPass_withFormattedSlides_shouldWriteFilesAndRows() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let audio_root = temp_dir.path().join("files");
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[
        common::slide(3, "<p>Znak stop</p>", Some("Znak stop")),
        common::slide(4, "<p>Cześć</p>", Some("Cześć")),
        common::slide(5, "<p>Hello</p>", Some("   ")),
    ])
    .await?;

    let synthesizer = Arc::new(MockSynthesizer::new());
    let pipeline = common::pipeline(&repository, common::pipeline_options(&audio_root, 10))?
        .with_synthesizer(synthesizer.clone());
    let report = pipeline.run(ArtifactKind::Audio).await?;

    assert_eq!(report.selected, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded, 2);
    assert_eq!(synthesizer.voice_lookups(), 1);

    let dubbings = repository.list_audio_dubbings().await?;
    assert_eq!(dubbings.len(), 2);
    assert_eq!(dubbings[0].slide_id, 3);
    assert_eq!(dubbings[0].audio, "3.mp3");
    assert_eq!(dubbings[1].audio, "4.mp3");

    let store = AudioStore::new(&audio_root);
    assert_eq!(std::fs::read(store.path_for(3))?, MockSynthesizer::audio_for("Znak stop").to_vec());
    assert_eq!(std::fs::read(store.path_for(4))?, MockSynthesizer::audio_for("Cześć").to_vec());
    assert!(!store.path_for(5).exists());
    Ok(())
}

/// A provider error skips the slide without a row or file; it stays eligible
#[tokio::test]
async fn test_audioPass_withProviderError_shouldSkipSlide() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[
        common::slide(1, "<p>Cześć</p>", Some("Cześć")),
        common::slide(2, "<p>Skręć w lewo</p>", Some("Skręć w lewo")),
    ])
    .await?;

    let synthesizer = Arc::new(MockSynthesizer::new().failing_on("Skręć w lewo"));
    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 10))?
        .with_synthesizer(synthesizer.clone());
    let report = pipeline.run(ArtifactKind::Audio).await?;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(!AudioStore::new(temp_dir.path()).path_for(2).exists());

    let remaining = repository.slides_missing_audio().await?;
    assert_eq!(remaining.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2]);
    Ok(())
}

/// Slides that already have audio are never selected again
#[tokio::test]
async fn test_audioPass_withExistingDubbing_shouldNotReselect() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[
        common::slide(1, "<p>Cześć</p>", Some("Cześć")),
        common::slide(2, "<p>Znak stop</p>", Some("Znak stop")),
    ])
    .await?;
    repository.insert_audio_dubbing(1, "1.mp3").await?;

    let synthesizer = Arc::new(MockSynthesizer::new());
    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 10))?
        .with_synthesizer(synthesizer.clone());

    let first = pipeline.run(ArtifactKind::Audio).await?;
    assert_eq!(first.selected, 1);
    assert_eq!(synthesizer.texts(), vec!["Znak stop".to_string()]);

    let second = pipeline.run(ArtifactKind::Audio).await?;
    assert_eq!(second.selected, 0);
    assert_eq!(synthesizer.calls(), 1);
    // nothing to do, no catalog lookup
    assert_eq!(synthesizer.voice_lookups(), 1);
    Ok(())
}

/// No more than the configured number of computations run at once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_audioPass_withManySlides_shouldRespectConcurrencyLimit() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    let slides: Vec<_> = (1..=25)
        .map(|id| common::slide(id, "<p>Cześć</p>", Some(&format!("Tekst {}", id))))
        .collect();
    common::seed_slides(&repository, &slides).await?;

    let synthesizer = Arc::new(MockSynthesizer::new().with_delay(Duration::from_millis(30)));
    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 10))?
        .with_synthesizer(synthesizer.clone());
    let report = pipeline.run(ArtifactKind::Audio).await?;

    assert_eq!(report.succeeded, 25);
    assert_eq!(synthesizer.calls(), 25);
    assert!(synthesizer.max_in_flight() <= 10);
    assert!(synthesizer.max_in_flight() > 1);
    assert_eq!(repository.list_audio_dubbings().await?.len(), 25);
    Ok(())
}

/// An unknown voice ends the whole pass before any synthesis
#[tokio::test]
async fn test_audioPass_withUnknownVoice_shouldFailRun() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[common::slide(1, "<p>Cześć</p>", Some("Cześć"))]).await?;

    let mut options = common::pipeline_options(temp_dir.path(), 10);
    options.voice = VoiceSelector::Name("Bella".to_string());
    let synthesizer = Arc::new(MockSynthesizer::new());
    let pipeline = common::pipeline(&repository, options)?.with_synthesizer(synthesizer.clone());

    let error = pipeline.run(ArtifactKind::Audio).await.unwrap_err();

    assert!(matches!(
        error.downcast_ref::<ProviderError>(),
        Some(ProviderError::VoiceNotFound(_))
    ));
    assert_eq!(synthesizer.calls(), 0);
    assert!(repository.list_audio_dubbings().await?.is_empty());
    Ok(())
}

/// The AUDIO pass refuses to run without a synthesizer
#[tokio::test]
async fn test_audioPass_withoutSynthesizer_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 1))?;

    assert!(pipeline.run(ArtifactKind::Audio).await.is_err());
    Ok(())
}

/// A zero concurrency limit is rejected up front
#[test]
fn test_new_withZeroLimit_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = prawko::database::Repository::new_in_memory()?;

    assert!(common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 0)).is_err());
    Ok(())
}

/// TEXT then AUDIO narrates the separated text
#[tokio::test]
async fn test_textThenAudio_shouldNarrateSeparatedText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[
        common::slide(1, "<p>Hello</p><p>Cześć</p>", None),
        common::slide(2, "<p>Hello</p>", None),
    ])
    .await?;

    let synthesizer = Arc::new(MockSynthesizer::new());
    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 2))?
        .with_synthesizer(synthesizer.clone());

    pipeline.run(ArtifactKind::Text).await?;
    let audio = pipeline.run(ArtifactKind::Audio).await?;

    // slide 2 has no Polish text, so its formatted content is empty
    assert_eq!(audio.skipped, 1);
    assert_eq!(synthesizer.texts(), vec!["Cześć".to_string()]);
    Ok(())
}

/// ElevenLabs client for the mock server with the Antoni voice in its catalog
async fn elevenlabs_with_catalog(server: &MockServer) -> Arc<ElevenLabs> {
    Mock::given(method("GET"))
        .and(path("/v1/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voices": [ { "voice_id": "ErXwobaYiN019PkySvjV", "name": "Antoni" } ]
        })))
        .mount(server)
        .await;

    Arc::new(ElevenLabs::new(&SpeechConfig {
        api_key: "xi-test".to_string(),
        endpoint: format!("{}/v1", server.uri()),
        timeout_secs: 5,
        ..SpeechConfig::default()
    }))
}

/// Respond to synthesis of `text` with a 422 validation payload
async fn mount_text_too_long(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/ErXwobaYiN019PkySvjV"))
        .and(body_partial_json(json!({ "text": text })))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [ { "msg": "text too long", "type": "value_error" } ]
        })))
        .mount(server)
        .await;
}

/// A 422 from the provider is logged as "message (Type: type)" and the slide gets no row
#[tokio::test]
async fn test_audioPass_withValidationError_shouldLogMessageAndType() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[common::slide(2, "<p>Skręć w lewo</p>", Some("Skręć w lewo"))]).await?;

    let server = MockServer::start().await;
    let synthesizer = elevenlabs_with_catalog(&server).await;
    mount_text_too_long(&server, "Skręć w lewo").await;

    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 10))?
        .with_synthesizer(synthesizer);
    let report = pipeline.run(ArtifactKind::Audio).await?;

    assert_eq!(report.failed, 1);
    let lines = common::log_capture::lines();
    assert!(
        lines.iter().any(|line| line == "text too long (Type: value_error)"),
        "captured lines: {:?}",
        lines
    );
    assert!(repository.list_audio_dubbings().await?.is_empty());
    assert!(!AudioStore::new(temp_dir.path()).path_for(2).exists());
    Ok(())
}

/// A failing slide is logged while slower slides of the batch are still running
#[tokio::test]
async fn test_audioPass_withSlowSlide_shouldLogFailureBeforeBatchEnds() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let repository = common::repository_with_module().await?;
    common::seed_slides(&repository, &[
        common::slide(2, "<p>Skręć w lewo</p>", Some("Skręć w lewo")),
        common::slide(3, "<p>Znak stop</p>", Some("Znak stop")),
    ])
    .await?;

    let server = MockServer::start().await;
    let synthesizer = elevenlabs_with_catalog(&server).await;
    mount_text_too_long(&server, "Skręć w lewo").await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/ErXwobaYiN019PkySvjV"))
        .and(body_partial_json(json!({ "text": "Znak stop" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"ID3slow".to_vec())
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let pipeline = common::pipeline(&repository, common::pipeline_options(temp_dir.path(), 10))?
        .with_synthesizer(synthesizer);

    let logged_at_first_completion = AtomicBool::new(false);
    let report = pipeline
        .run_with_progress(ArtifactKind::Audio, |completed, _| {
            if completed == 1 {
                let logged = common::log_capture::lines()
                    .iter()
                    .any(|line| line == "text too long (Type: value_error)");
                logged_at_first_completion.store(logged, Ordering::SeqCst);
            }
        })
        .await?;

    assert!(logged_at_first_completion.load(Ordering::SeqCst));
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(
        repository.list_audio_dubbings().await?.iter().map(|d| d.slide_id).collect::<Vec<_>>(),
        vec![3]
    );
    Ok(())
}
