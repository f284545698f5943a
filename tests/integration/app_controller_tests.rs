/*!
 * Integration tests for the controller commands that talk to providers
 */

use std::path::Path;

use anyhow::Result;
use prawko::app_config::Config;
use prawko::app_controller::Controller;
use prawko::database::{DatabaseConnection, ModuleRecord, Repository};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

const VOICE_ID: &str = "ErXwobaYiN019PkySvjV";

/// Config pointing the database into `dir` and speech at the mock server
fn speech_config(dir: &Path, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.database.path = dir.join("prawko.db");
    config.enrichment.save_folder = dir.join("files");
    config.enrichment.worker_threads = Some(1);
    config.speech.api_key = "xi-test".to_string();
    config.speech.endpoint = format!("{}/v1", server.uri());
    config.speech.voice = "Antoni".to_string();
    config
}

/// Store module 1 with one formatted slide in the file database
async fn seed_database(config: &Config) -> Result<()> {
    let repository = Repository::new(DatabaseConnection::new(&config.database.path)?);
    repository
        .upsert_module(&ModuleRecord {
            id: 1,
            module_number: 1,
            name: "Road signs".to_string(),
            subjects_number: 1,
        })
        .await?;
    common::seed_slides(&repository, &[common::slide(2, "<p>Skręć w lewo</p>", Some("Skręć w lewo"))]).await
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voices": [ { "voice_id": VOICE_ID, "name": "Antoni" } ]
        })))
        .mount(server)
        .await;
}

/// A successful synthesis lands at the requested path
#[tokio::test]
async fn test_speak_withAudio_shouldWriteOutputFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/text-to-speech/{}", VOICE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3slide".to_vec()))
        .mount(&server)
        .await;

    let config = speech_config(temp_dir.path(), &server);
    seed_database(&config).await?;
    let output = temp_dir.path().join("out").join("slide.mp3");

    let written = Controller::with_config(config)?.speak(2, &output).await?;

    assert_eq!(written, 8);
    assert_eq!(std::fs::read(&output)?, b"ID3slide");
    Ok(())
}

/// A provider error leaves neither the output file nor a temporary file behind
#[tokio::test]
async fn test_speak_withProviderError_shouldNotCreateOutputFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/text-to-speech/{}", VOICE_ID)))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [ { "msg": "text too long", "type": "value_error" } ]
        })))
        .mount(&server)
        .await;

    let config = speech_config(temp_dir.path(), &server);
    seed_database(&config).await?;
    let output_dir = temp_dir.path().join("out");
    let output = output_dir.join("slide.mp3");

    let result = Controller::with_config(config)?.speak(2, &output).await;

    assert!(result.is_err());
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(&output_dir)?.count(), 0);
    Ok(())
}
