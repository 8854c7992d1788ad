use base64::Engine;
use mockito::Matcher;
use newscast::error::SynthesisError;
use newscast::tts::cloud::CloudTts;
use newscast::tts::translate::GoogleTranslateTts;
use newscast::tts::{SpeechBackend, SpeechSynthesizer};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_translate_audio_url_encodes_text() {
    let backend = GoogleTranslateTts::new("https://translate.google.com/", "ko", false, Duration::from_secs(5))
        .expect("backend");
    let url = backend.audio_url("뉴스 속보").expect("url");

    assert!(url.starts_with("https://translate.google.com/translate_tts?"));
    let parsed = url::Url::parse(&url).expect("valid url");
    let query: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
    assert_eq!(query["q"], "뉴스 속보");
    assert_eq!(query["tl"], "ko");
    assert_eq!(query["textlen"], "5");
    assert_eq!(query["client"], "tw-ob");
    assert_eq!(query["ttsspeed"], "1");
}

#[tokio::test]
async fn test_translate_chunks_are_fetched_and_joined() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("GET", "/translate_tts")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "first part".into()),
            Matcher::UrlEncoded("tl".into(), "en".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body(b"MP3-ONE")
        .create_async()
        .await;
    let second = server
        .mock("GET", "/translate_tts")
        .match_query(Matcher::UrlEncoded("q".into(), "second".into()))
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body(b"MP3-TWO")
        .create_async()
        .await;

    let backend = GoogleTranslateTts::new(server.url(), "en", false, Duration::from_secs(5)).expect("backend");
    let synth = SpeechSynthesizer::new(Arc::new(backend), 10, 2);

    let audio = synth.synthesize("first part second").await.expect("synthesis");
    assert_eq!(audio, b"MP3-ONEMP3-TWO".to_vec());

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_translate_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/translate_tts")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("Too Many Requests")
        .create_async()
        .await;

    let backend = GoogleTranslateTts::new(server.url(), "ko", false, Duration::from_secs(5)).expect("backend");
    let err = backend.synthesize_chunk("hello").await.unwrap_err();
    match err {
        SynthesisError::Status { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("Too Many"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_cloud_decodes_audio_content() {
    let mut server = mockito::Server::new_async().await;
    let payload = base64::engine::general_purpose::STANDARD.encode(b"ID3-mp3-bytes");
    let mock = server
        .mock("POST", "/v1/text:synthesize")
        .match_header("x-goog-api-key", "secret-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "input": { "text": "안녕하세요" },
            "voice": { "languageCode": "ko-KR" },
            "audioConfig": { "audioEncoding": "MP3" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"audioContent": "{}"}}"#, payload))
        .create_async()
        .await;

    let backend = CloudTts::new(
        format!("{}/v1/text:synthesize", server.url()),
        "secret-key",
        "ko-KR",
        Duration::from_secs(5),
    )
    .expect("backend");

    assert_eq!(backend.max_input_bytes(), 5000);
    assert!(backend.audio_url("anything").is_none());

    let audio = backend.synthesize_chunk("안녕하세요").await.expect("synthesis");
    assert_eq!(audio, b"ID3-mp3-bytes".to_vec());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cloud_error_fails_synthesis() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/text:synthesize")
        .with_status(403)
        .with_body(r#"{"error": {"message": "API key not valid"}}"#)
        .create_async()
        .await;

    let backend = CloudTts::new(
        format!("{}/v1/text:synthesize", server.url()),
        "bad-key",
        "en-US",
        Duration::from_secs(5),
    )
    .expect("backend");
    let synth = SpeechSynthesizer::new(Arc::new(backend), 4500, 4);

    let err = synth.synthesize("some headline").await.unwrap_err();
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn test_cloud_invalid_base64_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/text:synthesize")
        .with_status(200)
        .with_body(r#"{"audioContent": "***not base64***"}"#)
        .create_async()
        .await;

    let backend = CloudTts::new(
        format!("{}/v1/text:synthesize", server.url()),
        "key",
        "en-US",
        Duration::from_secs(5),
    )
    .expect("backend");

    assert!(matches!(
        backend.synthesize_chunk("headline").await,
        Err(SynthesisError::Decode(_))
    ));
}

#[test]
fn test_build_backend_from_config() {
    let mut cfg = common::TtsConfig::default();
    let backend = newscast::tts::build_backend(&cfg).expect("translate backend");
    assert_eq!(backend.name(), "google-translate");
    assert_eq!(backend.max_input_bytes(), 200);

    cfg.backend = "google-cloud".to_string();
    cfg.api_key_env = Some("NEWSCAST_TEST_UNSET_TTS_KEY".to_string());
    assert!(newscast::tts::build_backend(&cfg).is_err());

    cfg.backend = "espeak".to_string();
    assert!(newscast::tts::build_backend(&cfg).is_err());
}
