use super::*;
use crate::config::BowlwatchConfig;
use crate::frame::FrameFormat;
use serde_json::json;
use std::time::SystemTime;

fn jpeg_frame() -> FrameData {
    FrameData::new(
        7,
        SystemTime::now(),
        vec![0xFF, 0xD8, 0xFF, 0xD9],
        640,
        480,
        FrameFormat::Jpeg,
    )
}

#[test]
fn test_extract_text_joins_parts() {
    let body = json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "The bowl is " },
                    { "text": "partially eaten." }
                ]
            }
        }]
    });

    assert_eq!(
        extract_text(&body).as_deref(),
        Some("The bowl is partially eaten.")
    );
}

#[test]
fn test_extract_text_missing_or_blank() {
    assert_eq!(extract_text(&json!({ "candidates": [] })), None);
    assert_eq!(
        extract_text(&json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        })),
        None
    );
    assert_eq!(extract_text(&json!({ "error": { "code": 429 } })), None);
}

#[test]
fn test_gemini_payload_contains_inline_image() {
    let mut config = BowlwatchConfig::default().vision;
    config.api_key = Some("test-key".to_string());

    let describer = GeminiDescriber::new(&config).unwrap();
    let payload = describer.build_payload(&jpeg_frame()).unwrap();

    let parts = &payload["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], json!(config.prompt));
    assert_eq!(parts[1]["inline_data"]["mime_type"], json!("image/jpeg"));
    assert_eq!(parts[1]["inline_data"]["data"], json!("/9j/2Q=="));
}

#[test]
fn test_gemini_uses_configured_key() {
    let mut config = BowlwatchConfig::default().vision;
    config.api_key = Some("configured".to_string());

    let describer = GeminiDescriber::new(&config).unwrap();
    assert_eq!(describer.name(), "gemini");
}

#[tokio::test]
async fn test_scripted_describer() {
    let describer = ScriptedDescriber::with_descriptions(["The bowl is full"]);
    describer.push_failure("quota exceeded");

    let frame = jpeg_frame();
    assert_eq!(describer.describe(&frame).await.unwrap(), "The bowl is full");

    let err = describer.describe(&frame).await.unwrap_err();
    assert!(err.to_string().contains("quota exceeded"));

    assert!(describer.describe(&frame).await.is_err());
    assert_eq!(describer.calls(), 3);
}
