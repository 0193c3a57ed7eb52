use super::*;

fn config(base_url: String) -> ModelConfig {
    ModelConfig {
        api_key: "test-key".to_string(),
        model: "gemini-test".to_string(),
        base_url,
        ..ModelConfig::default()
    }
}

#[test]
fn test_text_concatenates_parts_in_order() {
    let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": "{\"action\":" }, { "text": "\"WaitForLoad\"}" }] },
            "finishReason": "STOP"
        }]
    }))
    .unwrap();
    assert_eq!(response.text(), r#"{"action":"WaitForLoad"}"#);
    assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
}

#[test]
fn test_text_skips_candidates_without_text() {
    let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
        "candidates": [
            { "finishReason": "SAFETY" },
            { "content": { "parts": [{ "inlineData": {} }] } },
            { "content": { "parts": [{ "text": "DONE" }] } }
        ]
    }))
    .unwrap();
    assert_eq!(response.text(), "DONE");
}

#[test]
fn test_text_empty_when_nothing_usable() {
    let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
    assert_eq!(response.text(), "");
}

#[test]
fn test_parse_retry_hint() {
    assert_eq!(
        parse_retry_hint(r#"{"@type":"type.googleapis.com/google.rpc.RetryInfo","retryDelay":"37s"}"#),
        Some(Duration::from_secs(37))
    );
    assert_eq!(
        parse_retry_hint("429 Quota exceeded. retry_delay { seconds: 12 }"),
        Some(Duration::from_secs(12))
    );
    assert_eq!(parse_retry_hint("quota exceeded"), None);
}

#[test]
fn test_classify_rate_limit() {
    let err = classify_error(StatusCode::TOO_MANY_REQUESTS, r#"{"retryDelay":"4s"}"#);
    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(4)));

    let err = classify_error(StatusCode::SERVICE_UNAVAILABLE, "status: RESOURCE_EXHAUSTED");
    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after(), None);
}

#[test]
fn test_classify_api_error_extracts_message() {
    let err = classify_error(
        StatusCode::BAD_REQUEST,
        r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
    );
    match err {
        ModelError::ApiError { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

mod http {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    #[tokio::test]
    async fn test_generate_success() {
        let mock_server = MockServer::start().await;

        let body = serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "DONE found it" }] },
                "finishReason": "STOP"
            }]
        });

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/models/gemini-test:generateContent"))
            .and(matchers::header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeminiClient::new(&config(mock_server.uri())).unwrap();
        let text = client.generate("what next?").await.unwrap();
        assert_eq!(text, "DONE found it");
    }

    #[tokio::test]
    async fn test_generate_sends_prompt_as_user_part() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeminiClient::new(&config(mock_server.uri())).unwrap();
        assert_eq!(client.generate("hello").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_generate_rate_limited() {
        let mock_server = MockServer::start().await;

        let error_body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED","details":[{"retryDelay":"21s"}]}}"#;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string(error_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeminiClient::new(&config(mock_server.uri())).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(21)));
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeminiClient::new(&config(mock_server.uri())).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::ApiError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_generate_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeminiClient::new(&config(mock_server.uri())).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_key_stays_out_of_the_url() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::query_param_is_missing("key"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeminiClient::new(&config(mock_server.uri())).unwrap();
        client.generate("prompt").await.unwrap();
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_key() {
        let client = GeminiClient::new(&ModelConfig {
            api_key: "SUPERSECRET123".to_string(),
            model: "gemini-test".to_string(),
            base_url: "http://127.0.0.1:1/v1beta".to_string(),
            ..ModelConfig::default()
        })
        .unwrap();

        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Network(_)));
        assert!(!err.to_string().contains("SUPERSECRET123"), "{err}");
    }
}
