use model_sync::completion::ChatCompletionsClient;
use model_sync::load_config::TransformationSection;
use model_sync_core::contract::{TransformRequest, Transformer};
use model_sync_core::transform::SYSTEM_ROLE;
use model_sync_core::SyncError;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ChatCompletionsClient {
    let section = TransformationSection {
        base_url: format!("{}/v1/", server.uri()),
        model: "test-model".to_string(),
        style_instructions: None,
        timeout_secs: 5,
    };
    ChatCompletionsClient::new(&section, SecretString::from("sk-test")).unwrap()
}

fn request() -> TransformRequest<'static> {
    TransformRequest {
        server_model: "class User:\n    id: int\n    avatar: str\n",
        client_model: "struct User: Codable {\n    let id: Int\n}\n",
        style_instructions: Some("Keep property order."),
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

fn service_error(err: SyncError) -> String {
    match err {
        SyncError::TransformationService(detail) => detail,
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn returns_trimmed_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [{"role": "system", "content": SYSTEM_ROLE}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "\n\nstruct User: Codable {\n    let id: Int\n    let avatar: String\n}\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let out = client(&server).transform(request()).await.unwrap();

    assert_eq!(
        out,
        "struct User: Codable {\n    let id: Int\n    let avatar: String\n}"
    );
}

#[tokio::test]
async fn user_message_carries_both_models_and_style() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    client(&server).transform(request()).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(user.contains("avatar: str"));
    assert!(user.contains("let id: Int"));
    assert!(user.contains("Keep property order."));
}

#[tokio::test]
async fn rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let detail = service_error(client(&server).transform(request()).await.unwrap_err());
    assert!(detail.starts_with("rate limited"), "{detail}");
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let detail = service_error(client(&server).transform(request()).await.unwrap_err());
    assert!(detail.contains("500"), "{detail}");
    assert!(detail.contains("boom"), "{detail}");
}

#[tokio::test]
async fn blank_completion_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   \n")))
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).transform(request()).await,
        Err(SyncError::TransformationService(_))
    ));
}

#[tokio::test]
async fn response_without_choices_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let detail = service_error(client(&server).transform(request()).await.unwrap_err());
    assert_eq!(detail, "response contained no completion");
}
