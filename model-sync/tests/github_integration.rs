use model_sync::github::GitHubClient;
use model_sync_core::contract::{NewReviewRequest, ReviewDiffSource, ReviewRequester};
use model_sync_core::SyncError;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(&server.uri(), "acme/app", SecretString::from("ghp_test")).unwrap()
}

fn file_page(prefix: &str, count: usize) -> serde_json::Value {
    let files: Vec<_> = (0..count)
        .map(|i| json!({"filename": format!("{prefix}{i}.py"), "status": "modified"}))
        .collect();
    json!(files)
}

#[tokio::test]
async fn lists_changed_files_and_drops_removed_ones() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/7/files"))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"filename": "models/User.py", "status": "modified"},
            {"filename": "models/Old.py", "status": "removed"},
            {"filename": "README.md", "status": "added"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let files = client(&server).changed_files(7).await.unwrap();

    assert_eq!(files, vec!["models/User.py".to_string(), "README.md".to_string()]);
}

#[tokio::test]
async fn follows_pagination_until_a_short_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/9/files"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_page("models/A", 100)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/9/files"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_page("models/B", 2)))
        .expect(1)
        .mount(&server)
        .await;

    let files = client(&server).changed_files(9).await.unwrap();

    assert_eq!(files.len(), 102);
    assert_eq!(files[0], "models/A0.py");
    assert_eq!(files[101], "models/B1.py");
}

#[tokio::test]
async fn unknown_pull_request_is_a_review_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/404/files"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let err = client(&server).changed_files(404).await.unwrap_err();

    match err {
        SyncError::ReviewRequest(detail) => assert!(detail.contains("Not Found"), "{detail}"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn opens_pull_request_and_returns_its_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/pulls"))
        .and(header("accept", "application/vnd.github+json"))
        .and(body_partial_json(json!({
            "title": "Update client models",
            "head": "auto-model-sync",
            "base": "main",
            "body": "Automated"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 12,
            "html_url": "https://github.com/acme/app/pull/12"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = client(&server)
        .open(NewReviewRequest {
            head_branch: "auto-model-sync",
            base_branch: "main",
            title: "Update client models",
            body: "Automated",
        })
        .await
        .unwrap();

    assert_eq!(url, "https://github.com/acme/app/pull/12");
}

#[tokio::test]
async fn rejected_pull_request_carries_github_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/pulls"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Validation Failed",
            "errors": [{"message": "A pull request already exists for acme:auto-model-sync."}]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .open(NewReviewRequest {
            head_branch: "auto-model-sync",
            base_branch: "main",
            title: "t",
            body: "b",
        })
        .await
        .unwrap_err();

    match err {
        SyncError::ReviewRequest(detail) => {
            assert!(detail.contains("422"), "{detail}");
            assert!(detail.contains("already exists"), "{detail}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
