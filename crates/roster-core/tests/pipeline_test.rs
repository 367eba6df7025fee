//! Integration tests for the request pipeline against a mock backend


use roster_core::debug::{MAX_BODY_SNIPPET_CHARS, REDACTED_AUTHORIZATION};
use roster_core::{AuthError, DebugSnapshot, ReauthPolicy, RequestFailure, RequestOptions};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_support::*;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// SUCCESS PATH
// =============================================================================

#[tokio::test]
async fn test_json_success_on_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flights"))
        .and(header("Authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "flights": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RecordingTokenProvider::new();
    let client = client_for(&server.uri(), provider.clone());

    let body: Value = client.get("/api/flights").await.unwrap();

    assert_eq!(body, json!({"status": "ok", "flights": 3}));
    assert_eq!(provider.token_calls().len(), 1);
    assert_eq!(provider.login_calls(), 0);
}

#[tokio::test]
async fn test_snippet_keeps_backend_key_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flights"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"status":"ok","flights":3,"crew":["A","B"]}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let body: Value = client.get("/api/flights").await.unwrap();

    let snapshot = client.recorder().read();
    assert_eq!(
        snapshot.response.unwrap().body_snippet,
        r#"{"status":"ok","flights":3,"crew":["A","B"]}"#
    );
    let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["status", "flights", "crew"]);
}

#[tokio::test]
async fn test_decodes_into_declared_type() {
    #[derive(Debug, Deserialize)]
    struct Profile {
        sub: String,
        email: String,
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("Content-Type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"sub": "auth0|42", "email": "crew@example.com"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let options = RequestOptions::get().header("Content-Type", "application/json");
    let profile: Profile = client.request("/api/me", &options).await.unwrap();

    assert_eq!(profile.sub, "auth0|42");
    assert_eq!(profile.email, "crew@example.com");
}

#[tokio::test]
async fn test_me_helper() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Pilot"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    assert_eq!(client.me().await.unwrap(), json!({"name": "Pilot"}));
}

#[tokio::test]
async fn test_text_response_is_returned_as_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("UP"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let response = client.request_raw("/health", &RequestOptions::get()).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, roster_core::ResponseBody::Text("UP".to_string()));
}

#[tokio::test]
async fn test_body_and_caller_headers_are_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/roster/convert"))
        .and(header("X-Request-Source", "cli"))
        .and(header("Authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
        .and(body_string("roster,data\n1,2"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "r-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let options = RequestOptions::post()
        .header("X-Request-Source", "cli")
        .header("Authorization", "Basic c3RhbGU=")
        .body("roster,data\n1,2");

    let created: Value = client.request("/api/roster/convert", &options).await.unwrap();

    assert_eq!(created["id"], "r-1");
    assert_eq!(options.headers["Authorization"], "Basic c3RhbGU=");
}

// =============================================================================
// APPLICATION FAILURES
// =============================================================================

#[tokio::test]
async fn test_server_error_is_normalized_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/roster/convert"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "Conversion failed"})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RecordingTokenProvider::new();
    let client = client_for(&server.uri(), provider.clone());

    let err = client
        .request::<Value>("/api/roster/convert", &RequestOptions::post())
        .await
        .unwrap_err();

    match err {
        RequestFailure::Application(record) => {
            assert_eq!(record.status, 500);
            assert_eq!(record.message, "Conversion failed");
        }
        other => panic!("expected application failure, got {other:?}"),
    }
    assert_eq!(provider.token_calls().len(), 1);
    assert_eq!(provider.login_calls(), 0);
}

#[tokio::test]
async fn test_text_error_body_becomes_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No roster with that id"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let err = client.get::<Value>("/api/roster/9").await.unwrap_err();

    assert_eq!(err.status(), 404);
    assert_eq!(err.record().unwrap().message, "No roster with that id");
}

#[tokio::test]
async fn test_malformed_json_is_application_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"truncated\": ", "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let err = client.get::<Value>("/api/me").await.unwrap_err();

    match err {
        RequestFailure::Application(record) => {
            assert_eq!(record.status, 200);
            assert!(record.message.starts_with("Malformed JSON response"));
            assert_eq!(record.raw, json!("{\"truncated\": "));
        }
        other => panic!("expected application failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_success_body_is_application_failure() {
    #[derive(Debug, Deserialize)]
    struct Count {
        #[allow(dead_code)]
        count: u32,
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": "many"})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let err = client.get::<Count>("/api/count").await.unwrap_err();

    assert_eq!(err.status(), 200);
    assert!(err.record().unwrap().message.starts_with("Failed to decode response"));
}

// =============================================================================
// AUTHENTICATION FAILURES
// =============================================================================

#[tokio::test]
async fn test_401_triggers_login_once_and_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RecordingTokenProvider::new();
    let client = client_for(&server.uri(), provider.clone());

    let err = client.get::<Value>("/api/me").await.unwrap_err();

    match err {
        RequestFailure::Auth { code, record } => {
            assert_eq!(code, None);
            assert_eq!(record.status, 401);
            assert_eq!(record.message, "Token expired");
        }
        other => panic!("expected auth failure, got {other:?}"),
    }
    assert_eq!(provider.login_calls(), 1);
}

#[tokio::test]
async fn test_403_is_escalated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let provider = RecordingTokenProvider::new();
    let client = client_for(&server.uri(), provider.clone());

    let err = client.get::<Value>("/api/admin").await.unwrap_err();
    assert!(matches!(err, RequestFailure::Auth { .. }));
    assert_eq!(provider.login_calls(), 1);
}

#[tokio::test]
async fn test_identity_error_code_is_escalated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "consent_required", "message": "Consent needed"})),
        )
        .mount(&server)
        .await;

    let provider = RecordingTokenProvider::new();
    let client = client_for(&server.uri(), provider.clone());

    let err = client.get::<Value>("/api/me").await.unwrap_err();
    match err {
        RequestFailure::Auth { code, record } => {
            assert_eq!(code.as_deref(), Some("consent_required"));
            assert_eq!(record.status, 400);
        }
        other => panic!("expected auth failure, got {other:?}"),
    }
    assert_eq!(provider.login_calls(), 1);
}

#[tokio::test]
async fn test_failed_login_still_propagates_original_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider =
        RecordingTokenProvider::with_failing_login(AuthError::LoginFailed("popup closed".to_string()));
    let client = client_with_reauth(&server.uri(), provider.clone(), ReauthPolicy::RetryOnce);

    let err = client.get::<Value>("/api/me").await.unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(provider.login_calls(), 1);
    assert_eq!(provider.token_calls().len(), 1);
}

#[tokio::test]
async fn test_retry_once_after_successful_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Pilot"})))
        .with_priority(2)
        .mount(&server)
        .await;

    let provider = RecordingTokenProvider::new();
    let client = client_with_reauth(&server.uri(), provider.clone(), ReauthPolicy::RetryOnce);

    let body: Value = client.get("/api/me").await.unwrap();
    assert_eq!(body, json!({"name": "Pilot"}));
    assert_eq!(provider.login_calls(), 1);
    assert_eq!(provider.token_calls().len(), 2);
}

#[tokio::test]
async fn test_retry_once_escalates_only_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let provider = RecordingTokenProvider::new();
    let client = client_with_reauth(&server.uri(), provider.clone(), ReauthPolicy::RetryOnce);

    let err = client.get::<Value>("/api/me").await.unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(provider.login_calls(), 1);
}

// =============================================================================
// CREDENTIAL AND TRANSPORT FAILURES
// =============================================================================

#[tokio::test]
async fn test_credential_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider =
        RecordingTokenProvider::failing(AuthError::TokenUnavailable("refresh token revoked".to_string()));
    let client = client_for(&server.uri(), provider.clone());

    let err = client.get::<Value>("/api/me").await.unwrap_err();

    match err {
        RequestFailure::Credential(AuthError::TokenUnavailable(reason)) => {
            assert_eq!(reason, "refresh token revoked")
        }
        other => panic!("expected credential failure, got {other:?}"),
    }
    assert_eq!(provider.token_calls().len(), 1);
    assert_eq!(provider.login_calls(), 0);
    assert!(client.recorder().read().is_empty());
}

fn login_required(code: &str) -> AuthError {
    AuthError::LoginRequired {
        code: code.to_string(),
        message: "session expired".to_string(),
    }
}

#[tokio::test]
async fn test_login_required_token_failure_triggers_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for code in ["login_required", "consent_required", "interaction_required"] {
        let provider = RecordingTokenProvider::failing(login_required(code));
        let client = client_for(&server.uri(), provider.clone());

        let err = client.get::<Value>("/api/me").await.unwrap_err();

        match err {
            RequestFailure::Credential(ref auth) => assert_eq!(auth.code(), Some(code)),
            ref other => panic!("expected credential failure, got {other:?}"),
        }
        assert_eq!(err.status(), 0);
        assert_eq!(provider.login_calls(), 1, "{code}");
        assert_eq!(provider.token_calls().len(), 1);
        assert!(client.recorder().read().is_empty());
    }
}

#[tokio::test]
async fn test_login_required_token_failure_is_not_retried_after_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = RecordingTokenProvider::failing(login_required("login_required"));
    let client = client_with_reauth(&server.uri(), provider.clone(), ReauthPolicy::RetryOnce);

    let err = client.get::<Value>("/api/me").await.unwrap_err();

    assert!(matches!(err, RequestFailure::Credential(AuthError::LoginRequired { .. })));
    assert_eq!(provider.login_calls(), 1);
    assert_eq!(provider.token_calls().len(), 1);
}

#[tokio::test]
async fn test_other_provider_codes_do_not_trigger_login() {
    let provider = RecordingTokenProvider::failing(login_required("access_denied"));
    let client = client_for("http://127.0.0.1:9", provider.clone());

    let err = client.get::<Value>("/api/me").await.unwrap_err();

    assert!(matches!(err, RequestFailure::Credential(_)));
    assert_eq!(provider.login_calls(), 0);
}

#[tokio::test]
async fn test_transport_failure_retries_on_schedule() {
    let provider = RecordingTokenProvider::new();
    let client = client_for(&unreachable_origin(), provider.clone());

    let err = client.get::<Value>("/api/me").await.unwrap_err();

    assert!(matches!(err, RequestFailure::Transport(_)));
    assert_eq!(err.status(), 0);
    assert_eq!(provider.login_calls(), 0);

    let calls = provider.token_calls();
    assert_eq!(calls.len(), 4, "one attempt plus three retries");

    let expected = [300u64, 900, 2700];
    for (i, window) in calls.windows(2).enumerate() {
        let gap = window[1].duration_since(window[0]);
        assert!(
            gap >= Duration::from_millis(expected[i]),
            "gap {} was {:?}, expected at least {}ms",
            i,
            gap,
            expected[i]
        );
    }
}

#[tokio::test]
async fn test_transport_failure_records_preflight_only() {
    let provider = RecordingTokenProvider::new();
    let client = fast_client_for(&unreachable_origin(), provider.clone());

    let _ = client.get::<Value>("/api/me").await.unwrap_err();

    let snapshot = client.recorder().read();
    assert!(snapshot.request.is_some());
    assert!(snapshot.response.is_none());
    assert_eq!(provider.token_calls().len(), 4);
}

// =============================================================================
// DEBUG SNAPSHOTS
// =============================================================================

#[tokio::test]
async fn test_snapshot_is_redacted_and_truncated() {
    let server = MockServer::start().await;
    let large = "x".repeat(5_000);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"blob": large})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let _: Value = client.get("/api/blob").await.unwrap();

    let snapshot = client.recorder().read();
    let request = snapshot.request.expect("request trace");
    let response = snapshot.response.expect("response trace");

    assert_eq!(request.url, format!("{}/api/blob", server.uri()));
    assert_eq!(request.method, "GET");
    assert_eq!(request.headers["Authorization"], REDACTED_AUTHORIZATION);
    assert!(!request.headers.values().any(|v| v.contains(TEST_TOKEN)));
    assert_eq!(response.status, 200);
    assert_eq!(response.body_snippet.chars().count(), MAX_BODY_SNIPPET_CHARS);
    assert!(response.body_snippet.starts_with("{\"blob\":\"xxx"));
}

#[tokio::test]
async fn test_error_response_is_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let _ = client.get::<Value>("/api/me").await.unwrap_err();

    let response = client.recorder().read().response.expect("response trace");
    assert_eq!(response.status, 502);
    assert_eq!(response.body_snippet, "upstream down");
}

#[tokio::test]
async fn test_observer_sees_preflight_then_completed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), RecordingTokenProvider::new());
    let seen: Arc<Mutex<Vec<DebugSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = client
        .recorder()
        .subscribe(move |snapshot| sink.lock().unwrap().push(snapshot.clone()));

    let _: Value = client.get("/api/me").await.unwrap();
    assert!(subscription.unsubscribe());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].response.is_none());
    assert_eq!(seen[1].response.as_ref().unwrap().body_snippet, "{\"ok\":true}");
    assert_eq!(seen[0].request, seen[1].request);
}
