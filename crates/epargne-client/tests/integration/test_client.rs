use std::time::Duration;

use epargne_client::{
    host::NoticeLevel,
    schema::{FnSchema, Typed},
    Client, Environment, Error, RequestOptions, DECODE_ERROR_MESSAGE, MAINTENANCE_MESSAGE,
    NETWORK_ERROR_MESSAGE, SCHEMA_ERROR_MESSAGE,
};
use http::{
    header::{CONTENT_TYPE, HeaderName},
    HeaderValue, Method, StatusCode,
};
use indoc::indoc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::common::{bearer, client, settle, MockTransport, RecordingHost, Reply};

#[derive(Deserialize, Debug, PartialEq)]
struct Challenge {
    id: u32,
    title: String,
}

#[test_log::test(tokio::test)]
async fn unwraps_success_envelope() {
    let transport = MockTransport::new(|_| {
        Reply::json(StatusCode::OK, json!({ "success": true, "data": { "id": 1 } }))
    });
    let client = client(transport.clone(), RecordingHost::at("/"));

    let value: Value = client.get("/challenges/1").await.unwrap();
    assert_eq!(value, json!({ "id": 1 }));

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.url, "https://api.test/challenges/1");
    assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    assert_eq!(bearer(request), None);
    assert_eq!(request.body, None);
}

#[test_log::test(tokio::test)]
async fn decodes_typed_payload() {
    let transport = MockTransport::new(|_| {
        Reply::raw(
            StatusCode::OK,
            indoc! {r#"
                {
                    "success": true,
                    "data": { "id": 3, "title": "52 semaines" }
                }
            "#},
        )
    });
    let client = client(transport, RecordingHost::at("/"));

    let challenge: Challenge = client.get("challenges/3").await.unwrap();
    assert_eq!(
        challenge,
        Challenge {
            id: 3,
            title: "52 semaines".to_string()
        }
    );
}

#[test_log::test(tokio::test)]
async fn business_failure_carries_joined_errors() {
    let transport = MockTransport::new(|_| {
        Reply::json(StatusCode::OK, json!({ "success": false, "errors": ["bad"] }))
    });
    let client = client(transport, RecordingHost::at("/"));

    let err = client.get::<Value>("/transactions").await.unwrap_err();
    assert!(matches!(err, Error::Business { .. }), "{err:?}");
    assert_eq!(err.message(), "bad");
    assert_eq!(err.status(), 200);
}

#[test_log::test(tokio::test)]
async fn bare_and_empty_bodies() {
    let transport = MockTransport::new(|request| {
        if request.url.ends_with("/bare") {
            Reply::json(StatusCode::OK, json!([1, 2, 3]))
        } else {
            Reply::raw(StatusCode::NO_CONTENT, "")
        }
    });
    let client = client(transport, RecordingHost::at("/"));

    let bare: Vec<u32> = client.get("/bare").await.unwrap();
    assert_eq!(bare, vec![1, 2, 3]);

    let nothing: Option<Value> = client.delete("/transactions/9").await.unwrap();
    assert_eq!(nothing, None);
}

#[test_log::test(tokio::test)]
async fn sends_json_body_custom_headers_and_explicit_token() {
    let transport = MockTransport::new(|_| Reply::json(StatusCode::CREATED, json!({ "success": true })));
    let client = client(transport.clone(), RecordingHost::at("/"));
    client.tokens().set_tokens("stored", None);

    let options = RequestOptions::new()
        .json(&json!({ "amount": 25.5, "label": "Courses" }))
        .unwrap()
        .header(
            HeaderName::from_static("x-request-source"),
            HeaderValue::from_static("tests"),
        )
        .token("explicit");
    let _: Value = client
        .request(Method::POST, "/transactions", options)
        .await
        .unwrap();

    let _: Value = client
        .put("/transactions/1", &json!({ "amount": 1 }))
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(bearer(&requests[0]), Some("explicit"));
    assert_eq!(requests[0].headers["x-request-source"], "tests");
    let body: Value = serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
    assert_eq!(body, json!({ "amount": 25.5, "label": "Courses" }));

    assert_eq!(requests[1].method, Method::PUT);
    assert_eq!(bearer(&requests[1]), Some("stored"));
}

#[test_log::test(tokio::test)]
async fn absolute_endpoint_bypasses_base_url() {
    let transport = MockTransport::new(|_| Reply::json(StatusCode::OK, json!({ "ok": true })));
    let client = client(transport.clone(), RecordingHost::at("/"));

    let _: Value = client.get("https://other.test/health").await.unwrap();
    assert_eq!(transport.requests()[0].url, "https://other.test/health");
    assert_eq!(client.build_api_url("/foo"), "https://api.test/foo");
    assert_eq!(client.build_api_url("foo"), "https://api.test/foo");
}

#[test_log::test(tokio::test)]
async fn validation_error_is_prefixed() {
    let transport = MockTransport::new(|_| {
        Reply::json(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "success": false,
                "message": "Données invalides",
                "errors": ["Le montant doit être positif"]
            }),
        )
    });
    let client = client(transport, RecordingHost::at("/"));

    let err = client
        .post::<Value>("/transactions", &json!({ "amount": -1 }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 422);
    assert_eq!(
        err.message(),
        "Erreur de validation: Le montant doit être positif"
    );
    assert_eq!(
        err.details().unwrap()["errors"][0],
        "Le montant doit être positif"
    );
}

#[test_log::test(tokio::test)]
async fn unparseable_error_body_falls_back_to_status_text() {
    let transport =
        MockTransport::new(|_| Reply::raw(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>"));
    let client = client(transport, RecordingHost::at("/"));

    let err = client.get::<Value>("/stats").await.unwrap_err();
    assert_eq!(err.status(), 500);
    assert_eq!(err.message(), "Internal Server Error");
    assert_eq!(err.details(), None);
}

#[test_log::test(tokio::test)]
async fn other_statuses_keep_raw_message() {
    let transport = MockTransport::new(|_| {
        Reply::json(
            StatusCode::NOT_FOUND,
            json!({ "success": false, "message": "Défi introuvable" }),
        )
    });
    let client = client(transport, RecordingHost::at("/"));

    let err = client.get::<Value>("/challenges/404").await.unwrap_err();
    assert_eq!(err.status(), 404);
    assert_eq!(err.message(), "Défi introuvable");
}

#[test_log::test(tokio::test)]
async fn maintenance_notifies_and_redirects() {
    let transport = MockTransport::new(|_| Reply::raw(StatusCode::SERVICE_UNAVAILABLE, ""));
    let host = RecordingHost::at("/dashboard");
    let client = client(transport, host.clone());

    let err = client.get::<Value>("/challenges").await.unwrap_err();
    assert!(matches!(err, Error::Maintenance));
    assert_eq!(err.status(), 503);
    assert_eq!(err.message(), MAINTENANCE_MESSAGE);

    settle().await;
    assert_eq!(host.notices().len(), 1);
    assert_eq!(host.notices()[0].level, NoticeLevel::Warning);
    assert_eq!(host.navigations(), vec!["/maintenance".to_string()]);
}

#[test_log::test(tokio::test)]
async fn maintenance_redirect_skipped_when_already_there() {
    let transport = MockTransport::new(|_| Reply::raw(StatusCode::SERVICE_UNAVAILABLE, ""));
    let host = RecordingHost::at("/maintenance");
    let client = client(transport, host.clone());

    let _ = client.get::<Value>("/challenges").await.unwrap_err();

    settle().await;
    assert_eq!(host.notices().len(), 1);
    assert!(host.navigations().is_empty());
}

#[test_log::test(tokio::test)]
async fn network_failure_has_status_zero() {
    let transport = MockTransport::new(|_| Reply::unreachable());
    let client = client(transport.clone(), RecordingHost::at("/"));

    let err = client.get::<Value>("/challenges").await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert_eq!(err.status(), 0);
    assert_eq!(err.message(), NETWORK_ERROR_MESSAGE);
    assert_eq!(err.details(), Some(json!("connection refused")));
    assert_eq!(transport.requests().len(), 1);
}

#[test_log::test(tokio::test)]
async fn timeout_is_a_network_failure() {
    let transport = MockTransport::new(|_| {
        Reply::json(StatusCode::OK, json!({ "success": true })).delayed(Duration::from_secs(5))
    });
    let client = client(transport, RecordingHost::at("/"));

    let err = client
        .request::<Value>(
            Method::GET,
            "/slow",
            RequestOptions::new().timeout(Duration::from_millis(20)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), 0);
}

#[test_log::test(tokio::test)]
async fn schema_validation() {
    let transport = MockTransport::new(|_| {
        Reply::json(
            StatusCode::OK,
            json!({ "success": true, "data": { "balance": "120.50" } }),
        )
    });
    let client = client(transport, RecordingHost::at("/"));

    let balance = client
        .request_with_schema(
            Method::GET,
            "/wallet",
            RequestOptions::new(),
            &FnSchema(|value: &Value| {
                value["balance"]
                    .as_str()
                    .and_then(|balance| balance.parse::<f64>().ok())
                    .ok_or_else(|| anyhow::anyhow!("balance must be a numeric string"))
            }),
        )
        .await
        .unwrap();
    assert_eq!(balance, 120.5);

    let err = client
        .request_with_schema(
            Method::GET,
            "/wallet",
            RequestOptions::new(),
            &Typed::<Vec<u32>>::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
    assert_eq!(err.status(), 422);
    assert_eq!(err.message(), SCHEMA_ERROR_MESSAGE);
    assert!(err.details().is_some());
}

#[test_log::test(tokio::test)]
async fn decode_failure_without_schema() {
    let transport = MockTransport::new(|_| {
        Reply::json(StatusCode::OK, json!({ "success": true, "data": { "id": "x" } }))
    });
    let client = client(transport, RecordingHost::at("/"));

    let err = client.get::<Challenge>("/challenges/x").await.unwrap_err();
    assert_eq!(err.status(), 422);
    assert_eq!(err.message(), DECODE_ERROR_MESSAGE);
}

#[test]
fn build_requires_environment() {
    let err = Client::builder().build().err().unwrap();
    assert!(matches!(err, Error::EnvironmentNotInferrable));
}

#[test]
fn builder_overrides_environment() {
    let client = Client::builder()
        .with_environment(Environment::new("http://localhost:3000/api").with_name("development"))
        .with_debug(true)
        .with_transport(MockTransport::new(|_| Reply::raw(StatusCode::OK, "")))
        .build()
        .unwrap();

    assert_eq!(client.environment().name(), "development");
    assert!(client.environment().is_debug_mode());
    assert!(!client.environment().is_secure());
    assert_eq!(
        client.build_api_url("/users/me"),
        "http://localhost:3000/api/users/me"
    );
    assert_eq!(client.environment().api_base_url(), "http://localhost:3000/api");
}
