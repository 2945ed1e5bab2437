use epargne_common::envelope::{Envelope, Payload, DEFAULT_ERROR_MESSAGE};
use indoc::indoc;
use serde_json::json;

#[test]
fn success_envelope_unwraps_data() {
    let payload = Payload::from_slice(br#"{"success":true,"data":{"id":1}}"#);
    assert_eq!(payload, Payload::Success(json!({ "id": 1 })));
}

#[test]
fn success_envelope_without_data_is_null() {
    let payload = Payload::from_slice(br#"{"success":true,"message":"ok"}"#);
    assert_eq!(payload, Payload::Success(serde_json::Value::Null));
}

#[test]
fn failure_envelope_joins_errors() {
    let payload = Payload::from_slice(
        indoc! {r#"
            {
                "success": false,
                "message": "ignored",
                "errors": ["montant invalide", "date manquante"]
            }
        "#}
        .as_bytes(),
    );
    assert_eq!(
        payload.failure_message().as_deref(),
        Some("montant invalide, date manquante")
    );
}

#[test]
fn failure_envelope_single_error() {
    let payload = Payload::from_slice(br#"{"success":false,"errors":["bad"]}"#);
    assert_eq!(payload.failure_message().as_deref(), Some("bad"));
}

#[test]
fn failure_envelope_without_detail_degrades_to_default() {
    let payload = Payload::from_slice(br#"{"success":false}"#);
    assert_eq!(payload.failure_message().as_deref(), Some(DEFAULT_ERROR_MESSAGE));
}

#[test]
fn bare_json_passes_through() {
    let payload = Payload::from_slice(br#"[1,2,3]"#);
    assert_eq!(payload, Payload::Bare(json!([1, 2, 3])));
    assert_eq!(payload.failure_message(), None);

    let payload = Payload::from_slice(br#"{"accessToken":"abc"}"#);
    assert_eq!(payload, Payload::Bare(json!({ "accessToken": "abc" })));
}

#[test]
fn empty_or_garbage_body_is_null() {
    assert_eq!(Payload::from_slice(b""), Payload::Bare(serde_json::Value::Null));
    assert_eq!(
        Payload::from_slice(b"<html>502</html>"),
        Payload::Bare(serde_json::Value::Null)
    );
}

#[test]
fn typed_envelope_converts() {
    let envelope: Envelope =
        serde_json::from_str(r#"{"success":false,"message":"Défi introuvable"}"#).unwrap();
    assert_eq!(
        Payload::from(envelope).failure_message().as_deref(),
        Some("Défi introuvable")
    );
}
