use serde_json::json;

use alphaletter::api::stripe::{
    sign_header,
    verify_signature,
    SignatureError,
    SignatureHeader,
    StripeEvent,
};

const TEST_SECRET: &str = "whsec_test_secret_12345";

#[test]
fn parse_header_with_v1() {
    let header = SignatureHeader::parse(&format!("t=1234567890,v1={}", "a".repeat(64)))
        .expect("parse header");

    assert_eq!(header.timestamp, 1234567890);
    assert_eq!(header.v1_signature.len(), 32);
}

#[test]
fn parse_header_ignores_v0_and_unknown_fields() {
    let header = SignatureHeader::parse(&format!(
        "t=1234567890,v1={},v0={},scheme=hmac",
        "a".repeat(64),
        "b".repeat(64)
    ))
    .expect("parse header");

    assert_eq!(header.timestamp, 1234567890);
}

#[test]
fn parse_header_missing_timestamp_fails() {
    let result = SignatureHeader::parse(&format!("v1={}", "a".repeat(64)));
    assert!(matches!(result, Err(SignatureError::Malformed(_))));
}

#[test]
fn parse_header_missing_v1_fails() {
    let result = SignatureHeader::parse("t=1234567890");
    assert!(matches!(result, Err(SignatureError::Malformed(_))));
}

#[test]
fn parse_header_invalid_hex_fails() {
    let result = SignatureHeader::parse("t=1234567890,v1=not_valid_hex");
    assert!(matches!(result, Err(SignatureError::Malformed(_))));
}

#[test]
fn verify_accepts_valid_signature() {
    let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
    let header = sign_header(TEST_SECRET, chrono::Utc::now().timestamp(), payload);

    assert!(verify_signature(TEST_SECRET, &header, payload).is_ok());
}

#[test]
fn verify_rejects_wrong_secret() {
    let payload = br#"{"id":"evt_1"}"#;
    let header = sign_header("other_secret", chrono::Utc::now().timestamp(), payload);

    let result = verify_signature(TEST_SECRET, &header, payload);
    assert!(matches!(result, Err(SignatureError::Mismatch)));
}

#[test]
fn verify_rejects_tampered_payload() {
    let header = sign_header(
        TEST_SECRET,
        chrono::Utc::now().timestamp(),
        br#"{"id":"evt_1"}"#,
    );

    let result = verify_signature(TEST_SECRET, &header, br#"{"id":"evt_hacked"}"#);
    assert!(matches!(result, Err(SignatureError::Mismatch)));
}

#[test]
fn verify_rejects_old_timestamp() {
    let payload = br#"{"id":"evt_1"}"#;
    let header = sign_header(TEST_SECRET, chrono::Utc::now().timestamp() - 600, payload);

    let result = verify_signature(TEST_SECRET, &header, payload);
    assert!(matches!(result, Err(SignatureError::TimestampOutOfRange)));
}

#[test]
fn verify_rejects_future_timestamp_beyond_skew() {
    let payload = br#"{"id":"evt_1"}"#;
    let header = sign_header(TEST_SECRET, chrono::Utc::now().timestamp() + 120, payload);

    let result = verify_signature(TEST_SECRET, &header, payload);
    assert!(matches!(result, Err(SignatureError::TimestampOutOfRange)));
}

#[test]
fn verify_tolerates_small_clock_skew() {
    let payload = br#"{"id":"evt_1"}"#;
    let header = sign_header(TEST_SECRET, chrono::Utc::now().timestamp() + 30, payload);

    assert!(verify_signature(TEST_SECRET, &header, payload).is_ok());
}

#[test]
fn event_parses_checkout_session_fields() {
    let raw = json!({
        "id": "evt_parse",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "metadata": { "product_id": "author-portfolio" },
                "customer_details": { "email": "reader@example.com" },
                "amount_total": 4900,
                "currency": "usd"
            }
        }
    });

    let event: StripeEvent = serde_json::from_value(raw).expect("parse event");
    assert_eq!(event.id, "evt_parse");
    assert_eq!(event.event_type, "checkout.session.completed");
    let session = &event.data.object;
    assert_eq!(
        session
            .metadata
            .as_ref()
            .and_then(|m| m.product_id.as_deref()),
        Some("author-portfolio")
    );
    assert_eq!(
        session
            .customer_details
            .as_ref()
            .and_then(|c| c.email.as_deref()),
        Some("reader@example.com")
    );
    assert_eq!(event.data.object.amount_total, Some(4900));
}

#[test]
fn event_with_foreign_object_shape_still_parses() {
    // data.object другого типа события не должен ломать разбор
    let raw = json!({
        "id": "evt_sub",
        "type": "customer.subscription.updated",
        "data": {
            "object": {
                "status": "active",
                "items": []
            }
        }
    });

    let event: StripeEvent = serde_json::from_value(raw).expect("parse event");
    assert_eq!(event.event_type, "customer.subscription.updated");
    assert!(event.data.object.metadata.is_none());
}
