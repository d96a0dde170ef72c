// src/api/stripe.rs
//
// Проверка подписи вебхуков Stripe.
// Заголовок Stripe-Signature: `t=<unix ts>,v1=<hex hmac>`,
// подпись — HMAC-SHA256 от "{t}.{body}" ключом подписи вебхука.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Событие старше пяти минут считаем replay-ом.
const MAX_EVENT_AGE_SECS: i64 = 300;
const MAX_CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("malformed signature header: {0}")]
    Malformed(String),

    #[error("timestamp out of tolerance")]
    TimestampOutOfRange,

    #[error("signature mismatch")]
    Mismatch,
}

#[derive(Debug)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(SignatureError::Malformed("expected key=value".to_string()));
            };

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        SignatureError::Malformed("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        SignatureError::Malformed("invalid v1 hex".to_string())
                    })?);
                }
                // v0 и будущие схемы игнорируем
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| SignatureError::Malformed("missing timestamp".to_string()))?;
        let v1_signature = v1_signature
            .ok_or_else(|| SignatureError::Malformed("missing v1 signature".to_string()))?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Проверяет подпись и допуск по времени. Тело не трогает.
pub fn verify_signature(secret: &str, header: &str, payload: &[u8]) -> Result<(), SignatureError> {
    let header = SignatureHeader::parse(header)?;

    let now = chrono::Utc::now().timestamp();
    let age = now - header.timestamp;
    if age > MAX_EVENT_AGE_SECS || age < -MAX_CLOCK_SKEW_SECS {
        return Err(SignatureError::TimestampOutOfRange);
    }

    let expected = compute_signature(secret, header.timestamp, payload);

    // сравнение за константное время
    if expected.len() != header.v1_signature.len()
        || !bool::from(expected.ct_eq(&header.v1_signature))
    {
        return Err(SignatureError::Mismatch);
    }

    Ok(())
}

pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Готовый заголовок для тестовых запросов.
pub fn sign_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(compute_signature(secret, timestamp, payload))
    )
}

// Поля, которые нам нужны из checkout.session.completed. Остальное
// разбирать не пытаемся: для чужих типов событий object другой.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: StripeEventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeEventData {
    #[serde(default)]
    pub object: CheckoutSession,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutSession {
    // metadata и customer_details у Stripe бывают null
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}
