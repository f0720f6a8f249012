use crate::{config::GatewayConfig, errors::ServiceError};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{error, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Order handle returned by the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// HTTP client for the payment gateway's order API.
///
/// Gateway order creation is billable upstream, so nothing here retries;
/// retry safety is the caller's receipt-per-attempt contract.
#[derive(Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl PaymentGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    /// Opens a gateway order for the given amount in minor units.
    #[instrument(skip(self), fields(amount = amount, receipt = %receipt))]
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        let url = format!("{}/v1/orders", self.base_url);
        let body = CreateOrderBody {
            amount,
            currency,
            receipt,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gateway order request failed: {}", e);
                ServiceError::ExternalServiceError(format!("gateway unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, "Gateway order creation rejected: {}", detail);
            return Err(ServiceError::ExternalServiceError(format!(
                "gateway returned {}",
                status
            )));
        }

        response.json::<GatewayOrder>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("malformed gateway response: {}", e))
        })
    }
}

/// Verifier for gateway callback signatures.
///
/// The gateway signs `order_id + "|" + payment_id` with the shared key
/// secret; we recompute and compare in constant time.
#[derive(Clone)]
pub struct CallbackSignature {
    secret: String,
}

impl CallbackSignature {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Hex-encoded expected signature for a callback payload.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        let payload = format!("{}|{}", order_id, payment_id);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a supplied signature against the expectation.
    pub fn verify(&self, order_id: &str, payment_id: &str, supplied: &str) -> bool {
        let expected = self.sign(order_id, payment_id);
        constant_time_eq(&expected, supplied)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let signer = CallbackSignature::new("test_key_secret");
        let sig = signer.sign("order_123", "pay_456");
        assert!(signer.verify("order_123", "pay_456", &sig));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let signer = CallbackSignature::new("test_key_secret");
        let sig = signer.sign("order_123", "pay_456");
        assert!(!signer.verify("order_123", "pay_999", &sig));
        assert!(!signer.verify("order_999", "pay_456", &sig));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let signer = CallbackSignature::new("test_key_secret");
        let other = CallbackSignature::new("another_secret");
        let sig = other.sign("order_123", "pay_456");
        assert!(!signer.verify("order_123", "pay_456", &sig));
    }

    #[test]
    fn signature_is_hex_sha256_sized() {
        let signer = CallbackSignature::new("k");
        let sig = signer.sign("a", "b");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn constant_time_eq_length_mismatch() {
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("abcd", "abcd"));
        assert!(!constant_time_eq("abcd", "abce"));
    }
}
