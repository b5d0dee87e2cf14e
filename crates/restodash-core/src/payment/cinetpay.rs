//! CinetPay hosted checkout.
//!
//! `initiate` posts the order to `/payment` and returns the checkout page
//! URL; `check` asks `/payment/check` for the transaction's state. CinetPay
//! answers with a `{code, message, data}` envelope, often with HTTP 200
//! even for refusals, so the envelope code decides success.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{PaymentError, PaymentGateway, PaymentRequest, PaymentSession, PaymentStatus};
use crate::api::ApiError;

pub const CINETPAY_API_URL: &str = "https://api-checkout.cinetpay.com/v2";

const REQUEST_TIMEOUT_SECS: u64 = 30;

const CODE_CREATED: &str = "201";
const CODE_SUCCESS: &str = "00";
const CODE_PAYMENT_FAILED: &str = "600";
const CODE_TRANSACTION_CANCELLED: &str = "627";
const CODE_WAITING_CUSTOMER: &str = "662";

/// Merchant settings for CinetPay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CinetPayConfig {
    pub api_key: String,
    pub site_id: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub notify_url: Option<String>,
}

fn default_currency() -> String {
    super::DEFAULT_CURRENCY.to_string()
}

#[derive(Debug, Serialize)]
struct InitiateBody<'a> {
    apikey: &'a str,
    site_id: &'a str,
    transaction_id: &'a str,
    amount: i64,
    currency: &'a str,
    description: &'a str,
    channels: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notify_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CheckBody<'a> {
    apikey: &'a str,
    site_id: &'a str,
    transaction_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitiateData {
    payment_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckData {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Clone)]
pub struct CinetPayClient {
    client: Client,
    config: CinetPayConfig,
}

impl CinetPayClient {
    pub fn new(config: CinetPayConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            config,
        })
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, PaymentError> {
        let url = format!("{}{}", CINETPAY_API_URL, path);
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;

        match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ApiError::from_status(status, &text).into()),
            Err(e) => Err(ApiError::InvalidResponse(format!(
                "Failed to parse response from {}: {}",
                url, e
            ))
            .into()),
        }
    }
}

/// Unique merchant-side transaction id.
pub fn new_transaction_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("RD{}{}", Utc::now().timestamp_millis(), suffix)
}

fn parse_initiate(
    envelope: Envelope<InitiateData>,
    request: &PaymentRequest,
    transaction_id: String,
) -> Result<PaymentSession, PaymentError> {
    match (envelope.code.as_str(), envelope.data) {
        (CODE_CREATED, Some(data)) => Ok(PaymentSession {
            transaction_id,
            payment_url: data.payment_url,
            amount: request.amount(),
            currency: request.currency().to_string(),
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        }),
        (code, _) => Err(PaymentError::Rejected {
            code: code.to_string(),
            message: envelope.message,
        }),
    }
}

fn parse_check(envelope: Envelope<CheckData>) -> Result<PaymentStatus, PaymentError> {
    match envelope.code.as_str() {
        CODE_SUCCESS => {
            let status = envelope.data.and_then(|d| d.status).unwrap_or_default();
            Ok(match status.to_uppercase().as_str() {
                "ACCEPTED" => PaymentStatus::Completed,
                "REFUSED" => PaymentStatus::Failed,
                "CANCELED" | "CANCELLED" => PaymentStatus::Cancelled,
                _ => PaymentStatus::Pending,
            })
        }
        CODE_WAITING_CUSTOMER => Ok(PaymentStatus::Pending),
        CODE_PAYMENT_FAILED => Ok(PaymentStatus::Failed),
        CODE_TRANSACTION_CANCELLED => Ok(PaymentStatus::Cancelled),
        code => Err(PaymentError::Rejected {
            code: code.to_string(),
            message: envelope.message,
        }),
    }
}

#[async_trait]
impl PaymentGateway for CinetPayClient {
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentSession, PaymentError> {
        let transaction_id = new_transaction_id();
        let body = InitiateBody {
            apikey: &self.config.api_key,
            site_id: &self.config.site_id,
            transaction_id: &transaction_id,
            amount: request.amount(),
            currency: request.currency(),
            description: request.description(),
            channels: "ALL",
            return_url: self.config.return_url.as_deref(),
            notify_url: self.config.notify_url.as_deref(),
        };
        let envelope = self.post::<_, InitiateData>("/payment", &body).await?;
        let result = parse_initiate(envelope, &request, transaction_id);
        match &result {
            Ok(session) => info!(
                transaction_id = %session.transaction_id,
                amount = session.amount,
                "Payment initiated"
            ),
            Err(e) => warn!(error = %e, "Payment initiation refused"),
        }
        result
    }

    async fn check(&self, transaction_id: &str) -> Result<PaymentStatus, PaymentError> {
        let body = CheckBody {
            apikey: &self.config.api_key,
            site_id: &self.config.site_id,
            transaction_id,
        };
        let envelope = self.post::<_, CheckData>("/payment/check", &body).await?;
        let status = parse_check(envelope)?;
        debug!(transaction_id, ?status, "Payment status");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope<T: for<'de> Deserialize<'de>>(json: &str) -> Envelope<T> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_initiate_created() {
        let req = PaymentRequest::new(2500, "XOF", "Table 4").unwrap();
        let env = envelope::<InitiateData>(
            r#"{"code":"201","message":"CREATED","data":{"payment_token":"tok","payment_url":"https://checkout.cinetpay.com/payment/tok"}}"#,
        );
        let session = parse_initiate(env, &req, "RD1".to_string()).unwrap();
        assert_eq!(session.payment_url, "https://checkout.cinetpay.com/payment/tok");
        assert_eq!(session.status, PaymentStatus::Pending);
        assert_eq!(session.amount, 2500);
        assert_eq!(session.transaction_id, "RD1");
    }

    #[test]
    fn test_parse_initiate_rejected() {
        let req = PaymentRequest::new(2500, "XOF", "Table 4").unwrap();
        let env = envelope::<InitiateData>(r#"{"code":"608","message":"MINIMUM_REQUIRED_FIELDS","data":null}"#);
        match parse_initiate(env, &req, "RD1".to_string()) {
            Err(PaymentError::Rejected { code, message }) => {
                assert_eq!(code, "608");
                assert_eq!(message, "MINIMUM_REQUIRED_FIELDS");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_check_statuses() {
        let accepted = envelope::<CheckData>(r#"{"code":"00","message":"SUCCES","data":{"status":"ACCEPTED"}}"#);
        assert_eq!(parse_check(accepted).unwrap(), PaymentStatus::Completed);

        let refused = envelope::<CheckData>(r#"{"code":"00","message":"SUCCES","data":{"status":"REFUSED"}}"#);
        assert_eq!(parse_check(refused).unwrap(), PaymentStatus::Failed);

        let waiting = envelope::<CheckData>(r#"{"code":"662","message":"WAITING_CUSTOMER_PAYMENT","data":null}"#);
        assert_eq!(parse_check(waiting).unwrap(), PaymentStatus::Pending);

        let cancelled = envelope::<CheckData>(r#"{"code":"627","message":"TRANSACTION_CANCEL"}"#);
        assert_eq!(parse_check(cancelled).unwrap(), PaymentStatus::Cancelled);

        let unknown = envelope::<CheckData>(r#"{"code":"609","message":"AUTH_NOT_FOUND"}"#);
        assert!(matches!(parse_check(unknown), Err(PaymentError::Rejected { .. })));
    }

    #[test]
    fn test_initiate_body_shape() {
        let body = InitiateBody {
            apikey: "k",
            site_id: "s",
            transaction_id: "RD1",
            amount: 500,
            currency: "XOF",
            description: "d",
            channels: "ALL",
            return_url: None,
            notify_url: Some("https://example.ci/notify"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["apikey"], "k");
        assert_eq!(json["amount"], 500);
        assert!(json.get("return_url").is_none());
        assert_eq!(json["notify_url"], "https://example.ci/notify");
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let a = new_transaction_id();
        let b = new_transaction_id();
        assert!(a.starts_with("RD"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_config_defaults_currency() {
        let config: CinetPayConfig =
            serde_json::from_str(r#"{"api_key":"k","site_id":"s"}"#).unwrap();
        assert_eq!(config.currency, "XOF");
        assert!(config.return_url.is_none());
    }
}
