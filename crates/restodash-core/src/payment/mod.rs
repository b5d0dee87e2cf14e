//! Online payment for orders.
//!
//! The dashboard hands the customer off to a hosted checkout page and later
//! learns the outcome either from the embedding UI's callback or by polling
//! the gateway with the transaction id.

pub mod cinetpay;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;
use crate::validation::ValidationError;

pub use cinetpay::{CinetPayClient, CinetPayConfig, CINETPAY_API_URL};

/// Currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "XOF";

/// XOF amounts must be a multiple of this.
const XOF_STEP: i64 = 5;

const MAX_DESCRIPTION_LENGTH: usize = 120;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Payment rejected by gateway ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Payment {0} has already been settled")]
    AlreadySettled(String),
}

impl PaymentError {
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::Validation(e) => e.to_string(),
            PaymentError::Api(_) => "Payment service unavailable, try again".to_string(),
            PaymentError::Rejected { message, .. } => format!("Payment refused: {}", message),
            PaymentError::AlreadySettled(_) => "This payment is already closed".to_string(),
        }
    }
}

/// A checkout to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    amount: i64,
    currency: String,
    description: String,
}

impl PaymentRequest {
    pub fn new(amount: i64, currency: &str, description: &str) -> Result<Self, ValidationError> {
        let currency = currency.trim().to_uppercase();
        if amount <= 0 {
            return Err(ValidationError::InvalidAmount(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if currency == DEFAULT_CURRENCY && amount % XOF_STEP != 0 {
            return Err(ValidationError::InvalidAmount(format!(
                "{} amounts must be a multiple of {}, got {}",
                DEFAULT_CURRENCY, XOF_STEP, amount
            )));
        }
        let description = description.trim();
        let description = if description.is_empty() {
            "Restaurant order".to_string()
        } else {
            crate::utils::truncate_string(description, MAX_DESCRIPTION_LENGTH)
        };
        Ok(Self {
            amount,
            currency,
            description,
        })
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Outcome reported back by the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed,
    Cancelled,
}

/// A started checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub transaction_id: String,
    pub payment_url: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentSession {
    /// Record the outcome the checkout page reported. Only a pending session
    /// can be settled.
    pub fn settle(&mut self, outcome: PaymentOutcome) -> Result<PaymentStatus, PaymentError> {
        if self.status.is_final() {
            return Err(PaymentError::AlreadySettled(self.transaction_id.clone()));
        }
        self.status = match outcome {
            PaymentOutcome::Completed => PaymentStatus::Completed,
            PaymentOutcome::Cancelled => PaymentStatus::Cancelled,
        };
        Ok(self.status)
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentSession, PaymentError>;

    async fn check(&self, transaction_id: &str) -> Result<PaymentStatus, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> PaymentSession {
        PaymentSession {
            transaction_id: "RD-1".to_string(),
            payment_url: "https://checkout.cinetpay.com/payment/abc".to_string(),
            amount: 2500,
            currency: DEFAULT_CURRENCY.to_string(),
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(PaymentRequest::new(0, "XOF", "x").is_err());
        assert!(PaymentRequest::new(-5, "XOF", "x").is_err());
        assert!(PaymentRequest::new(1002, "xof", "x").is_err());
        assert!(PaymentRequest::new(1002, "USD", "x").is_ok());

        let req = PaymentRequest::new(1500, " xof ", "  ").unwrap();
        assert_eq!(req.currency(), "XOF");
        assert_eq!(req.amount(), 1500);
        assert_eq!(req.description(), "Restaurant order");
    }

    #[test]
    fn test_long_description_is_truncated() {
        let req = PaymentRequest::new(100, "XOF", &"a".repeat(300)).unwrap();
        assert!(req.description().chars().count() <= MAX_DESCRIPTION_LENGTH);
    }

    #[test]
    fn test_settle_once() {
        let mut s = session();
        assert_eq!(s.settle(PaymentOutcome::Completed).unwrap(), PaymentStatus::Completed);
        assert!(matches!(
            s.settle(PaymentOutcome::Cancelled),
            Err(PaymentError::AlreadySettled(_))
        ));
        assert_eq!(s.status, PaymentStatus::Completed);
    }

    #[test]
    fn test_cancelled_session_cannot_complete() {
        let mut s = session();
        s.settle(PaymentOutcome::Cancelled).unwrap();
        assert!(s.settle(PaymentOutcome::Completed).is_err());
    }
}
