use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReservationError;

/// Outcome reported by the external payment provider. Serialized spellings
/// match the upstream gateway payloads, so no case rewriting here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentState {
    Completed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Debit Card")]
    DebitCard,
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "Net Banking")]
    NetBanking,
    #[serde(rename = "Wallet")]
    Wallet,
}

/// A settled (or attempted) payment as reported from outside. Amounts are in
/// minor currency units. The engine never charges anything itself; it only
/// checks `state` and trusts the arithmetic after validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub total_amount: i64,
    pub discount: i64,
    pub final_amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentState,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentState::Completed
    }

    /// Amount arithmetic must be internally consistent before any booking is
    /// written; a refund later multiplies into `final_amount`.
    pub fn validate(&self) -> Result<(), ReservationError> {
        if self.total_amount < 0 {
            return Err(ReservationError::Validation(
                "total_amount must not be negative".to_string(),
            ));
        }
        if self.discount < 0 || self.discount > self.total_amount {
            return Err(ReservationError::Validation(
                "discount must be between 0 and total_amount".to_string(),
            ));
        }
        if self.final_amount != self.total_amount - self.discount {
            return Err(ReservationError::Validation(
                "final_amount must equal total_amount - discount".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: i64, discount: i64, final_amount: i64) -> PaymentRecord {
        PaymentRecord {
            total_amount: total,
            discount,
            final_amount,
            method: PaymentMethod::Upi,
            status: PaymentState::Completed,
            transaction_id: Some("txn_901".to_string()),
            paid_at: Some(Utc::now()),
        }
    }

    #[test]
    fn consistent_record_passes() {
        assert!(record(1200, 200, 1000).validate().is_ok());
    }

    #[test]
    fn inconsistent_arithmetic_is_rejected() {
        assert!(record(1200, 200, 1100).validate().is_err());
        assert!(record(1200, -5, 1205).validate().is_err());
        assert!(record(-1, 0, -1).validate().is_err());
    }

    #[test]
    fn wire_spellings_survive_round_trip() {
        let json = serde_json::to_value(record(500, 0, 500)).unwrap();
        assert_eq!(json["method"], "UPI");
        assert_eq!(json["status"], "Completed");
    }
}
