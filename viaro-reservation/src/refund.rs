use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::RefundStatus;

/// One row of the graduated refund table: cancelling at least
/// `min_hours_before` departure earns `percentage` back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundTier {
    pub min_hours_before: u32,
    pub percentage: u8,
}

/// Graduated refund rules, carried in configuration so operators can tune
/// them without a deploy. Tier order does not matter; the most generous
/// qualifying tier wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundPolicy {
    #[serde(default = "default_tiers")]
    pub tiers: Vec<RefundTier>,
    #[serde(default = "default_processing_days")]
    pub processing_days: u32,
}

fn default_tiers() -> Vec<RefundTier> {
    vec![
        RefundTier {
            min_hours_before: 24,
            percentage: 90,
        },
        RefundTier {
            min_hours_before: 12,
            percentage: 75,
        },
        RefundTier {
            min_hours_before: 6,
            percentage: 50,
        },
        RefundTier {
            min_hours_before: 2,
            percentage: 25,
        },
    ]
}

fn default_processing_days() -> u32 {
    5
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            processing_days: default_processing_days(),
        }
    }
}

/// The refund decision for one cancellation, ready to be copied onto the
/// booking's cancellation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundQuote {
    pub percentage: u8,
    pub amount: i64,
    pub status: RefundStatus,
    pub estimated_refund_date: Option<DateTime<Utc>>,
}

impl RefundPolicy {
    /// Percentage refunded when cancelling `hours_before` departure.
    /// Anything under the smallest tier (including departures already in the
    /// past) refunds nothing.
    pub fn percentage_for(&self, hours_before: f64) -> u8 {
        self.tiers
            .iter()
            .filter(|tier| hours_before >= f64::from(tier.min_hours_before))
            .max_by_key(|tier| tier.min_hours_before)
            .map(|tier| tier.percentage)
            .unwrap_or(0)
    }

    /// Quote a cancellation of `final_amount` (minor units) for a trip
    /// departing at `departure`. Amounts round half-up to the nearest unit.
    pub fn quote(
        &self,
        final_amount: i64,
        departure: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RefundQuote {
        let hours_before = (departure - now).num_seconds() as f64 / 3600.0;
        let percentage = self.percentage_for(hours_before);
        let amount = (final_amount * i64::from(percentage) + 50) / 100;

        if amount > 0 {
            RefundQuote {
                percentage,
                amount,
                status: RefundStatus::Processing,
                estimated_refund_date: Some(now + Duration::days(i64::from(self.processing_days))),
            }
        } else {
            RefundQuote {
                percentage,
                amount: 0,
                status: RefundStatus::NoRefund,
                estimated_refund_date: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote_at(hours: i64, amount: i64) -> RefundQuote {
        let now = Utc::now();
        RefundPolicy::default().quote(amount, now + Duration::hours(hours), now)
    }

    #[test]
    fn test_default_tiers() {
        let policy = RefundPolicy::default();
        assert_eq!(policy.percentage_for(30.0), 90);
        assert_eq!(policy.percentage_for(24.0), 90);
        assert_eq!(policy.percentage_for(23.9), 75);
        assert_eq!(policy.percentage_for(12.0), 75);
        assert_eq!(policy.percentage_for(7.5), 50);
        assert_eq!(policy.percentage_for(2.0), 25);
        assert_eq!(policy.percentage_for(1.9), 0);
        assert_eq!(policy.percentage_for(-3.0), 0);
    }

    #[test]
    fn test_quote_thirty_hours_out() {
        let quote = quote_at(30, 1000);
        assert_eq!(quote.percentage, 90);
        assert_eq!(quote.amount, 900);
        assert_eq!(quote.status, RefundStatus::Processing);
        assert!(quote.estimated_refund_date.is_some());
    }

    #[test]
    fn test_quote_last_minute_is_no_refund() {
        let quote = quote_at(1, 1000);
        assert_eq!(quote.percentage, 0);
        assert_eq!(quote.amount, 0);
        assert_eq!(quote.status, RefundStatus::NoRefund);
        assert!(quote.estimated_refund_date.is_none());
    }

    #[test]
    fn test_rounding_half_up() {
        // 333 * 25% = 83.25 -> 83; 335 * 25% = 83.75 -> 84.
        assert_eq!(quote_at(3, 333).amount, 83);
        assert_eq!(quote_at(3, 335).amount, 84);
    }

    #[test]
    fn test_refund_never_exceeds_paid_amount_and_grows_with_notice() {
        let amounts: Vec<i64> = [1, 2, 3, 7, 13, 30].iter().map(|h| quote_at(*h, 777).amount).collect();
        for window in amounts.windows(2) {
            assert!(window[0] <= window[1]);
        }
        assert!(amounts.iter().all(|a| *a <= 777));
    }

    #[test]
    fn test_custom_tier_table_is_respected() {
        let policy = RefundPolicy {
            tiers: vec![RefundTier {
                min_hours_before: 48,
                percentage: 100,
            }],
            processing_days: 2,
        };
        assert_eq!(policy.percentage_for(72.0), 100);
        assert_eq!(policy.percentage_for(24.0), 0);
    }

    #[test]
    fn test_zero_amount_quotes_no_refund_even_in_top_tier() {
        let quote = quote_at(48, 0);
        assert_eq!(quote.percentage, 90);
        assert_eq!(quote.amount, 0);
        assert_eq!(quote.status, RefundStatus::NoRefund);
    }
}
