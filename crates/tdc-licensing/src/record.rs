//! Issuance Records

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::code::LicenseCode;

/// Order and sale id used for licenses issued by hand
pub const MANUAL_ORDER_ID: &str = "MANUAL";

/// One issued license
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub license_key: String,
    pub buyer_email: String,
    pub buyer_name: String,
    pub order_id: String,
    pub sale_id: String,
    pub product_name: String,

    /// Written as RFC 3339. Offset-less timestamps are read as UTC.
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,

    /// Whether the delivery email was accepted by the provider
    pub email_sent: bool,

    /// Issued from the admin surface rather than a sale
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub manual: bool,
}

impl LicenseRecord {
    /// A fresh record for a just-generated code, email not yet sent
    pub fn new(
        code: &LicenseCode,
        buyer_email: impl Into<String>,
        buyer_name: impl Into<String>,
        order_id: impl Into<String>,
        sale_id: impl Into<String>,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            license_key: code.to_string(),
            buyer_email: buyer_email.into(),
            buyer_name: buyer_name.into(),
            order_id: order_id.into(),
            sale_id: sale_id.into(),
            product_name: product_name.into(),
            created_at: Utc::now(),
            email_sent: false,
            manual: false,
        }
    }
}

/// Parse an RFC 3339 timestamp, or an ISO 8601 one without offset taken as UTC
/// (`2025-03-01T10:00:00.123456`).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc()))
}

fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid created_at {raw:?}")))
}

/// Summary served by the admin stats endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuanceStats {
    pub total_licenses: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub recent_licenses: Vec<LicenseRecord>,
}

impl IssuanceStats {
    /// Summarize records already ordered newest-first
    pub fn from_newest_first(records: Vec<LicenseRecord>, recent_limit: usize) -> Self {
        let total_licenses = records.len();
        let emails_sent = records.iter().filter(|r| r.email_sent).count();

        Self {
            total_licenses,
            emails_sent,
            emails_failed: total_licenses - emails_sent,
            recent_licenses: records.into_iter().take(recent_limit).collect(),
        }
    }
}

/// Sort newest-first by `created_at`; among equal timestamps the later
/// position wins.
pub(crate) fn sort_newest_first(records: &mut [LicenseRecord]) {
    records.reverse();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
