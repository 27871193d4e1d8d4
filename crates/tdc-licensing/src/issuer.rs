//! License Issuance
//!
//! One issuance is: generate a code, append its record, email the buyer, then
//! flag the record if the email went out.

use std::sync::Arc;

use serde::Serialize;

use crate::code::LicenseCodec;
use crate::email::LicenseMailer;
use crate::error::{LicensingError, Result};
use crate::record::{LicenseRecord, MANUAL_ORDER_ID};
use crate::store::LicenseStore;
use crate::webhook::{SaleEvent, DEFAULT_BUYER_NAME};

/// Outcome of one issuance
#[derive(Clone, Debug, Serialize)]
pub struct Issuance {
    pub license_key: String,
    pub email_sent: bool,

    /// `false` when the record could not be written. The buyer still got the
    /// email, so the key exists only in their inbox and the logs.
    pub persisted: bool,
}

/// Issues licenses for sales and admin requests
pub struct LicenseIssuer {
    codec: LicenseCodec,
    store: Arc<dyn LicenseStore>,
    mailer: Arc<dyn LicenseMailer>,
    product_name: String,
}

impl LicenseIssuer {
    pub fn new(
        codec: LicenseCodec,
        store: Arc<dyn LicenseStore>,
        mailer: Arc<dyn LicenseMailer>,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            store,
            mailer,
            product_name: product_name.into(),
        }
    }

    pub const fn codec(&self) -> &LicenseCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn LicenseStore> {
        &self.store
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Issue a license for a completed sale
    pub async fn issue_for_sale(&self, sale: SaleEvent) -> Issuance {
        tracing::info!(
            email = %sale.buyer_email,
            order_id = %sale.order_id,
            "Processing sale"
        );

        let code = self.codec.generate();
        let record = LicenseRecord::new(
            &code,
            sale.buyer_email,
            sale.buyer_name,
            sale.order_id,
            sale.sale_id,
            sale.product_name,
        );

        self.deliver(record).await
    }

    /// Issue a license by hand, outside any sale
    pub async fn issue_manual(&self, email: &str, name: Option<&str>) -> Result<Issuance> {
        let email = email.trim();
        if email.is_empty() {
            return Err(LicensingError::InvalidRequest("email is required".into()));
        }
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_BUYER_NAME);

        let code = self.codec.generate();
        let mut record = LicenseRecord::new(
            &code,
            email,
            name,
            MANUAL_ORDER_ID,
            MANUAL_ORDER_ID,
            self.product_name.as_str(),
        );
        record.manual = true;

        tracing::info!(email = %email, license_key = %code, "Manual license requested");
        Ok(self.deliver(record).await)
    }

    async fn deliver(&self, record: LicenseRecord) -> Issuance {
        let license_key = record.license_key.clone();
        tracing::info!(license_key = %license_key, "License generated");

        let persisted = match self.store.append(&record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    license_key = %license_key,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to save license"
                );
                false
            }
        };

        let email_sent = self
            .mailer
            .send_license_email(&record.buyer_email, &record.buyer_name, &license_key)
            .await;

        if email_sent {
            tracing::info!(license_key = %license_key, email = %record.buyer_email, "License delivered");
            if persisted {
                if let Err(e) = self.store.mark_email_sent(&license_key, true).await {
                    tracing::error!(license_key = %license_key, error = %e, "Failed to flag email as sent");
                }
            }
        } else {
            tracing::error!(license_key = %license_key, email = %record.buyer_email, "License email not delivered");
        }

        Issuance {
            license_key,
            email_sent,
            persisted,
        }
    }
}
