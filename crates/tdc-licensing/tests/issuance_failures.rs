use std::sync::Arc;

use async_trait::async_trait;
use tdc_licensing::{
    IssuanceStats, LicenseCodec, LicenseIssuer, LicenseMailer, LicenseRecord, LicenseStore,
    LicensingError, Result, SaleEvent,
};

struct BrokenStore;

#[async_trait]
impl LicenseStore for BrokenStore {
    async fn append(&self, _record: &LicenseRecord) -> Result<()> {
        Err(LicensingError::Storage("disk full".into()))
    }

    async fn mark_email_sent(&self, _license_key: &str, _sent: bool) -> Result<bool> {
        Err(LicensingError::Storage("disk full".into()))
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>> {
        Err(LicensingError::Storage("disk full".into()))
    }
}

struct AlwaysDelivers;

#[async_trait]
impl LicenseMailer for AlwaysDelivers {
    async fn send_license_email(&self, _to: &str, _name: &str, _key: &str) -> bool {
        true
    }
}

#[tokio::test]
async fn storage_failure_still_emails_buyer() {
    let issuer = LicenseIssuer::new(
        LicenseCodec::default(),
        Arc::new(BrokenStore),
        Arc::new(AlwaysDelivers),
        "Tu Dinero Claro",
    );

    let issuance = issuer
        .issue_for_sale(SaleEvent {
            buyer_email: "buyer@example.com".into(),
            buyer_name: "Ana".into(),
            order_id: "ord_1".into(),
            sale_id: "ord_1".into(),
            product_name: "Tu Dinero Claro".into(),
        })
        .await;

    assert!(!issuance.persisted);
    assert!(issuance.email_sent);
    assert!(issuer.codec().verify(&issuance.license_key));

    let stats: Result<IssuanceStats> = issuer.store().stats(10).await;
    assert!(stats.is_err());
}
