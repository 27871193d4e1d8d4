//! Gumroad Sale Webhook
//!
//! Turns a sale ping into the buyer details needed to issue a license.
//! Gumroad posts form-encoded fields; JSON with the same field names is
//! accepted too.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{LicensingError, Result};

/// Buyer name used when the sale carries none
pub const DEFAULT_BUYER_NAME: &str = "Cliente";

/// Order id used when the sale carries none
pub const UNKNOWN_ORDER_ID: &str = "N/A";

/// Raw sale notification fields we care about. Everything else is ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SalePayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sale_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
}

/// Ids arrive as strings in form posts but may be bare numbers in JSON.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_owned()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, deserializer: D2) -> std::result::Result<Self::Value, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// A sale with every field resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleEvent {
    pub buyer_email: String,
    pub buyer_name: String,
    pub order_id: String,
    pub sale_id: String,
    pub product_name: String,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SaleEvent {
    /// Resolve defaults. A sale without a buyer email is rejected.
    pub fn from_payload(payload: SalePayload, default_product: &str) -> Result<Self> {
        let buyer_email = present(payload.email)
            .ok_or_else(|| LicensingError::WebhookParse("sale has no buyer email".into()))?;
        let order_id = present(payload.order_id).unwrap_or_else(|| UNKNOWN_ORDER_ID.into());

        Ok(Self {
            buyer_email,
            buyer_name: present(payload.full_name).unwrap_or_else(|| DEFAULT_BUYER_NAME.into()),
            sale_id: present(payload.sale_id).unwrap_or_else(|| order_id.clone()),
            order_id,
            product_name: present(payload.product_name)
                .unwrap_or_else(|| default_product.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let payload = SalePayload {
            email: Some("buyer@example.com".into()),
            ..Default::default()
        };
        let sale = SaleEvent::from_payload(payload, "Tu Dinero Claro").unwrap();
        assert_eq!(sale.buyer_name, "Cliente");
        assert_eq!(sale.order_id, "N/A");
        assert_eq!(sale.sale_id, "N/A");
        assert_eq!(sale.product_name, "Tu Dinero Claro");
    }

    #[test]
    fn test_sale_id_falls_back_to_order_id() {
        let payload = SalePayload {
            email: Some("buyer@example.com".into()),
            full_name: Some("Ana López".into()),
            order_id: Some("1234".into()),
            ..Default::default()
        };
        let sale = SaleEvent::from_payload(payload, "Tu Dinero Claro").unwrap();
        assert_eq!(sale.buyer_name, "Ana López");
        assert_eq!(sale.sale_id, "1234");
    }

    #[test]
    fn test_missing_or_blank_email_rejected() {
        let err = SaleEvent::from_payload(SalePayload::default(), "x").unwrap_err();
        assert!(matches!(err, LicensingError::WebhookParse(_)));

        let blank = SalePayload {
            email: Some("   ".into()),
            ..Default::default()
        };
        assert!(SaleEvent::from_payload(blank, "x").is_err());
    }

    #[test]
    fn test_numeric_ids_accepted() {
        let payload: SalePayload = serde_json::from_str(
            r#"{"email": "buyer@example.com", "order_id": 42, "sale_id": null}"#,
        )
        .unwrap();
        assert_eq!(payload.order_id.as_deref(), Some("42"));
        assert_eq!(payload.sale_id, None);

        let sale = SaleEvent::from_payload(payload, "Tu Dinero Claro").unwrap();
        assert_eq!(sale.order_id, "42");
        assert_eq!(sale.sale_id, "42");
    }

    #[test]
    fn test_non_scalar_id_rejected() {
        let parsed = serde_json::from_str::<SalePayload>(
            r#"{"email": "buyer@example.com", "order_id": {"id": 42}}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_ignores_unknown_fields() {
        let payload: SalePayload = serde_json::from_str(
            r#"{"email": "buyer@example.com", "price": "1900", "test": "true"}"#,
        )
        .unwrap();
        assert_eq!(payload.email.as_deref(), Some("buyer@example.com"));
    }
}
