//! # tdc-licensing
//!
//! License issuance for Tu Dinero Claro.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Sale ping   │────▶│ LicenseCodec │────▶│ LicenseStore │────▶│ LicenseMailer│
//! │  (Gumroad)   │     │  generate()  │     │   append()   │     │  (Resend)    │
//! └──────────────┘     └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The codec is the only piece with a contract outside this process: the
//! browser app checks the same `PREFIX-YEAR-BODY` format and check character
//! offline, so [`checksum`] must not change.
//!
//! ## Usage
//!
//! ```rust
//! use tdc_licensing::LicenseCodec;
//!
//! let codec = LicenseCodec::default();
//! let code = codec.generate();
//! assert!(codec.verify(code.as_str()));
//! assert!(codec.verify("TDC-2025-AAAAA"));
//! assert!(!codec.verify("TDC-2025-AAAAB"));
//! ```

mod code;
mod config;
mod email;
mod error;
mod issuer;
mod record;
mod store;
mod webhook;

pub use code::{
    checksum, CodeFormat, LicenseCode, LicenseCodec, ALPHABET, BODY_LEN, DEFAULT_PREFIX,
    DEFAULT_YEAR, PAYLOAD_LEN,
};
pub use config::{EmailConfig, LicensingConfig};
pub use email::{render_html, render_text, LicenseMailer, OutboundEmail, ResendMailer};
pub use error::{CodeError, LicensingError, Result};
pub use issuer::{Issuance, LicenseIssuer};
pub use record::{IssuanceStats, LicenseRecord, MANUAL_ORDER_ID};
pub use store::{JsonFileLicenseStore, LicenseStore, MemoryLicenseStore};
pub use webhook::{SaleEvent, SalePayload, DEFAULT_BUYER_NAME, UNKNOWN_ORDER_ID};
