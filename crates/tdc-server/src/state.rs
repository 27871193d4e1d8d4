//! Application State

use std::sync::Arc;

use tdc_licensing::{LicenseIssuer, LicenseStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Generate, persist, email
    pub issuer: Arc<LicenseIssuer>,

    /// Same store the issuer writes to, read by the admin routes
    pub store: Arc<dyn LicenseStore>,

    /// Bearer token for `/admin` (None = unprotected)
    pub admin_token: Option<Arc<str>>,

    /// Whether outbound email has credentials
    pub email_configured: bool,
}
