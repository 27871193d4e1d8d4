//! License Delivery Email
//!
//! Renders the license message and submits it to a Resend-compatible
//! transactional email API.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Datelike;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::error::{LicensingError, Result};

/// Sends a license key to a buyer.
///
/// Delivery failures are reported as `false`, never as errors, so callers can
/// record the outcome and move on.
#[async_trait]
pub trait LicenseMailer: Send + Sync {
    async fn send_license_email(&self, to: &str, buyer_name: &str, license_key: &str) -> bool;
}

/// Body of a send request
#[derive(Clone, Debug, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Mailer backed by the Resend HTTP API
pub struct ResendMailer {
    client: reqwest::Client,
    config: EmailConfig,
}

impl ResendMailer {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LicensingError::Config(format!("email client: {e}")))?;

        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &EmailConfig {
        &self.config
    }

    /// Whether an API key is present
    pub const fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Assemble the full message without sending it
    pub fn compose(&self, to: &str, buyer_name: &str, license_key: &str) -> OutboundEmail {
        OutboundEmail {
            from: format!("{} <{}>", self.config.sender_name, self.config.sender_email),
            to: vec![to.to_string()],
            subject: format!("🎉 Tu licencia de {} está lista", self.config.product_name),
            html: render_html(&self.config, buyer_name, license_key),
            text: render_text(&self.config, buyer_name, license_key),
        }
    }
}

#[async_trait]
impl LicenseMailer for ResendMailer {
    async fn send_license_email(&self, to: &str, buyer_name: &str, license_key: &str) -> bool {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::error!("RESEND_API_KEY not configured, license email not sent");
            return false;
        };

        let message = self.compose(to, buyer_name, license_key);
        tracing::info!(email = %to, "Sending license email");

        let response = match self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&message)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(email = %to, error = %e, "License email request failed");
                return false;
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::info!(email = %to, "License email sent");
            true
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(email = %to, status = %status, body = %body, "License email rejected");
            false
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const FEATURES: [(&str, &str, &str); 6] = [
    ("✅", "100% Privado", "Tus datos nunca salen de tu navegador"),
    ("📊", "Análisis Completo", "Gráficos interactivos de ingresos y gastos"),
    ("📁", "Importación Fácil", "Extractos CSV/Excel de cualquier banco"),
    ("🎯", "Categorización Automática", "Reglas personalizables"),
    ("👥", "Multi-Perfil", "Hasta 3 perfiles protegidos con PIN"),
    ("💾", "Exportación", "Descarga tus análisis en Excel"),
];

const STEPS: [&str; 3] = [
    "Introduce tu licencia cuando aparezca la pantalla de activación",
    "Crea tu primer perfil con un PIN de 4 dígitos",
    "Importa tus extractos bancarios y analiza tus finanzas",
];

/// HTML body. The license key and app URL appear verbatim.
pub fn render_html(config: &EmailConfig, buyer_name: &str, license_key: &str) -> String {
    let name = escape_html(buyer_name);
    let product = escape_html(&config.product_name);
    let app_url = &config.app_url;
    let year = chrono::Utc::now().year();

    let mut steps = format!(
        "<li>Abre <strong><a href=\"{app_url}\">{app_url}</a></strong> en tu navegador</li>\n"
    );
    for step in STEPS {
        let _ = writeln!(steps, "<li>{step}</li>");
    }

    let mut features = String::new();
    for (icon, title, detail) in FEATURES {
        let _ = writeln!(
            features,
            "<div class=\"feature\">{icon} <strong>{title}</strong> - {detail}</div>"
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<style>
body {{ font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; background-color: #f5f5f5; }}
.container {{ background: white; border-radius: 12px; padding: 40px; }}
.header h1 {{ color: #7c3aed; margin: 0; font-size: 28px; }}
.license-box {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 25px; border-radius: 10px; text-align: center; margin: 30px 0; }}
.license-key {{ font-size: 24px; font-weight: bold; letter-spacing: 2px; font-family: 'Courier New', monospace; background: rgba(255,255,255,0.2); padding: 15px; border-radius: 8px; }}
.button {{ display: inline-block; background: #7c3aed; color: white; padding: 15px 40px; text-decoration: none; border-radius: 8px; font-weight: bold; }}
.footer {{ text-align: center; margin-top: 40px; color: #666; font-size: 14px; }}
</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>🎉 ¡Bienvenido a {product}!</h1>
<p>Hola {name},</p>
<p>Tu compra se ha procesado correctamente. ¡Gracias por confiar en nosotros!</p>
</div>
<div class="license-box">
<p>🔑 TU LICENCIA PERSONAL</p>
<div class="license-key">{license_key}</div>
<p>Guarda esta licencia en un lugar seguro</p>
</div>
<div style="text-align: center;"><a href="{app_url}" class="button">🚀 Acceder a la Aplicación</a></div>
<h3>📋 Instrucciones de activación:</h3>
<ol>
{steps}</ol>
<h3>✨ Características de {product}:</h3>
{features}<div class="footer">
<p><strong>¿Necesitas ayuda?</strong> Responde a este email.</p>
<p><strong>{sender}</strong><br><a href="mailto:{sender_email}">{sender_email}</a></p>
<p>© {year} {sender}. Todos los derechos reservados.</p>
</div>
</div>
</body>
</html>
"#,
        sender = escape_html(&config.sender_name),
        sender_email = config.sender_email,
    )
}

/// Plain-text fallback body
pub fn render_text(config: &EmailConfig, buyer_name: &str, license_key: &str) -> String {
    let app_url = &config.app_url;
    let year = chrono::Utc::now().year();

    let mut out = format!(
        "🎉 ¡BIENVENIDO A {product}!\n\n\
         Hola {buyer_name},\n\n\
         Tu compra se ha procesado correctamente. ¡Gracias por confiar en nosotros!\n\n\
         🔑 TU LICENCIA PERSONAL:\n{license_key}\n\n\
         Guarda esta licencia en un lugar seguro.\n\n\
         🚀 ACCEDE A LA APLICACIÓN:\n{app_url}\n\n\
         📋 INSTRUCCIONES DE ACTIVACIÓN:\n\n\
         1. Abre {app_url} en tu navegador\n",
        product = config.product_name.to_uppercase(),
    );
    for (i, step) in STEPS.iter().enumerate() {
        let _ = writeln!(out, "{}. {step}", i + 2);
    }

    out.push_str("\n✨ CARACTERÍSTICAS:\n\n");
    for (icon, title, detail) in FEATURES {
        let _ = writeln!(out, "{icon} {title} - {detail}");
    }

    let _ = write!(
        out,
        "\n¿NECESITAS AYUDA?\nResponde a este email.\n\n---\n{}\n{}\n© {year} {}\n",
        config.sender_name, config.sender_email, config.sender_name
    );
    out
}
