// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outgoing e-mail (password reset links).

use crate::config::SmtpConfig;
use crate::error::AppError;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};

/// Sends transactional e-mail over SMTP.
///
/// Without SMTP settings the service only logs what it would have sent,
/// which is what local development and tests use.
#[derive(Clone)]
pub struct EmailService {
    transport: Option<(SmtpTransport, String)>,
}

impl EmailService {
    pub fn new(config: Option<&SmtpConfig>) -> Result<Self, AppError> {
        let Some(config) = config else {
            tracing::info!("SMTP not configured, e-mails will be logged only");
            return Ok(Self::new_mock());
        };

        let transport = if config.username.is_empty() || config.password.is_empty() {
            tracing::info!(
                smtp_host = %config.host,
                smtp_port = config.port,
                "SMTP credentials not configured, using unauthenticated connection"
            );
            SmtpTransport::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        } else {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            SmtpTransport::relay(&config.host)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("SMTP relay setup: {}", e)))?
                .port(config.port)
                .credentials(creds)
                .build()
        };

        tracing::info!(
            smtp_host = %config.host,
            from = %config.from_address,
            "Email service initialized"
        );

        Ok(Self {
            transport: Some((transport, config.from_address.clone())),
        })
    }

    /// Service that never opens an SMTP connection.
    pub fn new_mock() -> Self {
        Self { transport: None }
    }

    /// Send the password reset link to `to`.
    pub async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), AppError> {
        let Some((transport, from)) = &self.transport else {
            tracing::info!(to, "Mock email: password reset link generated (not sent)");
            return Ok(());
        };

        let body = format!(
            "Bonjour,\n\n\
             Une réinitialisation de votre mot de passe a été demandée.\n\
             Ouvrez ce lien pour choisir un nouveau mot de passe (valable 1 heure) :\n\n\
             {}\n\n\
             Si vous n'êtes pas à l'origine de cette demande, ignorez ce message.\n",
            reset_url
        );

        let message = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Bad from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::BadRequest(format!("Invalid e-mail address: {}", e)))?)
            .subject("Réinitialisation de votre mot de passe")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build e-mail: {}", e)))?;

        // SmtpTransport is blocking
        let transport = transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Mail task failed: {}", e)))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("SMTP send failed: {}", e)))?;

        tracing::info!(to, "Password reset e-mail sent");
        Ok(())
    }
}
