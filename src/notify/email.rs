// DANS : src/notify/email.rs

use crate::config::Config;
use anyhow::{Context, Result};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

const SMTP_SERVER: &str = "smtp.gmail.com";

/// Tout ce qu'il faut pour envoyer l'alerte, cloné vers la tâche bloquante.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub sender: String,
    pub password: String,
    pub receiver: String,
    pub subject: String,
    pub body: String,
}

impl EmailSettings {
    /// `None` dès qu'un identifiant manque : on logge et on n'envoie rien,
    /// le processus continue sans email.
    pub fn from_config(config: &Config) -> Option<Self> {
        Some(Self {
            sender: config.sender_email.clone()?,
            password: config.email_password.clone()?,
            receiver: config.receiver_email.clone()?,
            subject: config.email_subject.clone(),
            body: config.email_body.clone(),
        })
    }
}

/// Envoi SMTP en TLS implicite (port 465). Un seul essai par alerte.
pub fn send_notification(settings: &EmailSettings) -> Result<()> {
    let message = Message::builder()
        .from(
            settings
                .sender
                .parse()
                .context("adresse expéditeur invalide")?,
        )
        .to(settings
            .receiver
            .parse()
            .context("adresse destinataire invalide")?)
        .subject(settings.subject.clone())
        .body(settings.body.clone())
        .context("construction du message impossible")?;

    let credentials = Credentials::new(settings.sender.clone(), settings.password.clone());
    let mailer = SmtpTransport::relay(SMTP_SERVER)
        .context("configuration du transport SMTP impossible")?
        .credentials(credentials)
        .build();

    mailer.send(&message).context("envoi SMTP refusé")?;
    info!("[Notify] Email d'alerte envoyé avec succès.");
    Ok(())
}
