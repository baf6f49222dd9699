// DANS : src/notify/mod.rs

pub mod email;
pub mod sound;

use crate::config::Config;
use tracing::{error, warn};

/// La décision d'alerter appartient au Watcher ; la livraison est un appel
/// externe "fire-and-forget" dont l'échec est loggué, jamais retenté,
/// jamais propagé.
pub trait Notifier: Send + Sync {
    fn notify(&self);
    fn alert_sound(&self);
}

/// Implémentation réelle : email SMTP + signal sonore local.
pub struct AlertChannel {
    email: Option<email::EmailSettings>,
    sound_path: String,
}

impl AlertChannel {
    pub fn from_config(config: &Config) -> Self {
        let email = email::EmailSettings::from_config(config);
        if email.is_none() {
            warn!("[Notify] Identifiants email absents, les alertes resteront locales.");
        }
        Self {
            email,
            sound_path: config.alert_sound_path.clone(),
        }
    }
}

impl Notifier for AlertChannel {
    fn notify(&self) {
        let Some(settings) = self.email.clone() else {
            error!("[Notify] Alerte demandée mais identifiants email non configurés.");
            return;
        };
        // L'envoi SMTP est bloquant : on le décharge sans attendre le résultat.
        tokio::task::spawn_blocking(move || {
            if let Err(error) = email::send_notification(&settings) {
                error!(error = ?error, "[Notify] Échec d'envoi de l'email d'alerte.");
            }
        });
    }

    fn alert_sound(&self) {
        sound::play(&self.sound_path);
    }
}
