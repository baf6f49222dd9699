// DANS : src/config.rs

use anyhow::{Result, bail};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::str::FromStr;

/// Toute la configuration du processus, chargée une seule fois au démarrage
/// et immuable ensuite. Chaque champ correspond à une variable d'environnement
/// en majuscules (ex: `solana_rpc_url` <- `SOLANA_RPC_URL`).
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Endpoint RPC utilisé pour lister l'historique du compte.
    pub solana_rpc_url: String,

    /// Endpoint RPC dédié à la récupération des détails de transaction
    /// (un endpoint Helius chez nous). À défaut, on réutilise `solana_rpc_url`.
    pub fetch_rpc_url: Option<String>,

    /// Adresse base58 du compte surveillé.
    pub tracked_account: String,

    /// Intervalle entre deux cycles de polling, en secondes.
    #[serde(default = "default_check_frequency_secs")]
    pub check_frequency_secs: u64,

    /// Nombre de signatures demandées à chaque listing.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Plafond imposé à `history_limit` par le service amont.
    #[serde(default = "default_max_history_limit")]
    pub max_history_limit: usize,

    /// Curseur optionnel : ne lister que les signatures antérieures à celle-ci.
    pub before_signature: Option<String>,

    /// Taille du pool de workers pour la récupération des détails.
    #[serde(default = "default_fetch_workers")]
    pub fetch_workers: usize,

    /// Termes recherchés dans les log messages, dans l'ordre de priorité.
    #[serde(default = "default_log_search_terms")]
    pub log_search_terms: Vec<String>,

    /// Signatures d'appoint, ajoutées au listing live quand
    /// `include_seed_signatures` est actif (utile pour valider la chaîne
    /// de détection sur des transactions connues).
    #[serde(default)]
    pub seed_signatures: Vec<String>,

    #[serde(default)]
    pub include_seed_signatures: bool,

    /// Où écrire le rapport JSON du cycle (détails + correspondances).
    /// `None` désactive l'écriture.
    #[serde(default = "default_report_path")]
    pub report_path: Option<PathBuf>,

    /// Budget de tentatives par signature pour la récupération des détails.
    #[serde(default = "default_fetch_retry_attempts")]
    pub fetch_retry_attempts: u32,

    /// Délai fixe entre deux tentatives sur une même signature, en ms.
    #[serde(default = "default_fetch_retry_delay_ms")]
    pub fetch_retry_delay_ms: u64,

    /// Tentatives pour l'appel de listing (erreurs réseau transitoires).
    #[serde(default = "default_list_retry_attempts")]
    pub list_retry_attempts: u32,

    #[serde(default = "default_list_retry_delay_ms")]
    pub list_retry_delay_ms: u64,

    // --- Notification email ---
    pub sender_email: Option<String>,
    pub email_password: Option<String>,
    pub receiver_email: Option<String>,

    #[serde(default = "default_email_subject")]
    pub email_subject: String,

    #[serde(default = "default_email_body")]
    pub email_body: String,

    /// Fichier audio joué via `paplay` quand une alerte se déclenche.
    #[serde(default = "default_alert_sound_path")]
    pub alert_sound_path: String,
}

fn default_check_frequency_secs() -> u64 {
    600
}
fn default_history_limit() -> usize {
    10
}
fn default_max_history_limit() -> usize {
    50
}
fn default_fetch_workers() -> usize {
    5
}
fn default_log_search_terms() -> Vec<String> {
    vec!["FillPerpOrder".to_string(), "RevertFill".to_string()]
}
fn default_report_path() -> Option<PathBuf> {
    Some(PathBuf::from("transaction_details.json"))
}
fn default_fetch_retry_attempts() -> u32 {
    3
}
fn default_fetch_retry_delay_ms() -> u64 {
    1000
}
fn default_list_retry_attempts() -> u32 {
    3
}
fn default_list_retry_delay_ms() -> u64 {
    500
}
fn default_email_subject() -> String {
    "New Transaction Detected".to_string()
}
fn default_email_body() -> String {
    "A new transaction has been detected for the tracked account.".to_string()
}
fn default_alert_sound_path() -> String {
    "/usr/share/sounds/freedesktop/stereo/complete.oga".to_string()
}

impl Config {
    /// Charge `.env` puis l'environnement, et valide le tout.
    /// C'est le seul chemin d'erreur fatal du processus.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Valide les champs une bonne fois pour toutes. Après ce point, le reste
    /// du code peut supposer une configuration cohérente.
    pub fn validate(&mut self) -> Result<()> {
        if Pubkey::from_str(&self.tracked_account).is_err() {
            bail!(
                "TRACKED_ACCOUNT n'est pas une clé publique valide: {}",
                self.tracked_account
            );
        }
        if self.check_frequency_secs == 0 {
            bail!("CHECK_FREQUENCY_SECS doit être >= 1");
        }
        if self.fetch_workers == 0 {
            bail!("FETCH_WORKERS doit être >= 1");
        }
        if self.fetch_retry_attempts == 0 || self.list_retry_attempts == 0 {
            bail!("les budgets de tentatives doivent être >= 1");
        }
        if self.history_limit == 0 {
            bail!("HISTORY_LIMIT doit être >= 1");
        }
        // Le service amont plafonne la taille de page : on respecte la borne ici,
        // une seule fois, plutôt qu'à chaque appel.
        if self.history_limit > self.max_history_limit {
            self.history_limit = self.max_history_limit;
        }
        Ok(())
    }

    /// Le compte surveillé, déjà validé par `validate`.
    pub fn tracked_pubkey(&self) -> Pubkey {
        Pubkey::from_str(&self.tracked_account).expect("validé au démarrage")
    }

    /// Endpoint à utiliser pour les détails de transaction.
    pub fn detail_rpc_url(&self) -> &str {
        self.fetch_rpc_url.as_deref().unwrap_or(&self.solana_rpc_url)
    }
}
