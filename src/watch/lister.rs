// DANS : src/watch/lister.rs

use crate::rpc::{ResilientRpcClient, UpstreamError};
use async_trait::async_trait;
use chrono::DateTime;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::info;

/// Une ligne du listing d'historique : la signature, son statut de
/// confirmation et l'horodatage du bloc. Le service amont renvoie les lignes
/// de la plus récente à la plus ancienne ; cet ordre est porteur de sens
/// (la première ligne est "la dernière transaction") et n'est jamais
/// re-trié ici.
#[derive(Debug, Clone)]
pub struct SignatureRecord {
    pub signature: String,
    pub confirmation_status: Option<String>,
    pub block_time: Option<i64>,
}

impl From<RpcConfirmedTransactionStatusWithSignature> for SignatureRecord {
    fn from(row: RpcConfirmedTransactionStatusWithSignature) -> Self {
        Self {
            signature: row.signature,
            confirmation_status: row.confirmation_status.map(|status| format!("{status:?}")),
            block_time: row.block_time,
        }
    }
}

/// La frontière avec le service de listing. Le Watcher ne connaît que ce
/// contrat, ce qui permet de le tester sans réseau.
#[async_trait]
pub trait SignatureSource: Send + Sync {
    async fn recent_signatures(
        &self,
        account: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<SignatureRecord>, UpstreamError>;
}

#[async_trait]
impl SignatureSource for ResilientRpcClient {
    async fn recent_signatures(
        &self,
        account: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<SignatureRecord>, UpstreamError> {
        let rows = self
            .get_signatures_for_account(account, before, limit)
            .await?;
        Ok(rows.into_iter().map(SignatureRecord::from).collect())
    }
}

/// Echo lisible du listing, une ligne par signature, avec le block time
/// rendu en datetime UTC.
pub fn log_listing(rows: &[SignatureRecord]) {
    for (idx, row) in rows.iter().enumerate() {
        let rendered_time = row
            .block_time
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        info!(
            rank = idx + 1,
            signature = %row.signature,
            status = ?row.confirmation_status,
            block_time = %rendered_time,
            "[Lister] Signature observée."
        );
    }
}
