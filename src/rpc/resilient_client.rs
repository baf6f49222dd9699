// DANS : src/rpc/resilient_client.rs

use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_client::GetConfirmedSignaturesForAddress2Config,
    rpc_request::RpcRequest,
    rpc_response::RpcConfirmedTransactionStatusWithSignature,
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Politique de ré-essai explicite : nombre maximal de tentatives et délai
/// fixe entre deux tentatives. Partagée entre la couche RPC (listing) et le
/// pool de workers (détails).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Les deux façons dont le service amont peut nous décevoir.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Erreur réseau transitoire : l'appel peut être retenté tel quel.
    #[error("service RPC injoignable: {0}")]
    Unavailable(ClientError),

    /// Réponse malformée ou inattendue : retenter ne servira à rien,
    /// l'appelant doit traiter l'appel comme un résultat vide.
    #[error("réponse RPC inattendue: {0}")]
    Protocol(String),
}

impl UpstreamError {
    /// Sépare les erreurs de transport (retentables) des erreurs de protocole.
    pub fn classify(error: ClientError) -> Self {
        if Self::is_transient(&error) {
            Self::Unavailable(error)
        } else {
            Self::Protocol(error.to_string())
        }
    }

    fn is_transient(error: &ClientError) -> bool {
        matches!(
            error.kind,
            ClientErrorKind::Reqwest(_) | ClientErrorKind::Io(_)
        )
    }
}

/// Un "wrapper" autour du RpcClient de Solana qui ajoute une logique de
/// ré-essai automatique pour les appels qui échouent à cause d'erreurs
/// réseau temporaires. Le client HTTP étant sans état, retenter en place
/// équivaut à la reconnexion que ferait un client persistant.
#[derive(Clone)]
pub struct ResilientRpcClient {
    client: Arc<RpcClient>,
    retry: RetryPolicy,
}

impl ResilientRpcClient {
    /// Construit un nouveau client RPC résilient.
    pub fn new(rpc_url: String, retry: RetryPolicy) -> Self {
        Self {
            client: Arc::new(RpcClient::new(rpc_url)),
            retry,
        }
    }

    /// Liste les signatures les plus récentes du compte, de la plus neuve à
    /// la plus ancienne. L'ordre renvoyé par le service est préservé tel quel.
    /// Les erreurs transitoires sont retentées selon la `RetryPolicy`.
    pub async fn get_signatures_for_account(
        &self,
        account: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<RpcConfirmedTransactionStatusWithSignature>, UpstreamError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let config = GetConfirmedSignaturesForAddress2Config {
                before,
                until: None,
                limit: Some(limit),
                commitment: Some(CommitmentConfig::confirmed()),
            };
            match self
                .client
                .get_signatures_for_address_with_config(account, config)
                .await
            {
                Ok(rows) => return Ok(rows),
                Err(error) => {
                    let failure = UpstreamError::classify(error);
                    match failure {
                        UpstreamError::Unavailable(_) if attempt < self.retry.max_attempts => {
                            warn!(
                                account = %account,
                                attempt,
                                error = %failure,
                                "[Rpc] Listing indisponible, nouvelle tentative après délai."
                            );
                            sleep(self.retry.delay()).await;
                        }
                        other => return Err(other),
                    }
                }
            }
        }
    }

    /// Récupère les détails d'une transaction, en une seule tentative : le
    /// budget de ré-essai par signature appartient au pool de workers, pas
    /// au client. Une transaction introuvable (pas encore finalisée, ou
    /// purgée) donne `Ok(None)`.
    pub async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<EncodedConfirmedTransactionWithStatusMeta>, UpstreamError> {
        let params = serde_json::json!([
            signature.to_string(),
            {
                "encoding": "json",
                "commitment": "confirmed",
                "maxSupportedTransactionVersion": 0
            }
        ]);
        self.client
            .send::<Option<EncodedConfirmedTransactionWithStatusMeta>>(
                RpcRequest::GetTransaction,
                params,
            )
            .await
            .map_err(UpstreamError::classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn classify_io_errors_as_unavailable() {
        let error = ClientError::new_with_request(
            ClientErrorKind::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            RpcRequest::GetSignaturesForAddress,
        );
        assert!(matches!(
            UpstreamError::classify(error),
            UpstreamError::Unavailable(_)
        ));
    }

    #[test]
    fn classify_custom_errors_as_protocol() {
        let error = ClientError::new_with_request(
            ClientErrorKind::Custom("payload tronqué".to_string()),
            RpcRequest::GetTransaction,
        );
        assert!(matches!(
            UpstreamError::classify(error),
            UpstreamError::Protocol(_)
        ));
    }

    #[test]
    fn retry_policy_exposes_fixed_delay() {
        let policy = RetryPolicy::new(3, 250);
        assert_eq!(policy.delay(), Duration::from_millis(250));
        assert_eq!(policy.max_attempts, 3);
    }
}
