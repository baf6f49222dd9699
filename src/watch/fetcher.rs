// DANS : src/watch/fetcher.rs

use crate::monitoring::metrics;
use crate::rpc::{ResilientRpcClient, RetryPolicy, UpstreamError};
use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::signature::Signature;
use solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta;
use std::collections::{HashSet, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Le détail brut d'une transaction, tel que remis à l'extracteur. Les
/// champs structurés sont renseignés quand le payload les fournit ; `raw`
/// garde le rendu textuel complet pour l'extraction de secours.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub signature: String,
    pub slot: Option<u64>,
    pub block_time: Option<i64>,
    pub log_messages: Option<Vec<String>>,
    pub raw: String,
}

impl TransactionRecord {
    pub fn from_confirmed(
        signature: String,
        confirmed: EncodedConfirmedTransactionWithStatusMeta,
    ) -> Self {
        let raw = format!("{confirmed:?}");
        let slot = Some(confirmed.slot);
        let block_time = confirmed.block_time;
        // L'OptionSerializer du SDK se convertit proprement en Option.
        let log_messages: Option<Vec<String>> = confirmed
            .transaction
            .meta
            .and_then(|meta| meta.log_messages.into());
        Self {
            signature,
            slot,
            block_time,
            log_messages,
            raw,
        }
    }
}

/// La frontière avec le service de détails. Une seule tentative par appel :
/// le budget de ré-essai par signature appartient au pool, pas à la source.
/// Une transaction introuvable donne `Ok(None)`.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn transaction_detail(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionRecord>, UpstreamError>;
}

#[async_trait]
impl DetailSource for ResilientRpcClient {
    async fn transaction_detail(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionRecord>, UpstreamError> {
        let Some(confirmed) = self.get_transaction(signature).await? else {
            return Ok(None);
        };
        Ok(Some(TransactionRecord::from_confirmed(
            signature.to_string(),
            confirmed,
        )))
    }
}

/// Convertit un lot de signatures en détails de transaction, avec un
/// parallélisme borné et une tolérance aux échecs individuels : l'échec
/// d'une signature n'interrompt jamais le lot.
///
/// Chaque signature est mise en file exactement une fois (les doublons
/// sont filtrés avant la mise en file). Les workers vident la file jusqu'à
/// épuisement et envoient leurs résultats sur un canal dont l'accumulateur
/// est détenu ici ; la fonction ne rend la main qu'une fois tous les
/// workers joints, donc aucun enregistrement n'arrive après le retour.
pub async fn fetch_transaction_details<S>(
    source: Arc<S>,
    signatures: Vec<String>,
    workers: usize,
    retry: RetryPolicy,
) -> Vec<TransactionRecord>
where
    S: DetailSource + 'static,
{
    let mut seen = HashSet::new();
    let queue: VecDeque<String> = signatures
        .into_iter()
        .filter(|sig| seen.insert(sig.clone()))
        .collect();

    // Lot vide : rien à faire, on ne démarre aucun worker.
    if queue.is_empty() {
        return Vec::new();
    }

    info!(
        items = queue.len(),
        workers, "[Fetcher] Démarrage de l'inspection des transactions."
    );

    // Un excès de workers est légal : les surnuméraires trouveront la file
    // vide et termineront aussitôt.
    let worker_count = workers.max(1);
    let queue = Arc::new(Mutex::new(queue));
    let (records_tx, mut records_rx) = mpsc::unbounded_channel();

    let mut handles = Vec::with_capacity(worker_count);
    for worker_id in 1..=worker_count {
        let queue = Arc::clone(&queue);
        let source = Arc::clone(&source);
        let records_tx = records_tx.clone();
        handles.push(tokio::spawn(async move {
            drain_queue(worker_id, queue, source, retry, records_tx).await;
        }));
    }
    // Les workers détiennent les seuls émetteurs restants : le canal se
    // fermera quand le dernier aura terminé.
    drop(records_tx);

    let mut records = Vec::new();
    while let Some(record) = records_rx.recv().await {
        records.push(record);
    }

    // Barrière de jointure.
    for handle in handles {
        let _ = handle.await;
    }

    info!(
        fetched = records.len(),
        "[Fetcher] Inspection des transactions terminée."
    );
    records
}

/// Boucle d'un worker : dépiler, valider, récupérer avec budget de
/// tentatives, émettre. Chaque issue (succès, ré-essai, abandon) produit
/// son événement de diagnostic.
async fn drain_queue<S>(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<String>>>,
    source: Arc<S>,
    retry: RetryPolicy,
    records_tx: mpsc::UnboundedSender<TransactionRecord>,
) where
    S: DetailSource + 'static,
{
    loop {
        let next = { queue.lock().await.pop_front() };
        let Some(sig_str) = next else { break };

        let signature = match Signature::from_str(&sig_str) {
            Ok(signature) => signature,
            Err(_) => {
                // Format invalide : élément écarté sans consommer de budget.
                error!(
                    worker_id,
                    signature = %sig_str,
                    "[Fetcher] Format de signature invalide, élément ignoré."
                );
                continue;
            }
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match source.transaction_detail(&signature).await {
                Ok(Some(record)) => {
                    info!(
                        worker_id,
                        signature = %sig_str,
                        "[Fetcher] Détails de la transaction récupérés."
                    );
                    metrics::FETCH_SUCCESS.inc();
                    let _ = records_tx.send(record);
                    break;
                }
                Ok(None) => {
                    warn!(
                        worker_id,
                        signature = %sig_str,
                        "[Fetcher] Transaction introuvable ou pas encore finalisée."
                    );
                    break;
                }
                Err(UpstreamError::Protocol(message)) => {
                    // Réponse malformée : retenter ne servira à rien.
                    warn!(
                        worker_id,
                        signature = %sig_str,
                        error = %message,
                        "[Fetcher] Réponse invalide, élément abandonné."
                    );
                    break;
                }
                Err(failure) => {
                    if attempt < retry.max_attempts {
                        warn!(
                            worker_id,
                            signature = %sig_str,
                            attempt,
                            error = %failure,
                            "[Fetcher] Échec transitoire, nouvelle tentative après délai."
                        );
                        metrics::FETCH_RETRIES.inc();
                        sleep(retry.delay()).await;
                    } else {
                        error!(
                            worker_id,
                            signature = %sig_str,
                            attempts = attempt,
                            error = %failure,
                            "[Fetcher] Budget de tentatives épuisé, élément abandonné."
                        );
                        metrics::FETCH_FAILURES.inc();
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_client::{
        client_error::{ClientError, ClientErrorKind},
        rpc_request::RpcRequest,
    };
    use std::collections::HashMap;
    use std::io;

    fn transient_error() -> UpstreamError {
        UpstreamError::Unavailable(ClientError::new_with_request(
            ClientErrorKind::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout")),
            RpcRequest::GetTransaction,
        ))
    }

    fn record_for(signature: &str) -> TransactionRecord {
        TransactionRecord {
            signature: signature.to_string(),
            slot: Some(1),
            block_time: Some(1_700_000_000),
            log_messages: Some(vec!["Program log: ok".to_string()]),
            raw: String::new(),
        }
    }

    /// Source scriptée : pour chaque signature, un nombre d'échecs
    /// transitoires à servir avant le succès. Compte aussi les tentatives.
    struct ScriptedSource {
        failures_left: Mutex<HashMap<String, u32>>,
        attempts: Mutex<HashMap<String, u32>>,
        missing: HashSet<String>,
    }

    impl ScriptedSource {
        fn new(failures: &[(String, u32)]) -> Self {
            Self {
                failures_left: Mutex::new(failures.iter().cloned().collect()),
                attempts: Mutex::new(HashMap::new()),
                missing: HashSet::new(),
            }
        }

        async fn attempts_for(&self, signature: &str) -> u32 {
            *self.attempts.lock().await.get(signature).unwrap_or(&0)
        }
    }

    #[async_trait]
    impl DetailSource for ScriptedSource {
        async fn transaction_detail(
            &self,
            signature: &Signature,
        ) -> Result<Option<TransactionRecord>, UpstreamError> {
            let key = signature.to_string();
            *self.attempts.lock().await.entry(key.clone()).or_insert(0) += 1;
            if self.missing.contains(&key) {
                return Ok(None);
            }
            let mut failures = self.failures_left.lock().await;
            if let Some(remaining) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(transient_error());
                }
            }
            Ok(Some(record_for(&key)))
        }
    }

    // Des signatures valides et distinctes, sans dépendre du réseau.
    fn test_signature(n: u8) -> String {
        Signature::from([n; 64]).to_string()
    }

    fn fresh_signatures(count: usize) -> Vec<String> {
        (0..count).map(|n| test_signature(n as u8 + 1)).collect()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, 1)
    }

    #[tokio::test]
    async fn empty_input_returns_without_spawning() {
        let source = Arc::new(ScriptedSource::new(&[]));
        let records = fetch_transaction_details(source, Vec::new(), 4, fast_retry()).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn partition_is_exact_for_various_worker_counts() {
        let sigs = fresh_signatures(6);
        // Deux signatures échouent à chaque tentative, une réussit après
        // deux échecs transitoires, les autres du premier coup.
        let scripted = vec![
            (sigs[0].clone(), 100),
            (sigs[1].clone(), 100),
            (sigs[2].clone(), 2),
        ];

        for workers in [1usize, 6, 12] {
            let source = Arc::new(ScriptedSource::new(&scripted));
            let records = fetch_transaction_details(
                Arc::clone(&source),
                sigs.clone(),
                workers,
                fast_retry(),
            )
            .await;

            let fetched: HashSet<String> =
                records.iter().map(|r| r.signature.clone()).collect();
            assert_eq!(fetched.len(), 4, "workers={workers}");
            assert!(!fetched.contains(&sigs[0]));
            assert!(!fetched.contains(&sigs[1]));
            assert!(fetched.contains(&sigs[2]));

            // Les signatures défaillantes consomment tout le budget, ni plus.
            assert_eq!(source.attempts_for(&sigs[0]).await, 3);
            assert_eq!(source.attempts_for(&sigs[1]).await, 3);
            assert_eq!(source.attempts_for(&sigs[2]).await, 3);
            assert_eq!(source.attempts_for(&sigs[3]).await, 1);
        }
    }

    #[tokio::test]
    async fn rerun_with_same_script_gives_same_partition() {
        let sigs = fresh_signatures(4);
        let scripted = vec![(sigs[1].clone(), 100)];

        let mut partitions = Vec::new();
        for _ in 0..2 {
            let source = Arc::new(ScriptedSource::new(&scripted));
            let records =
                fetch_transaction_details(source, sigs.clone(), 2, fast_retry()).await;
            let mut fetched: Vec<String> =
                records.into_iter().map(|r| r.signature).collect();
            fetched.sort();
            partitions.push(fetched);
        }
        assert_eq!(partitions[0], partitions[1]);
    }

    #[tokio::test]
    async fn invalid_signature_is_skipped_without_retries() {
        let valid = test_signature(10);
        let source = Arc::new(ScriptedSource::new(&[]));
        let records = fetch_transaction_details(
            Arc::clone(&source),
            vec!["pas-une-signature".to_string(), valid.clone()],
            2,
            fast_retry(),
        )
        .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].signature, valid);
        // L'élément invalide n'a jamais atteint la source.
        assert_eq!(source.attempts_for("pas-une-signature").await, 0);
    }

    #[tokio::test]
    async fn duplicates_are_enqueued_once() {
        let sig = test_signature(11);
        let source = Arc::new(ScriptedSource::new(&[]));
        let records = fetch_transaction_details(
            Arc::clone(&source),
            vec![sig.clone(), sig.clone(), sig.clone()],
            3,
            fast_retry(),
        )
        .await;

        assert_eq!(records.len(), 1);
        assert_eq!(source.attempts_for(&sig).await, 1);
    }

    #[tokio::test]
    async fn missing_transaction_is_not_retried() {
        let sig = test_signature(12);
        let mut source = ScriptedSource::new(&[]);
        source.missing.insert(sig.clone());
        let source = Arc::new(source);

        let records =
            fetch_transaction_details(Arc::clone(&source), vec![sig.clone()], 1, fast_retry())
                .await;

        assert!(records.is_empty());
        assert_eq!(source.attempts_for(&sig).await, 1);
    }
}
