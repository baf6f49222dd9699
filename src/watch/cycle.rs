// DANS : src/watch/cycle.rs

use crate::config::Config;
use crate::monitoring::metrics;
use crate::notify::Notifier;
use crate::persistence;
use crate::rpc::{RetryPolicy, UpstreamError};
use crate::watch::detector::{ChangeDetector, Observation};
use crate::watch::extractor;
use crate::watch::fetcher::{self, DetailSource};
use crate::watch::lister::{self, SignatureRecord, SignatureSource};
use crate::watch::matcher::{self, MatchResult};
use anyhow::{Result, anyhow};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Les deux configurations de la même boucle de surveillance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Diff brut de signatures : alerte dès qu'une nouvelle transaction
    /// apparaît en tête du listing, sans inspection du contenu.
    ChangeAlert,
    /// Récupération des détails + recherche de mots-clés dans les logs :
    /// alerte seulement si le contenu correspond.
    ContentMatch,
}

/// Bilan d'un cycle, pour les logs de fin de cycle et les tests.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub listed: usize,
    pub fetched: usize,
    pub matches: Vec<MatchResult>,
    pub notified: bool,
}

/// L'orchestrateur : compose lister -> fetcher -> extracteur -> matcher ->
/// décision de notification, une fois par cycle, et enchaîne les cycles à
/// intervalle fixe jusqu'à interruption du processus.
pub struct Watcher<L, D, N> {
    config: Config,
    account: Pubkey,
    before: Option<Signature>,
    mode: WatchMode,
    lister: Arc<L>,
    details: Arc<D>,
    notifier: N,
    detector: ChangeDetector,
    fetch_retry: RetryPolicy,
}

impl<L, D, N> Watcher<L, D, N>
where
    L: SignatureSource + 'static,
    D: DetailSource + 'static,
    N: Notifier,
{
    pub fn new(
        config: Config,
        mode: WatchMode,
        lister: Arc<L>,
        details: Arc<D>,
        notifier: N,
    ) -> Result<Self> {
        let account = config.tracked_pubkey();
        let before = config
            .before_signature
            .as_deref()
            .map(Signature::from_str)
            .transpose()
            .map_err(|_| anyhow!("BEFORE_SIGNATURE n'est pas une signature valide"))?;
        let fetch_retry =
            RetryPolicy::new(config.fetch_retry_attempts, config.fetch_retry_delay_ms);
        Ok(Self {
            account,
            before,
            mode,
            lister,
            details,
            notifier,
            detector: ChangeDetector::new(),
            fetch_retry,
            config,
        })
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Boucle de contrôle : un cycle, une pause, indéfiniment. Un cycle en
    /// échec est loggué et n'empêche jamais le suivant. L'attente est
    /// annulable : les binaires exécutent cette boucle sous un
    /// `tokio::select!` face à Ctrl-C, qui abandonne proprement le futur.
    pub async fn run_forever(&mut self) -> Result<()> {
        let pause = Duration::from_secs(self.config.check_frequency_secs);
        loop {
            info!(mode = ?self.mode, "[Watcher] Démarrage d'un nouveau cycle d'inspection.");
            metrics::CYCLES_TOTAL.inc();
            match self.run_cycle().await {
                Ok(outcome) => {
                    info!(
                        listed = outcome.listed,
                        fetched = outcome.fetched,
                        matches = outcome.matches.len(),
                        notified = outcome.notified,
                        "[Watcher] Cycle terminé."
                    );
                }
                Err(failure) => {
                    // Échec de cycle : loggué, état du détecteur intact, on continue.
                    metrics::CYCLES_FAILED.inc();
                    error!(error = ?failure, "[Watcher] Cycle en échec, on attendra le prochain.");
                }
            }
            metrics::CYCLE_LAST_TIMESTAMP.set(chrono::Utc::now().timestamp());
            info!(
                pause_secs = self.config.check_frequency_secs,
                "[Watcher] Pause avant le prochain cycle."
            );
            tokio::time::sleep(pause).await;
        }
    }

    /// Un cycle complet. L'état du détecteur n'est committé qu'à la toute fin,
    /// jamais sur un chemin d'erreur.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let mut outcome = CycleOutcome::default();

        let rows = match self
            .lister
            .recent_signatures(&self.account, self.before, self.config.history_limit)
            .await
        {
            Ok(rows) => rows,
            Err(UpstreamError::Protocol(message)) => {
                // Réponse malformée : on traite l'appel comme un listing vide.
                warn!(error = %message, "[Watcher] Listing illisible, traité comme vide.");
                Vec::new()
            }
            Err(failure) => {
                return Err(
                    anyhow::Error::new(failure).context("échec du listing des signatures")
                );
            }
        };

        outcome.listed = rows.len();
        metrics::SIGNATURES_LISTED.inc_by(rows.len() as u64);

        if rows.is_empty() {
            info!("[Watcher] Rien observé sur le compte ce cycle.");
        } else {
            lister::log_listing(&rows);
        }

        let newest = rows.first().map(|row| row.signature.clone());
        let observation = newest.as_deref().map(|head| self.detector.observe(head));

        match self.mode {
            WatchMode::ChangeAlert => {
                if let Some(observation) = &observation {
                    self.decide_on_change(observation, &mut outcome);
                }
            }
            WatchMode::ContentMatch => {
                self.inspect_contents(&rows, observation.as_ref(), &mut outcome)
                    .await;
            }
        }

        // Commit de fin de cycle : seul point de mutation du détecteur.
        if let Some(newest) = newest {
            self.detector.record(newest);
        }
        Ok(outcome)
    }

    /// Mode diff brut : la tête du listing suffit à décider.
    fn decide_on_change(&self, observation: &Observation, outcome: &mut CycleOutcome) {
        match observation {
            Observation::FirstSighting => {
                info!("[Watcher] Première observation : détection armée, pas d'alerte.");
            }
            Observation::Unchanged => {
                info!("[Watcher] Pas de nouvelle transaction.");
            }
            Observation::NewActivity { previous } => {
                info!(previous = %previous, "[Watcher] Nouvelle transaction détectée !");
                self.raise_alert(outcome);
            }
        }
    }

    /// Mode contenu : récupère les détails du listing (plus les signatures
    /// d'appoint, dédupliquées avant la mise en file), extrait, cherche les
    /// termes, et alerte si au moins une correspondance existe.
    async fn inspect_contents(
        &self,
        rows: &[SignatureRecord],
        observation: Option<&Observation>,
        outcome: &mut CycleOutcome,
    ) {
        if let Some(Observation::NewActivity { previous }) = observation {
            info!(previous = %previous, "[Watcher] Nouvelle activité en tête de listing.");
        }

        let mut signatures: Vec<String> = rows.iter().map(|row| row.signature.clone()).collect();
        if self.config.include_seed_signatures && !self.config.seed_signatures.is_empty() {
            info!(
                seeds = self.config.seed_signatures.len(),
                "[Watcher] Ajout des signatures d'appoint à l'inspection."
            );
            signatures.extend(self.config.seed_signatures.iter().cloned());
        }
        let mut seen = HashSet::new();
        signatures.retain(|sig| seen.insert(sig.clone()));

        if signatures.is_empty() {
            info!("[Watcher] Aucune signature à inspecter, cycle sans effet.");
            return;
        }

        let records = fetcher::fetch_transaction_details(
            Arc::clone(&self.details),
            signatures,
            self.config.fetch_workers,
            self.fetch_retry,
        )
        .await;
        outcome.fetched = records.len();

        if records.is_empty() {
            info!("[Watcher] Aucun détail de transaction à inspecter.");
            return;
        }

        let mut matches = Vec::new();
        for record in &records {
            let fields = extractor::extract(record);
            matches.extend(matcher::search_logs(
                &fields,
                &self.config.log_search_terms,
            ));
        }

        if let Some(path) = &self.config.report_path {
            // Rapport best-effort : un échec d'écriture n'affecte pas la décision.
            if let Err(failure) = persistence::write_cycle_report(path, &records, &matches) {
                warn!(
                    path = %path.display(),
                    error = ?failure,
                    "[Watcher] Écriture du rapport impossible."
                );
            }
        }

        if matches.is_empty() {
            info!("[Watcher] Aucun log ne correspond aux termes surveillés.");
        } else {
            for hit in &matches {
                info!(
                    slot = ?hit.slot,
                    signature = ?hit.signature,
                    block_time = ?hit.block_time,
                    term = %hit.found_term,
                    log = %hit.log_line,
                    "[Watcher] Correspondance trouvée."
                );
            }
            metrics::MATCHES_FOUND.inc_by(matches.len() as u64);
            self.raise_alert(outcome);
        }
        outcome.matches = matches;
    }

    /// Une seule notification et un seul signal sonore par cycle, quel que
    /// soit le nombre de correspondances.
    fn raise_alert(&self, outcome: &mut CycleOutcome) {
        self.notifier.notify();
        self.notifier.alert_sound();
        metrics::NOTIFICATIONS_SENT.inc();
        outcome.notified = true;
    }
}
