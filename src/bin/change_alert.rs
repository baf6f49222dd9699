// DANS : src/bin/change_alert.rs

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use vigie::{
    config::Config,
    monitoring::{logging, metrics},
    notify::AlertChannel,
    rpc::{ResilientRpcClient, RetryPolicy},
    watch::cycle::{WatchMode, Watcher},
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup_logging();
    let mut config = Config::load()?;
    // Le diff brut ne regarde que la tête du listing : une seule signature
    // par cycle suffit.
    config.history_limit = 1;
    info!(
        account = %config.tracked_account,
        frequency_secs = config.check_frequency_secs,
        "[ChangeAlert] Démarrage de la surveillance par diff de signatures."
    );

    tokio::spawn(metrics::start_metrics_server());

    let list_retry = RetryPolicy::new(config.list_retry_attempts, config.list_retry_delay_ms);
    let lister = Arc::new(ResilientRpcClient::new(
        config.solana_rpc_url.clone(),
        list_retry,
    ));
    // Ce mode n'inspecte aucun détail ; le client n'existe que pour
    // satisfaire la frontière du Watcher.
    let details = Arc::new(ResilientRpcClient::new(
        config.detail_rpc_url().to_string(),
        RetryPolicy::new(1, 0),
    ));
    let notifier = AlertChannel::from_config(&config);

    let mut watcher = Watcher::new(config, WatchMode::ChangeAlert, lister, details, notifier)?;

    tokio::select! {
        result = watcher.run_forever() => {
            if let Err(failure) = &result {
                error!(error = ?failure, "[ChangeAlert] La boucle de surveillance a planté.");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("[ChangeAlert] Interruption reçue, arrêt propre.");
            Ok(())
        }
    }
}
