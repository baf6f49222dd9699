// DANS : src/bin/fill_watch.rs

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
    let config = Config::load()?;
    info!(
        account = %config.tracked_account,
        workers = config.fetch_workers,
        terms = ?config.log_search_terms,
        "[FillWatch] Démarrage de la surveillance par contenu."
    );

    tokio::spawn(metrics::start_metrics_server());

    let list_retry = RetryPolicy::new(config.list_retry_attempts, config.list_retry_delay_ms);
    let lister = Arc::new(ResilientRpcClient::new(
        config.solana_rpc_url.clone(),
        list_retry,
    ));
    // Les détails passent par l'endpoint dédié. Une tentative par appel :
    // le budget de ré-essai par signature vit dans le pool de workers.
    let details = Arc::new(ResilientRpcClient::new(
        config.detail_rpc_url().to_string(),
        RetryPolicy::new(1, 0),
    ));
    let notifier = AlertChannel::from_config(&config);

    let mut watcher = Watcher::new(config, WatchMode::ContentMatch, lister, details, notifier)?;

    tokio::select! {
        result = watcher.run_forever() => {
            if let Err(failure) = &result {
                error!(error = ?failure, "[FillWatch] La boucle de surveillance a planté.");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("[FillWatch] Interruption reçue, arrêt propre.");
            Ok(())
        }
    }
}
