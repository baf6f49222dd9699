// DANS : src/monitoring/metrics.rs

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, TextEncoder, register_int_counter, register_int_gauge};
use warp::Filter;

lazy_static! {
    // --- Cycles ---
    pub static ref CYCLES_TOTAL: IntCounter = register_int_counter!(
        "vigie_cycles_total", "Nombre total de cycles d'inspection lancés"
    ).unwrap();
    pub static ref CYCLES_FAILED: IntCounter = register_int_counter!(
        "vigie_cycles_failed_total", "Nombre de cycles terminés en échec"
    ).unwrap();
    pub static ref CYCLE_LAST_TIMESTAMP: IntGauge = register_int_gauge!(
        "vigie_cycle_last_timestamp_seconds", "Timestamp Unix de la fin du dernier cycle"
    ).unwrap();

    // --- Pipeline ---
    pub static ref SIGNATURES_LISTED: IntCounter = register_int_counter!(
        "vigie_signatures_listed_total", "Signatures renvoyées par les listings"
    ).unwrap();
    pub static ref FETCH_SUCCESS: IntCounter = register_int_counter!(
        "vigie_fetch_success_total", "Détails de transaction récupérés avec succès"
    ).unwrap();
    pub static ref FETCH_RETRIES: IntCounter = register_int_counter!(
        "vigie_fetch_retries_total", "Tentatives supplémentaires consommées sur une même signature"
    ).unwrap();
    pub static ref FETCH_FAILURES: IntCounter = register_int_counter!(
        "vigie_fetch_failures_total", "Signatures abandonnées après épuisement du budget"
    ).unwrap();

    // --- Alerting ---
    pub static ref MATCHES_FOUND: IntCounter = register_int_counter!(
        "vigie_matches_found_total", "Correspondances de mots-clés trouvées dans les logs"
    ).unwrap();
    pub static ref NOTIFICATIONS_SENT: IntCounter = register_int_counter!(
        "vigie_notifications_sent_total", "Alertes déclenchées (une par cycle au maximum)"
    ).unwrap();
}

// Ces compteurs sont purement observationnels : la chaîne de détection ne
// les consulte jamais.

/// Expose les métriques au format Prometheus sur /metrics.
pub async fn start_metrics_server() {
    let metrics_route = warp::path!("metrics").map(|| {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&prometheus::gather(), &mut buffer).unwrap();
        warp::reply::with_header(buffer, "content-type", "text/plain; version=0.0.4")
    });
    println!("[Monitoring] Serveur de métriques exposé sur http://0.0.0.0:9100/metrics");
    warp::serve(metrics_route).run(([0, 0, 0, 0], 9100)).await;
}
