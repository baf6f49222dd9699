// DANS : src/persistence.rs

use crate::watch::fetcher::TransactionRecord;
use crate::watch::matcher::MatchResult;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct CycleReport<'a> {
    fetched: &'a [TransactionRecord],
    matches: &'a [MatchResult],
}

/// Écrit le bilan du cycle (détails récupérés + correspondances) en JSON
/// lisible, pour inspection externe. Purement informatif : la détection ne
/// dépend jamais de ce fichier.
pub fn write_cycle_report(
    path: &Path,
    fetched: &[TransactionRecord],
    matches: &[MatchResult],
) -> Result<()> {
    let report = CycleReport { fetched, matches };
    let rendered =
        serde_json::to_string_pretty(&report).context("sérialisation du rapport impossible")?;
    fs::write(path, rendered)
        .with_context(|| format!("écriture du rapport dans {} impossible", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_valid_json() {
        let record = TransactionRecord {
            signature: "SigTest".to_string(),
            slot: Some(1),
            block_time: Some(1_700_000_000),
            log_messages: Some(vec!["Program log: RevertFill".to_string()]),
            raw: String::new(),
        };
        let hit = MatchResult {
            slot: Some(1),
            signature: Some("SigTest".to_string()),
            block_time: Some(1_700_000_000),
            found_term: "RevertFill".to_string(),
            log_line: "Program log: RevertFill".to_string(),
        };

        let dir = std::env::temp_dir().join("vigie_report_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("transaction_details.json");
        write_cycle_report(&path, &[record], &[hit]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["matches"][0]["found_term"], "RevertFill");
        assert_eq!(parsed["fetched"][0]["signature"], "SigTest");
    }
}
