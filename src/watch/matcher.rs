// DANS : src/watch/matcher.rs

use crate::watch::extractor::ExtractedFields;
use serde::Serialize;

/// Une correspondance : un triplet (transaction, ligne de log, terme).
/// Une même transaction peut en produire plusieurs, toutes sont remontées.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub slot: Option<u64>,
    pub signature: Option<String>,
    pub block_time: Option<i64>,
    pub found_term: String,
    pub log_line: String,
}

/// Parcourt chaque ligne de log, puis chaque terme dans l'ordre configuré.
/// Recherche de sous-chaîne à plat, volontairement simple. Une ligne n'est
/// pas court-circuitée après son premier terme trouvé. Fonction pure.
pub fn search_logs(fields: &ExtractedFields, terms: &[String]) -> Vec<MatchResult> {
    let mut results = Vec::new();
    for line in &fields.log_lines {
        for term in terms {
            if line.contains(term.as_str()) {
                results.push(MatchResult {
                    slot: fields.slot,
                    signature: fields.signature.clone(),
                    block_time: fields.block_time,
                    found_term: term.clone(),
                    log_line: line.clone(),
                });
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_with_logs(lines: &[&str]) -> ExtractedFields {
        ExtractedFields {
            log_lines: lines.iter().map(|l| l.to_string()).collect(),
            slot: Some(7),
            block_time: Some(1_700_000_000),
            signature: Some("SigTest".to_string()),
        }
    }

    fn terms(values: &[&str]) -> Vec<String> {
        values.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn single_hit_reports_term_and_line() {
        let fields = fields_with_logs(&["FillPerpOrder executed", "noop"]);
        let results = search_logs(&fields, &terms(&["FillPerpOrder", "RevertFill"]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].found_term, "FillPerpOrder");
        assert_eq!(results[0].log_line, "FillPerpOrder executed");
        assert_eq!(results[0].slot, Some(7));
        assert_eq!(results[0].signature.as_deref(), Some("SigTest"));
    }

    #[test]
    fn one_line_can_match_several_terms() {
        let fields = fields_with_logs(&["RevertFill after FillPerpOrder"]);
        let results = search_logs(&fields, &terms(&["FillPerpOrder", "RevertFill"]));
        assert_eq!(results.len(), 2);
        // Les termes sont testés dans l'ordre configuré.
        assert_eq!(results[0].found_term, "FillPerpOrder");
        assert_eq!(results[1].found_term, "RevertFill");
    }

    #[test]
    fn every_matching_line_is_reported() {
        let fields = fields_with_logs(&[
            "Program log: RevertFill: reason=timeout",
            "Program log: RevertFill: reason=slippage",
        ]);
        let results = search_logs(&fields, &terms(&["RevertFill"]));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn empty_terms_or_logs_yield_nothing() {
        let fields = fields_with_logs(&["FillPerpOrder executed"]);
        assert!(search_logs(&fields, &[]).is_empty());

        let empty = fields_with_logs(&[]);
        assert!(search_logs(&empty, &terms(&["FillPerpOrder"])).is_empty());
    }
}
