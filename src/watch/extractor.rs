// DANS : src/watch/extractor.rs

use crate::watch::fetcher::TransactionRecord;
use regex::Regex;
use std::sync::LazyLock;

// Motifs de secours, calqués sur le rendu textuel du payload. Best-effort
// par construction : l'absence d'un motif donne un champ absent, jamais
// une erreur. Le chemin principal reste les champs structurés du record.
static LOG_LIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)log_messages:\s*Some\(\[(.*?)\]\)").expect("motif log_messages invalide")
});
static QUOTED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(.*?)""#).expect("motif de chaîne invalide"));
static SLOT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"slot:\s*(?:Some\()?(\d+)").expect("motif slot invalide"));
static BLOCK_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"block_time:\s*(?:Some\()?(\d+)").expect("motif block_time invalide")
});
static SIGNATURE_LIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"signatures:\s*\[\s*"(.*?)""#).expect("motif signatures invalide")
});

/// Les champs typés dérivés d'un détail de transaction. Immuable une fois
/// produit ; tout champ introuvable est simplement absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub log_lines: Vec<String>,
    pub slot: Option<u64>,
    pub block_time: Option<i64>,
    pub signature: Option<String>,
}

/// Extraction totale : aucune entrée, si malformée soit-elle, ne fait
/// échouer l'appel. Les champs structurés du record font foi ; le rendu
/// textuel ne sert que de secours pour ce qui manque. Pas d'I/O ici.
pub fn extract(record: &TransactionRecord) -> ExtractedFields {
    let log_lines = match &record.log_messages {
        Some(lines) => lines.clone(),
        None => extract_log_lines(&record.raw),
    };
    let slot = record.slot.or_else(|| extract_slot(&record.raw));
    let block_time = record
        .block_time
        .or_else(|| extract_block_time(&record.raw));
    let signature = if record.signature.is_empty() {
        extract_first_signature(&record.raw)
    } else {
        Some(record.signature.clone())
    };
    ExtractedFields {
        log_lines,
        slot,
        block_time,
        signature,
    }
}

/// Retrouve les lignes de log dans la liste entre crochets du rendu
/// textuel. Pas de construit reconnaissable : séquence vide, pas d'erreur.
fn extract_log_lines(raw: &str) -> Vec<String> {
    let Some(captures) = LOG_LIST_REGEX.captures(raw) else {
        return Vec::new();
    };
    let Some(list_body) = captures.get(1) else {
        return Vec::new();
    };
    QUOTED_REGEX
        .captures_iter(list_body.as_str())
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

// Première occurrence gagnante, comme pour tous les motifs de secours.
fn extract_slot(raw: &str) -> Option<u64> {
    SLOT_REGEX
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn extract_block_time(raw: &str) -> Option<i64> {
    BLOCK_TIME_REGEX
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn extract_first_signature(raw: &str) -> Option<String> {
    SIGNATURE_LIST_REGEX
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
