//! Canonical forms for names and URLs.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Record;

/// Legal-entity suffixes dropped from identity keys.
const LEGAL_SUFFIXES: &[&str] = &[
    " inc", " inc.", " llc", " ltd", " ltd.", " corp", " corp.", " co", " co.",
];

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Collapse whitespace runs to single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute URL with a scheme and without trailing slashes; empty stays empty.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    url.trim_end_matches('/').to_string()
}

fn normalize_optional_url(url: Option<String>) -> Option<String> {
    url.map(|u| normalize_url(&u)).filter(|u| !u.is_empty())
}

/// Lossy matching key for a company name.
///
/// Lowercases, strips one trailing legal suffix, removes punctuation and
/// collapses whitespace. The pass is repeated until the key stops changing,
/// so `identity_key(&identity_key(x)) == identity_key(x)` always holds.
pub fn identity_key(name: &str) -> String {
    let mut key = identity_pass(name);
    loop {
        let next = identity_pass(&key);
        if next == key {
            return key;
        }
        key = next;
    }
}

fn identity_pass(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut key = lowered.trim();
    if let Some(suffix) = LEGAL_SUFFIXES.iter().find(|s| key.ends_with(*s)) {
        key = key[..key.len() - suffix.len()].trim();
    }
    let key = PUNCTUATION.replace_all(key, "");
    WHITESPACE.replace_all(&key, " ").trim().to_string()
}

/// Trim text fields and canonicalize URLs. Records with an empty name are dropped.
pub fn normalize_record(mut record: Record) -> Option<Record> {
    record.name = record.name.trim().to_string();
    if record.name.is_empty() {
        return None;
    }
    record.description = record
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    record.website = normalize_optional_url(record.website);
    record.primary_source_url = normalize_optional_url(record.primary_source_url);
    record.secondary_source_url = normalize_optional_url(record.secondary_source_url);
    Some(record)
}

pub fn normalize_records(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().filter_map(normalize_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com/"), "https://example.com");
        assert_eq!(normalize_url(""), "");
        assert_eq!(normalize_url("   "), "");
        assert_eq!(normalize_url(" http://acme.dev// "), "http://acme.dev");
        assert_eq!(normalize_url("https://acme.dev/about"), "https://acme.dev/about");
    }

    #[test]
    fn test_identity_key_suffix_variants() {
        assert_eq!(identity_key("Acme Inc."), "acme");
        assert_eq!(identity_key("acme inc"), "acme");
        assert_eq!(identity_key("ACME, INC"), "acme");
        assert_eq!(identity_key("  Acme   Robotics  LLC "), "acme robotics");
        assert_eq!(identity_key("Inc"), "inc");
        assert_eq!(identity_key(""), "");
    }

    #[test]
    fn test_identity_key_is_fixed_point() {
        for name in ["Acme Co Inc", "acme inc,", "Foo-Bar Ltd.", "Ünïcode Corp.", "a  b   c", "co co co"] {
            let key = identity_key(name);
            assert_eq!(identity_key(&key), key, "not a fixed point for {name:?}");
        }
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\n\tb  c "), "a b c");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_normalize_record_keeps_single_character_names() {
        let record = normalize_record(Record::named(" X ")).unwrap();
        assert_eq!(record.name, "X");
        assert_eq!(normalize_records(vec![Record::named("Q"), Record::named("")]).len(), 1);
    }

    #[test]
    fn test_normalize_record_drops_blank_names() {
        assert!(normalize_record(Record::named("   ")).is_none());

        let record = normalize_record(Record {
            name: "  Acme ".to_string(),
            website: Some("acme.dev/".to_string()),
            description: Some("  ".to_string()),
            primary_source_url: Some(String::new()),
            secondary_source_url: Some("https://linkedin.com/company/acme/".to_string()),
            corroborated: true,
        })
        .unwrap();

        assert_eq!(record.name, "Acme");
        assert_eq!(record.website.as_deref(), Some("https://acme.dev"));
        assert_eq!(record.description, None);
        assert_eq!(record.primary_source_url, None);
        assert_eq!(record.secondary_source_url.as_deref(), Some("https://linkedin.com/company/acme"));
        assert!(record.corroborated);
    }
}
