//! Merge the directory and search results into one list.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::models::Record;
use crate::normalize::{identity_key, normalize_records};

/// Merge `secondary` into `primary`.
///
/// Every primary record is kept, in order. When a secondary record has the
/// same identity key and a non-empty source URL, that URL and its
/// corroboration flag are copied over; all other primary fields win.
/// Secondary records that matched nothing follow, untouched, in their
/// original order. On key collisions within `secondary` the last one wins.
pub fn merge(primary: Vec<Record>, secondary: Vec<Record>) -> Vec<Record> {
    let lookup: HashMap<String, &Record> = secondary
        .iter()
        .map(|record| (identity_key(&record.name), record))
        .collect();

    let mut matched: HashSet<String> = HashSet::new();
    let mut merged: Vec<Record> = Vec::with_capacity(primary.len() + secondary.len());

    for mut record in primary {
        let key = identity_key(&record.name);
        if let Some(other) = lookup.get(&key) {
            matched.insert(key);
            if let Some(url) = other.secondary_source_url.as_deref().filter(|u| !u.is_empty()) {
                debug!("Corroborated {} via {}", record.name, url);
                record.secondary_source_url = Some(url.to_string());
                record.corroborated = other.corroborated;
            }
        }
        merged.push(record);
    }

    let corroborated = merged.iter().filter(|r| r.corroborated).count();
    let unmatched: Vec<Record> = secondary
        .into_iter()
        .filter(|record| !matched.contains(&identity_key(&record.name)))
        .collect();

    info!(
        "Merged {} directory records ({} corroborated) with {} search-only records",
        merged.len(),
        corroborated,
        unmatched.len()
    );
    merged.extend(unmatched);
    merged
}

/// Normalize both lists, then [`merge`] them.
pub fn reconcile(primary: Vec<Record>, secondary: Vec<Record>) -> Vec<Record> {
    merge(normalize_records(primary), normalize_records(secondary))
}
