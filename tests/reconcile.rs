use cohort_crawler::normalize::{identity_key, normalize_url};
use cohort_crawler::search::{extract_name_from_title, CohortLabels};
use cohort_crawler::{merge, reconcile, Record};

fn profile(name: &str, url: &str) -> Record {
    Record {
        name: name.to_string(),
        secondary_source_url: Some(url.to_string()),
        corroborated: true,
        ..Record::default()
    }
}

#[test]
fn test_identity_key_matches_suffix_and_case_variants() {
    let key = identity_key("Acme Inc.");
    assert_eq!(key, identity_key("acme inc"));
    assert_eq!(key, identity_key("ACME, INC"));
    assert_eq!(identity_key(&key), key);
}

#[test]
fn test_directory_record_gains_profile_link() {
    let merged = merge(
        vec![Record::named("Acme Inc")],
        vec![profile("acme", "https://linkedin.com/company/acme")],
    );

    assert_eq!(
        merged,
        vec![Record {
            name: "Acme Inc".to_string(),
            secondary_source_url: Some("https://linkedin.com/company/acme".to_string()),
            corroborated: true,
            ..Record::default()
        }]
    );
}

#[test]
fn test_no_directory_record_is_dropped() {
    let primary: Vec<Record> = ["Alpha", "Beta Corp", "Gamma Labs", "Delta"]
        .iter()
        .map(|n| Record::named(*n))
        .collect();
    let secondary = vec![
        profile("beta", "https://linkedin.com/company/beta"),
        profile("Omega", "https://linkedin.com/company/omega"),
    ];

    let merged = reconcile(primary.clone(), secondary);

    assert_eq!(merged.len(), 5);
    for (record, original) in merged.iter().zip(&primary) {
        assert_eq!(record.name, original.name);
    }
    assert_eq!(merged[4], profile("Omega", "https://linkedin.com/company/omega"));
}

#[test]
fn test_search_title_and_label_cleanup() {
    let labels = CohortLabels::new(&["YC S25".to_string(), "Y Combinator S25".to_string()]).unwrap();
    for title in ["Acme | LinkedIn", "Acme - LinkedIn", "Acme"] {
        assert_eq!(extract_name_from_title(title), "Acme");
    }
    assert_eq!(labels.strip(&extract_name_from_title("Acme (YC S25) | LinkedIn")), "Acme");
    assert_eq!(labels.strip("Acme YC S25"), "Acme");
    assert_eq!(labels.strip(""), "");
}

#[test]
fn test_url_normalization() {
    assert_eq!(normalize_url("example.com/"), "https://example.com");
    assert_eq!(normalize_url(""), "");
}
