// Property-based tests for text normalization.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use permis_core::{normalize, normalize_header};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

/// Latin text with accents, separators, apostrophes and odd whitespace.
fn arb_text() -> impl Strategy<Value = String> {
    r"[A-Za-z0-9àâäçéèêëîïôöùûüÿÀÂÄÇÉÈÊËÎÏÔÖÙÛÜŸœŒ '’._/\-\t]{0,40}"
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn normalize_is_idempotent(s in arb_text()) {
        let once = normalize(s.as_str());
        prop_assert_eq!(normalize(once.as_str()), once);
    }

    #[test]
    fn normalize_header_is_idempotent(s in arb_text()) {
        let once = normalize_header(&s);
        prop_assert_eq!(normalize_header(&once), once);
    }

    #[test]
    fn normalized_text_has_no_edge_or_double_spaces(s in arb_text()) {
        let n = normalize(s.as_str());
        prop_assert!(!n.starts_with(' ') && !n.ends_with(' '));
        prop_assert!(!n.contains("  "));
        prop_assert!(!n.contains(['-', '_', '/', '.']));
    }

    #[test]
    fn case_does_not_matter(s in arb_text()) {
        prop_assert_eq!(normalize(s.to_uppercase().as_str()), normalize(s.to_lowercase().as_str()));
    }
}
