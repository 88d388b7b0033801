//! Property-based checks for URL variant derivation.
//!
//! 1. **Idempotence**: stripping size params twice equals stripping once,
//!    for any string.
//! 2. **Round trip**: a sized variant of a base URL strips back to that base,
//!    for any positive size.
//! 3. **Candidate sets**: one candidate per breakpoint, in breakpoint order,
//!    each one the sized variant at that width.

use product_grid::variant::{
    BREAKPOINT_WIDTHS, CandidateSet, build_responsive_candidate_set, build_sized_url,
    strip_size_params,
};
use proptest::prelude::*;

/// Free-form strings dense in the characters the stripper cares about.
fn raw_url() -> impl Strategy<Value = String> {
    "[a-z?&wh=0-9#ü/.:]{0,24}"
}

/// URL-shaped input: a path plus a query mixing size and other params.
fn query_url() -> impl Strategy<Value = String> {
    let param = prop_oneof![
        (0u32..5000).prop_map(|n| format!("w={n}")),
        (0u32..5000).prop_map(|n| format!("h={n}")),
        "[a-z]{1,4}=[a-z0-9]{0,4}",
        Just(String::new()),
    ];
    (
        "https://[a-z]{1,8}/[a-z0-9]{1,8}",
        prop::collection::vec(param, 0..6),
    )
        .prop_map(|(path, params)| {
            if params.is_empty() {
                path
            } else {
                format!("{path}?{}", params.join("&"))
            }
        })
}

fn any_url() -> impl Strategy<Value = String> {
    prop_oneof![raw_url(), query_url()]
}

// ===========================================================================
// Normalization
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn strip_is_idempotent(url in any_url()) {
        let once = strip_size_params(&url);
        prop_assert_eq!(strip_size_params(&once), once);
    }

    #[test]
    fn sized_url_strips_back_to_base(url in any_url(), size in 1u32..5000) {
        let base = strip_size_params(&url);
        prop_assume!(!base.is_empty());
        prop_assert_eq!(strip_size_params(&build_sized_url(&base, size)), base);
    }

    #[test]
    fn empty_base_yields_empty_sized_url(size in 1u32..5000) {
        prop_assert_eq!(build_sized_url("", size), "");
    }
}

// ===========================================================================
// Candidate sets
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn default_set_matches_breakpoints(url in any_url()) {
        let base = strip_size_params(&url);
        prop_assume!(!base.is_empty());
        let set = build_responsive_candidate_set(&base);
        prop_assert_eq!(set.len(), BREAKPOINT_WIDTHS.len());
        prop_assert_eq!(set.widths(), BREAKPOINT_WIDTHS.to_vec());
    }

    #[test]
    fn configured_set_keeps_width_order(
        url in query_url(),
        widths in prop::collection::btree_set(1u32..5000, 1..10),
    ) {
        let widths: Vec<u32> = widths.into_iter().collect();
        let base = strip_size_params(&url);
        let set = CandidateSet::with_widths(&base, &widths);
        prop_assert_eq!(set.widths(), widths.clone());
        for candidate in set.iter() {
            prop_assert_eq!(&candidate.url, &build_sized_url(&base, candidate.width));
        }
    }
}
