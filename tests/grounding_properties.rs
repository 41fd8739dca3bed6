use proptest::prelude::*;

use conductor::core::grounding::{is_grounded, propose_correction, substitute};

fn sources<'a>(error: &'a str, evidence: &'a [String], request: &'a str) -> Vec<&'a str> {
    let mut out = vec![error];
    out.extend(evidence.iter().map(String::as_str));
    out.push(request);
    out
}

// 只由 b-h 组成的词不可能拼出任何替换关系标记
fn filler_sentence() -> impl Strategy<Value = String> {
    prop::collection::vec("[b-h]{4,7}", 1..8).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn test_rewrite_only_uses_values_from_context(
        literal in "[a-z]{3,8}",
        table in "[a-z]{3,8}",
        replacement in "[A-Z][a-z0-9_]{2,8}",
        other in "[a-z]{3,8}",
        evidence in prop::collection::vec(filler_sentence(), 0..6),
        with_relation in any::<bool>(),
        relation_about_other in any::<bool>(),
    ) {
        let task = format!("select {literal} from {table}");
        let error = format!("ERROR: missing column '{literal}'");
        let mut evidence = evidence;
        if with_relation {
            let subject = if relation_about_other { &other } else { &literal };
            evidence.push(format!("column {subject} was renamed to {replacement}"));
        }
        let request = format!("report on {table}");
        let srcs = sources(&error, &evidence, &request);

        if let Some(fix) = propose_correction(&error, &task, &srcs) {
            let corrected = substitute(&task, &fix.original, &fix.replacement);
            prop_assert_ne!(&corrected, &task);
            prop_assert!(srcs.iter().any(|s| s.contains(fix.replacement.as_str())));
            prop_assert!(is_grounded(&task, &corrected, &srcs));
        }
    }

    #[test]
    fn test_no_relation_means_no_rewrite(
        literal in "[a-z]{3,8}",
        table in "[a-z]{3,8}",
        evidence in prop::collection::vec(filler_sentence(), 0..6),
    ) {
        let task = format!("select {literal} from {table}");
        let error = format!("ERROR: missing column '{literal}'");
        let request = format!("report on {table}");
        let srcs = sources(&error, &evidence, &request);
        prop_assert!(propose_correction(&error, &task, &srcs).is_none());
    }

    #[test]
    fn test_explicit_relation_is_found(
        literal in "[a-z]{3,8}",
        table in "[a-z]{3,8}",
        replacement in "[A-Z][a-z0-9_]{2,8}",
        evidence in prop::collection::vec(filler_sentence(), 0..6),
    ) {
        let task = format!("select {literal} from {table}");
        let error = format!("ERROR: missing column '{literal}'");
        let mut evidence = evidence;
        evidence.push(format!("column {literal} was renamed to {replacement}"));
        let request = format!("report on {table}");
        let srcs = sources(&error, &evidence, &request);

        let fix = propose_correction(&error, &task, &srcs);
        prop_assert!(fix.is_some());
        let fix = fix.unwrap();
        prop_assert_eq!(&fix.original, &literal);
        prop_assert_eq!(&fix.replacement, &replacement);
    }
}
