//! Parsing and re-rendering schedules.

use schedcheck_core::analyze;
use schedcheck_core::schedule::format_schedule;
use schedcheck_parser::{parse_schedule, tokenize_with_text, TokenKind};

const SCHEDULES: &[&str] = &[
    "R1(X); W1(X); R2(X); W2(X); C1; C2",
    "r1(x) w2(x)\nr2(y),w1(y)",
    "W1(A);W2(B);R1(B);R2(A)",
    "  w3(acct_1) ;; r12(ACCT_1)\t a3 c12  ",
    "R01(X); W1(X); C01; C1",
    "R99999999999999999999999(X); W1(X); C1; C99999999999999999999999",
    "",
];

/// Valid tokens of `input`, upper-cased, in order.
fn normalized_tokens(input: &str) -> Vec<String> {
    tokenize_with_text(input)
        .into_iter()
        .filter(|(token, _)| token.kind == TokenKind::Operation)
        .map(|(_, text)| text.to_uppercase())
        .collect()
}

#[test]
fn original_text_reproduces_token_order() {
    for input in SCHEDULES {
        let parsed = parse_schedule(input);
        assert!(parsed.is_clean(), "{input}: {:?}", parsed.warnings);
        let mut operations = parsed.operations.clone();
        operations.sort_by_key(|op| op.step);
        let texts: Vec<String> = operations.into_iter().map(|op| op.text).collect();
        assert_eq!(texts, normalized_tokens(input), "{input}");
    }
}

#[test]
fn canonical_form_is_a_fixed_point() {
    for input in SCHEDULES {
        let once = format_schedule(&parse_schedule(input).operations);
        let twice = format_schedule(&parse_schedule(&once).operations);
        assert_eq!(once, twice, "{input}");
        assert_eq!(parse_schedule(&once).operations, parse_schedule(input).operations);
    }
}

#[test]
fn canonical_form_uses_semicolons() {
    let parsed = parse_schedule("r1(x) w2(x)\nc1 , a2");
    assert_eq!(format_schedule(&parsed.operations), "R1(X); W2(X); C1; A2");
}

#[test]
fn dropped_tokens_do_not_shift_later_steps() {
    let parsed = parse_schedule("R1(X) C2(Y) W2(X) ?? C1");
    let steps: Vec<(usize, &str)> = parsed
        .operations
        .iter()
        .map(|op| (op.step, op.text.as_str()))
        .collect();
    assert_eq!(steps, vec![(0, "R1(X)"), (1, "W2(X)"), (2, "C1")]);
    let indexes: Vec<usize> = parsed.warnings.iter().map(|w| w.index).collect();
    assert_eq!(indexes, vec![1, 3]);
}

#[test]
fn padded_and_oversized_numbers_are_distinct_transactions() {
    let text = "R01(X) W1(X) W99999999999999999999999(X) C01 C1";
    let analysis = analyze(parse_schedule(text).operations);
    let ids: Vec<String> = analysis
        .transactions
        .iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(ids, vec!["T01", "T1", "T99999999999999999999999"]);
    assert_eq!(analysis.conflicts.len(), 3);
    let edges: Vec<String> = analysis
        .precedence_graph
        .edges
        .iter()
        .map(|edge| format!("{} -> {}", edge.source, edge.target))
        .collect();
    assert_eq!(
        edges,
        vec![
            "T01 -> T1",
            "T01 -> T99999999999999999999999",
            "T1 -> T99999999999999999999999",
        ]
    );
}

#[cfg(feature = "serde")]
#[test]
fn warnings_serialize() {
    let parsed = parse_schedule("R1");
    let json = serde_json::to_value(&parsed.warnings).map(|value| value.is_array());
    assert_eq!(json.ok(), Some(true));
}
