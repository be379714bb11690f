use pel::lexer::Lexer;
use pel::parser;
use pel::provenance::ProvenanceChecker;

fn check(src: &str) -> (Vec<pel::Diagnostic>, f64) {
    let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
    let model = parser::parse(tokens).unwrap();
    ProvenanceChecker::new().check(&model)
}

#[test]
fn partial_provenance_scores_between_zero_and_one() {
    let (diags, score) = check(
        r#"model M {
            param a = $1 { source: "x", method: observed, confidence: 0.9 }
        }"#,
    );
    assert!(diags.is_empty());
    assert!(score > 0.0 && score < 1.0);
}

#[test]
fn param_without_a_provenance_block_is_flagged() {
    let (diags, _) = check(
        r#"model M {
            param retention = 0.8;
        }"#,
    );
    assert_eq!(diags[0].code.as_str(), "E0400");
}

#[test]
fn negative_correlation_outside_range_is_invalid() {
    let (diags, _) = check(
        r#"model M {
            param a = $1 {
                source: "x", method: expert_estimate, confidence: 0.5,
                correlated_with: [(b, -1.5)]
            }
        }"#,
    );
    assert!(diags.iter().any(|d| d.code.as_str() == "E0601"));
}
