use pel::checker::TypeChecker;
use pel::lexer::Lexer;
use pel::parser;

fn diagnostics(src: &str) -> Vec<pel::Diagnostic> {
    let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
    let model = parser::parse(tokens).unwrap();
    TypeChecker::new().check(&model)
}

#[test]
fn rate_times_duration_in_a_real_model_type_checks() {
    let diags = diagnostics(
        r#"model M {
            param monthly_fee: Rate per mo = $10 {
                source: "pricing", method: expert_estimate, confidence: 0.9
            }
            param term: Duration = 12mo {
                source: "contract", method: observed, confidence: 1.0
            }
            var total = monthly_fee * term;
        }"#,
    );
    assert!(diags.is_empty(), "{diags:?}");
}

#[test]
fn generic_duration_literal_unifies_with_a_concrete_unit_param() {
    let diags = diagnostics(
        r#"model M {
            param term: Duration = 1yr {
                source: "contract", method: observed, confidence: 1.0
            }
            var horizon = term;
        }"#,
    );
    assert!(diags.is_empty(), "{diags:?}");
}

#[test]
fn incompatible_comparison_across_currencies_is_flagged() {
    let diags = diagnostics(
        r#"model M {
            param usd_price: Currency<USD> = $100 {
                source: "x", method: expert_estimate, confidence: 0.5
            }
            param eur_price: Currency<EUR> = $90 {
                source: "x", method: expert_estimate, confidence: 0.5
            }
            constraint c: usd_price > eur_price;
        }"#,
    );
    assert!(diags.iter().any(|d| d.code.as_str() == "E0200"));
}
