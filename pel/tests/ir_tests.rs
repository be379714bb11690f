use pel::driver::{compile, CompileOptions};

#[test]
fn ir_is_stable_across_two_identical_compiles() {
    let src = r#"model M {
        param price: Currency<USD> = $100 {
            source: "finance", method: expert_estimate, confidence: 0.9
        }
        var revenue = price * 10;
    }"#;
    let a = compile(src, "t.pel", &CompileOptions::default()).unwrap();
    let b = compile(src, "t.pel", &CompileOptions::default()).unwrap();

    let ir_a = a.ir.expect("first compile should succeed");
    let ir_b = b.ir.expect("second compile should succeed");
    assert_eq!(ir_a.metadata.model_hash, ir_b.metadata.model_hash);
}

#[test]
fn ir_changes_when_source_changes() {
    let opts = CompileOptions::default();
    let a = compile(
        r#"model M { param a = $1 { source: "x", method: expert_estimate, confidence: 0.5 } }"#,
        "t.pel",
        &opts,
    )
    .unwrap()
    .ir
    .unwrap();
    let b = compile(
        r#"model M { param a = $2 { source: "x", method: expert_estimate, confidence: 0.5 } }"#,
        "t.pel",
        &opts,
    )
    .unwrap()
    .ir
    .unwrap();
    assert_ne!(a.metadata.model_hash, b.metadata.model_hash);
}

#[test]
fn policy_with_forced_emit_preserves_action_statements() {
    let src = r#"model M {
        param threshold = 100;
        policy alert {
            when: threshold > 50,
            then: {
                fired = true;
            }
        }
    }"#;
    let out = compile(src, "t.pel", &CompileOptions { verbose: false, force: true }).unwrap();
    let ir = out.ir.unwrap();
    assert_eq!(ir.model.policies[0].action.len(), 1);
}
