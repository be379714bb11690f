use pel::ast::{BinaryOp, ExprKind, StmtKind};
use pel::lexer::Lexer;
use pel::parser;

fn parse(src: &str) -> pel::ast::Model {
    let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
    parser::parse(tokens).unwrap()
}

#[test]
fn full_model_with_constraint_and_policy_parses() {
    let model = parse(
        r#"model SaaSGrowth {
            param initial_customers: Count<customer> = 100 {
                source: "CRM export", method: observed, confidence: 1.0
            }
            param monthly_growth: Fraction = 10% {
                source: "board deck", method: expert_estimate, confidence: 0.7,
                correlated_with: [(monthly_churn, -0.4)]
            }
            param monthly_churn: Fraction = 5% {
                source: "analytics", method: observed, confidence: 0.85
            }

            constraint non_negative_customers: customers[t] >= 0 {
                severity: fatal
            }

            policy churn_alert {
                when: monthly_churn > 0.1,
                then: {
                    alert = true;
                }
            }
        }"#,
    );

    assert_eq!(model.name, "SaaSGrowth");
    assert_eq!(model.params.len(), 3);
    assert_eq!(model.constraints.len(), 1);
    assert_eq!(model.policies.len(), 1);
}

#[test]
fn if_then_else_expression_vs_if_statement() {
    let model = parse(
        r#"model M {
            func classify(x) {
                if x > 0 {
                    return 1;
                } else {
                    return -1;
                }
            }
            var label = if 1 > 0 then "pos" else "neg";
        }"#,
    );
    assert_eq!(model.funcs[0].body.len(), 1);
    match &model.funcs[0].body[0].kind {
        StmtKind::If { .. } => {}
        other => panic!("expected an if statement, got {other:?}"),
    }
    match &model.vars[0].value.as_ref().unwrap().kind {
        ExprKind::IfThenElse { .. } => {}
        other => panic!("expected an if-then-else expression, got {other:?}"),
    }
}

#[test]
fn indexing_with_arithmetic_inside_brackets() {
    let model = parse(
        r#"model M {
            var next_month = customers[t + 1];
        }"#,
    );
    match &model.vars[0].value.as_ref().unwrap().kind {
        ExprKind::Indexing { index, .. } => match &index.kind {
            ExprKind::BinaryOp { op: BinaryOp::Add, .. } => {}
            other => panic!("expected addition inside brackets, got {other:?}"),
        },
        other => panic!("expected indexing, got {other:?}"),
    }
}

#[test]
fn var_without_initializer_takes_its_equations_from_top_level_assignments() {
    let model = parse(
        r#"model M {
            param seed_customers: Count<customer> = 100 {
                source: "CRM", method: observed, confidence: 1.0
            }
            var customers: TimeSeries<Count<customer>>;
            customers[0] = seed_customers;
            customers[t+1] = customers[t] * 1.1;
        }"#,
    );
    assert!(model.vars[0].value.is_none());
    assert_eq!(model.statements.len(), 2);
    for stmt in &model.statements {
        match &stmt.kind {
            StmtKind::Assignment { target, .. } => match &target.kind {
                ExprKind::Indexing { .. } => {}
                other => panic!("expected an indexed assignment target, got {other:?}"),
            },
            other => panic!("expected an assignment statement, got {other:?}"),
        }
    }
}

#[test]
fn for_loop_statement_parses() {
    let model = parse(
        r#"model M {
            func total(xs) {
                var sum = 0;
                for x in xs {
                    sum = sum + x;
                }
                return sum;
            }
        }"#,
    );
    assert_eq!(model.funcs[0].body.len(), 3);
}
