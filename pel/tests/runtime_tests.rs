use pel::driver::{compile, CompileOptions};
use pel::runtime::{run_deterministic, run_monte_carlo, RuntimeConfig, RuntimeMode};

#[test]
fn deterministic_compound_growth_matches_hand_computed_values() {
    let src = r#"model M {
        param growth: Fraction = 10% {
            source: "plan", method: expert_estimate, confidence: 0.8
        }
        param initial: Count<customer> = 100 {
            source: "crm", method: observed, confidence: 1.0
        }
        var customers = if t == 0 then initial else customers[t - 1] * (1 + growth);
    }"#;
    let out = compile(src, "t.pel", &CompileOptions { verbose: false, force: true }).unwrap();
    let ir = out.ir.unwrap();
    let config = RuntimeConfig { time_horizon: 3, ..RuntimeConfig::default() };
    let result = run_deterministic(&ir, &config).unwrap();
    let customers = &result.series["customers"];
    assert_eq!(customers.len(), 3);
    assert!((customers[0] - 100.0).abs() < 1e-6);
    assert!((customers[1] - 110.0).abs() < 1e-6);
    assert!((customers[2] - 121.0).abs() < 1e-6);
}

#[test]
fn monte_carlo_is_reproducible_for_the_same_seed() {
    let src = r#"model M {
        param demand: Distribution<Fraction> = ~Normal(mu=100, sigma=15) {
            source: "sales", method: expert_estimate, confidence: 0.6
        }
    }"#;
    let out = compile(src, "t.pel", &CompileOptions { verbose: false, force: true }).unwrap();
    let ir = out.ir.unwrap();
    let config = RuntimeConfig {
        mode: RuntimeMode::MonteCarlo,
        seed: 7,
        num_runs: 20,
        time_horizon: 1,
        ..RuntimeConfig::default()
    };
    let a = run_monte_carlo(&ir, &config).unwrap();
    let b = run_monte_carlo(&ir, &config).unwrap();
    assert_eq!(
        a.summary["demand"].mean,
        b.summary["demand"].mean
    );
}

#[test]
fn run_count_is_clamped_to_max_runs() {
    let src = r#"model M {
        param x: Distribution<Fraction> = ~Uniform(low=0, high=1) {
            source: "x", method: expert_estimate, confidence: 0.5
        }
    }"#;
    let out = compile(src, "t.pel", &CompileOptions { verbose: false, force: true }).unwrap();
    let ir = out.ir.unwrap();
    let config = RuntimeConfig {
        mode: RuntimeMode::MonteCarlo,
        num_runs: 200,
        max_runs: 25,
        time_horizon: 1,
        ..RuntimeConfig::default()
    };
    let result = run_monte_carlo(&ir, &config).unwrap();
    assert_eq!(result.runs.len(), 25);
}
