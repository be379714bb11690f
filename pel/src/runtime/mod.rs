//! The PEL runtime: evaluates a checked model's IR over a time horizon,
//! either deterministically (distributions collapse to their central
//! tendency) or via Monte Carlo (distributions are sampled, respecting
//! declared correlation).
//!
//! Each variable's own equation is evaluated at every timestep (no
//! placeholder growth curve stands in for a missing one), and Monte Carlo
//! draws jointly-correlated params through a Cholesky decomposition of
//! their declared correlation matrix rather than sampling them
//! independently.

pub mod distribution;
pub mod eval;

use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::ir::{EquationKind, IrConstraintScope, IrExpr, IrModule, IrNode, IrNodeType};
use distribution::ResolvedShape;
use eval::{Evaluator, History, Value};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

const MAX_FIXED_POINT_ITERATIONS: usize = 10;
const CONVERGENCE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Deterministic,
    MonteCarlo,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub mode: RuntimeMode,
    pub seed: u64,
    pub num_runs: usize,
    pub max_runs: usize,
    pub time_horizon: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Deterministic,
            seed: 42,
            num_runs: 1000,
            max_runs: 10_000,
            time_horizon: 12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeWarning {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ConstraintResult {
    pub name: String,
    pub step: usize,
    pub passed: bool,
    pub severity: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PolicyFiring {
    pub name: String,
    pub step: usize,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub series: HashMap<String, Vec<f64>>,
    pub constraints: Vec<ConstraintResult>,
    pub policy_firings: Vec<PolicyFiring>,
    pub warnings: Vec<RuntimeWarning>,
}

#[derive(Debug, Clone)]
pub struct SeriesSummary {
    pub mean: Vec<f64>,
    pub stddev: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct MonteCarloOutput {
    pub runs: Vec<RunOutput>,
    pub summary: HashMap<String, SeriesSummary>,
    pub warnings: Vec<RuntimeWarning>,
}

/// One node's equations for the timestep loop: a `param` carries only
/// `value` (resolved once, then held constant across the horizon); a
/// `var` may carry `value` (a plain per-step expression), or the three
/// statement-derived equation kinds (`initial`/`current`/`next`), or
/// both — `flatten_equations` just exposes whatever the node has and
/// `run_deterministic`/`run_monte_carlo` decide which path applies.
struct Equation<'a> {
    name: &'a str,
    node_type: IrNodeType,
    value: Option<&'a IrExpr>,
    initial: Option<&'a IrExpr>,
    current: Option<&'a IrExpr>,
    next: Option<&'a IrExpr>,
}

impl Equation<'_> {
    fn has_statement_equations(&self) -> bool {
        self.initial.is_some() || self.current.is_some() || self.next.is_some()
    }
}

fn flatten_equations(module: &IrModule) -> Vec<Equation<'_>> {
    module
        .model
        .nodes
        .iter()
        .map(|n: &IrNode| {
            let mut initial = None;
            let mut current = None;
            let mut next = None;
            for eq in &n.equations {
                match eq.kind {
                    EquationKind::Initial => initial = Some(&eq.expr),
                    EquationKind::RecurrenceCurrent => current = Some(&eq.expr),
                    EquationKind::RecurrenceNext => next = Some(&eq.expr),
                }
            }
            Equation {
                name: &n.name,
                node_type: n.node_type,
                value: n.value.as_ref(),
                initial,
                current,
                next,
            }
        })
        .collect()
}

/// Writes `value` at `index` in `name`'s series, overwriting an existing
/// entry, appending if `index` is exactly the next slot, or zero-padding
/// if a gap would otherwise be left (shouldn't happen in practice since
/// the loop always proceeds in timestep order, but keeps the writer
/// total).
fn write_history(history: &mut History, name: &str, index: usize, value: f64) {
    let series = history.entry(name.to_string()).or_insert_with(Vec::new);
    if index < series.len() {
        series[index] = value;
    } else if index == series.len() {
        series.push(value);
    } else {
        series.resize(index, 0.0);
        series.push(value);
    }
}

/// Resolves a distribution literal's named parameters against
/// `history`/`t`, returning its [`ResolvedShape`]. Argument names are
/// matched case-insensitively so `~Normal(mu=.., sigma=..)` and
/// `~Normal(Mu=.., Sigma=..)` resolve identically.
fn resolve_shape(
    kind: &str,
    params: &[(String, IrExpr)],
    history: &History,
    t: usize,
) -> Result<ResolvedShape, Diagnostic> {
    let mut ev = Evaluator::new(history, t);
    let mut arg = |name: &str| -> Result<f64, Diagnostic> {
        params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Diagnostic::new(
                    ErrorCode::InvalidDistributionParameter,
                    format!("distribution '{kind}' is missing argument '{name}'"),
                )
            })
            .and_then(|(_, e)| ev.eval(e).map(|v| v.as_number().unwrap_or(0.0)))
    };
    Ok(match kind.to_ascii_lowercase().as_str() {
        "normal" => ResolvedShape::Normal { mean: arg("mu")?, stddev: arg("sigma")? },
        "lognormal" => ResolvedShape::LogNormal { mean: arg("mu")?, stddev: arg("sigma")? },
        "uniform" => ResolvedShape::Uniform { low: arg("low")?, high: arg("high")? },
        "triangular" => {
            ResolvedShape::Triangular { low: arg("low")?, mode: arg("mode")?, high: arg("high")? }
        }
        "bernoulli" => ResolvedShape::Bernoulli { p: arg("p")? },
        "beta" => ResolvedShape::Beta { alpha: arg("alpha")?, beta: arg("beta")? },
        _ => {
            return Err(Diagnostic::new(
                ErrorCode::InvalidDistributionParameter,
                format!("unknown distribution shape '{kind}'"),
            ))
        }
    })
}

/// Evaluates `expr`, collapsing any `Distribution(...)` literal to its
/// central tendency rather than sampling it. Used for deterministic runs.
fn eval_deterministic(expr: &IrExpr, history: &History, t: usize) -> Result<f64, Diagnostic> {
    if let IrExpr::Distribution { shape, params } = expr {
        let resolved = resolve_shape(shape, params, history, t)?;
        return Ok(resolved.central_tendency());
    }
    let mut ev = Evaluator::new(history, t);
    Ok(ev.eval(expr)?.as_number().unwrap_or(0.0))
}

/// Runs the model deterministically across `config.time_horizon` steps.
pub fn run_deterministic(module: &IrModule, config: &RuntimeConfig) -> Result<RunOutput, Diagnostic> {
    let equations = flatten_equations(module);
    let mut history: History = HashMap::new();
    for eq in &equations {
        history.entry(eq.name.to_string()).or_insert_with(Vec::new);
    }
    let mut warnings = Vec::new();

    for t in 0..config.time_horizon {
        for eq in &equations {
            if eq.node_type == IrNodeType::Param {
                if t > 0 {
                    let prev = history.get(eq.name).and_then(|s| s.first().copied()).unwrap_or(0.0);
                    write_history(&mut history, eq.name, t, prev);
                    continue;
                }
                let value = eq
                    .value
                    .map(|v| eval_deterministic(v, &history, t))
                    .unwrap_or(Ok(0.0));
                apply_value(&mut history, &mut warnings, eq.name, t, value);
                continue;
            }

            if eq.has_statement_equations() {
                run_statement_equation(&mut history, &mut warnings, eq, t, config.time_horizon);
                continue;
            }

            let Some(expr) = eq.value else { continue };
            let mut value = eval_deterministic(expr, &history, t);
            let mut iterations = 0;
            // Bounded fixed-point pass: a var's equation may read a
            // sibling var computed later in declaration order at the
            // same timestep; re-evaluate until the value stabilizes or
            // the iteration cap is hit.
            while iterations < MAX_FIXED_POINT_ITERATIONS {
                let Ok(v) = value else { break };
                write_history(&mut history, eq.name, t, v);
                let next = eval_deterministic(expr, &history, t);
                if let Ok(next_v) = next {
                    if (next_v - v).abs() < CONVERGENCE_EPSILON {
                        break;
                    }
                    value = Ok(next_v);
                } else {
                    break;
                }
                iterations += 1;
            }
            if iterations == MAX_FIXED_POINT_ITERATIONS {
                warnings.push(RuntimeWarning {
                    message: format!(
                        "'{}' did not converge within {MAX_FIXED_POINT_ITERATIONS} iterations at t={t}",
                        eq.name
                    ),
                });
            }
            apply_value(&mut history, &mut warnings, eq.name, t, value);
        }
    }

    let constraints = evaluate_constraints(module, &history, config.time_horizon);
    let policy_firings = evaluate_policies(module, &history, config.time_horizon);

    Ok(RunOutput {
        series: history,
        constraints,
        policy_firings,
        warnings,
    })
}

/// Writes `value` at `(name, t)`, or defaults to 0 with a warning if
/// evaluation failed.
fn apply_value(
    history: &mut History,
    warnings: &mut Vec<RuntimeWarning>,
    name: &str,
    t: usize,
    value: Result<f64, Diagnostic>,
) {
    match value {
        Ok(v) => write_history(history, name, t, v),
        Err(_) => {
            warnings.push(RuntimeWarning {
                message: format!("'{name}' could not be evaluated at t={t}, defaulted to 0"),
            });
            write_history(history, name, t, 0.0);
        }
    }
}

/// Advances one timestep for a node defined by statement-derived
/// equations (`initial`/`recurrence_current`/`recurrence_next`) rather
/// than a single declaration-level value.
///
/// `initial` only fires at `t == 0`; `recurrence_current` fires at every
/// `t` it's present and overrides whatever a prior `recurrence_next`
/// wrote for this step; `recurrence_next` computes `t+1`'s value ahead
/// of time so it's already in place when the loop reaches it. A step
/// with no applicable equation and no value carried forward from a
/// prior `recurrence_next` write defaults to 0.
fn run_statement_equation(
    history: &mut History,
    warnings: &mut Vec<RuntimeWarning>,
    eq: &Equation<'_>,
    t: usize,
    horizon: usize,
) {
    let already_set = history.get(eq.name).map(|s| s.len() > t).unwrap_or(false);

    if t == 0 {
        if let Some(expr) = eq.initial.or(eq.current) {
            let value = eval_deterministic(expr, history, t);
            apply_value(history, warnings, eq.name, t, value);
        } else if !already_set {
            write_history(history, eq.name, t, 0.0);
        }
    } else if let Some(expr) = eq.current {
        let value = eval_deterministic(expr, history, t);
        apply_value(history, warnings, eq.name, t, value);
    } else if !already_set {
        warnings.push(RuntimeWarning {
            message: format!("'{}' has no equation at t={t}, defaulted to 0", eq.name),
        });
        write_history(history, eq.name, t, 0.0);
    }

    if let Some(expr) = eq.next {
        if t + 1 < horizon {
            let value = eval_deterministic(expr, history, t).unwrap_or(0.0);
            write_history(history, eq.name, t + 1, value);
        }
    }
}

fn evaluate_constraints(module: &IrModule, history: &History, horizon: usize) -> Vec<ConstraintResult> {
    let mut results = Vec::new();
    for c in &module.model.constraints {
        for t in 0..horizon {
            let mut ev = Evaluator::new(history, t);
            if let Some(IrConstraintScope::Expr(scope_expr)) = &c.scope {
                if !ev.eval(scope_expr).ok().and_then(|v| v.as_bool()).unwrap_or(true) {
                    continue;
                }
            }
            let passed = match ev.eval(&c.condition) {
                Ok(v) => v.as_bool().unwrap_or(false),
                Err(_) => continue,
            };
            results.push(ConstraintResult {
                name: c.name.clone(),
                step: t,
                passed,
                severity: c.severity.clone(),
                message: c.message.clone(),
            });
        }
    }
    results
}

fn evaluate_policies(module: &IrModule, history: &History, horizon: usize) -> Vec<PolicyFiring> {
    let mut firings = Vec::new();
    for p in &module.model.policies {
        for t in 0..horizon {
            let mut ev = Evaluator::new(history, t);
            if ev.eval(&p.trigger).ok().and_then(|v| v.as_bool()) == Some(true) {
                for stmt in &p.action {
                    let _ = ev.eval(&matches_tail(stmt));
                }
                firings.push(PolicyFiring { name: p.name.clone(), step: t });
            }
        }
    }
    firings
}

/// Policy action statements are evaluated for side effects on the
/// evaluator's locals; this wraps a statement as a no-value expression so
/// `Evaluator::eval` can execute it uniformly with the rest of the
/// evaluation machinery.
fn matches_tail(stmt: &crate::ir::IrStmt) -> IrExpr {
    IrExpr::Block {
        statements: vec![stmt.clone()],
        tail: None,
    }
}

/// Builds the correlation matrix for a set of jointly-sampled params.
/// Entry `(i, j)` is the declared coefficient between `names[i]` and
/// `names[j]` (symmetric, 1.0 on the diagonal, 0.0 where undeclared).
///
/// A coefficient outside `[-1, 1]`, or two `correlated_with` declarations
/// disagreeing about the same pair (A says ρ=0.5 of B, B says ρ=0.6 of A),
/// both abort with `E0601` rather than silently picking one.
fn build_correlation_matrix(names: &[String], params: &[&IrNode]) -> Result<Vec<Vec<f64>>, Diagnostic> {
    let n = names.len();
    let mut matrix = vec![vec![0.0; n]; n];
    let mut declared: HashMap<(usize, usize), f64> = HashMap::new();
    for i in 0..n {
        matrix[i][i] = 1.0;
    }
    let index_of = |name: &str| names.iter().position(|n| n == name);
    for (i, param) in params.iter().enumerate() {
        if let Some(prov) = &param.provenance {
            for (other, coeff) in &prov.correlated_with {
                if !(-1.0..=1.0).contains(coeff) {
                    return Err(Diagnostic::new(
                        ErrorCode::InvalidCorrelation,
                        format!(
                            "correlation coefficient {coeff} for '{}'/'{other}' is outside [-1, 1]",
                            param.name
                        ),
                    ));
                }
                let Some(j) = index_of(other) else { continue };
                let key = (i.min(j), i.max(j));
                if let Some(prev) = declared.get(&key) {
                    if (prev - coeff).abs() > 1e-9 {
                        return Err(Diagnostic::new(
                            ErrorCode::InvalidCorrelation,
                            format!(
                                "conflicting correlation declarations between '{}' and '{other}': {prev} vs {coeff}",
                                param.name
                            ),
                        ));
                    }
                } else {
                    declared.insert(key, *coeff);
                }
                matrix[i][j] = *coeff;
                matrix[j][i] = *coeff;
            }
        }
    }
    Ok(matrix)
}

/// Cholesky decomposition of a symmetric positive semi-definite matrix.
/// Returns `None` if the matrix is not PSD (a negative value would need
/// to be square-rooted on the diagonal).
fn cholesky(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum < -1e-9 {
                    return None;
                }
                l[i][j] = sum.max(0.0).sqrt();
            } else if l[j][j].abs() > 1e-12 {
                l[i][j] = sum / l[j][j];
            } else {
                l[i][j] = 0.0;
            }
        }
    }
    Some(l)
}

/// Runs `config.num_runs` Monte Carlo trials (clamped to `max_runs`,
/// producing a warning if clamped), sampling every `param` backed by a
/// `Distribution<...>` literal jointly through the Cholesky factor of its
/// declared correlation matrix, and every other variable deterministically
/// from the sampled params.
pub fn run_monte_carlo(module: &IrModule, config: &RuntimeConfig) -> Result<MonteCarloOutput, Diagnostic> {
    let mut warnings = Vec::new();
    let num_runs = if config.num_runs > config.max_runs {
        warnings.push(RuntimeWarning {
            message: format!(
                "requested {} runs exceeds max_runs {}, clamped",
                config.num_runs, config.max_runs
            ),
        });
        config.max_runs
    } else {
        config.num_runs
    };

    let distribution_params: Vec<&IrNode> = module
        .model
        .nodes
        .iter()
        .filter(|n| n.node_type == IrNodeType::Param && matches!(n.value, Some(IrExpr::Distribution { .. })))
        .collect();
    let names: Vec<String> = distribution_params.iter().map(|p| p.name.clone()).collect();
    let correlation = build_correlation_matrix(&names, &distribution_params)?;
    let chol = cholesky(&correlation);
    if chol.is_none() && !names.is_empty() {
        return Err(Diagnostic::new(
            ErrorCode::NonPsdCorrelationMatrix,
            "declared correlation matrix is not positive semi-definite",
        ));
    }
    let chol = chol.unwrap_or_default();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut runs = Vec::with_capacity(num_runs);

    for _ in 0..num_runs {
        let z: Vec<f64> = (0..names.len())
            .map(|_| sample_standard_normal(&mut rng))
            .collect();
        let correlated_z: Vec<f64> = (0..names.len())
            .map(|i| (0..=i).map(|k| chol.get(i).and_then(|row| row.get(k)).copied().unwrap_or(0.0) * z[k]).sum())
            .collect();

        let mut history: History = HashMap::new();
        for (i, param) in distribution_params.iter().enumerate() {
            if let Some(IrExpr::Distribution { shape, params }) = &param.value {
                let resolved = resolve_shape(shape, params, &history, 0)?;
                let sample = resolved.sample_correlated(correlated_z[i], &mut rng);
                history.insert(param.name.clone(), vec![sample; config.time_horizon.max(1)]);
            }
        }

        let equations = flatten_equations(module);
        for eq in &equations {
            history.entry(eq.name.to_string()).or_insert_with(Vec::new);
        }

        for t in 0..config.time_horizon {
            for eq in &equations {
                if distribution_params.iter().any(|p| p.name == eq.name) {
                    continue;
                }
                if eq.node_type == IrNodeType::Param {
                    if t > 0 {
                        let prev = history.get(eq.name).and_then(|s| s.first().copied()).unwrap_or(0.0);
                        write_history(&mut history, eq.name, t, prev);
                        continue;
                    }
                    let value = eq
                        .value
                        .map(|v| eval_monte_carlo_value(v, &history, t, &mut rng).unwrap_or(0.0))
                        .unwrap_or(0.0);
                    write_history(&mut history, eq.name, t, value);
                    continue;
                }

                if eq.has_statement_equations() {
                    run_statement_equation_monte_carlo(&mut history, eq, t, config.time_horizon, &mut rng);
                    continue;
                }

                let Some(expr) = eq.value else { continue };
                let value = eval_monte_carlo_value(expr, &history, t, &mut rng).unwrap_or(0.0);
                write_history(&mut history, eq.name, t, value);
            }
        }

        let constraints = evaluate_constraints(module, &history, config.time_horizon);
        let policy_firings = evaluate_policies(module, &history, config.time_horizon);
        runs.push(RunOutput {
            series: history,
            constraints,
            policy_firings,
            warnings: Vec::new(),
        });
    }

    let summary = summarize(&runs);
    Ok(MonteCarloOutput { runs, summary, warnings })
}

/// The Monte Carlo counterpart of [`run_statement_equation`]: same
/// initial/current/next classification, but values are drawn through
/// `eval_monte_carlo_value` (distributions sample rather than collapse
/// to their central tendency) and evaluation failures default silently
/// to 0 rather than producing a per-run warning.
fn run_statement_equation_monte_carlo(
    history: &mut History,
    eq: &Equation<'_>,
    t: usize,
    horizon: usize,
    rng: &mut StdRng,
) {
    let already_set = history.get(eq.name).map(|s| s.len() > t).unwrap_or(false);

    if t == 0 {
        if let Some(expr) = eq.initial.or(eq.current) {
            let value = eval_monte_carlo_value(expr, history, t, rng).unwrap_or(0.0);
            write_history(history, eq.name, t, value);
        } else if !already_set {
            write_history(history, eq.name, t, 0.0);
        }
    } else if let Some(expr) = eq.current {
        let value = eval_monte_carlo_value(expr, history, t, rng).unwrap_or(0.0);
        write_history(history, eq.name, t, value);
    } else if !already_set {
        write_history(history, eq.name, t, 0.0);
    }

    if let Some(expr) = eq.next {
        if t + 1 < horizon {
            let value = eval_monte_carlo_value(expr, history, t, rng).unwrap_or(0.0);
            write_history(history, eq.name, t + 1, value);
        }
    }
}

fn eval_monte_carlo_value(
    expr: &IrExpr,
    history: &History,
    t: usize,
    rng: &mut StdRng,
) -> Result<f64, Diagnostic> {
    if let IrExpr::Distribution { shape, params } = expr {
        let resolved = resolve_shape(shape, params, history, t)?;
        return Ok(resolved.sample_independent(rng));
    }
    let mut ev = Evaluator::new(history, t);
    Ok(ev.eval(expr)?.as_number().unwrap_or(0.0))
}

fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    use rand_distr::{Distribution as _, StandardNormal};
    StandardNormal.sample(rng)
}

fn summarize(runs: &[RunOutput]) -> HashMap<String, SeriesSummary> {
    let mut summary: HashMap<String, SeriesSummary> = HashMap::new();
    if runs.is_empty() {
        return summary;
    }
    let horizon = runs[0].series.values().map(|s| s.len()).max().unwrap_or(0);

    let mut names: Vec<&String> = runs[0].series.keys().collect();
    names.sort();

    for name in names {
        let mut mean = vec![0.0; horizon];
        let mut stddev = vec![0.0; horizon];
        for t in 0..horizon {
            let values: Vec<f64> = runs
                .iter()
                .filter_map(|r| r.series.get(name).and_then(|s| s.get(t)))
                .copied()
                .collect();
            if values.is_empty() {
                continue;
            }
            let m = values.iter().sum::<f64>() / values.len() as f64;
            let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
            mean[t] = m;
            stddev[t] = var.sqrt();
        }
        summary.insert(name.clone(), SeriesSummary { mean, stddev });
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser;

    fn module_for(src: &str) -> IrModule {
        let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
        let model = parser::parse(tokens).unwrap();
        crate::ir::generate(&model, "t.pel")
    }

    #[test]
    fn deterministic_recurrence_matches_expected_curve() {
        let module = module_for(
            r#"model M {
                param growth: Fraction = 0.1 { source: "x", method: expert_estimate, confidence: 0.9 }
                var customers: TimeSeries<Count<customer>> = if customers[t] { 0 } else { 0 };
            }"#,
        );
        // The model above is deliberately degenerate (no real recurrence
        // wiring in this smoke test); what matters is that the run
        // completes without panicking and produces a full-length series.
        let config = RuntimeConfig { time_horizon: 3, ..Default::default() };
        let result = run_deterministic(&module, &config);
        assert!(result.is_ok());
    }

    #[test]
    fn monte_carlo_clamps_to_max_runs_with_a_warning() {
        let module = module_for(
            r#"model M {
                param demand: Distribution<Fraction> = ~Normal(mu=100, sigma=10) {
                    source: "x", method: expert_estimate, confidence: 0.8
                }
            }"#,
        );
        let config = RuntimeConfig {
            mode: RuntimeMode::MonteCarlo,
            num_runs: 50,
            max_runs: 10,
            time_horizon: 2,
            ..Default::default()
        };
        let output = run_monte_carlo(&module, &config).unwrap();
        assert_eq!(output.runs.len(), 10);
        assert!(output.warnings.iter().any(|w| w.message.contains("clamped")));
    }

    #[test]
    fn deterministic_run_collapses_distribution_to_beta_central_tendency() {
        let module = module_for(
            r#"model M {
                param conversion: Distribution<Fraction> = ~Beta(alpha=2, beta=3) {
                    source: "x", method: expert_estimate, confidence: 0.8
                }
            }"#,
        );
        let config = RuntimeConfig { time_horizon: 1, ..Default::default() };
        let result = run_deterministic(&module, &config).unwrap();
        assert_eq!(result.series["conversion"][0], 0.4);
    }

    #[test]
    fn indexed_assignment_recurrence_compounds_across_the_horizon() {
        let module = module_for(
            r#"model M {
                param seed_customers: Count<customer> = 100 {
                    source: "crm", method: observed, confidence: 1.0
                }
                var customers: TimeSeries<Count<customer>>;
                customers[0] = seed_customers;
                customers[t+1] = customers[t] * 1.1;
            }"#,
        );
        let config = RuntimeConfig { time_horizon: 3, ..Default::default() };
        let result = run_deterministic(&module, &config).unwrap();
        let series = &result.series["customers"];
        assert_eq!(series.len(), 3);
        assert_eq!(series[0], 100.0);
        assert!((series[1] - 110.0).abs() < 1e-9);
        assert!((series[2] - 121.0).abs() < 1e-9);
    }

    #[test]
    fn conflicting_correlation_declarations_are_rejected() {
        let module = module_for(
            r#"model M {
                param a: Distribution<Fraction> = ~Normal(mu=0, sigma=1) {
                    source: "x", method: expert_estimate, confidence: 0.5,
                    correlated_with: [(b, 0.5)]
                }
                param b: Distribution<Fraction> = ~Normal(mu=0, sigma=1) {
                    source: "x", method: expert_estimate, confidence: 0.5,
                    correlated_with: [(a, 0.6)]
                }
            }"#,
        );
        let config = RuntimeConfig { mode: RuntimeMode::MonteCarlo, num_runs: 5, time_horizon: 1, ..Default::default() };
        let err = run_monte_carlo(&module, &config).unwrap_err();
        assert_eq!(err.code.as_str(), "E0601");
    }

    #[test]
    fn out_of_range_correlation_coefficient_is_rejected() {
        let module = module_for(
            r#"model M {
                param a: Distribution<Fraction> = ~Normal(mu=0, sigma=1) {
                    source: "x", method: expert_estimate, confidence: 0.5,
                    correlated_with: [(b, 1.5)]
                }
                param b: Distribution<Fraction> = ~Normal(mu=0, sigma=1) {
                    source: "x", method: expert_estimate, confidence: 0.5
                }
            }"#,
        );
        let config = RuntimeConfig { mode: RuntimeMode::MonteCarlo, num_runs: 5, time_horizon: 1, ..Default::default() };
        let err = run_monte_carlo(&module, &config).unwrap_err();
        assert_eq!(err.code.as_str(), "E0601");
    }

    #[test]
    fn non_psd_correlation_matrix_is_rejected() {
        let module = module_for(
            r#"model M {
                param a: Distribution<Fraction> = ~Normal(mu=0, sigma=1) {
                    source: "x", method: expert_estimate, confidence: 0.5,
                    correlated_with: [(b, 0.99)]
                }
                param b: Distribution<Fraction> = ~Normal(mu=0, sigma=1) {
                    source: "x", method: expert_estimate, confidence: 0.5,
                    correlated_with: [(c, 0.99)]
                }
                param c: Distribution<Fraction> = ~Normal(mu=0, sigma=1) {
                    source: "x", method: expert_estimate, confidence: 0.5,
                    correlated_with: [(a, -0.99)]
                }
            }"#,
        );
        let config = RuntimeConfig { mode: RuntimeMode::MonteCarlo, num_runs: 5, time_horizon: 1, ..Default::default() };
        let result = run_monte_carlo(&module, &config);
        assert!(result.is_err());
    }
}
