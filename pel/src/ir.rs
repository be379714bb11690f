//! The JSON intermediate representation: a serializable, content-hashed
//! snapshot of a checked [`Model`], suitable for feeding the runtime or an
//! external tool without re-parsing PEL source.
//!
//! Canonical form: `serde_json`'s default map type sorts keys, so
//! `serde_json::to_string` of any [`IrModelBody`] already produces a
//! deterministic sorted-keys encoding; the hash is computed over exactly
//! that string (the `metadata` wrapper, which carries the hash itself and
//! a wall-clock timestamp, is excluded from the hashed bytes).

use crate::ast::*;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum IrLiteral {
    Number { value: f64 },
    Currency { amount: f64, code: Option<String> },
    Duration { text: String },
    Boolean { value: bool },
    Text { value: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "expr_type")]
pub enum IrExpr {
    Literal { value: IrLiteral },
    Variable { name: String },
    BinaryOp { op: String, left: Box<IrExpr>, right: Box<IrExpr> },
    UnaryOp { op: String, operand: Box<IrExpr> },
    FunctionCall { callee: String, args: Vec<IrExpr> },
    Indexing { target: Box<IrExpr>, index: Box<IrExpr> },
    ArrayLiteral { items: Vec<IrExpr> },
    Lambda { params: Vec<String>, body: Box<IrExpr> },
    MemberAccess { target: Box<IrExpr>, member: String },
    IfThenElse { condition: Box<IrExpr>, then_branch: Box<IrExpr>, else_branch: Box<IrExpr> },
    Distribution { shape: String, params: Vec<(String, IrExpr)> },
    Block { statements: Vec<IrStmt>, tail: Option<Box<IrExpr>> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum IrStmt {
    Assignment { target: IrExpr, value: IrExpr },
    Return { value: Option<IrExpr> },
    If { condition: IrExpr, then_branch: Vec<IrStmt>, else_branch: Option<Vec<IrStmt>> },
    For { var: String, iterable: IrExpr, body: Vec<IrStmt> },
    Expr { expr: IrExpr },
    VarDecl { name: String, mutable: bool, value: Option<IrExpr> },
    EmitEvent { name: String, args: Vec<(String, IrExpr)> },
}

#[derive(Debug, Clone, Serialize)]
pub struct IrProvenance {
    pub source: Option<String>,
    pub method: Option<String>,
    pub confidence: Option<f64>,
    pub freshness: Option<String>,
    pub owner: Option<String>,
    pub notes: Option<String>,
    pub correlated_with: Vec<(String, f64)>,
}

/// A node's equation classification: `customers[0] = ...` seeds the
/// series, `customers[t] = ...` recomputes the current step, and
/// `customers[t+1] = ...` writes the next one. A node may carry any
/// combination (or none, if it's defined only by its declaration's own
/// `value`).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EquationKind {
    Initial,
    RecurrenceCurrent,
    RecurrenceNext,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrEquation {
    pub kind: EquationKind,
    pub expr: IrExpr,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IrNodeType {
    Param,
    Var,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrNode {
    pub node_id: String,
    pub node_type: IrNodeType,
    pub name: String,
    pub type_annotation: Option<String>,
    /// The single defining expression from `param NAME = EXPR` or
    /// `var NAME = EXPR`; absent for a `var` whose equations instead come
    /// entirely from indexed assignment statements (see `equations`).
    pub value: Option<IrExpr>,
    /// Indexed-assignment equations discovered among the model's
    /// top-level statements, grouped by [`EquationKind`].
    pub equations: Vec<IrEquation>,
    pub provenance: Option<IrProvenance>,
    /// Names of other nodes this node's `value`/`equations` read.
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrFunc {
    pub name: String,
    pub params: Vec<(String, Option<String>)>,
    pub return_type: Option<String>,
    pub body: Vec<IrStmt>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum IrConstraintScope {
    Named { name: String },
    Expr { expr: IrExpr },
}

#[derive(Debug, Clone, Serialize)]
pub struct IrConstraint {
    pub id: String,
    pub name: String,
    pub condition: IrExpr,
    pub scope: Option<IrConstraintScope>,
    pub severity: String,
    pub message: Option<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrPolicy {
    pub id: String,
    pub name: String,
    pub trigger: IrExpr,
    pub action: Vec<IrStmt>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrModelBody {
    pub name: String,
    pub time_horizon: Option<usize>,
    pub time_unit: String,
    pub nodes: Vec<IrNode>,
    pub constraints: Vec<IrConstraint>,
    pub policies: Vec<IrPolicy>,
    /// Lowered function declarations; not part of the node/constraint/
    /// policy triad but kept alongside it so the IR remains a complete,
    /// standalone program.
    pub funcs: Vec<IrFunc>,
    /// Top-level statements that are not indexed-assignment equations
    /// already folded into a `var` node (e.g. a bare `for` loop).
    pub statements: Vec<IrStmt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrMetadata {
    pub model_hash: String,
    pub compiled_at: String,
    pub compiler_version: String,
    pub source_file: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrModule {
    pub version: String,
    pub model: IrModelBody,
    pub metadata: IrMetadata,
}

/// A time-indexed assignment statement's right-hand side, still carrying
/// the AST [`Expr`] it was parsed from so dependency extraction can run
/// before lowering.
struct PendingEquation {
    kind: EquationKind,
    value: Expr,
}

/// Builds the IR for `model` and stamps it with a `sha256:`-prefixed
/// content hash computed over the canonical (sorted-keys) JSON encoding
/// of the `model` sub-document.
pub fn generate(model: &Model, source_file: &str) -> IrModule {
    let mut statement_equations = collect_statement_equations(&model.statements);

    let mut nodes = Vec::new();
    for (i, p) in model.params.iter().enumerate() {
        nodes.push(lower_param_node(p, i));
    }
    for (i, v) in model.vars.iter().enumerate() {
        let equations = statement_equations.remove(&v.name).unwrap_or_default();
        nodes.push(lower_var_node(v, i, &equations));
    }

    let statements = model
        .statements
        .iter()
        .filter(|s| !is_equation_assignment(s))
        .map(lower_stmt)
        .collect();

    let mut module = IrModule {
        version: "0.1.0".to_string(),
        model: IrModelBody {
            name: model.name.clone(),
            time_horizon: model.time_horizon,
            time_unit: model.time_unit.clone(),
            nodes,
            constraints: model.constraints.iter().map(lower_constraint).collect(),
            policies: model.policies.iter().map(lower_policy).collect(),
            funcs: model.funcs.iter().map(lower_func).collect(),
            statements,
        },
        metadata: IrMetadata {
            model_hash: String::new(),
            compiled_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
            source_file: source_file.to_string(),
        },
    };

    // Route through `serde_json::Value` rather than serializing the struct
    // directly: derived `Serialize` impls emit object keys in field
    // declaration order, but `Value::Object` (without the `preserve_order`
    // feature, which this crate doesn't enable) is `BTreeMap`-backed, so
    // round-tripping through it gives the lexicographically-sorted key
    // order spec.md's IR-hashing invariant requires.
    let value = serde_json::to_value(&module.model).expect("IrModelBody always serializes");
    let canonical = serde_json::to_string(&value).expect("a Value always serializes");
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    module.metadata.model_hash = format!("sha256:{:x}", hasher.finalize());
    module
}

/// Recognizes `customers[0] = ...`, `customers[t] = ...`, and
/// `customers[t+1] = ...` (either operand order) among a statement list,
/// keyed by the target variable's name.
fn collect_statement_equations(statements: &[Stmt]) -> HashMap<String, Vec<PendingEquation>> {
    let mut map: HashMap<String, Vec<PendingEquation>> = HashMap::new();
    for stmt in statements {
        if let StmtKind::Assignment { target, value } = &stmt.kind {
            if let ExprKind::Indexing { target: base, index } = &target.kind {
                if let ExprKind::Variable(name) = &base.kind {
                    if let Some(kind) = equation_kind(index) {
                        map.entry(name.clone())
                            .or_default()
                            .push(PendingEquation { kind, value: value.clone() });
                    }
                }
            }
        }
    }
    map
}

fn is_equation_assignment(stmt: &Stmt) -> bool {
    if let StmtKind::Assignment { target, .. } = &stmt.kind {
        if let ExprKind::Indexing { target: base, index } = &target.kind {
            if matches!(&base.kind, ExprKind::Variable(_)) {
                return equation_kind(index).is_some();
            }
        }
    }
    false
}

/// Classifies an indexing expression's index as `initial` (literal `0`),
/// `recurrence_current` (bare `t`), or `recurrence_next` (`t+1` or
/// `1+t`); any other index shape (e.g. `t+2`, `t-1`) is not a recognized
/// equation and is left as an ordinary statement.
fn equation_kind(index: &Expr) -> Option<EquationKind> {
    match &index.kind {
        ExprKind::Literal(Literal::Number(n)) if *n == 0.0 => Some(EquationKind::Initial),
        ExprKind::Variable(name) if name == "t" => Some(EquationKind::RecurrenceCurrent),
        ExprKind::BinaryOp { op: BinaryOp::Add, left, right } => {
            let is_t = |e: &Expr| matches!(&e.kind, ExprKind::Variable(n) if n == "t");
            let is_one = |e: &Expr| matches!(&e.kind, ExprKind::Literal(Literal::Number(n)) if *n == 1.0);
            if (is_t(left) && is_one(right)) || (is_one(left) && is_t(right)) {
                Some(EquationKind::RecurrenceNext)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn lower_param_node(p: &ParamDecl, index: usize) -> IrNode {
    let mut deps = BTreeSet::new();
    extract_dependencies(&p.value, &mut deps);
    IrNode {
        node_id: format!("param_{index}"),
        node_type: IrNodeType::Param,
        name: p.name.clone(),
        type_annotation: p.type_annotation.as_ref().map(annotation_text),
        value: Some(lower_expr(&p.value)),
        equations: Vec::new(),
        provenance: p.provenance.as_ref().map(lower_provenance),
        dependencies: deps.into_iter().collect(),
    }
}

fn lower_var_node(v: &VarDecl, index: usize, equations: &[PendingEquation]) -> IrNode {
    let mut deps = BTreeSet::new();
    if let Some(value) = &v.value {
        extract_dependencies(value, &mut deps);
    }
    for eq in equations {
        extract_dependencies(&eq.value, &mut deps);
    }
    IrNode {
        node_id: format!("var_{index}"),
        node_type: IrNodeType::Var,
        name: v.name.clone(),
        type_annotation: v.type_annotation.as_ref().map(annotation_text),
        value: v.value.as_ref().map(lower_expr),
        equations: equations
            .iter()
            .map(|e| IrEquation { kind: e.kind, expr: lower_expr(&e.value) })
            .collect(),
        provenance: None,
        dependencies: deps.into_iter().collect(),
    }
}

fn lower_func(f: &FuncDecl) -> IrFunc {
    IrFunc {
        name: f.name.clone(),
        params: f
            .params
            .iter()
            .map(|(n, t)| (n.clone(), t.as_ref().map(annotation_text)))
            .collect(),
        return_type: f.return_type.as_ref().map(annotation_text),
        body: f.body.iter().map(lower_stmt).collect(),
    }
}

fn lower_provenance(p: &Provenance) -> IrProvenance {
    IrProvenance {
        source: p.source.clone(),
        method: p.method.clone(),
        confidence: p.confidence,
        freshness: p.freshness.clone(),
        owner: p.owner.clone(),
        notes: p.notes.clone(),
        correlated_with: p.correlated_with.clone(),
    }
}

fn lower_constraint(c: &Constraint) -> IrConstraint {
    let mut deps = BTreeSet::new();
    extract_dependencies(&c.condition, &mut deps);
    if let Some(ConstraintScope::Expr(e)) = &c.scope {
        extract_dependencies(e, &mut deps);
    }
    IrConstraint {
        id: format!("const_{}", c.name),
        name: c.name.clone(),
        condition: lower_expr(&c.condition),
        // Kept as whatever shape the parser produced — a bare name or a
        // full expression — rather than forced into one common shape.
        scope: c.scope.as_ref().map(|s| match s {
            ConstraintScope::Named(n) => IrConstraintScope::Named { name: n.clone() },
            ConstraintScope::Expr(e) => IrConstraintScope::Expr { expr: lower_expr(e) },
        }),
        severity: match c.severity {
            ConstraintSeverity::Fatal => "fatal",
            ConstraintSeverity::Warning => "warning",
            ConstraintSeverity::Info => "info",
        }
        .to_string(),
        message: c.message.clone(),
        dependencies: deps.into_iter().collect(),
    }
}

/// Lowers a policy's full trigger condition and action body so the
/// runtime can actually evaluate policies, rather than emitting an empty
/// stub.
fn lower_policy(p: &Policy) -> IrPolicy {
    let mut deps = BTreeSet::new();
    extract_dependencies(&p.trigger.condition, &mut deps);
    extract_action_dependencies(&p.action, &mut deps);
    IrPolicy {
        id: format!("policy_{}", p.name),
        name: p.name.clone(),
        trigger: lower_expr(&p.trigger.condition),
        action: lower_action(&p.action),
        dependencies: deps.into_iter().collect(),
    }
}

/// Flattens an [`Action`] into the [`IrStmt`] sequence the runtime steps
/// through when a policy fires: a nested `block` flattens into its
/// members in order, everything else lowers to a single statement.
fn lower_action(action: &Action) -> Vec<IrStmt> {
    match action {
        Action::Assign { target, value } => vec![IrStmt::Assignment {
            target: lower_expr(target),
            value: lower_expr(value),
        }],
        Action::EmitEvent { name, args } => vec![IrStmt::EmitEvent {
            name: name.clone(),
            args: args.iter().map(|(n, e)| (n.clone(), lower_expr(e))).collect(),
        }],
        Action::Block(actions) => actions.iter().flat_map(lower_action).collect(),
        Action::Expr(expr) => vec![IrStmt::Expr { expr: lower_expr(expr) }],
    }
}

fn extract_action_dependencies(action: &Action, out: &mut BTreeSet<String>) {
    match action {
        Action::Assign { target, value } => {
            extract_dependencies(target, out);
            extract_dependencies(value, out);
        }
        Action::EmitEvent { args, .. } => {
            for (_, e) in args {
                extract_dependencies(e, out);
            }
        }
        Action::Block(actions) => {
            for a in actions {
                extract_action_dependencies(a, out);
            }
        }
        Action::Expr(expr) => extract_dependencies(expr, out),
    }
}

fn lower_expr(expr: &Expr) -> IrExpr {
    match &expr.kind {
        ExprKind::Literal(lit) => IrExpr::Literal { value: lower_literal(lit) },
        ExprKind::Variable(name) => IrExpr::Variable { name: name.clone() },
        ExprKind::BinaryOp { op, left, right } => IrExpr::BinaryOp {
            op: binary_op_text(op).to_string(),
            left: Box::new(lower_expr(left)),
            right: Box::new(lower_expr(right)),
        },
        ExprKind::UnaryOp { op, operand } => IrExpr::UnaryOp {
            op: match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
            }
            .to_string(),
            operand: Box::new(lower_expr(operand)),
        },
        ExprKind::FunctionCall { callee, args } => IrExpr::FunctionCall {
            callee: callee.clone(),
            args: args.iter().map(lower_expr).collect(),
        },
        ExprKind::Indexing { target, index } => IrExpr::Indexing {
            target: Box::new(lower_expr(target)),
            index: Box::new(lower_expr(index)),
        },
        ExprKind::ArrayLiteral(items) => IrExpr::ArrayLiteral {
            items: items.iter().map(lower_expr).collect(),
        },
        ExprKind::Lambda { params, body } => IrExpr::Lambda {
            params: params.clone(),
            body: Box::new(lower_expr(body)),
        },
        ExprKind::MemberAccess { target, member } => IrExpr::MemberAccess {
            target: Box::new(lower_expr(target)),
            member: member.clone(),
        },
        ExprKind::IfThenElse {
            condition,
            then_branch,
            else_branch,
        } => IrExpr::IfThenElse {
            condition: Box::new(lower_expr(condition)),
            then_branch: Box::new(lower_expr(then_branch)),
            else_branch: Box::new(lower_expr(else_branch)),
        },
        ExprKind::Distribution(shape) => lower_distribution(shape),
        ExprKind::Block(stmts, tail) => IrExpr::Block {
            statements: stmts.iter().map(lower_stmt).collect(),
            tail: tail.as_ref().map(|t| Box::new(lower_expr(t))),
        },
    }
}

fn lower_literal(lit: &Literal) -> IrLiteral {
    match lit {
        Literal::Number(v) => IrLiteral::Number { value: *v },
        Literal::Currency { amount, code } => IrLiteral::Currency {
            amount: *amount,
            code: code.clone(),
        },
        Literal::Duration(text) => IrLiteral::Duration { text: text.clone() },
        Literal::Boolean(v) => IrLiteral::Boolean { value: *v },
        Literal::Text(v) => IrLiteral::Text { value: v.clone() },
    }
}

fn lower_distribution(shape: &DistributionShape) -> IrExpr {
    IrExpr::Distribution {
        shape: shape.name.clone(),
        params: shape
            .args
            .iter()
            .map(|(n, e)| (n.clone(), lower_expr(e)))
            .collect(),
    }
}

fn lower_stmt(stmt: &Stmt) -> IrStmt {
    match &stmt.kind {
        StmtKind::Assignment { target, value } => IrStmt::Assignment {
            target: lower_expr(target),
            value: lower_expr(value),
        },
        StmtKind::Return(value) => IrStmt::Return {
            value: value.as_ref().map(lower_expr),
        },
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => IrStmt::If {
            condition: lower_expr(condition),
            then_branch: then_branch.iter().map(lower_stmt).collect(),
            else_branch: else_branch
                .as_ref()
                .map(|b| b.iter().map(lower_stmt).collect()),
        },
        StmtKind::For { var, iterable, body } => IrStmt::For {
            var: var.clone(),
            iterable: lower_expr(iterable),
            body: body.iter().map(lower_stmt).collect(),
        },
        StmtKind::Expr(expr) => IrStmt::Expr { expr: lower_expr(expr) },
        StmtKind::VarDecl(decl) => IrStmt::VarDecl {
            name: decl.name.clone(),
            mutable: decl.mutable,
            value: decl.value.as_ref().map(lower_expr),
        },
    }
}

fn binary_op_text(op: &BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "^",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

fn annotation_text(ann: &TypeAnnotation) -> String {
    match ann {
        TypeAnnotation::Currency(c) => format!("Currency<{c}>"),
        TypeAnnotation::Rate(unit) => format!("Rate per {unit}"),
        TypeAnnotation::Duration => "Duration".to_string(),
        TypeAnnotation::Count(e) => format!("Count<{e}>"),
        TypeAnnotation::Capacity(r) => format!("Capacity<{r}>"),
        TypeAnnotation::Fraction => "Fraction".to_string(),
        TypeAnnotation::Boolean => "Boolean".to_string(),
        TypeAnnotation::Text => "Text".to_string(),
        TypeAnnotation::TimeSeries(inner) => format!("TimeSeries<{}>", annotation_text(inner)),
        TypeAnnotation::Distribution(inner) => format!("Distribution<{}>", annotation_text(inner)),
    }
}

/// Collects every bare variable name an expression reads, for dependency
/// graph construction. Lambda parameters are excluded since they're bound
/// locally, not read from the enclosing scope.
fn extract_dependencies(expr: &Expr, out: &mut BTreeSet<String>) {
    match &expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::Variable(name) => {
            out.insert(name.clone());
        }
        ExprKind::BinaryOp { left, right, .. } => {
            extract_dependencies(left, out);
            extract_dependencies(right, out);
        }
        ExprKind::UnaryOp { operand, .. } => extract_dependencies(operand, out),
        ExprKind::FunctionCall { args, .. } => {
            for a in args {
                extract_dependencies(a, out);
            }
        }
        ExprKind::Indexing { target, index } => {
            extract_dependencies(target, out);
            extract_dependencies(index, out);
        }
        ExprKind::ArrayLiteral(items) => {
            for i in items {
                extract_dependencies(i, out);
            }
        }
        ExprKind::Lambda { params, body } => {
            let mut inner = BTreeSet::new();
            extract_dependencies(body, &mut inner);
            for p in params {
                inner.remove(p);
            }
            out.extend(inner);
        }
        ExprKind::MemberAccess { target, .. } => extract_dependencies(target, out),
        ExprKind::IfThenElse {
            condition,
            then_branch,
            else_branch,
        } => {
            extract_dependencies(condition, out);
            extract_dependencies(then_branch, out);
            extract_dependencies(else_branch, out);
        }
        ExprKind::Distribution(shape) => {
            for (_, e) in &shape.args {
                extract_dependencies(e, out);
            }
        }
        ExprKind::Block(stmts, tail) => {
            for s in stmts {
                extract_stmt_dependencies(s, out);
            }
            if let Some(t) = tail {
                extract_dependencies(t, out);
            }
        }
    }
}

fn extract_stmt_dependencies(stmt: &Stmt, out: &mut BTreeSet<String>) {
    match &stmt.kind {
        StmtKind::Assignment { target, value } => {
            extract_dependencies(target, out);
            extract_dependencies(value, out);
        }
        StmtKind::Return(Some(e)) => extract_dependencies(e, out),
        StmtKind::Return(None) => {}
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            extract_dependencies(condition, out);
            for s in then_branch {
                extract_stmt_dependencies(s, out);
            }
            if let Some(b) = else_branch {
                for s in b {
                    extract_stmt_dependencies(s, out);
                }
            }
        }
        StmtKind::For { iterable, body, .. } => {
            extract_dependencies(iterable, out);
            for s in body {
                extract_stmt_dependencies(s, out);
            }
        }
        StmtKind::Expr(e) => extract_dependencies(e, out),
        StmtKind::VarDecl(decl) => {
            if let Some(v) = &decl.value {
                extract_dependencies(v, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser;

    fn generate_src(src: &str) -> IrModule {
        let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
        let model = parser::parse(tokens).unwrap();
        generate(&model, "t.pel")
    }

    fn node<'a>(module: &'a IrModule, name: &str) -> &'a IrNode {
        module.model.nodes.iter().find(|n| n.name == name).unwrap()
    }

    #[test]
    fn content_hash_is_deterministic_for_identical_models() {
        let src = r#"model M { param a = $1 { source: "x", method: expert_estimate, confidence: 0.5 } }"#;
        let a = generate_src(src);
        let b = generate_src(src);
        assert_eq!(a.metadata.model_hash, b.metadata.model_hash);
        assert!(a.metadata.model_hash.starts_with("sha256:"));
    }

    #[test]
    fn policy_ir_preserves_trigger_and_action() {
        let module = generate_src(
            r#"model M {
                var balance = 0;
                policy discount {
                    when: balance > 1000,
                    then: { bonus = 10; }
                }
            }"#,
        );
        assert_eq!(module.model.policies.len(), 1);
        let p = &module.model.policies[0];
        assert_eq!(p.id, "policy_discount");
        assert!(matches!(p.trigger, IrExpr::BinaryOp { .. }));
        assert_eq!(p.action.len(), 1);
        assert!(p.dependencies.contains(&"balance".to_string()));
    }

    #[test]
    fn distribution_literal_lowers_to_named_params() {
        let module = generate_src(r#"model M { var b = ~Normal(mu=100, sigma=10); }"#);
        match &node(&module, "b").value {
            Some(IrExpr::Distribution { shape, params }) => {
                assert_eq!(shape, "Normal");
                assert_eq!(params[0].0, "mu");
                assert_eq!(params[1].0, "sigma");
            }
            other => panic!("expected a distribution expr, got {other:?}"),
        }
    }

    #[test]
    fn dependency_extraction_follows_binary_ops_and_indexing() {
        let module = generate_src(
            r#"model M {
                param a = 1 { source: "x", method: expert_estimate, confidence: 0.5 }
                var b = a + customers[t];
            }"#,
        );
        let b = node(&module, "b");
        assert_eq!(
            b.dependencies,
            vec!["a".to_string(), "customers".to_string(), "t".to_string()]
        );
    }

    #[test]
    fn indexed_assignments_become_a_vars_equations() {
        let module = generate_src(
            r#"model M {
                param seed_customers: Count<Customer> = 100 {
                    source: "given", method: observed, confidence: 1
                }
                var customers: TimeSeries<Count<Customer>>
                customers[0] = seed_customers;
                customers[t+1] = customers[t] * 1.1;
            }"#,
        );
        let customers = node(&module, "customers");
        assert!(customers.value.is_none());
        assert_eq!(customers.equations.len(), 2);
        assert_eq!(customers.equations[0].kind, EquationKind::Initial);
        assert_eq!(customers.equations[1].kind, EquationKind::RecurrenceNext);
        assert!(module.model.statements.is_empty());
    }
}
