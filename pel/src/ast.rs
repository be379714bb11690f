//! The PEL abstract syntax tree.
//!
//! A closed tagged sum of variants, owned via `Box` rather than built over
//! an arena: IR lowering and JSON serialization both want to walk and
//! consume the tree by value, which an arena of borrowed references would
//! only complicate. See DESIGN.md for the full rationale.

use pel_base::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// A type annotation as written in source, e.g. `Currency<USD>`,
/// `Rate per Month`, `TimeSeries<Count<customer>>`. `Rate` carries only
/// the time unit — the grammar has no syntax for naming a rate's base
/// quantity — and bare `Duration` carries no unit at all.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    Currency(String),
    Rate(String),
    Duration,
    Count(String),
    Capacity(String),
    Fraction,
    Boolean,
    Text,
    TimeSeries(Box<TypeAnnotation>),
    Distribution(Box<TypeAnnotation>),
}

/// A distribution literal's shape: a free-form distribution name (`Normal`,
/// `Beta`, ...; any identifier is accepted) and its named arguments in
/// source order, e.g. `~Normal(mu=100, sigma=10)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionShape {
    pub name: String,
    pub args: Vec<(String, Expr)>,
}

impl DistributionShape {
    /// Looks up a named argument's expression.
    pub fn arg(&self, name: &str) -> Option<&Expr> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Currency { amount: f64, code: Option<String> },
    Duration(String),
    Boolean(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Variable(String),
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    FunctionCall {
        callee: String,
        args: Vec<Expr>,
    },
    Indexing {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayLiteral(Vec<Expr>),
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    MemberAccess {
        target: Box<Expr>,
        member: String,
    },
    IfThenElse {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Distribution(DistributionShape),
    Block(Vec<Stmt>, Option<Box<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assignment {
        target: Expr,
        value: Expr,
    },
    Return(Option<Expr>),
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    For {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Expr(Expr),
    VarDecl(VarDecl),
}

/// Provenance metadata attached to a `param` declaration: where the value
/// came from, how confident we are in it, and (for Monte Carlo) which
/// other parameters it's correlated with.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub source: Option<String>,
    pub method: Option<String>,
    pub confidence: Option<f64>,
    pub freshness: Option<String>,
    pub owner: Option<String>,
    pub notes: Option<String>,
    pub correlated_with: Vec<(String, f64)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub type_annotation: Option<TypeAnnotation>,
    pub value: Expr,
    pub provenance: Option<Provenance>,
    pub span: Span,
}

/// A `var` declaration. `value` is absent for a time series whose
/// defining equations are instead free top-level assignment statements
/// (`customers[0] = ...`, `customers[t+1] = ...`) rather than a single
/// initializer expression.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub type_annotation: Option<TypeAnnotation>,
    pub value: Option<Expr>,
    pub mutable: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<(String, Option<TypeAnnotation>)>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A constraint's `for:` field: the common `all timesteps` literal, kept
/// as a string, or an arbitrary boolean expression like `t >= 6`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintScope {
    Named(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub condition: Expr,
    pub severity: ConstraintSeverity,
    pub message: Option<String>,
    pub scope: Option<ConstraintScope>,
    /// Extra constraint-block fields beyond `severity`/`message`/`for`,
    /// kept as raw expressions (`[extra: EXPR]*`).
    pub extra: Vec<(String, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSeverity {
    Fatal,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub condition: Expr,
    pub span: Span,
}

/// A policy's `then` clause: one of three shapes plus a fallback —
/// `assign(target, value)`, `emit_event(name, named_args)`,
/// `block(statements)`, or a bare expression evaluated for effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    EmitEvent {
        name: String,
        args: Vec<(String, Expr)>,
    },
    Block(Vec<Action>),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub name: String,
    pub trigger: Trigger,
    pub action: Action,
    pub span: Span,
}

/// A top-level `model { ... }` block: the root of a compiled program.
///
/// `time_horizon`/`time_unit` carry a model's declared time horizon and
/// unit; the parser currently has no `simulate`-block grammar to
/// populate `time_horizon` from source, so it stays `None` (the runtime
/// falls back to its config's horizon) and `time_unit` defaults to
/// `"Month"` until that surface syntax exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub time_horizon: Option<usize>,
    pub time_unit: String,
    pub params: Vec<ParamDecl>,
    pub vars: Vec<VarDecl>,
    pub funcs: Vec<FuncDecl>,
    pub constraints: Vec<Constraint>,
    pub policies: Vec<Policy>,
    /// Free top-level statements, most commonly the indexed assignments
    /// (`customers[0] = ...`, `customers[t+1] = ...`) that give a `var`
    /// declared without an initializer its defining equations.
    pub statements: Vec<Stmt>,
    pub span: Span,
}
