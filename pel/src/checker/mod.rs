//! The dimensional type checker: walks a [`Model`] and either confirms
//! every expression's dimension is consistent or accumulates diagnostics.
//!
//! Runs in four phases: register params/vars, register funcs, check
//! constraints/policies, then infer every expression bottom-up. The phase
//! order lets forward references between top-level declarations (a `var`
//! that reads a `param` declared later in the file) resolve correctly.

use crate::ast::*;
use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::types::{Dimension, DimensionError, PELType, TypeEnvironment};

pub struct TypeChecker {
    env: TypeEnvironment,
    diagnostics: Vec<Diagnostic>,
}

impl TypeChecker {
    pub fn new() -> Self {
        let mut env = TypeEnvironment::new();
        // `t` is the implicit current-timestep index available to every
        // equation; it is never explicitly declared.
        env.define("t", PELType::Dimensioned(Dimension::Scalar));
        Self {
            env,
            diagnostics: Vec::new(),
        }
    }

    /// Type-checks a model, returning every error found. An empty vector
    /// means the model is well-typed.
    pub fn check(mut self, model: &Model) -> Vec<Diagnostic> {
        self.register_params(&model.params);
        self.register_vars(&model.vars);
        self.register_funcs(&model.funcs);

        self.check_vars(&model.vars);
        self.check_funcs(&model.funcs);
        self.check_constraints(&model.constraints);
        self.check_policies(&model.policies);
        for stmt in &model.statements {
            self.check_stmt(stmt);
        }

        self.diagnostics
    }

    fn register_params(&mut self, params: &[ParamDecl]) {
        for p in params {
            let ty = p
                .type_annotation
                .as_ref()
                .map(annotation_to_type)
                .unwrap_or(PELType::Unknown);
            self.env.define(p.name.clone(), ty);
        }
    }

    fn register_vars(&mut self, vars: &[VarDecl]) {
        for v in vars {
            let ty = v
                .type_annotation
                .as_ref()
                .map(annotation_to_type)
                .unwrap_or(PELType::Unknown);
            self.env.define(v.name.clone(), ty);
        }
    }

    fn register_funcs(&mut self, funcs: &[FuncDecl]) {
        for f in funcs {
            let params = f
                .params
                .iter()
                .map(|(_, ty)| ty.as_ref().map(annotation_to_type).unwrap_or(PELType::Unknown))
                .collect();
            let ret = f
                .return_type
                .as_ref()
                .map(annotation_to_type)
                .unwrap_or(PELType::Unknown);
            self.env
                .define(f.name.clone(), PELType::Function { params, ret: Box::new(ret) });
        }
    }

    fn check_vars(&mut self, vars: &[VarDecl]) {
        for v in vars {
            let Some(value) = &v.value else { continue };
            let inferred = self.infer(value);
            if let Some(annotated) = &v.type_annotation {
                let expected = annotation_to_type(annotated);
                self.require_compatible(&expected, &inferred, value);
            }
        }
    }

    fn check_funcs(&mut self, funcs: &[FuncDecl]) {
        for f in funcs {
            self.env.push_scope();
            for (name, ty) in &f.params {
                let t = ty.as_ref().map(annotation_to_type).unwrap_or(PELType::Unknown);
                self.env.define(name.clone(), t);
            }
            for stmt in &f.body {
                self.check_stmt(stmt);
            }
            self.env.pop_scope();
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assignment { value, .. } => {
                self.infer(value);
            }
            StmtKind::Return(Some(expr)) => {
                self.infer(expr);
            }
            StmtKind::Return(None) => {}
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.infer(condition);
                self.require_compatible(&PELType::Dimensioned(Dimension::Boolean), &cond_ty, condition);
                for s in then_branch {
                    self.check_stmt(s);
                }
                if let Some(else_branch) = else_branch {
                    for s in else_branch {
                        self.check_stmt(s);
                    }
                }
            }
            StmtKind::For { var, iterable, body } => {
                self.infer(iterable);
                self.env.push_scope();
                self.env.define(var.clone(), PELType::Dimensioned(Dimension::Scalar));
                for s in body {
                    self.check_stmt(s);
                }
                self.env.pop_scope();
            }
            StmtKind::Expr(expr) => {
                self.infer(expr);
            }
            StmtKind::VarDecl(decl) => {
                let inferred = decl
                    .value
                    .as_ref()
                    .map(|v| self.infer(v))
                    .unwrap_or(PELType::Unknown);
                self.env.define(decl.name.clone(), inferred);
            }
        }
    }

    fn check_constraints(&mut self, constraints: &[Constraint]) {
        for c in constraints {
            let ty = self.infer(&c.condition);
            if !matches!(ty, PELType::Dimensioned(Dimension::Boolean) | PELType::Unknown) {
                self.diagnostics.push(
                    Diagnostic::new(
                        ErrorCode::InvalidConstraint,
                        format!("constraint '{}' condition must be Boolean, found {ty}", c.name),
                    )
                    .with_span(c.condition.span.clone()),
                );
            }
            if let Some(ConstraintScope::Expr(scope_expr)) = &c.scope {
                self.infer(scope_expr);
            }
        }
    }

    fn check_policies(&mut self, policies: &[Policy]) {
        for p in policies {
            let cond_ty = self.infer(&p.trigger.condition);
            self.require_compatible(
                &PELType::Dimensioned(Dimension::Boolean),
                &cond_ty,
                &p.trigger.condition,
            );
            self.check_action(&p.action);
        }
    }

    /// Type-checks a policy's `then` action: an assignment's target and
    /// value, an `emit_event`'s named args, each action in a block, or a
    /// bare expression.
    fn check_action(&mut self, action: &Action) {
        match action {
            Action::Assign { target, value } => {
                self.infer(target);
                self.infer(value);
            }
            Action::EmitEvent { args, .. } => {
                for (_, v) in args {
                    self.infer(v);
                }
            }
            Action::Block(actions) => {
                for a in actions {
                    self.check_action(a);
                }
            }
            Action::Expr(expr) => {
                self.infer(expr);
            }
        }
    }

    fn require_compatible(&mut self, expected: &PELType, actual: &PELType, expr: &Expr) {
        if matches!(expected, PELType::Unknown) || matches!(actual, PELType::Unknown) {
            return;
        }
        let ok = match (expected, actual) {
            (PELType::Dimensioned(a), PELType::Dimensioned(b)) => a.compatible(b),
            (a, b) => a == b,
        };
        if !ok {
            self.diagnostics.push(
                Diagnostic::new(
                    ErrorCode::TypeMismatch,
                    format!("expected {expected}, found {actual}"),
                )
                .with_span(expr.span.clone()),
            );
        }
    }

    fn infer(&mut self, expr: &Expr) -> PELType {
        match &expr.kind {
            ExprKind::Literal(lit) => PELType::Dimensioned(literal_dimension(lit)),
            ExprKind::Variable(name) => self
                .env
                .lookup(name)
                .cloned()
                .unwrap_or_else(|| {
                    self.diagnostics.push(
                        Diagnostic::new(
                            ErrorCode::UndefinedVariable,
                            format!("undefined variable '{name}'"),
                        )
                        .with_span(expr.span.clone()),
                    );
                    PELType::Unknown
                }),
            ExprKind::BinaryOp { op, left, right } => self.infer_binary(op, left, right, &expr.span),
            ExprKind::UnaryOp { op, operand } => {
                let ty = self.infer(operand);
                match op {
                    UnaryOp::Not => PELType::Dimensioned(Dimension::Boolean),
                    UnaryOp::Neg => ty,
                }
            }
            ExprKind::FunctionCall { callee, args } => {
                for a in args {
                    self.infer(a);
                }
                match self.env.lookup(callee).cloned() {
                    Some(PELType::Function { ret, .. }) => *ret,
                    Some(_) | None => PELType::Unknown,
                }
            }
            ExprKind::Indexing { target, index } => {
                self.infer(index);
                match self.infer(target) {
                    PELType::Dimensioned(Dimension::TimeSeries(inner)) => {
                        PELType::Dimensioned(*inner)
                    }
                    PELType::Array(inner) => *inner,
                    other => other,
                }
            }
            ExprKind::ArrayLiteral(items) => {
                let mut elem = PELType::Unknown;
                for item in items {
                    elem = self.infer(item);
                }
                PELType::Array(Box::new(elem))
            }
            ExprKind::Lambda { params, body } => {
                self.env.push_scope();
                for p in params {
                    self.env.define(p.clone(), PELType::Unknown);
                }
                let ret = self.infer(body);
                self.env.pop_scope();
                PELType::Function {
                    params: params.iter().map(|_| PELType::Unknown).collect(),
                    ret: Box::new(ret),
                }
            }
            ExprKind::MemberAccess { target, .. } => {
                self.infer(target);
                PELType::Unknown
            }
            ExprKind::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.infer(condition);
                self.require_compatible(&PELType::Dimensioned(Dimension::Boolean), &cond_ty, condition);
                let then_ty = self.infer(then_branch);
                let else_ty = self.infer(else_branch);
                self.require_compatible(&then_ty, &else_ty, else_branch);
                then_ty
            }
            ExprKind::Distribution(shape) => {
                let inner = self.infer_distribution_shape(shape);
                PELType::Dimensioned(Dimension::Distribution(Box::new(inner)))
            }
            ExprKind::Block(stmts, tail) => {
                self.env.push_scope();
                for s in stmts {
                    self.check_stmt(s);
                }
                let ty = tail
                    .as_ref()
                    .map(|t| self.infer(t))
                    .unwrap_or(PELType::Unknown);
                self.env.pop_scope();
                ty
            }
        }
    }

    /// A distribution literal is typed as the type of its first named
    /// argument's value, since the surface syntax treats distributions as
    /// values of the declared type they are assigned to.
    fn infer_distribution_shape(&mut self, shape: &DistributionShape) -> Dimension {
        let mut result = Dimension::Fraction;
        for (i, (_, value)) in shape.args.iter().enumerate() {
            let ty = self.infer(value);
            if i == 0 {
                result = dimension_of(ty);
            }
        }
        result
    }

    fn infer_binary(&mut self, op: &BinaryOp, left: &Expr, right: &Expr, span: &pel_base::Span) -> PELType {
        let lt = self.infer(left);
        let rt = self.infer(right);
        if matches!(lt, PELType::Unknown) || matches!(rt, PELType::Unknown) {
            return PELType::Unknown;
        }
        let (PELType::Dimensioned(ld), PELType::Dimensioned(rd)) = (&lt, &rt) else {
            return PELType::Unknown;
        };

        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                if ld.compatible(rd) {
                    PELType::Dimensioned(ld.clone())
                } else {
                    self.diagnostics.push(
                        Diagnostic::new(
                            ErrorCode::DimensionalMismatch,
                            format!("dimensional mismatch: {ld} vs {rd}"),
                        )
                        .with_span(span.clone()),
                    );
                    PELType::Unknown
                }
            }
            BinaryOp::Mul => match ld.multiply(rd) {
                Ok(d) => PELType::Dimensioned(d),
                Err(e) => {
                    self.diagnostics.push(
                        Diagnostic::new(
                            dimension_error_code(&e),
                            format!("cannot multiply {ld} by {rd}: {e}"),
                        )
                        .with_span(span.clone()),
                    );
                    PELType::Unknown
                }
            },
            BinaryOp::Div => match ld.divide(rd) {
                Ok(d) => PELType::Dimensioned(d),
                Err(e) => {
                    self.diagnostics.push(
                        Diagnostic::new(
                            dimension_error_code(&e),
                            format!("cannot divide {ld} by {rd}: {e}"),
                        )
                        .with_span(span.clone()),
                    );
                    PELType::Unknown
                }
            },
            BinaryOp::Mod => PELType::Dimensioned(ld.clone()),
            BinaryOp::Pow => {
                if matches!(rd, Dimension::Scalar | Dimension::Fraction) {
                    PELType::Dimensioned(ld.clone())
                } else {
                    self.diagnostics.push(
                        Diagnostic::new(
                            ErrorCode::DimensionalMismatch,
                            format!("exponent must be dimensionless, got {rd}"),
                        )
                        .with_span(span.clone()),
                    );
                    PELType::Unknown
                }
            }
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => {
                if !ld.compatible(rd) {
                    self.diagnostics.push(
                        Diagnostic::new(
                            ErrorCode::DimensionalMismatch,
                            format!("cannot compare {ld} with {rd}"),
                        )
                        .with_span(span.clone()),
                    );
                }
                PELType::Dimensioned(Dimension::Boolean)
            }
            BinaryOp::And | BinaryOp::Or => PELType::Dimensioned(Dimension::Boolean),
        }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the `E02xx` code matching a dimension-combination failure: a
/// currency-code clash gets its own code, everything else is a generic
/// dimensional mismatch.
fn dimension_error_code(e: &DimensionError) -> ErrorCode {
    match e {
        DimensionError::CurrencyMismatch(..) => ErrorCode::CurrencyMismatch,
        DimensionError::Incompatible => ErrorCode::DimensionalMismatch,
    }
}

fn dimension_of(ty: PELType) -> Dimension {
    match ty {
        PELType::Dimensioned(d) => d,
        _ => Dimension::Scalar,
    }
}

fn literal_dimension(lit: &Literal) -> Dimension {
    match lit {
        Literal::Number(_) => Dimension::Scalar,
        Literal::Currency { code, .. } => Dimension::Currency(code.clone().unwrap_or_else(|| "USD".into())),
        Literal::Duration(_) => Dimension::Duration("generic".into()),
        Literal::Boolean(_) => Dimension::Boolean,
        Literal::Text(_) => Dimension::Text,
    }
}

fn annotation_to_type(ann: &TypeAnnotation) -> PELType {
    PELType::Dimensioned(annotation_to_dimension(ann))
}

fn annotation_to_dimension(ann: &TypeAnnotation) -> Dimension {
    match ann {
        TypeAnnotation::Currency(code) => Dimension::Currency(code.clone()),
        TypeAnnotation::Rate(unit) => Dimension::Rate(unit.clone()),
        TypeAnnotation::Duration => Dimension::Duration("generic".into()),
        TypeAnnotation::Count(entity) => Dimension::Count(entity.clone()),
        TypeAnnotation::Capacity(resource) => Dimension::Capacity(resource.clone()),
        TypeAnnotation::Fraction => Dimension::Fraction,
        TypeAnnotation::Boolean => Dimension::Boolean,
        TypeAnnotation::Text => Dimension::Text,
        TypeAnnotation::TimeSeries(inner) => {
            Dimension::TimeSeries(Box::new(annotation_to_dimension(inner)))
        }
        TypeAnnotation::Distribution(inner) => {
            Dimension::Distribution(Box::new(annotation_to_dimension(inner)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser;

    fn check_src(src: &str) -> Vec<Diagnostic> {
        let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
        let model = parser::parse(tokens).unwrap();
        TypeChecker::new().check(&model)
    }

    #[test]
    fn currency_plus_currency_is_fine() {
        let diags = check_src(
            r#"model M { param a: Currency<USD> = $10 { source: "x", method: expert_estimate, confidence: 0.5 } var b = a + a; }"#,
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn currency_plus_fraction_is_a_dimensional_mismatch() {
        let diags = check_src(
            r#"model M {
                param a: Currency<USD> = $10 { source: "x", method: expert_estimate, confidence: 0.5 }
                param b: Fraction = 0.1 { source: "x", method: expert_estimate, confidence: 0.5 }
                var c = a + b;
            }"#,
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_str(), "E0200");
    }

    #[test]
    fn undefined_variable_is_reported() {
        let diags = check_src("model M { var a = unknown_name; }");
        assert_eq!(diags[0].code.as_str(), "E0101");
    }

    #[test]
    fn distribution_literal_takes_the_type_of_its_first_argument() {
        let diags = check_src(
            r#"model M {
                param a: Currency<USD> = $10 { source: "x", method: expert_estimate, confidence: 0.5 }
                var b: Distribution<Currency<USD>> = ~Normal(mu=a, sigma=$1);
            }"#,
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn policy_action_block_type_checks_its_assignments() {
        let diags = check_src(
            r#"model M {
                var balance = 0;
                policy p {
                    when: balance > 1000,
                    then: { balance = unknown_name; }
                }
            }"#,
        );
        assert_eq!(diags[0].code.as_str(), "E0101");
    }
}
