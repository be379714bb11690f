//! Recursive-descent parser: tokens to an [`ast::Model`].
//!
//! Declarations (`param`, `var`, `func`, `constraint`, `policy`) are
//! parsed here; expression precedence-climbing lives in [`expr`].

mod expr;

use crate::ast::*;
use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_model(mut self) -> Result<Model, Diagnostic> {
        self.expect(&TokenKind::Model)?;
        let name_tok = self.expect_identifier()?;
        let span = name_tok.span.clone();
        let name = ident_text(&name_tok);
        self.expect(&TokenKind::LBrace)?;

        let mut model = Model {
            name,
            time_horizon: None,
            time_unit: "Month".to_string(),
            params: Vec::new(),
            vars: Vec::new(),
            funcs: Vec::new(),
            constraints: Vec::new(),
            policies: Vec::new(),
            statements: Vec::new(),
            span,
        };

        while !self.check(&TokenKind::RBrace) {
            self.parse_model_member(&mut model)?;
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(model)
    }

    fn parse_model_member(&mut self, model: &mut Model) -> Result<(), Diagnostic> {
        match self.peek_kind() {
            TokenKind::Param => model.params.push(self.parse_param()?),
            TokenKind::Var => model.vars.push(self.parse_var()?),
            TokenKind::Func => model.funcs.push(self.parse_func()?),
            TokenKind::Constraint => model.constraints.push(self.parse_constraint()?),
            TokenKind::Policy => model.policies.push(self.parse_policy()?),
            _ => model.statements.push(self.parse_stmt()?),
        }
        Ok(())
    }

    fn parse_param(&mut self) -> Result<ParamDecl, Diagnostic> {
        let span = self.expect(&TokenKind::Param)?.span;
        let name = ident_text(&self.expect_identifier()?);
        let type_annotation = self.parse_optional_type_annotation()?;
        self.expect(&TokenKind::Assign)?;
        let value = self.parse_expr()?;

        let provenance = if self.check(&TokenKind::LBrace) {
            Some(self.parse_provenance_block()?)
        } else {
            None
        };
        self.consume_semicolon();

        Ok(ParamDecl {
            name,
            type_annotation,
            value,
            provenance,
            span,
        })
    }

    fn parse_provenance_block(&mut self) -> Result<Provenance, Diagnostic> {
        let span = self.expect(&TokenKind::LBrace)?.span;
        let mut prov = Provenance {
            source: None,
            method: None,
            confidence: None,
            freshness: None,
            owner: None,
            notes: None,
            correlated_with: Vec::new(),
            span,
        };

        while !self.check(&TokenKind::RBrace) {
            let key = ident_text(&self.expect_identifier()?);
            self.expect(&TokenKind::Colon)?;
            match key.as_str() {
                "source" => prov.source = Some(self.parse_string_value()?),
                "method" => prov.method = Some(self.parse_string_or_ident_value()?),
                "confidence" => prov.confidence = Some(self.parse_number_value()?),
                "freshness" => prov.freshness = Some(self.parse_string_value()?),
                "owner" => prov.owner = Some(self.parse_string_value()?),
                "notes" => prov.notes = Some(self.parse_string_value()?),
                "correlated_with" => {
                    prov.correlated_with = self.parse_correlation_list()?;
                }
                _ => return Err(self.unexpected("unknown provenance field")),
            }
            self.consume_comma_or_semicolon();
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(prov)
    }

    fn parse_correlation_list(&mut self) -> Result<Vec<(String, f64)>, Diagnostic> {
        self.expect(&TokenKind::LBracket)?;
        let mut pairs = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            pairs.push(self.parse_correlation_pair()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(pairs)
    }

    /// Parses one `(name, coefficient)` pair, accepting a leading `-` on
    /// the coefficient.
    fn parse_correlation_pair(&mut self) -> Result<(String, f64), Diagnostic> {
        self.expect(&TokenKind::LParen)?;
        let name = ident_text(&self.expect_identifier()?);
        self.expect(&TokenKind::Comma)?;
        let negative = if self.check(&TokenKind::Minus) {
            self.advance();
            true
        } else {
            false
        };
        let mut coeff = self.parse_number_value()?;
        if negative {
            coeff = -coeff;
        }
        self.expect(&TokenKind::RParen)?;
        Ok((name, coeff))
    }

    fn parse_var(&mut self) -> Result<VarDecl, Diagnostic> {
        let span = self.expect(&TokenKind::Var)?.span;
        let mutable = if self.check(&TokenKind::Mut) {
            self.advance();
            true
        } else {
            false
        };
        let name = ident_text(&self.expect_identifier()?);
        let type_annotation = self.parse_optional_type_annotation()?;
        let value = if self.check(&TokenKind::Assign) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.consume_semicolon();
        Ok(VarDecl {
            name,
            type_annotation,
            value,
            mutable,
            span,
        })
    }

    fn parse_func(&mut self) -> Result<FuncDecl, Diagnostic> {
        let span = self.expect(&TokenKind::Func)?.span;
        let name = ident_text(&self.expect_identifier()?);
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let pname = ident_text(&self.expect_identifier()?);
            let ptype = self.parse_optional_type_annotation()?;
            params.push((pname, ptype));
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(&TokenKind::RParen)?;

        let return_type = if self.check(&TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type_annotation()?)
        } else {
            None
        };

        self.expect(&TokenKind::LBrace)?;
        let body = self.parse_stmt_list()?;
        self.expect(&TokenKind::RBrace)?;

        Ok(FuncDecl {
            name,
            params,
            return_type,
            body,
            span,
        })
    }

    /// Parses `constraint NAME : EXPR { severity: ..., [message: ...,]
    /// [for: ...,] [extra: EXPR]* }` — the metadata block is a single
    /// brace-delimited record, not a separate `when` clause.
    fn parse_constraint(&mut self) -> Result<Constraint, Diagnostic> {
        let span = self.expect(&TokenKind::Constraint)?.span;
        let name = ident_text(&self.expect_identifier()?);
        self.expect(&TokenKind::Colon)?;
        let condition = self.parse_expr()?;

        self.expect(&TokenKind::LBrace)?;

        // "severity" is required and comes first.
        let severity_key = ident_text(&self.expect_identifier()?);
        if severity_key != "severity" {
            return Err(self.unexpected("expected 'severity' as the first constraint field"));
        }
        self.expect(&TokenKind::Colon)?;
        let severity = match self.parse_string_or_ident_value()?.as_str() {
            "fatal" => ConstraintSeverity::Fatal,
            "warning" => ConstraintSeverity::Warning,
            "info" => ConstraintSeverity::Info,
            _ => return Err(self.unexpected("unknown constraint severity")),
        };

        let mut message = None;
        let mut scope = None;
        let mut extra = Vec::new();
        while self.consume_if(&TokenKind::Comma) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            let field_name = if self.check(&TokenKind::For) {
                ident_text(self.advance())
            } else {
                ident_text(&self.expect_identifier()?)
            };
            self.expect(&TokenKind::Colon)?;
            match field_name.as_str() {
                "message" => message = Some(self.parse_string_value()?),
                "for" => scope = Some(self.parse_scope_spec()?),
                _ => extra.push((field_name, self.parse_expr()?)),
            }
        }
        self.expect(&TokenKind::RBrace)?;
        self.consume_semicolon();

        Ok(Constraint {
            name,
            condition,
            severity,
            message,
            scope,
            extra,
            span,
        })
    }

    /// Parses a constraint's `for:` value: the common `all timesteps`
    /// bare-word phrase (kept as a joined string), or any other
    /// expression (e.g. `t >= 6`).
    fn parse_scope_spec(&mut self) -> Result<ConstraintScope, Diagnostic> {
        if let TokenKind::Identifier(word) = self.peek_kind().clone() {
            if word == "all" {
                let mut parts = Vec::new();
                while matches!(self.peek_kind(), TokenKind::Identifier(_)) {
                    parts.push(ident_text(self.advance()));
                }
                return Ok(ConstraintScope::Named(parts.join(" ")));
            }
        }
        Ok(ConstraintScope::Expr(self.parse_expr()?))
    }

    /// Parses `policy NAME { when: EXPR, then: ACTION }`.
    fn parse_policy(&mut self) -> Result<Policy, Diagnostic> {
        let span = self.expect(&TokenKind::Policy)?.span;
        let name = ident_text(&self.expect_identifier()?);
        self.expect(&TokenKind::LBrace)?;

        self.expect(&TokenKind::When)?;
        self.expect(&TokenKind::Colon)?;
        let trig_span = self.peek().span.clone();
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::Comma)?;
        let trigger = Trigger {
            condition,
            span: trig_span,
        };

        self.expect_keyword_ident("then")?;
        self.expect(&TokenKind::Colon)?;
        let action = self.parse_action()?;

        self.expect(&TokenKind::RBrace)?;
        Ok(Policy {
            name,
            trigger,
            action,
            span,
        })
    }

    /// Parses a policy action: a `{ }`-delimited block of nested actions,
    /// an `emit event(...)` call, a `target = expr` assignment, or (as a
    /// fallback) a plain expression.
    fn parse_action(&mut self) -> Result<Action, Diagnostic> {
        if self.check(&TokenKind::LBrace) {
            self.advance();
            let mut actions = Vec::new();
            while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
                actions.push(self.parse_action()?);
                self.consume_semicolon();
            }
            self.expect(&TokenKind::RBrace)?;
            return Ok(Action::Block(actions));
        }

        if self.check(&TokenKind::Emit) {
            return self.parse_emit_action();
        }

        if matches!(self.peek_kind(), TokenKind::Identifier(_)) {
            let checkpoint = self.pos;
            let target_tok = self.advance().clone();
            if self.check(&TokenKind::Assign) {
                self.advance();
                let value = self.parse_expr()?;
                return Ok(Action::Assign {
                    target: Box::new(Expr::new(
                        ExprKind::Variable(ident_text(&target_tok)),
                        target_tok.span,
                    )),
                    value: Box::new(value),
                });
            }
            self.pos = checkpoint;
        }

        Ok(Action::Expr(Box::new(self.parse_expr()?)))
    }

    /// Parses `emit event("name" [, field: expr]*)`.
    fn parse_emit_action(&mut self) -> Result<Action, Diagnostic> {
        self.expect(&TokenKind::Emit)?;
        self.expect(&TokenKind::Event)?;
        self.expect(&TokenKind::LParen)?;
        let event_name = self.parse_string_value()?;

        let mut args = Vec::new();
        while self.consume_if(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            let arg_name = ident_text(&self.expect_identifier()?);
            self.expect(&TokenKind::Colon)?;
            args.push((arg_name, self.parse_expr()?));
        }
        self.expect(&TokenKind::RParen)?;

        Ok(Action::EmitEvent {
            name: event_name,
            args,
        })
    }

    fn parse_stmt_list(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        match self.peek_kind() {
            TokenKind::Var => {
                let decl = self.parse_var()?;
                let span = decl.span.clone();
                Ok(Stmt::new(StmtKind::VarDecl(decl), span))
            }
            TokenKind::Return => {
                let span = self.advance().span.clone();
                let value = if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::RBrace)
                {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.consume_semicolon();
                Ok(Stmt::new(StmtKind::Return(value), span))
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            _ => {
                let span = self.peek().span.clone();
                let expr = self.parse_expr()?;
                if self.check(&TokenKind::Assign) {
                    self.advance();
                    let value = self.parse_expr()?;
                    self.consume_semicolon();
                    Ok(Stmt::new(
                        StmtKind::Assignment {
                            target: expr,
                            value,
                        },
                        span,
                    ))
                } else {
                    self.consume_semicolon();
                    Ok(Stmt::new(StmtKind::Expr(expr), span))
                }
            }
        }
    }

    /// Disambiguates `if` used as a statement (with `{ }` blocks, no
    /// trailing value) from `if` used as an expression (`then`/`else`
    /// with values) by checking for `then` after the condition.
    fn parse_if_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        let span = self.expect(&TokenKind::If)?.span;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::LBrace)?;
        let then_branch = self.parse_stmt_list()?;
        self.expect(&TokenKind::RBrace)?;

        let else_branch = if self.check(&TokenKind::Else) {
            self.advance();
            if self.check(&TokenKind::If) {
                let nested = self.parse_if_stmt()?;
                Some(vec![nested])
            } else {
                self.expect(&TokenKind::LBrace)?;
                let stmts = self.parse_stmt_list()?;
                self.expect(&TokenKind::RBrace)?;
                Some(stmts)
            }
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        let span = self.expect(&TokenKind::For)?.span;
        let var = ident_text(&self.expect_identifier()?);
        self.expect_keyword_ident("in")?;
        let iterable = self.parse_expr()?;
        self.expect(&TokenKind::LBrace)?;
        let body = self.parse_stmt_list()?;
        self.expect(&TokenKind::RBrace)?;
        Ok(Stmt::new(
            StmtKind::For {
                var,
                iterable,
                body,
            },
            span,
        ))
    }

    fn parse_optional_type_annotation(&mut self) -> Result<Option<TypeAnnotation>, Diagnostic> {
        if self.check(&TokenKind::Colon) {
            self.advance();
            Ok(Some(self.parse_type_annotation()?))
        } else {
            Ok(None)
        }
    }

    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation, Diagnostic> {
        let kind = self.peek_kind().clone();
        match kind {
            TokenKind::CurrencyType => {
                self.advance();
                let code = self.parse_type_param_ident()?;
                Ok(TypeAnnotation::Currency(code))
            }
            TokenKind::RateType => {
                self.advance();
                self.consume_if(&TokenKind::Per);
                let unit = ident_text(&self.expect_identifier()?);
                Ok(TypeAnnotation::Rate(unit))
            }
            TokenKind::DurationType => {
                self.advance();
                Ok(TypeAnnotation::Duration)
            }
            TokenKind::CountType => {
                self.advance();
                let entity = self.parse_type_param_ident()?;
                Ok(TypeAnnotation::Count(entity))
            }
            TokenKind::CapacityType => {
                self.advance();
                let resource = self.parse_type_param_ident()?;
                Ok(TypeAnnotation::Capacity(resource))
            }
            TokenKind::FractionType => {
                self.advance();
                Ok(TypeAnnotation::Fraction)
            }
            TokenKind::TimeSeriesType => {
                self.advance();
                self.expect(&TokenKind::Lt)?;
                let inner = self.parse_type_annotation()?;
                self.expect(&TokenKind::Gt)?;
                Ok(TypeAnnotation::TimeSeries(Box::new(inner)))
            }
            TokenKind::DistributionType => {
                self.advance();
                self.expect(&TokenKind::Lt)?;
                let inner = self.parse_type_annotation()?;
                self.expect(&TokenKind::Gt)?;
                Ok(TypeAnnotation::Distribution(Box::new(inner)))
            }
            TokenKind::Identifier(id) if id == "Boolean" => {
                self.advance();
                Ok(TypeAnnotation::Boolean)
            }
            TokenKind::Identifier(id) if id == "Text" => {
                self.advance();
                Ok(TypeAnnotation::Text)
            }
            _ => Err(self.unexpected("expected a type annotation")),
        }
    }

    fn parse_type_param_ident(&mut self) -> Result<String, Diagnostic> {
        self.expect(&TokenKind::Lt)?;
        let name = ident_text(&self.expect_identifier()?);
        self.expect(&TokenKind::Gt)?;
        Ok(name)
    }

    // --- token-stream primitives -------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> &Token {
        let current = self.pos;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[current]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn consume_if(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.unexpected(&format!("expected '{kind}'")))
        }
    }

    fn expect_identifier(&mut self) -> Result<Token, Diagnostic> {
        if matches!(self.peek_kind(), TokenKind::Identifier(_)) {
            Ok(self.advance().clone())
        } else {
            Err(self.unexpected("expected an identifier"))
        }
    }

    fn expect_keyword_ident(&mut self, word: &str) -> Result<Token, Diagnostic> {
        match self.peek_kind() {
            TokenKind::Identifier(id) if id == word => Ok(self.advance().clone()),
            TokenKind::Then if word == "then" => Ok(self.advance().clone()),
            TokenKind::For if word == "for" => Ok(self.advance().clone()),
            _ => Err(self.unexpected(&format!("expected '{word}'"))),
        }
    }

    fn consume_semicolon(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn consume_comma_or_semicolon(&mut self) {
        if self.check(&TokenKind::Comma) || self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn parse_string_value(&mut self) -> Result<String, Diagnostic> {
        match self.peek_kind().clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("expected a string literal")),
        }
    }

    fn parse_string_or_ident_value(&mut self) -> Result<String, Diagnostic> {
        match self.peek_kind().clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(s)
            }
            TokenKind::Identifier(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("expected a string or bare word")),
        }
    }

    fn parse_number_value(&mut self) -> Result<f64, Diagnostic> {
        match self.peek_kind().clone() {
            TokenKind::Number(s) => {
                self.advance();
                expr::parse_number_literal(&s)
                    .ok_or_else(|| Diagnostic::new(ErrorCode::MalformedNumber, "malformed number"))
            }
            TokenKind::Minus => {
                self.advance();
                Ok(-self.parse_number_value()?)
            }
            _ => Err(self.unexpected("expected a number")),
        }
    }

    fn unexpected(&self, message: &str) -> Diagnostic {
        let span = self.peek().span.clone();
        Diagnostic::new(
            ErrorCode::UnexpectedToken,
            format!("{message}, found '{}'", self.peek_kind()),
        )
        .with_span(span)
    }
}

fn ident_text(tok: &Token) -> String {
    match &tok.kind {
        TokenKind::Identifier(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses `source` (already lexed into `tokens`) into a [`Model`].
pub fn parse(tokens: Vec<Token>) -> Result<Model, Diagnostic> {
    Parser::new(tokens).parse_model()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_src(src: &str) -> Model {
        let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
        parse(tokens).expect("parse should succeed")
    }

    #[test]
    fn parses_empty_model() {
        let model = parse_src("model Empty { }");
        assert_eq!(model.name, "Empty");
        assert!(model.params.is_empty());
    }

    #[test]
    fn parses_param_with_provenance() {
        let model = parse_src(
            r#"model M {
                param price: Currency<USD> = $100 {
                    source: "finance team",
                    method: expert_estimate,
                    confidence: 0.8
                }
            }"#,
        );
        assert_eq!(model.params.len(), 1);
        let p = &model.params[0];
        assert_eq!(p.name, "price");
        let prov = p.provenance.as_ref().unwrap();
        assert_eq!(prov.method.as_deref(), Some("expert_estimate"));
        assert_eq!(prov.confidence, Some(0.8));
    }

    #[test]
    fn parses_notes_field() {
        let model = parse_src(
            r#"model M {
                param churn: Fraction = 0.05 {
                    source: "analytics",
                    method: observed,
                    confidence: 0.9,
                    notes: "seasonally adjusted"
                }
            }"#,
        );
        let prov = model.params[0].provenance.as_ref().unwrap();
        assert_eq!(prov.notes.as_deref(), Some("seasonally adjusted"));
    }

    #[test]
    fn parses_negative_correlation_coefficient() {
        let model = parse_src(
            r#"model M {
                param churn: Fraction = 0.05 {
                    source: "analytics",
                    method: observed,
                    confidence: 0.9,
                    correlated_with: [(growth, -0.6)]
                }
            }"#,
        );
        let prov = model.params[0].provenance.as_ref().unwrap();
        assert_eq!(prov.correlated_with, vec![("growth".to_string(), -0.6)]);
    }

    #[test]
    fn parses_constraint_with_severity() {
        let model = parse_src(
            r#"model M {
                constraint nonneg: balance >= 0 {
                    severity: warning,
                    message: "balance dipped negative"
                }
            }"#,
        );
        let c = &model.constraints[0];
        assert_eq!(c.severity, ConstraintSeverity::Warning);
        assert_eq!(c.message.as_deref(), Some("balance dipped negative"));
    }

    #[test]
    fn parses_policy_trigger_and_action() {
        let model = parse_src(
            r#"model M {
                policy discount {
                    when: balance > 1000,
                    then: {
                        bonus = 10;
                    }
                }
            }"#,
        );
        assert_eq!(model.policies.len(), 1);
        match &model.policies[0].action {
            Action::Block(actions) => assert_eq!(actions.len(), 1),
            other => panic!("expected a block action, got {other:?}"),
        }
    }

    #[test]
    fn parses_rate_and_duration_type_annotations() {
        let model = parse_src(
            r#"model M {
                param churn: Rate per Month = 0.05 {
                    source: "analytics", method: observed, confidence: 0.9
                }
                var lifetime: Duration = 12mo;
            }"#,
        );
        assert_eq!(
            model.params[0].type_annotation,
            Some(TypeAnnotation::Rate("Month".to_string()))
        );
        assert_eq!(model.vars[0].type_annotation, Some(TypeAnnotation::Duration));
    }
}
