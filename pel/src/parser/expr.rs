//! Expression parsing: precedence-climbing binary operators, unary
//! prefixes, and the primary-expression forms (literals, calls, indexing,
//! member access, lambdas, `if`/`then`/`else`, distribution literals).

use super::Parser;
use crate::ast::*;
use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::token::TokenKind;

/// Binding power table. Note `^` sits at the top of the table but is
/// parsed through the same left-associative climbing loop as every other
/// level — despite `a ^ b ^ c` reading as if it should nest the other
/// way, `^` is deliberately left-associative here rather than right —
/// this table intentionally does not special-case `Caret` for
/// right-associativity.
fn precedence(kind: &TokenKind) -> Option<u8> {
    use TokenKind::*;
    Some(match kind {
        OrOr => 1,
        AndAnd => 2,
        EqEq | NotEq => 3,
        Lt | LtEq | Gt | GtEq => 4,
        Plus | Minus => 5,
        Star | Slash | Percent => 6,
        Caret => 7,
        _ => return None,
    })
}

fn binary_op(kind: &TokenKind) -> BinaryOp {
    use TokenKind::*;
    match kind {
        Plus => BinaryOp::Add,
        Minus => BinaryOp::Sub,
        Star => BinaryOp::Mul,
        Slash => BinaryOp::Div,
        Percent => BinaryOp::Mod,
        Caret => BinaryOp::Pow,
        EqEq => BinaryOp::Eq,
        NotEq => BinaryOp::NotEq,
        Lt => BinaryOp::Lt,
        LtEq => BinaryOp::LtEq,
        Gt => BinaryOp::Gt,
        GtEq => BinaryOp::GtEq,
        AndAnd => BinaryOp::And,
        OrOr => BinaryOp::Or,
        _ => unreachable!("binary_op called with non-operator token"),
    }
}

/// Interprets a lexed number lexeme's magnitude suffix (`k`, `m`/`M`,
/// `B`, `T`, and their Cyrillic homographs) into an `f64`.
pub fn parse_number_literal(text: &str) -> Option<f64> {
    let suffix_multiplier = |c: char| -> Option<f64> {
        match c {
            'k' => Some(1e3),
            'm' | '\u{041C}' => Some(1e6),
            'M' => Some(1e6),
            'B' => Some(1e9),
            'T' | '\u{0422}' => Some(1e12),
            _ => None,
        }
    };

    let mut chars = text.chars();
    let last = text.chars().last()?;
    if let Some(mult) = suffix_multiplier(last) {
        let digits: String = chars.by_ref().take(text.chars().count() - 1).collect();
        let base: f64 = digits.replace('_', "").parse().ok()?;
        Some(base * mult)
    } else {
        text.replace('_', "").parse().ok()
    }
}

/// Interprets a lexed currency lexeme (`$100`, `€2.5M`) into an amount and
/// an (optional, symbol-implied) currency code.
pub fn parse_currency_literal(text: &str) -> Option<(f64, Option<String>)> {
    let mut chars = text.chars();
    let symbol = chars.next()?;
    let code = match symbol {
        '$' => Some("USD".to_string()),
        '€' => Some("EUR".to_string()),
        '£' => Some("GBP".to_string()),
        '¥' => Some("USD".to_string()),
        _ => None,
    };
    let rest: String = chars.collect();
    let amount = parse_number_literal(&rest)?;
    Some((amount, code))
}

impl Parser {
    pub(super) fn parse_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_unary()?;

        while let Some(prec) = precedence(self.peek_kind()) {
            if prec < min_prec {
                break;
            }
            let op_span = self.peek().span.clone();
            let op = binary_op(self.peek_kind());
            self.advance();
            // Left-associative at every level, including `^` (see
            // `precedence` above).
            let right = self.parse_binary(prec + 1)?;
            left = Expr::new(
                ExprKind::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                op_span,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        match self.peek_kind() {
            TokenKind::Minus => {
                let span = self.advance().span.clone();
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::UnaryOp {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::Not => {
                let span = self.advance().span.clone();
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::UnaryOp {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LBracket => {
                    let span = self.advance().span.clone();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::new(
                        ExprKind::Indexing {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    let span = self.advance().span.clone();
                    let member = super::ident_text(&self.expect_identifier()?);
                    expr = Expr::new(
                        ExprKind::MemberAccess {
                            target: Box::new(expr),
                            member,
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    // Only a call when the receiver is a bare variable
                    // name; anything else falls through untouched.
                    if let ExprKind::Variable(name) = &expr.kind {
                        let span = expr.span.clone();
                        let name = name.clone();
                        self.advance();
                        let mut args = Vec::new();
                        while !self.check(&TokenKind::RParen) {
                            args.push(self.parse_expr()?);
                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            }
                        }
                        self.expect(&TokenKind::RParen)?;
                        expr = Expr::new(
                            ExprKind::FunctionCall { callee: name, args },
                            span,
                        );
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let span = self.peek().span.clone();
        match self.peek_kind().clone() {
            TokenKind::Number(text) => {
                self.advance();
                let value = parse_number_literal(&text).ok_or_else(|| {
                    Diagnostic::new(ErrorCode::MalformedNumber, format!("malformed number '{text}'"))
                        .with_span(span.clone())
                })?;
                Ok(Expr::new(ExprKind::Literal(Literal::Number(value)), span))
            }
            TokenKind::Percentage(text) => {
                self.advance();
                let digits = text.trim_end_matches('%');
                let value = parse_number_literal(digits).ok_or_else(|| {
                    Diagnostic::new(
                        ErrorCode::MalformedNumber,
                        format!("malformed percentage '{text}'"),
                    )
                    .with_span(span.clone())
                })? / 100.0;
                Ok(Expr::new(ExprKind::Literal(Literal::Number(value)), span))
            }
            TokenKind::Currency(text) => {
                self.advance();
                let (amount, code) = parse_currency_literal(&text).ok_or_else(|| {
                    Diagnostic::new(
                        ErrorCode::MalformedNumber,
                        format!("malformed currency literal '{text}'"),
                    )
                    .with_span(span.clone())
                })?;
                Ok(Expr::new(
                    ExprKind::Literal(Literal::Currency { amount, code }),
                    span,
                ))
            }
            TokenKind::Duration(text) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Duration(text)), span))
            }
            TokenKind::String(text) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Text(text)), span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Boolean(true)), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Boolean(false)), span))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Variable(name), span))
            }
            TokenKind::LParen => self.parse_paren_or_lambda(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::If => self.parse_if_expr(),
            TokenKind::LBrace => self.parse_block_expr(),
            TokenKind::Tilde => self.parse_distribution_literal(),
            _ => Err(Diagnostic::new(
                ErrorCode::SyntaxError,
                format!("unexpected token '{}' in expression position", self.peek_kind()),
            )
            .with_span(span)),
        }
    }

    /// Disambiguates `(x, y) -> body` (a lambda) from `(expr)` (a
    /// parenthesized expression) by checkpointing position, scanning to
    /// the matching `)`, and peeking for `->`; on mismatch it backtracks
    /// and reparses as a plain parenthesized expression.
    fn parse_paren_or_lambda(&mut self) -> Result<Expr, Diagnostic> {
        let checkpoint = self.pos;
        let span = self.peek().span.clone();

        if self.looks_like_lambda_params() {
            self.advance(); // (
            let mut params = Vec::new();
            while !self.check(&TokenKind::RParen) {
                params.push(super::ident_text(&self.expect_identifier()?));
                if self.check(&TokenKind::Comma) {
                    self.advance();
                }
            }
            self.expect(&TokenKind::RParen)?;
            if self.check(&TokenKind::Arrow) {
                self.advance();
                let body = self.parse_expr()?;
                return Ok(Expr::new(
                    ExprKind::Lambda {
                        params,
                        body: Box::new(body),
                    },
                    span,
                ));
            }
            self.pos = checkpoint;
        }

        self.expect(&TokenKind::LParen)?;
        let inner = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        Ok(inner)
    }

    /// Scans forward from the current `(` to its matching `)` without
    /// consuming tokens, checking the contents are a bare comma-separated
    /// identifier list and that `->` follows.
    fn looks_like_lambda_params(&self) -> bool {
        let mut i = self.pos;
        if !matches!(self.tokens.get(i).map(|t| &t.kind), Some(TokenKind::LParen)) {
            return false;
        }
        i += 1;
        loop {
            match self.tokens.get(i).map(|t| &t.kind) {
                Some(TokenKind::RParen) => {
                    i += 1;
                    break;
                }
                Some(TokenKind::Identifier(_)) => {
                    i += 1;
                    if matches!(self.tokens.get(i).map(|t| &t.kind), Some(TokenKind::Comma)) {
                        i += 1;
                    }
                }
                _ => return false,
            }
        }
        matches!(self.tokens.get(i).map(|t| &t.kind), Some(TokenKind::Arrow))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, Diagnostic> {
        let span = self.expect(&TokenKind::LBracket)?.span;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            items.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::ArrayLiteral(items), span))
    }

    fn parse_if_expr(&mut self) -> Result<Expr, Diagnostic> {
        let span = self.expect(&TokenKind::If)?.span;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::Then)?;
        let then_branch = self.parse_expr()?;
        self.expect(&TokenKind::Else)?;
        let else_branch = self.parse_expr()?;
        Ok(Expr::new(
            ExprKind::IfThenElse {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    fn parse_block_expr(&mut self) -> Result<Expr, Diagnostic> {
        let span = self.expect(&TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        let mut tail = None;
        while !self.check(&TokenKind::RBrace) {
            let stmt_span = self.peek().span.clone();
            if matches!(self.peek_kind(), TokenKind::Return) {
                stmts.push(self.parse_block_stmt()?);
                continue;
            }
            let expr = self.parse_expr()?;
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                stmts.push(Stmt::new(StmtKind::Expr(expr), stmt_span));
            } else if self.check(&TokenKind::RBrace) {
                tail = Some(Box::new(expr));
            } else {
                stmts.push(Stmt::new(StmtKind::Expr(expr), stmt_span));
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Block(stmts, tail), span))
    }

    fn parse_block_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        let span = self.advance().span.clone(); // return
        let value = if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::RBrace) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.consume_semicolon();
        Ok(Stmt::new(StmtKind::Return(value), span))
    }

    /// Parses `~Name(key=value, key=value, ...)`. The distribution name is
    /// a free-form identifier; checked against a known set at the type
    /// checker, not here.
    fn parse_distribution_literal(&mut self) -> Result<Expr, Diagnostic> {
        let span = self.expect(&TokenKind::Tilde)?.span;
        let name = super::ident_text(&self.expect_identifier()?);
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let arg_name = super::ident_text(&self.expect_identifier()?);
            self.expect(&TokenKind::Assign)?;
            args.push((arg_name, self.parse_expr()?));
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Expr::new(
            ExprKind::Distribution(DistributionShape { name, args }),
            span,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse_expr_src(src: &str) -> Expr {
        let mut tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
        tokens.pop(); // drop trailing Eof duplicate check isn't needed
        let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        parser.parse_expr().unwrap()
    }

    #[test]
    fn exponent_is_left_associative() {
        // 2 ^ 3 ^ 2 should parse as (2 ^ 3) ^ 2, not 2 ^ (3 ^ 2).
        let expr = parse_expr_src("2 ^ 3 ^ 2");
        match expr.kind {
            ExprKind::BinaryOp { op: BinaryOp::Pow, left, .. } => match left.kind {
                ExprKind::BinaryOp { op: BinaryOp::Pow, .. } => {}
                _ => panic!("expected left operand to itself be a Pow"),
            },
            _ => panic!("expected top-level Pow"),
        }
    }

    #[test]
    fn precedence_respects_arithmetic_then_comparison() {
        let expr = parse_expr_src("1 + 2 * 3 > 5");
        match expr.kind {
            ExprKind::BinaryOp { op: BinaryOp::Gt, .. } => {}
            _ => panic!("expected top-level comparison"),
        }
    }

    #[test]
    fn parses_lambda_with_arrow() {
        let expr = parse_expr_src("(x, y) -> x + y");
        match expr.kind {
            ExprKind::Lambda { params, .. } => assert_eq!(params, vec!["x", "y"]),
            _ => panic!("expected a lambda"),
        }
    }

    #[test]
    fn parenthesized_expr_is_not_mistaken_for_lambda() {
        let expr = parse_expr_src("(1 + 2) * 3");
        match expr.kind {
            ExprKind::BinaryOp { op: BinaryOp::Mul, .. } => {}
            _ => panic!("expected multiplication at top level"),
        }
    }

    #[test]
    fn number_suffix_and_currency_literal_values() {
        assert_eq!(parse_number_literal("100k"), Some(100_000.0));
        assert_eq!(parse_number_literal("2.5M"), Some(2_500_000.0));
        assert_eq!(
            parse_currency_literal("$500"),
            Some((500.0, Some("USD".to_string())))
        );
    }

    #[test]
    fn parses_distribution_literal_with_named_args() {
        let expr = parse_expr_src("~Normal(mu=100, sigma=10)");
        match expr.kind {
            ExprKind::Distribution(shape) => {
                assert_eq!(shape.name, "Normal");
                assert_eq!(shape.arg("mu").unwrap().kind, ExprKind::Literal(Literal::Number(100.0)));
                assert_eq!(shape.arg("sigma").unwrap().kind, ExprKind::Literal(Literal::Number(10.0)));
            }
            other => panic!("expected a distribution literal, got {other:?}"),
        }
    }

    #[test]
    fn function_call_and_indexing_chain() {
        let expr = parse_expr_src("customers[t + 1]");
        match expr.kind {
            ExprKind::Indexing { .. } => {}
            _ => panic!("expected indexing expression"),
        }
    }
}
