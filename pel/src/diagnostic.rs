//! The PEL diagnostic model: coded, located, hinted errors.
//!
//! Every compiler error has a stable code in the form `EXXXX`, grouped by
//! range (see [`ErrorCode`]), an optional source [`Span`], and an optional
//! hint. The rendered form is:
//!
//! ```text
//! --> FILE:LINE:COL
//! error[E0200]: dimensional mismatch: Currency<USD> + Fraction
//!   = hint: did you mean to convert units first?
//! ```

use pel_base::Span;
use std::fmt;

/// A stable, documented error code. Codes are grouped by the stage that
/// raises them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E0001 - unexpected character.
    UnexpectedChar,
    /// E0002 - malformed numeric literal (reserved).
    MalformedNumber,
    /// E0003 - unterminated string literal.
    UnterminatedString,
    /// E0101 - reference to an undefined variable.
    UndefinedVariable,
    /// E0102 - declared type does not match the inferred type of a value.
    TypeMismatch,
    /// E0103 - a generic type-system violation not covered by a specific code.
    InvalidOperation,
    /// E0200 - dimensional mismatch between operands of `+`/`-`/comparison.
    DimensionalMismatch,
    /// E0201 - currency-code mismatch (e.g. USD vs EUR).
    CurrencyMismatch,
    /// E0202 - rate/time-unit mismatch.
    RateUnitMismatch,
    /// E0300 - a time-series equation references a future timestep.
    FutureReference,
    /// E0301 - a cyclic dependency among node equations.
    CyclicDependency,
    /// E0400 - a `param` is missing its provenance block entirely.
    MissingProvenanceBlock,
    /// E0401 - a provenance block is missing a required field.
    MissingProvenanceField,
    /// E0402 - a provenance `confidence` value is outside `[0, 1]`, or
    /// `method` is not one of the recognized values.
    InvalidProvenanceField,
    /// E0500 - a constraint's condition does not type-check as Boolean.
    InvalidConstraint,
    /// E0501 - constraints that can never simultaneously hold (detection
    /// only; PEL does not attempt to resolve contradictions).
    ContradictoryConstraint,
    /// E0600 - a distribution parameter is out of its valid domain.
    InvalidDistributionParameter,
    /// E0601 - a correlation coefficient is outside `[-1, 1]`, or two
    /// `correlated_with` entries disagree about the same pair.
    InvalidCorrelation,
    /// E0602 - a correlation matrix is not positive semi-definite.
    NonPsdCorrelationMatrix,
    /// E0700 - the parser expected a specific token and found another.
    UnexpectedToken,
    /// E0701 - a generic syntax error not covered by `UnexpectedToken`.
    SyntaxError,
    /// E9999 - an internal compiler error (a stage invariant was violated).
    Internal,
}

impl ErrorCode {
    /// The `EXXXX` rendering of this code.
    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            UnexpectedChar => "E0001",
            MalformedNumber => "E0002",
            UnterminatedString => "E0003",
            UndefinedVariable => "E0101",
            TypeMismatch => "E0102",
            InvalidOperation => "E0103",
            DimensionalMismatch => "E0200",
            CurrencyMismatch => "E0201",
            RateUnitMismatch => "E0202",
            FutureReference => "E0300",
            CyclicDependency => "E0301",
            MissingProvenanceBlock => "E0400",
            MissingProvenanceField => "E0401",
            InvalidProvenanceField => "E0402",
            InvalidConstraint => "E0500",
            ContradictoryConstraint => "E0501",
            InvalidDistributionParameter => "E0600",
            InvalidCorrelation => "E0601",
            NonPsdCorrelationMatrix => "E0602",
            UnexpectedToken => "E0700",
            SyntaxError => "E0701",
            Internal => "E9999",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single compiler diagnostic: a code, a message, an optional location,
/// and an optional hint.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub span: Option<Span>,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
            hint: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            writeln!(f, "--> {span}")?;
        }
        write!(f, "error[{}]: {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  = hint: {hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_without_span_or_hint() {
        let diag = Diagnostic::new(ErrorCode::UndefinedVariable, "unbound name 'x'");
        assert_eq!(format!("{diag}"), "error[E0101]: unbound name 'x'");
    }

    #[test]
    fn renders_span_and_hint() {
        let diag = Diagnostic::new(ErrorCode::DimensionalMismatch, "Currency + Fraction")
            .with_span(Span::new("m.pel", 4, 2))
            .with_hint("convert units first");
        let rendered = format!("{diag}");
        assert!(rendered.starts_with("--> m.pel:4:2\n"));
        assert!(rendered.contains("error[E0200]: Currency + Fraction"));
        assert!(rendered.ends_with("= hint: convert units first"));
    }
}
