//! The dimensional type system: `Dimension` tags and `PELType`s built from
//! them.
//!
//! Dimensions track what an economic quantity *is* (a currency amount, a
//! rate over time, a count of some entity, ...) separately from PEL's
//! scalar representation (always `f64` at runtime) so that `price + count`
//! is rejected even though both are numbers.
//!
//! A dimension could equally be modeled as an open bag of string-keyed
//! tags (`{"currency": "USD"}`, `{"rate": "Month", "time": "generic"}`,
//! ...) that combine freely. PEL instead uses the closed, Rust-idiomatic
//! enum the rest of this crate already builds on; every multiply/divide
//! rule is still implemented exactly, with the generic "otherwise"
//! fallback (an arbitrary merge of bag keys under the open-bag model)
//! approximated through `Inverted` composition rather than a literal
//! multi-key bag. See DESIGN.md for the rationale.

use std::collections::BTreeMap;
use std::fmt;

/// A dimension tag: what kind of economic quantity a value represents.
///
/// Multiplication and division compose dimensions (a `Rate` times a
/// `Duration` cancels to dimensionless, a `Currency` divided by a `Count`
/// becomes a scoped per-entity `Currency`); addition and subtraction
/// require the *same* dimension (up to `compatible`) on both sides.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Dimension {
    /// A dimensionless number (a bare integer literal).
    Scalar,
    /// A monetary amount in a specific currency code, e.g. `Currency(USD)`.
    Currency(String),
    /// A quantity per unit time, tagged only by the time unit — PEL's
    /// `Rate [per] UNIT` surface syntax carries no base type, so neither
    /// does this dimension.
    Rate(String),
    /// A span of time in a specific unit (`mo`, `yr`, `day`, `q`, `w`), or
    /// `"generic"` for a duration literal that hasn't been pinned to a unit
    /// yet (any concrete unit unifies with `generic`).
    Duration(String),
    /// A count of some named kind of entity, e.g. `Count(customer)`.
    Count(String),
    /// A capacity of some named kind of resource, e.g. `Capacity(seat)`.
    Capacity(String),
    /// A dimensionless fraction (a ratio, a probability, a percentage).
    Fraction,
    /// A boolean.
    Boolean,
    /// A string.
    Text,
    /// A `Dimension` indexed by time, e.g. `TimeSeries(Currency(USD))`.
    TimeSeries(Box<Dimension>),
    /// A `Dimension` drawn from a probability distribution.
    Distribution(Box<Dimension>),
    /// A dimension scoped to a named entity, produced by dividing a
    /// `Currency` or other aggregate quantity by a `Count<ENTITY>` (e.g.
    /// `revenue / customers` is revenue-per-customer, scoped to
    /// `customer`) and cancelled by multiplying back by `Count<ENTITY>`.
    Scoped(String, Box<Dimension>),
    /// The inverse of another dimension, produced as the fallback for
    /// divisions the algebra doesn't special-case; composes back to the
    /// original dimension when multiplied against it again.
    Inverted(Box<Dimension>),
}

/// Why two dimensions could not be combined — distinguished so the
/// checker can raise the right `E02xx` code (a currency-code clash gets
/// its own code from a generic dimensional mismatch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionError {
    CurrencyMismatch(String, String),
    Incompatible,
}

impl fmt::Display for DimensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionError::CurrencyMismatch(a, b) => {
                write!(f, "currency mismatch: {a} vs {b}")
            }
            DimensionError::Incompatible => write!(f, "incompatible dimensions"),
        }
    }
}

/// Whether `d` counts as "dimensionless" for the purposes of the
/// dimensionless-operand-times-dimensioned-operand multiply shortcut
/// (rule 1 below): `Fraction`, plain `Scalar`, and `Count` all
/// count, even though `Count` is itself a tracked dimension elsewhere.
fn is_multiply_dimensionless(d: &Dimension) -> bool {
    matches!(d, Dimension::Scalar | Dimension::Fraction | Dimension::Count(_))
}

/// The three dimensioned shapes the multiply shortcut passes through
/// unchanged.
fn is_multiply_dimensioned(d: &Dimension) -> bool {
    matches!(d, Dimension::Currency(_) | Dimension::Rate(_) | Dimension::Duration(_))
}

impl Dimension {
    /// Multiplies two dimensions, implementing an ordered rule list
    /// (first match wins).
    pub fn multiply(&self, other: &Dimension) -> Result<Dimension, DimensionError> {
        use Dimension::*;

        // Rule 1: dimensionless (Fraction/Scalar/Count) x dimensioned
        // (Currency/Rate/Duration) yields the dimensioned operand
        // unchanged. Not applied when both sides are dimensionless.
        if is_multiply_dimensionless(self) && is_multiply_dimensioned(other) {
            return Ok(other.clone());
        }
        if is_multiply_dimensionless(other) && is_multiply_dimensioned(self) {
            return Ok(self.clone());
        }

        // Rule 3: Rate x Duration (same or generic time unit) is
        // dimensionless.
        match (self, other) {
            (Rate(unit), Duration(du)) | (Duration(du), Rate(unit)) if units_compatible(unit, du) => {
                return Ok(Fraction)
            }
            _ => {}
        }

        // Rule 4: Count<E> x Scoped<E> cancels the scoped dimension.
        match (self, other) {
            (Count(e), Scoped(se, inner)) | (Scoped(se, inner), Count(e)) if e == se => {
                return Ok((**inner).clone())
            }
            _ => {}
        }

        // Rule 5: currency x currency, same code cancels to dimensionless,
        // differing codes is an error.
        if let (Currency(a), Currency(b)) = (self, other) {
            return if a == b {
                Ok(Fraction)
            } else {
                Err(DimensionError::CurrencyMismatch(a.clone(), b.clone()))
            };
        }

        // Cancellation of a prior division's `Inverted` fallback.
        match (self, other) {
            (Inverted(a), b) if a.as_ref() == b => return Ok(Scalar),
            (a, Inverted(b)) if a == b.as_ref() => return Ok(Scalar),
            (Inverted(a), b) => return b.multiply(a).map(|d| Inverted(Box::new(d))),
            (a, Inverted(b)) => return a.multiply(b).map(|d| Inverted(Box::new(d))),
            _ => {}
        }

        Err(DimensionError::Incompatible)
    }

    /// Divides `self` by `other`, implementing an ordered rule list
    /// (first match wins).
    pub fn divide(&self, other: &Dimension) -> Result<Dimension, DimensionError> {
        use Dimension::*;

        // Dimensionless / Duration yields Rate per that time unit
        // (the common `0.30 / 1mo` pattern).
        if matches!(self, Fraction | Scalar) {
            if let Duration(u) = other {
                return Ok(Rate(u.clone()));
            }
        }

        if let (Currency(a), Currency(b)) = (self, other) {
            return if a == b {
                Ok(Fraction)
            } else {
                Err(DimensionError::CurrencyMismatch(a.clone(), b.clone()))
            };
        }

        if let (Currency(_), Duration(u)) = (self, other) {
            return Ok(Rate(u.clone()));
        }

        if let (Currency(c), Rate(_)) = (self, other) {
            return Ok(Currency(c.clone()));
        }

        if let (Currency(c), Count(e)) = (self, other) {
            return Ok(Scoped(e.clone(), Box::new(Currency(c.clone()))));
        }

        if let (Duration(a), Duration(b)) = (self, other) {
            if units_compatible(a, b) {
                return Ok(Fraction);
            }
        }

        // Divide by dimensionless preserves the left dimension.
        if matches!(other, Fraction | Scalar) {
            return Ok(self.clone());
        }

        // Otherwise, approximate an open-bag "invert and merge" fallback
        // via `Inverted` composition.
        self.multiply(&Inverted(Box::new(other.clone())))
    }

    /// Whether two dimensions can appear on either side of `+`/`-`/a
    /// comparison. Two `Duration`s are compatible if either is `"generic"`
    /// (a bare duration literal unifies with any concrete unit); every
    /// other pair requires structural equality.
    pub fn compatible(&self, other: &Dimension) -> bool {
        use Dimension::*;
        match (self, other) {
            (Duration(a), Duration(b)) => units_compatible(a, b),
            (TimeSeries(a), TimeSeries(b)) => a.compatible(b),
            (Distribution(a), Distribution(b)) => a.compatible(b),
            (Scoped(sa, a), Scoped(sb, b)) => sa == sb && a.compatible(b),
            _ => self == other,
        }
    }
}

fn units_compatible(a: &str, b: &str) -> bool {
    a == b || a == "generic" || b == "generic"
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Dimension::*;
        match self {
            Scalar => write!(f, "Scalar"),
            Currency(code) => write!(f, "Currency<{code}>"),
            Rate(unit) => write!(f, "Rate per {unit}"),
            Duration(unit) => write!(f, "Duration<{unit}>"),
            Count(entity) => write!(f, "Count<{entity}>"),
            Capacity(resource) => write!(f, "Capacity<{resource}>"),
            Fraction => write!(f, "Fraction"),
            Boolean => write!(f, "Boolean"),
            Text => write!(f, "Text"),
            TimeSeries(inner) => write!(f, "TimeSeries<{inner}>"),
            Distribution(inner) => write!(f, "Distribution<{inner}>"),
            Scoped(entity, inner) => write!(f, "{inner}@{entity}"),
            Inverted(inner) => write!(f, "1/{inner}"),
        }
    }
}

/// A fully resolved PEL type: a dimension plus a PEL scalar/array/function
/// shape. Every runtime value is ultimately an `f64`, `bool`, `String`, or
/// a structured aggregate of those; `PELType` is purely a compile-time
/// bookkeeping device used by the checker.
#[derive(Debug, Clone, PartialEq)]
pub enum PELType {
    Dimensioned(Dimension),
    Array(Box<PELType>),
    Function {
        params: Vec<PELType>,
        ret: Box<PELType>,
    },
    /// The type of `if` branches or expressions the checker could not yet
    /// pin down; unifies with anything during inference and is never the
    /// final type of a well-typed program.
    Unknown,
}

impl fmt::Display for PELType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PELType::Dimensioned(d) => write!(f, "{d}"),
            PELType::Array(inner) => write!(f, "[{inner}]"),
            PELType::Function { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            PELType::Unknown => write!(f, "?"),
        }
    }
}

/// A name-to-type environment with lexical scoping: each scope's lookup
/// falls through to its parent.
#[derive(Debug, Clone)]
pub struct TypeEnvironment {
    scopes: Vec<BTreeMap<String, PELType>>,
}

impl TypeEnvironment {
    pub fn new() -> Self {
        Self {
            scopes: vec![BTreeMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        if self.scopes.is_empty() {
            self.scopes.push(BTreeMap::new());
        }
    }

    pub fn define(&mut self, name: impl Into<String>, ty: PELType) {
        self.scopes
            .last_mut()
            .expect("at least one scope always present")
            .insert(name.into(), ty);
    }

    pub fn lookup(&self, name: &str) -> Option<&PELType> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

impl Default for TypeEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Dimension::*;

    #[test]
    fn rate_times_duration_cancels_to_dimensionless() {
        let rate = Rate("mo".into());
        let dur = Duration("mo".into());
        assert_eq!(rate.multiply(&dur), Ok(Fraction));
    }

    #[test]
    fn generic_duration_unifies_with_any_unit() {
        assert!(Duration("generic".into()).compatible(&Duration("yr".into())));
        assert!(Duration("mo".into()).compatible(&Duration("generic".into())));
        assert!(!Duration("mo".into()).compatible(&Duration("yr".into())));
    }

    #[test]
    fn currency_plus_fraction_is_incompatible() {
        assert!(!Currency("USD".into()).compatible(&Fraction));
    }

    #[test]
    fn currency_divided_by_count_is_scoped() {
        let currency = Currency("USD".into());
        let count = Count("customer".into());
        assert_eq!(
            currency.divide(&count),
            Ok(Scoped("customer".into(), Box::new(Currency("USD".into()))))
        );
    }

    #[test]
    fn count_times_scoped_cancels_to_inner() {
        let count = Count("customer".into());
        let scoped = Scoped("customer".into(), Box::new(Currency("USD".into())));
        assert_eq!(count.multiply(&scoped), Ok(Currency("USD".into())));
    }

    #[test]
    fn currency_divided_by_rate_is_currency() {
        let currency = Currency("USD".into());
        let rate = Rate("mo".into());
        assert_eq!(currency.divide(&rate), Ok(Currency("USD".into())));
    }

    #[test]
    fn currency_times_currency_mismatch_is_an_error() {
        let usd = Currency("USD".into());
        let eur = Currency("EUR".into());
        assert_eq!(
            usd.multiply(&eur),
            Err(DimensionError::CurrencyMismatch("USD".into(), "EUR".into()))
        );
    }

    #[test]
    fn fraction_divided_by_duration_is_a_rate() {
        assert_eq!(Fraction.divide(&Duration("mo".into())), Ok(Rate("mo".into())));
    }

    #[test]
    fn environment_lookup_falls_through_to_parent_scope() {
        let mut env = TypeEnvironment::new();
        env.define("x", PELType::Dimensioned(Scalar));
        env.push_scope();
        env.define("y", PELType::Dimensioned(Fraction));
        assert_eq!(env.lookup("x"), Some(&PELType::Dimensioned(Scalar)));
        assert_eq!(env.lookup("y"), Some(&PELType::Dimensioned(Fraction)));
        env.pop_scope();
        assert_eq!(env.lookup("y"), None);
    }
}
