//! A minimal spanned error, for callers that don't need PEL's full
//! diagnostic-code machinery (see `pel::diagnostic::Diagnostic` for that).

use crate::span::Span;
use std::fmt;

/// An error annotated with the source location it occurred at.
#[derive(Debug, Clone)]
pub struct SpannedError {
    pub message: String,
    pub span: Span,
}

impl SpannedError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for SpannedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for SpannedError {}

/// Alias for `std::result::Result<T, SpannedError>`.
pub type Result<T> = std::result::Result<T, SpannedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanned_error_display_includes_location() {
        let err = SpannedError::new("bad thing", Span::new("m.pel", 5, 10));
        let rendered = format!("{err}");
        assert!(rendered.contains("bad thing"));
        assert!(rendered.contains("m.pel:5:10"));
    }
}
