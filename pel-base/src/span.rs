//! Source location tracking for diagnostics.
//!
//! A [`Span`] is a line/column position in a single source file. Every
//! token, AST node, and diagnostic in PEL carries one, enabling error
//! messages that point at the exact place a problem occurred.
//!
//! Unlike byte-offset spans, PEL spans are line/column pairs because the
//! lexer already tracks position that way (see `pel::lexer::Lexer`) and the
//! error renderer (`--> FILE:LINE:COL`) wants line/column directly.
//!
//! # Example
//!
//! ```
//! use pel_base::Span;
//!
//! let span = Span::new("model.pel", 3, 10);
//! assert_eq!(format!("{span}"), "model.pel:3:10");
//! ```

use std::fmt;

/// A 1-based line/column position within a named source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Span {
    /// Creates a span at the given 1-based line and column.
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// A span with no meaningful location, used for synthesized nodes.
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0, 0)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_stores_position() {
        let span = Span::new("a.pel", 5, 10);
        assert_eq!(span.line, 5);
        assert_eq!(span.column, 10);
    }

    #[test]
    fn span_default_is_unknown_position() {
        let span = Span::default();
        assert_eq!(span.line, 0);
        assert_eq!(span.column, 0);
    }

    #[test]
    fn span_display_matches_renderer_format() {
        let span = Span::new("model.pel", 3, 10);
        assert_eq!(format!("{span}"), "model.pel:3:10");
    }
}
