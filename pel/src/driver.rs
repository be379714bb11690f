//! Pipeline orchestration: source text to IR, and IR to a runtime result.
//!
//! Runs the five-stage pipeline in order (lexer, parser, type checker,
//! provenance checker, IR generator), with `--verbose` stage banners and
//! the option to emit IR even when non-fatal diagnostics were raised.

use crate::ast::Model;
use crate::checker::TypeChecker;
use crate::diagnostic::Diagnostic;
use crate::ir::{self, IrModule};
use crate::lexer::Lexer;
use crate::parser;
use crate::provenance::ProvenanceChecker;

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub verbose: bool,
    /// Emit IR even if the checker or provenance pass produced
    /// diagnostics, as long as parsing itself succeeded.
    pub force: bool,
}

pub struct CompileOutput {
    pub model: Model,
    pub ir: Option<IrModule>,
    pub diagnostics: Vec<Diagnostic>,
    pub provenance_score: f64,
}

/// Runs the full compile pipeline over `source`, returning as much of the
/// output as could be produced. A `None` `ir` means parsing failed
/// outright (there's no model to lower) or the checker found diagnostics
/// and `options.force` was not set.
pub fn compile(source: &str, filename: &str, options: &CompileOptions) -> Result<CompileOutput, Diagnostic> {
    let stage = |n: u8, name: &str| {
        if options.verbose {
            eprintln!("[{n}/5] {name}...");
        }
    };

    stage(1, "Lexer");
    let tokens = Lexer::new(source, filename).tokenize()?;

    stage(2, "Parser");
    let model = parser::parse(tokens)?;

    stage(3, "Type checker");
    let mut diagnostics = TypeChecker::new().check(&model);

    stage(4, "Provenance checker");
    let (prov_diags, provenance_score) = ProvenanceChecker::new().check(&model);
    diagnostics.extend(prov_diags);

    stage(5, "IR generator");
    let ir = if diagnostics.is_empty() || options.force {
        Some(ir::generate(&model, filename))
    } else {
        None
    };

    Ok(CompileOutput {
        model,
        ir,
        diagnostics,
        provenance_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_model_compiles_with_no_diagnostics() {
        let src = r#"model M {
            param price: Currency<USD> = $100 {
                source: "finance", method: observed, confidence: 0.9
            }
        }"#;
        let out = compile(src, "t.pel", &CompileOptions::default()).unwrap();
        assert!(out.diagnostics.is_empty());
        assert!(out.ir.is_some());
        assert_eq!(out.provenance_score, 1.0);
    }

    #[test]
    fn missing_provenance_withholds_ir_unless_forced() {
        let src = "model M { param a = 1; }";
        let out = compile(src, "t.pel", &CompileOptions::default()).unwrap();
        assert!(!out.diagnostics.is_empty());
        assert!(out.ir.is_none());

        let forced = compile(
            src,
            "t.pel",
            &CompileOptions { verbose: false, force: true },
        )
        .unwrap();
        assert!(forced.ir.is_some());
    }
}
