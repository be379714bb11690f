//! Provenance checking: every `param` must explain where its value came
//! from and how confident the model is in it.
//!
//! The completeness score is the fraction of required and recommended
//! fields present across every param in the model.

use crate::ast::{Constraint, Model, ParamDecl, Policy};
use crate::diagnostic::{Diagnostic, ErrorCode};

/// Fields every provenance block must carry.
const REQUIRED_FIELDS: &[&str] = &["source", "method", "confidence"];

/// Fields that raise no error when absent but lower the completeness
/// score.
const RECOMMENDED_FIELDS: &[&str] = &["freshness", "owner"];

/// The only recognized `method` values.
const VALID_METHODS: &[&str] = &[
    "observed",
    "fitted",
    "derived",
    "expert_estimate",
    "external_research",
    "assumption",
];

pub struct ProvenanceChecker {
    diagnostics: Vec<Diagnostic>,
    total_fields: usize,
    present_fields: usize,
}

impl ProvenanceChecker {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
            total_fields: 0,
            present_fields: 0,
        }
    }

    /// Checks every `param` in the model, returning the accumulated
    /// diagnostics and an overall completeness score in `[0, 1]` (1.0
    /// when there are no params to score).
    pub fn check(mut self, model: &Model) -> (Vec<Diagnostic>, f64) {
        self.check_params(&model.params);
        self.check_constraints_and_policies(&model.constraints, &model.policies);

        let score = if self.total_fields == 0 {
            1.0
        } else {
            self.present_fields as f64 / self.total_fields as f64
        };
        (self.diagnostics, score)
    }

    fn check_constraints_and_policies(&mut self, _constraints: &[Constraint], _policies: &[Policy]) {
        // Constraints and policies carry no provenance of their own; kept
        // as an explicit no-op so the four-part model walk in `check`
        // stays symmetric with the checker and IR passes.
    }

    fn check_params(&mut self, params: &[ParamDecl]) {
        for p in params {
            self.check_param(p);
        }
    }

    fn check_param(&mut self, param: &ParamDecl) {
        let Some(prov) = &param.provenance else {
            self.diagnostics.push(
                Diagnostic::new(
                    ErrorCode::MissingProvenanceBlock,
                    format!("param '{}' has no provenance block", param.name),
                )
                .with_span(param.span.clone())
                .with_hint("add a { source: ..., method: ..., confidence: ... } block"),
            );
            self.total_fields += REQUIRED_FIELDS.len() + RECOMMENDED_FIELDS.len();
            return;
        };

        for field in REQUIRED_FIELDS {
            self.total_fields += 1;
            let present = match *field {
                "source" => prov.source.is_some(),
                "method" => prov.method.is_some(),
                "confidence" => prov.confidence.is_some(),
                _ => unreachable!(),
            };
            if present {
                self.present_fields += 1;
            } else {
                self.diagnostics.push(
                    Diagnostic::new(
                        ErrorCode::MissingProvenanceField,
                        format!("param '{}' is missing required provenance field '{field}'", param.name),
                    )
                    .with_span(prov.span.clone()),
                );
            }
        }

        for field in RECOMMENDED_FIELDS {
            self.total_fields += 1;
            let present = match *field {
                "freshness" => prov.freshness.is_some(),
                "owner" => prov.owner.is_some(),
                _ => unreachable!(),
            };
            if present {
                self.present_fields += 1;
            }
        }

        if let Some(confidence) = prov.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                self.diagnostics.push(
                    Diagnostic::new(
                        ErrorCode::InvalidProvenanceField,
                        format!(
                            "param '{}' confidence {confidence} is outside [0, 1]",
                            param.name
                        ),
                    )
                    .with_span(prov.span.clone()),
                );
            }
        }

        if let Some(method) = &prov.method {
            if !VALID_METHODS.contains(&method.as_str()) {
                self.diagnostics.push(
                    Diagnostic::new(
                        ErrorCode::InvalidProvenanceField,
                        format!("param '{}' has unrecognized provenance method '{method}'", param.name),
                    )
                    .with_span(prov.span.clone())
                    .with_hint(format!("expected one of: {}", VALID_METHODS.join(", "))),
                );
            }
        }

        for (name, coeff) in &prov.correlated_with {
            if !(-1.0..=1.0).contains(coeff) {
                self.diagnostics.push(
                    Diagnostic::new(
                        ErrorCode::InvalidCorrelation,
                        format!(
                            "param '{}' correlation with '{name}' ({coeff}) is outside [-1, 1]",
                            param.name
                        ),
                    )
                    .with_span(prov.span.clone()),
                );
            }
        }
    }
}

impl Default for ProvenanceChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser;

    fn check_src(src: &str) -> (Vec<Diagnostic>, f64) {
        let tokens = Lexer::new(src, "t.pel").tokenize().unwrap();
        let model = parser::parse(tokens).unwrap();
        ProvenanceChecker::new().check(&model)
    }

    #[test]
    fn missing_provenance_block_is_an_error() {
        let (diags, score) = check_src("model M { param a = 1; }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_str(), "E0400");
        assert_eq!(score, 0.0);
    }

    #[test]
    fn full_provenance_scores_1_0() {
        let (diags, score) = check_src(
            r#"model M {
                param a = $1 {
                    source: "x",
                    method: observed,
                    confidence: 0.9,
                    freshness: "2026-01-01",
                    owner: "finance"
                }
            }"#,
        );
        assert!(diags.is_empty());
        assert_eq!(score, 1.0);
    }

    #[test]
    fn invalid_confidence_is_reported() {
        let (diags, _) = check_src(
            r#"model M {
                param a = $1 { source: "x", method: observed, confidence: 1.5 }
            }"#,
        );
        assert!(diags.iter().any(|d| d.code.as_str() == "E0402"));
    }

    #[test]
    fn unknown_method_is_reported() {
        let (diags, _) = check_src(
            r#"model M {
                param a = $1 { source: "x", method: guessing, confidence: 0.5 }
            }"#,
        );
        assert!(diags.iter().any(|d| d.code.as_str() == "E0402"));
    }
}
