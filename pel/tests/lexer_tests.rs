use pel::lexer::Lexer;
use pel::token::TokenKind;

#[test]
fn range_syntax_does_not_swallow_the_dots_into_a_decimal() {
    let tokens = Lexer::new("for t in 0..time_horizon { }", "t.pel")
        .tokenize()
        .unwrap();
    let kinds: Vec<&TokenKind> = tokens.iter().map(|t| &t.kind).collect();
    assert!(kinds.contains(&&TokenKind::Number("0".into())));
    assert_eq!(kinds.iter().filter(|k| **k == &TokenKind::Dot).count(), 2);
}

#[test]
fn a_file_of_mixed_literals_tokenizes_without_error() {
    let src = r#"
        param price: Currency<USD> = $1.5M
        param churn: Fraction = 5%
        param horizon: Duration<mo> = 18mo
        var active = true
    "#;
    let tokens = Lexer::new(src, "mixed.pel").tokenize().unwrap();
    assert!(tokens.len() > 10);
    assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
}

#[test]
fn cyrillic_homograph_suffixes_are_tolerated() {
    // U+041C (Cyrillic Em) used where a Latin 'M' was probably intended.
    let tokens = Lexer::new("1\u{041C}", "t.pel").tokenize().unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Number("1\u{041C}".into()));
}
