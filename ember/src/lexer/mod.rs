//! Lexer implementation using logos

mod token;

pub use token::Token;

use crate::ast::Span;
use crate::error::{CompileError, Result};
use logos::Logos;

/// Tokenize source code
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) if lexer.slice().starts_with('"') => {
                return Err(CompileError::lexer(
                    format!("malformed string literal: {}", lexer.slice()),
                    span,
                ));
            }
            Err(_) => {
                return Err(CompileError::lexer(
                    format!("unexpected character: {:?}", lexer.slice()),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_keywords() {
        assert_eq!(
            kinds("fn if else while for break continue return global"),
            vec![
                Token::Fn,
                Token::If,
                Token::Else,
                Token::While,
                Token::For,
                Token::Break,
                Token::Continue,
                Token::Return,
                Token::Global,
            ]
        );
    }

    #[test]
    fn test_tokenize_literal_keywords() {
        assert_eq!(
            kinds("true false nil typeof and or not"),
            vec![
                Token::True,
                Token::False,
                Token::Nil,
                Token::TypeOf,
                Token::And,
                Token::Or,
                Token::Not,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            kinds("42 1.5 2e3"),
            vec![Token::Number(42.0), Token::Number(1.5), Token::Number(2000.0)]
        );
    }

    #[test]
    fn test_tokenize_range_is_not_a_float() {
        assert_eq!(
            kinds("0..5"),
            vec![Token::Number(0.0), Token::DotDot, Token::Number(5.0)]
        );
    }

    #[test]
    fn test_tokenize_string_escapes() {
        assert_eq!(
            kinds(r#""a\tb\n\"q\"""#),
            vec![Token::Str("a\tb\n\"q\"".to_string())]
        );
    }

    #[test]
    fn test_tokenize_bad_escape_is_error() {
        let err = tokenize(r#""\q""#).unwrap_err();
        assert!(err.message().contains("malformed string literal"));
    }

    #[test]
    fn test_tokenize_assignment_forms() {
        assert_eq!(
            kinds("= := == !="),
            vec![Token::Eq, Token::ColonEq, Token::EqEq, Token::NotEq]
        );
    }

    #[test]
    fn test_tokenize_comparisons() {
        assert_eq!(
            kinds("< <= > >="),
            vec![Token::Lt, Token::LtEq, Token::Gt, Token::GtEq]
        );
    }

    #[test]
    fn test_tokenize_identifiers_vs_keywords() {
        assert_eq!(
            kinds("format iffy _x1"),
            vec![
                Token::Ident("format".to_string()),
                Token::Ident("iffy".to_string()),
                Token::Ident("_x1".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_skips_comments() {
        assert_eq!(
            kinds("x // trailing words\ny"),
            vec![Token::Ident("x".to_string()), Token::Ident("y".to_string())]
        );
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("xs[1:]").unwrap();
        assert_eq!(tokens[0].1, Span::new(0, 2));
        assert_eq!(tokens[2].1, Span::new(3, 4));
        assert_eq!(tokens[3], (Token::Colon, Span::new(4, 5)));
    }

    #[test]
    fn test_tokenize_unexpected_character() {
        let err = tokenize("x = @").unwrap_err();
        assert!(err.message().contains("unexpected character"));
        assert_eq!(err.span(), Some(Span::new(4, 5)));
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token::ColonEq.to_string(), "`:=`");
        assert_eq!(Token::Ident("x".into()).to_string(), "identifier `x`");
    }
}
