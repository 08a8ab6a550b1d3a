use std::fmt::Display;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::debug;

use crate::system::{Constant, Function, Operator};

#[derive(Error, Debug, Diagnostic)]
pub enum LexError {
    #[error("Unexpected character '{token}'")]
    #[diagnostic(
        code(sci_calc::lex::unexpected_character),
        help("remove or correct the character: `{token}`")
    )]
    UnexpectedCharacter {
        #[source_code]
        src: NamedSource<String>,

        #[label("this character")]
        bad_bit: SourceSpan,

        token: char,
    },

    #[error("invalid number literal `{literal}`")]
    #[diagnostic(code(sci_calc::lex::invalid_number))]
    InvalidNumber {
        #[source_code]
        src: NamedSource<String>,

        #[label("this numeric literal")]
        bad_bit: SourceSpan,

        literal: String,
    },
}

impl LexError {
    pub fn span(&self) -> SourceSpan {
        match self {
            LexError::UnexpectedCharacter { bad_bit, .. }
            | LexError::InvalidNumber { bad_bit, .. } => *bad_bit,
        }
    }

    /// 1-based character column of the offending input.
    pub fn column(&self) -> usize {
        let src = match self {
            LexError::UnexpectedCharacter { src, .. } | LexError::InvalidNumber { src, .. } => src,
        };
        src.inner()[..self.span().offset()].chars().count() + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

impl Token {
    /// Functions, including names the lexer could not resolve, sit on the
    /// operator stack until their argument list is complete.
    pub fn is_function(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Function(_) | TokenKind::UnresolvedIdentifier(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Operator(Operator),
    Function(Function),
    /// An identifier that is neither a function nor a constant. It is
    /// handled like a function call and rejected by the evaluator.
    UnresolvedIdentifier(String),
    LeftParen,
    RightParen,
    Comma,
    Constant(Constant),
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Operator(op) => write!(f, "{op}"),
            TokenKind::Function(function) => write!(f, "{function}"),
            TokenKind::UnresolvedIdentifier(name) => write!(f, "{name}"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Constant(constant) => write!(f, "{constant}"),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = &self.kind;
        match self.kind {
            TokenKind::Number(_) => write!(f, "NUMBER {lit}"),
            TokenKind::Operator(_) => write!(f, "OPERATOR {lit}"),
            TokenKind::Function(_) => write!(f, "FUNCTION {lit}"),
            TokenKind::UnresolvedIdentifier(_) => write!(f, "IDENTIFIER {lit}"),
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit}"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit}"),
            TokenKind::Comma => write!(f, "COMMA {lit}"),
            TokenKind::Constant(_) => write!(f, "CONSTANT {lit}"),
        }
    }
}

pub struct Lexer<'de> {
    whole: &'de str,
    rest: &'de str,
    byte: usize,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            whole: input,
            rest: input,
            byte: 0,
        }
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new("<input>", self.whole.to_string())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let cur = self.rest;
            let start = self.byte;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Start {
                Ident,
                Number,
            }

            let process = |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    span: SourceSpan::from(start..start + c.len_utf8()),
                }))
            };

            let started = match c {
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                ',' => return process(TokenKind::Comma),
                '+' => return process(TokenKind::Operator(Operator::Plus)),
                '-' => return process(TokenKind::Operator(Operator::Minus)),
                '*' => return process(TokenKind::Operator(Operator::Star)),
                '/' => return process(TokenKind::Operator(Operator::Slash)),
                '^' => return process(TokenKind::Operator(Operator::Caret)),
                '%' => return process(TokenKind::Operator(Operator::Percent)),
                '0'..='9' => Start::Number,
                '.' if self.rest.starts_with(|c: char| c.is_ascii_digit()) => Start::Number,
                'a'..='z' | 'A'..='Z' | '_' | '$' => Start::Ident,
                c if c.is_ascii_whitespace() => continue,
                c => {
                    return Some(Err(LexError::UnexpectedCharacter {
                        src: self.source(),
                        bad_bit: SourceSpan::from(start..self.byte),
                        token: c,
                    }));
                }
            };

            match started {
                Start::Number => {
                    let mut seen_dot = false;
                    let end = cur
                        .find(|c: char| match c {
                            '0'..='9' => false,
                            '.' if !seen_dot => {
                                seen_dot = true;
                                false
                            }
                            _ => true,
                        })
                        .unwrap_or(cur.len());

                    let literal = &cur[..end];
                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    let span = SourceSpan::from(start..self.byte);
                    return Some(match literal.parse() {
                        Ok(n) => Ok(Token {
                            kind: TokenKind::Number(n),
                            span,
                        }),
                        Err(_) => Err(LexError::InvalidNumber {
                            src: self.source(),
                            bad_bit: span,
                            literal: literal.to_string(),
                        }),
                    });
                }
                Start::Ident => {
                    // digits and dots end an identifier, so `sin2` is `sin` applied to `2`
                    let end = cur
                        .find(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '_' | '$'))
                        .unwrap_or(cur.len());

                    let literal = &cur[..end];
                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    let kind = if let Some(function) = Function::lookup(literal) {
                        TokenKind::Function(function)
                    } else if let Some(constant) = Constant::lookup(literal) {
                        TokenKind::Constant(constant)
                    } else {
                        TokenKind::UnresolvedIdentifier(literal.to_string())
                    };

                    return Some(Ok(Token {
                        kind,
                        span: SourceSpan::from(start..self.byte),
                    }));
                }
            }
        }
    }
}

/// Splits one line of input into tokens, stopping at the first bad character.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let tokens = Lexer::new(text).collect::<Result<Vec<_>, _>>()?;
    debug!(count = tokens.len(), "tokenized input");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn operators_and_structure() {
        assert_eq!(
            kinds("(1+2)*3,4^5%6/7-8"),
            vec![
                TokenKind::LeftParen,
                TokenKind::Number(1.0),
                TokenKind::Operator(Operator::Plus),
                TokenKind::Number(2.0),
                TokenKind::RightParen,
                TokenKind::Operator(Operator::Star),
                TokenKind::Number(3.0),
                TokenKind::Comma,
                TokenKind::Number(4.0),
                TokenKind::Operator(Operator::Caret),
                TokenKind::Number(5.0),
                TokenKind::Operator(Operator::Percent),
                TokenKind::Number(6.0),
                TokenKind::Operator(Operator::Slash),
                TokenKind::Number(7.0),
                TokenKind::Operator(Operator::Minus),
                TokenKind::Number(8.0),
            ]
        );
    }

    #[test]
    fn number_literals() {
        assert_eq!(kinds("3.25"), vec![TokenKind::Number(3.25)]);
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5)]);
        assert_eq!(kinds("7."), vec![TokenKind::Number(7.0)]);
        assert_eq!(
            kinds("1.2.3"),
            vec![TokenKind::Number(1.2), TokenKind::Number(0.3)]
        );
    }

    #[test]
    fn whitespace_is_dropped_and_spans_point_at_source() {
        let tokens = tokenize("  12 \t+ pi").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].span, SourceSpan::from(2..4));
        assert_eq!(tokens[1].span, SourceSpan::from(6..7));
        assert_eq!(tokens[2].span, SourceSpan::from(8..10));
    }

    #[test]
    fn identifiers_are_classified() {
        assert_eq!(
            kinds("SIN pi E M foo $x"),
            vec![
                TokenKind::Function(Function::Sin),
                TokenKind::Constant(Constant::Pi),
                TokenKind::Constant(Constant::E),
                TokenKind::Constant(Constant::Memory),
                TokenKind::UnresolvedIdentifier("foo".to_string()),
                TokenKind::UnresolvedIdentifier("$x".to_string()),
            ]
        );
    }

    #[test]
    fn identifiers_stop_at_digits_and_dots() {
        assert_eq!(
            kinds("sin2.5"),
            vec![TokenKind::Function(Function::Sin), TokenKind::Number(2.5)]
        );
    }

    #[test]
    fn unexpected_character_reports_position() {
        let err = tokenize("2 # 3").unwrap_err();
        assert!(matches!(
            err,
            LexError::UnexpectedCharacter { token: '#', .. }
        ));
        assert_eq!(err.span().offset(), 2);
        assert_eq!(err.column(), 3);

        let err = tokenize("1 + .").unwrap_err();
        assert!(matches!(
            err,
            LexError::UnexpectedCharacter { token: '.', .. }
        ));
        assert_eq!(err.column(), 5);
    }

    #[test]
    fn token_display() {
        let tokens = tokenize("max(2)").unwrap();
        let lines: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            ["IDENTIFIER max", "LEFT_PAREN (", "NUMBER 2", "RIGHT_PAREN )"]
        );
    }
}
