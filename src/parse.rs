use std::fmt::Display;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;
use tracing::debug;

use crate::{
    lex::{Token, TokenKind},
    system::{Function, Operator},
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ConvertError {
    #[error("misplaced comma or mismatched parentheses")]
    #[diagnostic(
        code(sci_calc::convert::misplaced_comma),
        help("commas only separate the arguments of a function call")
    )]
    MisplacedComma {
        #[label("this comma is outside any parentheses")]
        span: SourceSpan,
    },

    #[error("mismatched parentheses")]
    #[diagnostic(
        code(sci_calc::convert::mismatched_parens),
        help("every `(` needs a matching `)`")
    )]
    MismatchedParens {
        #[label("this parenthesis has no partner")]
        span: SourceSpan,
    },
}

impl ConvertError {
    pub fn span(&self) -> SourceSpan {
        match self {
            ConvertError::MisplacedComma { span } | ConvertError::MismatchedParens { span } => {
                *span
            }
        }
    }
}

/// Renders a postfix sequence as space separated lexemes, e.g. `2 3 4 * +`.
pub struct DisplayPostfix<'a>(pub &'a [Token]);

impl Display for DisplayPostfix<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", token.kind)?;
        }
        Ok(())
    }
}

/// Reorders infix tokens into postfix order with the shunting-yard algorithm.
///
/// A prefix `+` or `-` becomes [`Function::UnaryPlus`] / [`Function::UnaryMinus`],
/// so every [`TokenKind::Operator`] in the output is binary. Functions never
/// wait behind an operator: an incoming binary operator pops them first, and
/// a closing parenthesis releases the function that owns the argument list.
pub fn to_postfix(tokens: Vec<Token>) -> Result<Vec<Token>, ConvertError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();

    // a sign is unary at the start of input and after anything that cannot end an operand
    let mut expects_operand = true;

    for token in tokens {
        let next_expects_operand = matches!(
            token.kind,
            TokenKind::Operator(_)
                | TokenKind::LeftParen
                | TokenKind::Comma
                | TokenKind::Function(_)
                | TokenKind::UnresolvedIdentifier(_)
        );

        match token.kind {
            TokenKind::Number(_) | TokenKind::Constant(_) => output.push(token),
            TokenKind::Function(_) | TokenKind::UnresolvedIdentifier(_) | TokenKind::LeftParen => {
                operators.push(token)
            }
            TokenKind::Comma => {
                while operators
                    .last()
                    .is_some_and(|top| top.kind != TokenKind::LeftParen)
                {
                    output.extend(operators.pop());
                }
                if operators.is_empty() {
                    return Err(ConvertError::MisplacedComma { span: token.span });
                }
            }
            TokenKind::Operator(op @ (Operator::Plus | Operator::Minus)) if expects_operand => {
                let function = match op {
                    Operator::Plus => Function::UnaryPlus,
                    _ => Function::UnaryMinus,
                };
                operators.push(Token {
                    kind: TokenKind::Function(function),
                    span: token.span,
                });
            }
            TokenKind::Operator(op) => {
                while let Some(top) = operators.last() {
                    let pop = match top.kind {
                        TokenKind::Operator(top_op) => {
                            top_op.precedence() > op.precedence()
                                || (top_op.precedence() == op.precedence()
                                    && !op.is_right_associative())
                        }
                        TokenKind::Function(_) | TokenKind::UnresolvedIdentifier(_) => true,
                        _ => false,
                    };
                    if !pop {
                        break;
                    }
                    output.extend(operators.pop());
                }
                operators.push(token);
            }
            TokenKind::RightParen => {
                loop {
                    match operators.pop() {
                        Some(Token {
                            kind: TokenKind::LeftParen,
                            ..
                        }) => break,
                        Some(top) => output.push(top),
                        None => return Err(ConvertError::MismatchedParens { span: token.span }),
                    }
                }
                if operators.last().is_some_and(Token::is_function) {
                    output.extend(operators.pop());
                }
            }
        }

        expects_operand = next_expects_operand;
    }

    while let Some(top) = operators.pop() {
        if top.kind == TokenKind::LeftParen {
            return Err(ConvertError::MismatchedParens { span: top.span });
        }
        output.push(top);
    }

    debug!(postfix = %DisplayPostfix(&output), "converted to postfix");
    Ok(output)
}
