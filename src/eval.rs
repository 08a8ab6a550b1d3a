use std::{fmt::Display, str::FromStr};

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;
use tracing::trace;

use crate::{
    lex::{Token, TokenKind},
    system::{DomainError, Function, Operator},
};

/// Unit used by the trigonometric functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleMode {
    #[default]
    Radians,
    Degrees,
}

impl Display for AngleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AngleMode::Radians => write!(f, "radians"),
            AngleMode::Degrees => write!(f, "degrees"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown angle mode `{0}`, expected `rad` or `deg`")]
pub struct ParseAngleModeError(String);

impl FromStr for AngleMode {
    type Err = ParseAngleModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rad" | "radians" => Ok(AngleMode::Radians),
            "deg" | "degrees" => Ok(AngleMode::Degrees),
            _ => Err(ParseAngleModeError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown function `{name}`")]
    #[diagnostic(
        code(sci_calc::eval::unknown_function),
        help("type `help` to list the available functions")
    )]
    UnknownFunction {
        name: String,
        #[label("not a known function or constant")]
        span: SourceSpan,
    },

    #[error("division by zero")]
    #[diagnostic(code(sci_calc::eval::division_by_zero))]
    DivisionByZero {
        #[label("divisor is zero")]
        span: SourceSpan,
    },

    #[error("modulo by zero")]
    #[diagnostic(code(sci_calc::eval::modulo_by_zero))]
    ModuloByZero {
        #[label("divisor is zero")]
        span: SourceSpan,
    },

    #[error("{function}: {reason}")]
    #[diagnostic(code(sci_calc::eval::domain))]
    Domain {
        function: Function,
        reason: DomainError,
        #[label("argument out of range")]
        span: SourceSpan,
    },

    #[error("`{operation}` is missing an operand")]
    #[diagnostic(code(sci_calc::eval::missing_operand))]
    MissingOperand {
        operation: String,
        #[label("needs more operands")]
        span: SourceSpan,
    },

    #[error("unexpected `{token}` in postfix input")]
    #[diagnostic(code(sci_calc::eval::unexpected_token))]
    UnexpectedToken {
        token: String,
        #[label("only numbers, constants, operators and functions can be evaluated")]
        span: SourceSpan,
    },

    #[error("stack has {count} elements after evaluation")]
    #[diagnostic(
        code(sci_calc::eval::malformed_stack),
        help("check that every function got the right number of arguments")
    )]
    MalformedStack { count: usize },
}

/// Runs a postfix sequence produced by [`crate::to_postfix`].
///
/// `angle_mode` and `memory_slot` belong to the caller; they are only read.
pub fn evaluate(rpn: &[Token], angle_mode: AngleMode, memory_slot: f64) -> Result<f64, EvalError> {
    let mut stack: Vec<f64> = Vec::with_capacity(rpn.len());

    for token in rpn {
        match &token.kind {
            TokenKind::Number(n) => stack.push(*n),
            TokenKind::Constant(constant) => stack.push(constant.value(memory_slot)),
            TokenKind::Operator(op) => {
                let b = pop_operand(&mut stack, token)?;
                let a = pop_operand(&mut stack, token)?;
                stack.push(apply_operator(*op, a, b, token.span)?);
            }
            TokenKind::Function(function) => {
                let arity = function.arity();
                let mut args = [0.0; 2];
                for arg in args[..arity].iter_mut().rev() {
                    *arg = pop_operand(&mut stack, token)?;
                }
                let value = function
                    .apply(&args[..arity], angle_mode)
                    .map_err(|reason| EvalError::Domain {
                        function: *function,
                        reason,
                        span: token.span,
                    })?;
                stack.push(value);
            }
            TokenKind::UnresolvedIdentifier(name) => {
                return Err(EvalError::UnknownFunction {
                    name: name.clone(),
                    span: token.span,
                });
            }
            TokenKind::LeftParen | TokenKind::RightParen | TokenKind::Comma => {
                return Err(EvalError::UnexpectedToken {
                    token: token.kind.to_string(),
                    span: token.span,
                });
            }
        }
    }

    match stack.as_slice() {
        &[result] => {
            trace!(result, "evaluated");
            Ok(result)
        }
        _ => Err(EvalError::MalformedStack { count: stack.len() }),
    }
}

fn pop_operand(stack: &mut Vec<f64>, token: &Token) -> Result<f64, EvalError> {
    stack.pop().ok_or_else(|| EvalError::MissingOperand {
        operation: token.kind.to_string(),
        span: token.span,
    })
}

fn apply_operator(op: Operator, a: f64, b: f64, span: SourceSpan) -> Result<f64, EvalError> {
    Ok(match op {
        Operator::Plus => a + b,
        Operator::Minus => a - b,
        Operator::Star => a * b,
        Operator::Slash if b == 0.0 => return Err(EvalError::DivisionByZero { span }),
        Operator::Slash => a / b,
        Operator::Percent if b == 0.0 => return Err(EvalError::ModuloByZero { span }),
        // truncated remainder: the sign follows the dividend
        Operator::Percent => a % b,
        Operator::Caret => a.powf(b),
    })
}
