//! Scientific expression evaluator.
//!
//! A line of infix text goes through three stages: [`tokenize`] turns it
//! into [`Token`]s, [`to_postfix`] reorders them with the shunting-yard
//! algorithm, and [`evaluate`] runs the postfix sequence on an operand stack.
//! [`Session`] wraps the pipeline in the interactive command loop.

use miette::Report;

pub mod eval;
pub mod format;
pub mod lex;
pub mod parse;
pub mod repl;
pub mod system;

pub use eval::{AngleMode, EvalError, evaluate};
pub use format::format_general;
pub use lex::{LexError, Lexer, Token, TokenKind, tokenize};
pub use parse::{ConvertError, DisplayPostfix, to_postfix};
pub use repl::{Config, Session};

/// Runs all three stages on `line`, attaching it as source code to any
/// diagnostic.
pub fn calculate(line: &str, angle_mode: AngleMode, memory_slot: f64) -> miette::Result<f64> {
    let tokens = tokenize(line)?;
    let rpn = to_postfix(tokens).map_err(|e| Report::new(e).with_source_code(line.to_string()))?;
    evaluate(&rpn, angle_mode, memory_slot)
        .map_err(|e| Report::new(e).with_source_code(line.to_string()))
}
