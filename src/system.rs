use std::{f64::consts, fmt::Display};

use thiserror::Error;

use crate::eval::AngleMode;

/// Largest argument whose factorial still fits in an `f64`.
const MAX_FACTORIAL: f64 = 170.0;

/// How close an argument must be to an integer to count as one.
const INTEGER_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Plus => '+',
            Operator::Minus => '-',
            Operator::Star => '*',
            Operator::Slash => '/',
            Operator::Caret => '^',
            Operator::Percent => '%',
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Plus | Operator::Minus => 2,
            Operator::Star | Operator::Slash | Operator::Percent => 3,
            Operator::Caret => 4,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, Operator::Caret)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    E,
    /// The session's memory slot.
    Memory,
}

impl Constant {
    /// Case-insensitive lookup of a constant name.
    pub fn lookup(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pi" => Some(Constant::Pi),
            "e" => Some(Constant::E),
            "m" => Some(Constant::Memory),
            _ => None,
        }
    }

    pub fn value(self, memory_slot: f64) -> f64 {
        match self {
            Constant::Pi => consts::PI,
            Constant::E => consts::E,
            Constant::Memory => memory_slot,
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Pi => write!(f, "pi"),
            Constant::E => write!(f, "e"),
            Constant::Memory => write!(f, "M"),
        }
    }
}

/// Every callable the evaluator knows about.
///
/// `UnaryPlus` and `UnaryMinus` are never produced by the lexer; the
/// converter rewrites a prefix `+`/`-` into them so signs are applied like
/// any other one-argument function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    UnaryPlus,
    UnaryMinus,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sqrt,
    Cbrt,
    Ln,
    Log,
    Exp,
    Pow,
    Abs,
    Floor,
    Ceil,
    Fact,
    NCr,
    NPr,
    Gcd,
    Lcm,
}

/// Why a function refused its arguments.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainError {
    #[error("square root of a negative number")]
    NegativeRoot,
    #[error("logarithm of a non-positive number")]
    NonPositiveLogarithm,
    #[error("factorial needs an integer between 0 and 170")]
    Factorial,
    #[error("expected integers with 0 <= k <= n")]
    Selection,
}

impl Function {
    /// Case-insensitive lookup of a function name as typed by the user.
    pub fn lookup(name: &str) -> Option<Self> {
        let function = match name.to_ascii_lowercase().as_str() {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "sqrt" => Function::Sqrt,
            "cbrt" => Function::Cbrt,
            "ln" => Function::Ln,
            "log" => Function::Log,
            "exp" => Function::Exp,
            "pow" => Function::Pow,
            "abs" => Function::Abs,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "fact" | "factorial" => Function::Fact,
            "ncr" => Function::NCr,
            "npr" => Function::NPr,
            "gcd" => Function::Gcd,
            "lcm" => Function::Lcm,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::UnaryPlus => "uplus",
            Function::UnaryMinus => "uminus",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Asin => "asin",
            Function::Acos => "acos",
            Function::Atan => "atan",
            Function::Sinh => "sinh",
            Function::Cosh => "cosh",
            Function::Tanh => "tanh",
            Function::Sqrt => "sqrt",
            Function::Cbrt => "cbrt",
            Function::Ln => "ln",
            Function::Log => "log",
            Function::Exp => "exp",
            Function::Pow => "pow",
            Function::Abs => "abs",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Fact => "fact",
            Function::NCr => "nCr",
            Function::NPr => "nPr",
            Function::Gcd => "gcd",
            Function::Lcm => "lcm",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Function::Pow | Function::NCr | Function::NPr | Function::Gcd | Function::Lcm => 2,
            _ => 1,
        }
    }

    /// Applies the function to `args`, given in push order (leftmost
    /// argument first). `args.len()` must equal [`Function::arity`].
    pub fn apply(self, args: &[f64], angle_mode: AngleMode) -> Result<f64, DomainError> {
        let to_radians = |x: f64| match angle_mode {
            AngleMode::Radians => x,
            AngleMode::Degrees => x.to_radians(),
        };
        let from_radians = |x: f64| match angle_mode {
            AngleMode::Radians => x,
            AngleMode::Degrees => x.to_degrees(),
        };

        let value = match (self, args) {
            (Function::UnaryPlus, &[x]) => x,
            (Function::UnaryMinus, &[x]) => -x,
            (Function::Sin, &[x]) => to_radians(x).sin(),
            (Function::Cos, &[x]) => to_radians(x).cos(),
            (Function::Tan, &[x]) => to_radians(x).tan(),
            (Function::Asin, &[x]) => from_radians(x.asin()),
            (Function::Acos, &[x]) => from_radians(x.acos()),
            (Function::Atan, &[x]) => from_radians(x.atan()),
            (Function::Sinh, &[x]) => x.sinh(),
            (Function::Cosh, &[x]) => x.cosh(),
            (Function::Tanh, &[x]) => x.tanh(),
            (Function::Sqrt, &[x]) if x < 0.0 => return Err(DomainError::NegativeRoot),
            (Function::Sqrt, &[x]) => x.sqrt(),
            (Function::Cbrt, &[x]) => x.cbrt(),
            (Function::Ln | Function::Log, &[x]) if x <= 0.0 => {
                return Err(DomainError::NonPositiveLogarithm);
            }
            (Function::Ln, &[x]) => x.ln(),
            (Function::Log, &[x]) => x.log10(),
            (Function::Exp, &[x]) => x.exp(),
            (Function::Pow, &[base, exponent]) => base.powf(exponent),
            (Function::Abs, &[x]) => x.abs(),
            (Function::Floor, &[x]) => x.floor(),
            (Function::Ceil, &[x]) => x.ceil(),
            (Function::Fact, &[x]) => factorial(x)?,
            (Function::NCr, &[n, k]) => combinations(n, k)?,
            (Function::NPr, &[n, k]) => permutations(n, k)?,
            (Function::Gcd, &[a, b]) => gcd(round_to_integer(a), round_to_integer(b)) as f64,
            (Function::Lcm, &[a, b]) => lcm(round_to_integer(a), round_to_integer(b)),
            (function, args) => unreachable!(
                "{function} takes {} arguments, got {}",
                function.arity(),
                args.len()
            ),
        };
        Ok(value)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn factorial(x: f64) -> Result<f64, DomainError> {
    if !x.is_finite() || x < 0.0 {
        return Err(DomainError::Factorial);
    }
    let n = (x + 0.5).floor();
    if (x - n).abs() > INTEGER_TOLERANCE || n > MAX_FACTORIAL {
        return Err(DomainError::Factorial);
    }
    Ok((2..=n as u32).map(f64::from).product())
}

/// Rounds both selection arguments half-up and checks `0 <= k <= n`.
fn selection_bounds(n: f64, k: f64) -> Result<(i64, i64), DomainError> {
    if !n.is_finite() || !k.is_finite() {
        return Err(DomainError::Selection);
    }
    let n = (n + 0.5).floor() as i64;
    let k = (k + 0.5).floor() as i64;
    if n < 0 || k < 0 || k > n {
        return Err(DomainError::Selection);
    }
    Ok((n, k))
}

fn combinations(n: f64, k: f64) -> Result<f64, DomainError> {
    let (n, k) = selection_bounds(n, k)?;
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 1..=k {
        result = result * (n - k + i) as f64 / i as f64;
        if result.is_infinite() {
            break;
        }
    }
    Ok(result)
}

fn permutations(n: f64, k: f64) -> Result<f64, DomainError> {
    let (n, k) = selection_bounds(n, k)?;
    let mut result = 1.0;
    for i in 0..k {
        result *= (n - i) as f64;
        if result.is_infinite() {
            break;
        }
    }
    Ok(result)
}

/// Rounds half away from zero, saturating at the `i64` range.
fn round_to_integer(x: f64) -> i64 {
    x.round() as i64
}

fn gcd(a: i64, b: i64) -> u64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: i64, b: i64) -> f64 {
    if a == 0 || b == 0 {
        return 0.0;
    }
    let divisor = gcd(a, b);
    (u128::from(a.unsigned_abs() / divisor) * u128::from(b.unsigned_abs())) as f64
}
