use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
    ops::ControlFlow,
};

use miette::{Diagnostic, Report};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    eval::{AngleMode, evaluate},
    format::format_general,
    lex::tokenize,
    parse::to_postfix,
};

const BANNER: &str = "Scientific Calculator - Type ? or help for help";

const HELP: &str = "\
Scientific Calculator - Help:
Basic usage: <number> <operator> <number>  (e.g. 3 + 4)
Operators: + - * / ^ %
Functions: sin cos tan asin acos atan sinh cosh tanh sqrt cbrt ln log exp pow abs floor ceil fact nCr nPr gcd lcm
Constants: pi e M (memory recall)
Angle mode: mode rad|deg (default is rad)
Memory: m+ <value>, m- <value>, mr (recall), mc (clear)
History: h (show), h <n> (show last n), !<n> (recall n), !! (repeat last)
Help: ? or help
Quit: exit or quit
";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub angle_mode: AngleMode,
    /// Initial value of the memory slot.
    pub memory: f64,
    /// Significant digits in printed results.
    pub precision: usize,
    pub history_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            angle_mode: AngleMode::Radians,
            memory: 0.0,
            precision: 10,
            history_capacity: 256,
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum CommandError {
    #[error("Invalid memory operation")]
    #[diagnostic(
        code(sci_calc::command::memory),
        help("use `m+ <number>` or `m- <number>`")
    )]
    InvalidMemoryOperation,

    #[error("unknown angle mode `{0}`")]
    #[diagnostic(code(sci_calc::command::mode), help("use `mode rad` or `mode deg`"))]
    InvalidMode(String),

    #[error("invalid history command `{0}`")]
    #[diagnostic(
        code(sci_calc::command::history),
        help("use `h`, `h <n>`, `!!` or `!<n>`")
    )]
    InvalidHistoryCommand(String),

    #[error("no history entry {0}")]
    #[diagnostic(code(sci_calc::command::history))]
    NoSuchEntry(usize),

    #[error("history is empty")]
    #[diagnostic(code(sci_calc::command::history))]
    EmptyHistory,
}

/// One line of session input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<'a> {
    Quit,
    Help,
    SetMode(AngleMode),
    MemoryAdd(f64),
    MemorySubtract(f64),
    MemoryRecall,
    MemoryClear,
    /// Print the whole history, or only its last `n` entries.
    ShowHistory(Option<usize>),
    RepeatLast,
    Recall(usize),
    Evaluate(&'a str),
}

impl<'a> Command<'a> {
    /// Parses a trimmed, non-empty line.
    pub fn parse(line: &'a str) -> Result<Self, CommandError> {
        let lower = line.to_ascii_lowercase();
        let command = match lower.as_str() {
            "exit" | "quit" => Command::Quit,
            "help" => Command::Help,
            _ if line.starts_with('?') => Command::Help,
            "mr" => Command::MemoryRecall,
            "mc" => Command::MemoryClear,
            "h" => Command::ShowHistory(None),
            "!!" => Command::RepeatLast,
            _ => {
                if let Some(value) = line.strip_prefix("m+") {
                    Command::MemoryAdd(parse_memory_value(value)?)
                } else if let Some(value) = line.strip_prefix("m-") {
                    Command::MemorySubtract(parse_memory_value(value)?)
                } else if let Some(number) = line.strip_prefix('!') {
                    Command::Recall(parse_history_number(line, number)?)
                } else {
                    let mut words = lower.split_whitespace();
                    match (words.next(), words.next(), words.next()) {
                        (Some("mode"), Some(mode), None) => Command::SetMode(
                            mode.parse::<AngleMode>()
                                .map_err(|_| CommandError::InvalidMode(mode.to_string()))?,
                        ),
                        (Some("h"), Some(count), None) => {
                            Command::ShowHistory(Some(parse_history_number(line, count)?))
                        }
                        _ => Command::Evaluate(line),
                    }
                }
            }
        };
        Ok(command)
    }
}

fn parse_memory_value(value: &str) -> Result<f64, CommandError> {
    value
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidMemoryOperation)
}

fn parse_history_number(line: &str, number: &str) -> Result<usize, CommandError> {
    number
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidHistoryCommand(line.to_string()))
}

/// Bounded record of evaluated lines.
///
/// Entries are numbered from 1 for the lifetime of the session; once the ring
/// is full the oldest entry is dropped and its number is never reused.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
    total: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        History {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    pub fn push(&mut self, line: &str) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
        self.total += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn first_number(&self) -> usize {
        self.total - self.entries.len() + 1
    }

    pub fn get(&self, number: usize) -> Option<&str> {
        let index = number.checked_sub(self.first_number())?;
        self.entries.get(index).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    /// Entries oldest first, with their numbers.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        let first = self.first_number();
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, entry)| (first + i, entry.as_str()))
    }
}

/// The interactive calculator: owns the angle mode, memory slot and history
/// that the evaluator only ever reads.
pub struct Session {
    config: Config,
    angle_mode: AngleMode,
    memory: f64,
    history: History,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Session {
            angle_mode: config.angle_mode,
            memory: config.memory,
            history: History::new(config.history_capacity),
            config,
        }
    }

    pub fn angle_mode(&self) -> AngleMode {
        self.angle_mode
    }

    pub fn memory(&self) -> f64 {
        self.memory
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Reads lines until `exit`, `quit` or end of input. Results go to `out`,
    /// diagnostics to `err`; a bad line never ends the loop.
    pub fn run(
        &mut self,
        input: impl BufRead,
        mut out: impl Write,
        mut err: impl Write,
    ) -> io::Result<()> {
        writeln!(out, "{BANNER}")?;
        let mut lines = input.lines();
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                writeln!(out)?;
                break;
            };
            let line = line?;
            if self.execute(line.trim(), &mut out, &mut err)?.is_break() {
                break;
            }
        }
        writeln!(out, "Goodbye!")?;
        Ok(())
    }

    /// Handles a single line of input.
    pub fn execute(
        &mut self,
        line: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<ControlFlow<()>> {
        if line.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                render(err, Report::new(e))?;
                return Ok(ControlFlow::Continue(()));
            }
        };
        debug!(?command, "parsed command");

        match command {
            Command::Quit => return Ok(ControlFlow::Break(())),
            Command::Help => out.write_all(HELP.as_bytes())?,
            Command::SetMode(mode) => {
                self.angle_mode = mode;
                info!(%mode, "angle mode changed");
                writeln!(out, "Angle mode set to {}", mode.to_string().to_uppercase())?;
            }
            Command::MemoryAdd(value) => {
                self.memory += value;
                info!(memory = self.memory, "memory updated");
                writeln!(out, "Memory slot added to: {}", self.format(value.abs()))?;
            }
            Command::MemorySubtract(value) => {
                self.memory -= value;
                info!(memory = self.memory, "memory updated");
                writeln!(out, "Memory slot subtracted from: {}", self.format(value.abs()))?;
            }
            Command::MemoryRecall => writeln!(out, "Memory recall: {}", self.format(self.memory))?,
            Command::MemoryClear => {
                self.memory = 0.0;
                writeln!(out, "Memory cleared")?;
            }
            Command::ShowHistory(limit) => {
                let skip = limit.map_or(0, |n| self.history.len().saturating_sub(n));
                for (number, entry) in self.history.iter().skip(skip) {
                    writeln!(out, "{number}: {entry}")?;
                }
            }
            Command::RepeatLast => {
                let entry = self.history.last().map(str::to_string);
                match entry {
                    Some(entry) => self.recall(&entry, out, err)?,
                    None => render(err, Report::new(CommandError::EmptyHistory))?,
                }
            }
            Command::Recall(number) => {
                let entry = self.history.get(number).map(str::to_string);
                match entry {
                    Some(entry) => self.recall(&entry, out, err)?,
                    None => render(err, Report::new(CommandError::NoSuchEntry(number)))?,
                }
            }
            Command::Evaluate(expression) => self.evaluate_line(expression, out, err)?,
        }
        Ok(ControlFlow::Continue(()))
    }

    fn recall(
        &mut self,
        entry: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<()> {
        debug!(entry, "recalled from history");
        writeln!(out, "{entry}")?;
        self.evaluate_line(entry, out, err)
    }

    fn evaluate_line(
        &mut self,
        line: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<()> {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                writeln!(err, "Invalid expression: {line}")?;
                return render(err, Report::new(e));
            }
        };

        // lines that tokenize are recorded even if a later stage rejects them
        self.history.push(line);

        let result = to_postfix(tokens)
            .map_err(Report::new)
            .and_then(|rpn| evaluate(&rpn, self.angle_mode, self.memory).map_err(Report::new));

        match result {
            Ok(value) => writeln!(out, "Result: {}", self.format(value)),
            Err(report) => render(err, report.with_source_code(line.to_string())),
        }
    }

    fn format(&self, value: f64) -> String {
        format_general(value, self.config.precision)
    }
}

fn render(err: &mut impl Write, report: Report) -> io::Result<()> {
    writeln!(err, "{report:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("QUIT"), Ok(Command::Quit));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
        assert_eq!(Command::parse("?"), Ok(Command::Help));
        assert_eq!(Command::parse("? anything"), Ok(Command::Help));
        assert_eq!(Command::parse("Help"), Ok(Command::Help));
        assert_eq!(
            Command::parse("mode DEG"),
            Ok(Command::SetMode(AngleMode::Degrees))
        );
        assert_eq!(
            Command::parse("mode rad"),
            Ok(Command::SetMode(AngleMode::Radians))
        );
        assert_eq!(Command::parse("m+ 2.5"), Ok(Command::MemoryAdd(2.5)));
        assert_eq!(Command::parse("m-3"), Ok(Command::MemorySubtract(3.0)));
        assert_eq!(Command::parse("MR"), Ok(Command::MemoryRecall));
        assert_eq!(Command::parse("mc"), Ok(Command::MemoryClear));
        assert_eq!(Command::parse("h"), Ok(Command::ShowHistory(None)));
        assert_eq!(Command::parse("h 3"), Ok(Command::ShowHistory(Some(3))));
        assert_eq!(Command::parse("!!"), Ok(Command::RepeatLast));
        assert_eq!(Command::parse("!4"), Ok(Command::Recall(4)));
        assert_eq!(Command::parse("M - 3"), Ok(Command::Evaluate("M - 3")));
        assert_eq!(Command::parse("2 + 2"), Ok(Command::Evaluate("2 + 2")));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(
            Command::parse("m+"),
            Err(CommandError::InvalidMemoryOperation)
        );
        assert_eq!(
            Command::parse("m+ 2x"),
            Err(CommandError::InvalidMemoryOperation)
        );
        assert_eq!(
            Command::parse("mode grad"),
            Err(CommandError::InvalidMode("grad".to_string()))
        );
        assert_eq!(
            Command::parse("!x"),
            Err(CommandError::InvalidHistoryCommand("!x".to_string()))
        );
        assert_eq!(
            Command::parse("h two"),
            Err(CommandError::InvalidHistoryCommand("h two".to_string()))
        );
    }

    #[test]
    fn history_ring_drops_oldest() {
        let mut history = History::new(2);
        assert!(history.is_empty());
        history.push("1 + 1");
        history.push("2 + 2");
        history.push("3 + 3");

        assert_eq!(history.len(), 2);
        assert_eq!(history.get(1), None);
        assert_eq!(history.get(2), Some("2 + 2"));
        assert_eq!(history.get(3), Some("3 + 3"));
        assert_eq!(history.get(4), None);
        assert_eq!(history.last(), Some("3 + 3"));
        assert_eq!(
            history.iter().collect::<Vec<_>>(),
            [(2, "2 + 2"), (3, "3 + 3")]
        );
    }

    #[test]
    fn execute_updates_session_state() {
        let mut session = Session::new(Config::default());
        let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());

        for line in ["mode deg", "m+ 4", "m- 1.5", "sin(90) + M"] {
            let flow = session.execute(line, &mut out, &mut err).unwrap();
            assert!(flow.is_continue());
        }
        assert_eq!(session.angle_mode(), AngleMode::Degrees);
        assert_eq!(session.memory(), 2.5);
        assert!(err.is_empty());
        assert!(String::from_utf8(out).unwrap().ends_with("Result: 3.5\n"));

        let flow = session.execute("quit", &mut io::sink(), &mut io::sink()).unwrap();
        assert!(flow.is_break());
    }
}
