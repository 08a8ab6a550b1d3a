use std::io;

use clap::Parser;
use clap::Subcommand;
use miette::IntoDiagnostic;
use miette::Report;
use miette::WrapErr;
use sci_calc::{AngleMode, Config, DisplayPostfix, Lexer, Session};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Interactive scientific calculator")]
struct Args {
    /// Angle unit for trigonometric functions (`rad` or `deg`)
    #[arg(long, global = true, default_value_t = AngleMode::Radians)]
    angle: AngleMode,

    /// Initial value of the memory slot `M`
    #[arg(long, global = true, default_value_t = 0.0, allow_hyphen_values = true)]
    memory: f64,

    /// Significant digits in printed results
    #[arg(long, global = true, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=17))]
    precision: u8,

    /// Number of lines kept in the session history
    #[arg(long = "history", default_value_t = 256)]
    history_capacity: usize,

    /// Log pipeline stages to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the interactive calculator (default)
    Repl,
    /// Print the tokens of an expression
    Tokenize {
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },
    /// Print an expression in postfix order
    Rpn {
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },
    /// Evaluate a single expression
    Eval {
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config {
        angle_mode: args.angle,
        memory: args.memory,
        precision: args.precision.into(),
        history_capacity: args.history_capacity,
    };

    match args.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            let mut session = Session::new(config);
            session
                .run(io::stdin().lock(), io::stdout(), io::stderr())
                .into_diagnostic()
                .wrap_err("terminal I/O failed")?;
        }
        Commands::Tokenize { expression } => {
            for token in Lexer::new(&expression) {
                println!("{}", token?);
            }
        }
        Commands::Rpn { expression } => {
            let tokens = sci_calc::tokenize(&expression)?;
            let rpn = sci_calc::to_postfix(tokens)
                .map_err(|e| Report::new(e).with_source_code(expression.clone()))?;
            println!("{}", DisplayPostfix(&rpn));
        }
        Commands::Eval { expression } => {
            let value = sci_calc::calculate(&expression, config.angle_mode, config.memory)?;
            println!("{}", sci_calc::format_general(value, config.precision));
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
