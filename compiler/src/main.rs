//! TinyPascal compiler CLI entry point.
//!
//! Usage:
//!   tpc ir <input.tp> [--format tac|list]   (compile to three-address code)
//!   tpc check <input.tp>                    (name resolution + type check only)
//!   tpc parse <input.tp>                    (dump AST)
//!   tpc lex <input.tp>                      (dump tokens)

use std::{fs, path::PathBuf, process};

use clap::{Parser, Subcommand, ValueEnum};
use tinypascal_compiler::{errors::Error, ir};
use tracing_subscriber::EnvFilter;

const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_IOERR: i32 = 74;

#[derive(Debug, Parser)]
#[command(name = "tpc", version, about = "TinyPascal compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dump the token stream
    Lex { input: PathBuf },

    /// Dump the syntax tree
    Parse { input: PathBuf },

    /// Resolve names and check types
    Check { input: PathBuf },

    /// Emit intermediate code
    Ir {
        input: PathBuf,

        /// Output rendering
        #[arg(short, long, value_enum, default_value_t = Format::Tac)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Three-address code
    Tac,
    /// One record per instruction
    List,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { EX_USAGE } else { 0 };
            // Help and version go to stdout, usage errors to stderr.
            let _ = err.print();
            process::exit(code);
        }
    };

    let input = match &cli.command {
        Command::Lex { input }
        | Command::Parse { input }
        | Command::Check { input }
        | Command::Ir { input, .. } => input,
    };

    let source = match fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {}", input.display(), e);
            process::exit(EX_IOERR);
        }
    };

    if let Err(err) = run(&cli.command, &source) {
        tracing::debug!(error = %err, "compilation failed");
        eprintln!("{:?}", miette::Report::new(err.to_report(&source)));
        process::exit(EX_DATAERR);
    }
}

fn run(command: &Command, source: &str) -> Result<(), Error> {
    match command {
        Command::Lex { .. } => {
            for token in tinypascal_compiler::lex(source)? {
                println!(
                    "{}:{}\t{:?}\t{}",
                    token.span.line,
                    token.span.column,
                    token.kind.category(),
                    token.kind
                );
            }
        }
        Command::Parse { .. } => {
            let program = tinypascal_compiler::parse(source)?;
            println!("{:#?}", program);
        }
        Command::Check { .. } => {
            let (_, symbols) = tinypascal_compiler::check(source)?;
            for (name, symbol) in symbols.global_symbols() {
                tracing::debug!(name, kind = ?symbol.kind, "global symbol");
            }
            println!("No semantic errors.");
        }
        Command::Ir { format, .. } => {
            let code = tinypascal_compiler::compile(source)?;
            let text = match format {
                Format::Tac => ir::render_tac(&code),
                Format::List => ir::render_list(&code),
            };
            print!("{}", text);
        }
    }
    Ok(())
}
