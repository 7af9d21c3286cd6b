use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use nanoscript::{Environment, init_tracing, parse, run};

/// Runs a nanoscript program and prints the value of its last statement.
#[derive(Parser, Debug)]
#[command(name = "nanoscript", version, long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["source", "file"])))]
struct Cli {
    /// Print the parsed syntax tree as JSON instead of evaluating it.
    #[arg(long)]
    ast: bool,

    /// Evaluate the given source text instead of reading a file.
    #[arg(short = 'e', value_name = "SOURCE")]
    source: Option<String>,

    /// Script to run.
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let (name, source) = match (cli.source, cli.file) {
        (Some(source), _) => ("<inline>".to_string(), source),
        (None, Some(path)) => match std::fs::read_to_string(&path) {
            Ok(source) => (path.display().to_string(), source),
            Err(err) => {
                eprintln!("Cannot read {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        // The "input" group makes one of the two mandatory
        (None, None) => return ExitCode::from(2),
    };
    tracing::debug!(name = %name, bytes = source.len(), "loaded source");

    if cli.ast {
        let program = match parse(&source) {
            Ok(program) => program,
            Err(err) => {
                if err.pretty_print(&name, &source).is_err() {
                    eprintln!("{}", err);
                }
                return ExitCode::FAILURE;
            }
        };
        return match program.to_record() {
            Ok(record) => {
                println!("{}", record);
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Cannot serialise syntax tree: {}", err);
                ExitCode::FAILURE
            }
        };
    }

    let env = Environment::new_global();
    match run(&source, &env) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            if err.pretty_print(&name, &source).is_err() {
                eprintln!("{}", err);
            }
            ExitCode::FAILURE
        }
    }
}
