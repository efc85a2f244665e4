use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{debug, error, info};

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum LogLevel {
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Cloudy: run a `.cdy` script or start a line-based REPL.
#[derive(Debug, Parser)]
#[command(name = "cloudy")]
struct Cli {
    /// Script to run. Omit to start a REPL.
    file: Option<PathBuf>,

    /// Pretty-print the parsed AST as JSON before evaluating.
    #[arg(long)]
    dump_ast: bool,

    #[arg(short, long, value_enum, default_value_t = LogLevel::Error)]
    verbosity: LogLevel,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    simple_logger::init_with_level(cli.verbosity.into()).ok();

    match cli.file {
        Some(path) => run_file(&path, cli.dump_ast),
        None => run_repl(),
    }
}

fn run_file(path: &PathBuf, dump_ast: bool) -> ExitCode {
    let ext_ok = path.extension().map(|e| e == "cdy").unwrap_or(false);
    if !ext_ok {
        let got = path.extension().and_then(|e| e.to_str()).unwrap_or("<none>");
        eprintln!("error: expected a '.cdy' file, got '{}'", got);
        return ExitCode::from(2);
    }

    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", path.display(), e);
            return ExitCode::from(2);
        }
    };

    let filename = path.display().to_string();
    info!("running {}", filename);

    if dump_ast {
        match cloudy::lexer::tokenize(&filename, &source).and_then(cloudy::parser::parse) {
            Ok(ast) => {
                if let Ok(json) = serde_json::to_string_pretty(&ast) {
                    println!("{}", json);
                }
            }
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let (_value, error) = cloudy::run(&filename, &source);
    match error {
        Some(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}

fn run_repl() -> ExitCode {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("cloudy> ");
        io::stdout().flush().ok();
        line.clear();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        debug!("evaluating: {}", trimmed);
        let (value, error) = cloudy::run("<stdin>", trimmed);
        match error {
            Some(e) => eprintln!("{}", e),
            None => {
                if let Some(v) = value {
                    println!("{}", v);
                }
            }
        }
    }
    ExitCode::SUCCESS
}
