//! Lyra command-line driver.
//!
//! Orchestrates read → parse → emit → finalize and exposes the dump
//! hook. Exit codes: 0 on success, 1 on read/compile failure, 2 on
//! argument errors.

mod args;

use args::{help_text, parse_args_vec, version_string, CliArgs, ExecutionMode};
use lyra_compiler::Compiler;
use std::io::Read;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args_vec(&raw) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("lyra: {}", err);
            return ExitCode::from(2);
        }
    };

    init_tracing(&args);

    let source = match &args.mode {
        ExecutionMode::PrintVersion => {
            println!("{}", version_string());
            return ExitCode::SUCCESS;
        }
        ExecutionMode::PrintHelp => {
            println!("{}", help_text());
            return ExitCode::SUCCESS;
        }
        ExecutionMode::Command(command) => command.clone(),
        ExecutionMode::Stdin => {
            let mut buffer = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut buffer) {
                error!("cannot read stdin: {}", err);
                return ExitCode::FAILURE;
            }
            buffer
        }
        ExecutionMode::Script(path) => match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                error!("cannot read '{}': {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
    };

    match Compiler::compile(&source) {
        Ok(program) => {
            if args.dump {
                print!("{}", program.dump());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the flag-derived
/// default level.
fn init_tracing(args: &CliArgs) {
    let default = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}
