// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use kingpy::unstable::{Lexer, Source, TokenKind};
use kingpy::{ErrorReporter, Executor, ExecutorConfig, RunError, Translator};

struct StderrReporter;

impl ErrorReporter for StderrReporter {
    fn report(&self, error: &RunError) {
        eprintln!("Error: {error}");
    }
}

fn ensure_dialect_file(file: &str) -> Result<()> {
    if !file.ends_with(".kp") {
        bail!("`{file}` is not a King Python file. Expected a .kp extension.");
    }
    Ok(())
}

fn kp_run(file: String, config: Option<String>, max_steps: Option<u64>) -> Result<()> {
    ensure_dialect_file(&file)?;

    let mut config = match config {
        Some(path) => ExecutorConfig::from_file(path)?,
        None => ExecutorConfig::default(),
    };
    if max_steps.is_some() {
        config.max_steps = max_steps;
    }

    let executor = Executor::with_config(config).with_reporter(Box::new(StderrReporter));
    match executor.run_file(&file) {
        Ok(exports) => {
            if !exports.as_object().map(|o| o.is_empty()).unwrap_or(true) {
                println!("{}", exports.to_json_str()?);
            }
            Ok(())
        }
        // Already printed by the reporter.
        Err(_) => std::process::exit(1),
    }
}

fn kp_translate(file: String) -> Result<()> {
    ensure_dialect_file(&file)?;
    let source = Source::from_file(&file)?;
    print!("{}", Translator::new().translate(&source));
    Ok(())
}

fn kp_lex(file: String, verbose: bool) -> Result<()> {
    let source = Source::from_file(&file)?;
    let mut lexer = Lexer::new(&source);

    loop {
        let token = lexer.next_token()?;
        if token.0 == TokenKind::Eof {
            break;
        }

        if verbose {
            println!("{}", token.1.message("", ""));
        }

        println!("{token:?}");
    }
    Ok(())
}

fn kp_parse(file: String) -> Result<()> {
    ensure_dialect_file(&file)?;
    let dialect = Source::from_file(&file)?;
    let target = Translator::new().translate(&dialect);
    let source = Source::from_contents(file, target)?;

    let mut parser = kingpy::unstable::Parser::new(&source)?;
    let ast = parser.parse()?;
    println!("{ast:#?}");

    Ok(())
}

#[derive(Subcommand)]
enum KpCommand {
    /// Run a program and print its exports.
    Run {
        file: String,

        /// Executor configuration (json or yaml).
        #[arg(long, short, value_name = "config.json|config.yaml")]
        config: Option<String>,

        #[arg(long)]
        max_steps: Option<u64>,
    },

    /// Print the translated host script.
    Translate { file: String },

    /// Tokenize a file.
    Lex {
        file: String,

        #[arg(long, short)]
        verbose: bool,
    },

    /// Translate and parse, printing the host script AST.
    Parse { file: String },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: KpCommand,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        KpCommand::Run {
            file,
            config,
            max_steps,
        } => kp_run(file, config, max_steps),
        KpCommand::Translate { file } => kp_translate(file),
        KpCommand::Lex { file, verbose } => kp_lex(file, verbose),
        KpCommand::Parse { file } => kp_parse(file),
    }
}
