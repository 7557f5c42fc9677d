use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use clap::Parser as ClapParser;

use nox::error::NoxError;
use nox::interpreter::Interpreter;
use nox::parser::Parser;
use nox::resolver::Resolver;
use nox::scanner::Scanner;
use nox::stmt::Stmt;
use nox::value::Value;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; starts an interactive session when omitted.
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) => {
            e.print()?;
            std::process::exit(64);
        }
    };

    match args.script {
        Some(path) => run_file(path),
        None => run_repl(),
    }
}

fn run_file(path: PathBuf) -> anyhow::Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
    reader.read_to_end(&mut buf)?;

    let scanner: Scanner = Scanner::new(buf);
    let mut parser: Parser = Parser::new(scanner);

    let statements: Vec<Stmt> = match parser.parse() {
        Ok(statements) => statements,

        Err(errors) => {
            report_all(&errors);
            std::process::exit(65);
        }
    };

    let mut interpreter: Interpreter = Interpreter::new();

    if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
        report_all(&errors);
        std::process::exit(65);
    }

    if let Err(e) = interpreter.interpret(&statements) {
        eprintln!("{}", e);
        std::process::exit(70);
    }

    Ok(())
}

fn run_repl() -> anyhow::Result<()> {
    let stdin = io::stdin();

    // One interpreter for the whole session so definitions persist across
    // lines; the site counter carries over so earlier resolutions are
    // never clobbered.
    let mut interpreter: Interpreter = Interpreter::new();
    let mut next_site: usize = 0;

    loop {
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();

        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF (ctrl-D).
            println!();
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        let scanner: Scanner = Scanner::new(line.into_bytes());
        let mut parser: Parser = Parser::with_first_site(scanner, next_site);

        let result = parser.parse();
        next_site = parser.next_site();

        let statements: Vec<Stmt> = match result {
            Ok(statements) => statements,

            Err(errors) => {
                report_all(&errors);
                continue;
            }
        };

        if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
            report_all(&errors);
            continue;
        }

        // A lone bare expression echoes its value.
        let outcome = match statements.as_slice() {
            [Stmt::Expression(expr)] => interpreter.evaluate(expr).map(|value| {
                if !matches!(value, Value::Nil) {
                    println!("{}", value);
                }
            }),

            _ => interpreter.interpret(&statements),
        };

        if let Err(e) = outcome {
            eprintln!("{}", e);
        }
    }

    Ok(())
}

fn report_all(errors: &[NoxError]) {
    for error in errors {
        eprintln!("{}", error);
    }
}
