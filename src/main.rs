use std::fs;
use std::io::{self, BufRead, Read, Write};

use anyhow::{Context, Result, anyhow, bail};
use log::{LevelFilter, Log, Metadata, Record};

use sepia::evaluator::{Config, Interpreter};
use sepia::lexer::tokenize;
use sepia::object::{Environment, Object};
use sepia::parser;

const USAGE: &str = "usage: sepia [--trace] [--max-depth <n>] [--tokens | --ast | -i] [file]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Tokens,
    Ast,
    Prompt,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut mode = Mode::Run;
    let mut config = Config::default();
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--trace" => {
                log::set_logger(&LOGGER).map_err(|err| anyhow!("Installing logger: {err}"))?;
                log::set_max_level(LevelFilter::Trace);
            }
            "--max-depth" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing depth after {arg}"))?;
                config.max_call_depth = value
                    .parse()
                    .with_context(|| format!("Invalid depth '{value}'"))?;
            }
            "--tokens" => mode = Mode::Tokens,
            "--ast" => mode = Mode::Ast,
            "-i" | "--interactive" => mode = Mode::Prompt,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ if arg.starts_with('-') => bail!("Unknown option '{arg}'\n{USAGE}"),
            _ => {
                if input_path.replace(arg).is_some() {
                    bail!("Only one input file is supported");
                }
            }
        }
    }

    if mode == Mode::Prompt {
        return prompt(config);
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    match mode {
        Mode::Tokens => {
            for token in tokenize(&source) {
                println!(
                    "{}:{}\t{}\t{:?}",
                    token.span.line, token.span.column, token.kind, token.literal
                );
            }
        }
        Mode::Ast => {
            let program = parser::parse(&source)?;
            println!("{program}");
        }
        Mode::Run | Mode::Prompt => {
            let program = parser::parse(&source)?;
            let mut interpreter = Interpreter::with_config(config);
            let result = interpreter.eval_program(&program, &Environment::new_root());
            for line in interpreter.take_output() {
                println!("{line}");
            }
            let value = result?;
            if !matches!(value, Object::Null) {
                println!("{value}");
            }
        }
    }

    Ok(())
}

/// Reads one line at a time, keeping bindings between lines.
fn prompt(config: Config) -> Result<()> {
    let env = Environment::new_root();
    let mut interpreter = Interpreter::with_config(config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!(">> ");
        stdout.flush().context("Flushing prompt")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("Reading stdin")? == 0 {
            println!();
            return Ok(());
        }

        let program = match parser::parse(&line) {
            Ok(program) => program,
            Err(errors) => {
                for error in errors.iter() {
                    eprintln!("\t{error}");
                }
                continue;
            }
        };

        let result = interpreter.eval_program(&program, &env);
        for output in interpreter.take_output() {
            println!("{output}");
        }
        match result {
            Ok(Object::Null) => {}
            Ok(value) => println!("{value}"),
            Err(error) => eprintln!("ERROR: {error}"),
        }
    }
}
