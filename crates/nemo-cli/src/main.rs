//! Command-line front-end for the Nemo runtime (§6, §10.2).

use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use nemo::Interpreter;

/// Runs Nemo source: a script file, a one-shot `-e` expression, or an
/// interactive REPL when no script is given.
#[derive(Parser)]
#[command(name = "nemo", version, about = "Run Nemo programs")]
struct Cli {
    /// Source file to run. Omitted starts the REPL.
    script: Option<PathBuf>,

    /// Evaluate EXPR as a single top-level statement, print its
    /// `printString`, and exit.
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Print the parsed AST before executing.
    #[arg(long)]
    ast: bool,

    /// DEBUG, INFO, WARN, or ERROR.
    #[arg(long, default_value = "ERROR")]
    loglevel: String,

    /// Overrides NEMO_HOME for relative library loads.
    #[arg(long)]
    home: Option<PathBuf>,

    /// Overrides the default bootstrap file list.
    #[arg(long)]
    bootstrap: Option<PathBuf>,

    /// Overrides the activation-depth ceiling.
    #[arg(long)]
    stack_depth: Option<usize>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 2,
            };
            err.print().ok();
            return ExitCode::from(code);
        }
    };

    let level = match cli.loglevel.to_ascii_uppercase().as_str() {
        "DEBUG" => log::LevelFilter::Debug,
        "INFO" => log::LevelFilter::Info,
        "WARN" => log::LevelFilter::Warn,
        _ => log::LevelFilter::Error,
    };
    simple_logger::SimpleLogger::new().with_level(level).init().ok();

    if let Some(home) = &cli.home {
        // SAFETY: single-threaded at startup, before any process runs user code.
        unsafe { std::env::set_var("NEMO_HOME", home) };
    }
    if let Some(bootstrap) = &cli.bootstrap {
        log::debug!("--bootstrap {} requested; bootstrap is currently built in, not file-loaded", bootstrap.display());
    }

    let mut interp = Interpreter::bootstrapped();
    if let Some(depth) = cli.stack_depth {
        interp.stack_limit = depth;
    }

    if let Some(expr) = &cli.eval {
        return run_eval(&mut interp, expr, cli.ast);
    }

    if let Some(path) = &cli.script {
        return run_file(&mut interp, path, cli.ast);
    }

    run_repl(&mut interp, cli.ast);
    ExitCode::SUCCESS
}

fn run_eval(interp: &mut Interpreter, source: &str, dump_ast: bool) -> ExitCode {
    if dump_ast {
        dump_program(source);
    }
    match interp.run_source(source) {
        Ok(value) => {
            match nemo::primitives::print_string(interp, &value) {
                Ok(s) => println!("{s}"),
                Err(err) => eprintln!("{err:?}"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

fn run_file(interp: &mut Interpreter, path: &PathBuf, dump_ast: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error reading {}: {err}", path.display());
            return ExitCode::from(1);
        }
    };
    if dump_ast {
        dump_program(&source);
    }
    match interp.run_source(&source) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

fn dump_program(source: &str) {
    match nemo::parser::Parser::parse_program(source) {
        Ok(program) => println!("{program:#?}"),
        Err(err) => eprintln!("{err}"),
    }
}

/// Interactive loop (§6 "REPL protocol", §10.5's continuation rule): buffers
/// input until brackets/parens balance and the last non-blank line ends
/// with a period, or the buffer ends mid keyword-chain and the next line
/// starts a keyword fragment — the same rule the parser uses to decide a
/// newline doesn't end a statement.
fn run_repl(interp: &mut Interpreter, dump_ast: bool) {
    use std::io::{self, Write};

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "nemo> " } else { "  ... " };
        print!("{prompt}");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut line = String::new();
        if io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            println!();
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);

        if buffer.is_empty() {
            match line.trim() {
                ":quit" | ":q" => break,
                ":help" => {
                    println!("Nemo REPL. Enter a statement ending in '.'; ':quit' to exit.");
                    continue;
                }
                "" => continue,
                _ => {}
            }
        }

        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(line);

        if needs_more_input(&buffer) {
            continue;
        }

        if dump_ast {
            dump_program(&buffer);
        }
        match nemo::parser::Parser::parse_program(&buffer) {
            Ok(program) => {
                for stmt in &program.statements {
                    match interp.run_statement(stmt) {
                        Ok(value) => match nemo::primitives::print_string(interp, &value) {
                            Ok(s) => println!("{s}"),
                            Err(err) => eprintln!("{err:?}"),
                        },
                        Err(err) => eprintln!("{err}"),
                    }
                }
            }
            Err(err) => eprintln!("{err}"),
        }
        buffer.clear();
    }
}

fn needs_more_input(buffer: &str) -> bool {
    let trimmed = buffer.trim_end();
    let mut balance = 0i32;
    for ch in trimmed.chars() {
        match ch {
            '(' | '[' | '{' => balance += 1,
            ')' | ']' | '}' => balance -= 1,
            _ => {}
        }
    }
    if balance > 0 {
        return true;
    }
    let Some(last_line) = trimmed.lines().next_back() else { return false };
    let last_line = last_line.trim_end();
    if last_line.ends_with('.') {
        return false;
    }
    last_line.ends_with(':') || !last_line.is_empty()
}
