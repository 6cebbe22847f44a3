//! Standalone interactive front-end for the Nemo core (§6, §10.5).
//!
//! A thinner sibling of `nemo-cli`'s REPL: no `clap` surface, just a file
//! argument or stdin, for embedding or quick manual testing of the library
//! crate on its own.

use std::{
    io::{self, Write},
    process::ExitCode,
};

use nemo::Interpreter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error reading {path}: {e}");
                return ExitCode::FAILURE;
            }
        };
        let mut interp = Interpreter::bootstrapped();
        return match interp.run_source(&source) {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        };
    }

    let mut interp = Interpreter::bootstrapped();
    let mut source = String::new();

    loop {
        let prompt = if source.is_empty() { ">>> " } else { "... " };
        let Some(line) = read_line(prompt) else {
            println!();
            break;
        };

        if source.is_empty() && line.trim().is_empty() {
            continue;
        }

        if !source.is_empty() {
            source.push('\n');
        }
        source.push_str(&line);

        if needs_more_input(&source) {
            continue;
        }

        match nemo::parser::Parser::parse_program(&source) {
            Ok(program) => {
                for stmt in &program.statements {
                    match interp.run_statement(stmt) {
                        Ok(value) => match nemo::primitives::print_string(&mut interp, &value) {
                            Ok(s) => println!("{s}"),
                            Err(err) => eprintln!("{err:?}"),
                        },
                        Err(err) => eprintln!("{err}"),
                    }
                }
            }
            Err(err) => eprintln!("{err}"),
        }
        source.clear();
    }

    ExitCode::SUCCESS
}

fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    let n = io::stdin().read_line(&mut line).ok()?;
    if n == 0 {
        return None;
    }
    Some(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Mirrors the parser's own newline-absorption rule (§4.2): buffered text
/// keeps accumulating while brackets are unbalanced, or while the last line
/// ends mid keyword-chain with no closing period.
fn needs_more_input(source: &str) -> bool {
    let trimmed = source.trim_end();
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
