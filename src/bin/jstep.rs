//! CLI wrapper for the jstep interpreter.
//!
//! Usage:
//!   jstep <file.js>              # Execute a JavaScript file
//!   jstep -e "code"              # Evaluate JavaScript code
//!   jstep                        # Start REPL (interactive mode)

use jstep::parser::ast::ProgramData;
use jstep::parser::JsParser;
use jstep::runner::api::Interpreter;
use jstep::runner::ds::value::JsValue;
use jstep::runner::eval::types::CompletionType;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    match args.len() {
        1 => {
            run_repl();
        }
        2 => {
            let arg = &args[1];
            if arg == "-h" || arg == "--help" {
                print_usage();
                process::exit(0);
            }
            run_file(arg);
        }
        3 if args[1] == "-e" || args[1] == "--eval" => {
            eval_code(&args[2], true);
        }
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("jstep - steppable JavaScript interpreter");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  jstep <file.js>              Execute a JavaScript file");
    eprintln!("  jstep -e \"code\"              Evaluate JavaScript code");
    eprintln!("  jstep --eval \"code\"          Evaluate JavaScript code");
    eprintln!("  jstep                        Start REPL (interactive mode)");
}

fn run_file(filename: &str) {
    let source = match fs::read_to_string(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    };
    eval_code(&source, false);
}

fn eval_code(code: &str, print_value: bool) {
    let program = match JsParser::parse_to_ast_from_str(code) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Parse error: {:?}", e);
            process::exit(1);
        }
    };

    let interpreter = Interpreter::new();
    let completion = interpreter.run(&program);
    match completion.completion_type {
        CompletionType::Normal => {
            if print_value {
                let value = completion.get_value();
                if !matches!(value, JsValue::Undefined) {
                    println!("{}", value);
                }
            }
        }
        CompletionType::Throw => {
            eprintln!("Uncaught {}", completion.get_value());
            process::exit(1);
        }
        other => {
            eprintln!("Unexpected {:?} completion at the top level", other);
            process::exit(1);
        }
    }
}

fn run_repl() {
    println!("jstep - steppable JavaScript interpreter");
    println!("Type JavaScript code and press Enter. Type .exit to quit.");
    println!();

    // One interpreter for the whole session: variables and functions
    // persist between inputs. Each line's AST is deliberately leaked so
    // that closures created by earlier inputs stay valid.
    let interpreter: Interpreter<'static> = Interpreter::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }

        let input = input.trim();
        if input == ".exit" || input == ".quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        let program: &'static ProgramData = match JsParser::parse_to_ast_from_str(input) {
            Ok(program) => Box::leak(Box::new(program)),
            Err(e) => {
                eprintln!("Parse error: {:?}", e);
                continue;
            }
        };

        let completion = interpreter.run(program);
        match completion.completion_type {
            CompletionType::Normal => {
                let value = completion.get_value();
                if !matches!(value, JsValue::Undefined) {
                    println!("{}", value);
                }
            }
            CompletionType::Throw => {
                eprintln!("Uncaught {}", completion.get_value());
            }
            other => {
                eprintln!("Unexpected {:?} completion at the top level", other);
            }
        }
    }

    println!("Goodbye!");
}
