use lisplet::ast::Value;
use lisplet::evaluator::{self, Environment};
use lisplet::reader::parse;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;

fn main() {
    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("Lisplet - a minimal Lisp");
    println!("Enter expressions like: (+ 1 2) or (defn double (n) (* n 2))");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");

    // One global environment per session; definitions persist across inputs
    let env = Environment::new();

    loop {
        match rl.readline("lisplet> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                match parse(line).and_then(|expr| evaluator::evaluate(&expr, &env)) {
                    Ok(result) => println!("{result}"),
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Lisplet REPL commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("The language:");
    println!("  Integers: 42, -5");
    println!("  Booleans: #t, #f");
    println!("  Strings:  \"hello\"");
    println!("  Math:     (+ 1 2), (- 5 3), (* 2 3), (/ 9 2), (mod 9 2), (> 2 1)");
    println!("  Lists:    (cons 1 (quote (2 3))), (head xs), (tail xs), (empty xs)");
    println!("  Forms:    quote, atom, eq, if, cond, let, define, lambda, defn");
    println!();
    println!("Examples:");
    println!("  (define x 10)");
    println!("  (if (> x 5) \"big\" \"small\")");
    println!("  (defn fact (n) (if (eq n 0) 1 (* n (fact (- n 1)))))");
    println!("  (fact 5)");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate functions from plain values
    let mut closures = Vec::new();
    let mut plain = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Closure(_) => closures.push((name, value)),
            _ => plain.push((name, value)),
        }
    }

    if !closures.is_empty() {
        println!("Functions ({}):", closures.len());
        for (name, value) in closures {
            println!("  {name} = {value}");
        }
        println!();
    }

    if !plain.is_empty() {
        println!("Values ({}):", plain.len());
        for (name, value) in plain {
            println!("  {name} = {value}");
        }
    }
}
