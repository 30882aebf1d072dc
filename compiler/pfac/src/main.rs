//! PFA Compiler CLI
//!
//! Runs a PFA document against a stream of JSON input records.

mod tracing_setup;

use std::io::{BufRead, Write};
use std::path::Path;

use pfa_eval::{Engine, from_json, to_json};
use pfa_ir::Method;

fn main() {
    tracing_setup::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];
    match command.as_str() {
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: pfac check <doc.json>");
                std::process::exit(1);
            }
            check_file(&args[2]);
        }
        "run" => {
            if args.len() < 3 {
                eprintln!("Usage: pfac run <doc.json> [input.ndjson]");
                std::process::exit(1);
            }
            let input_path = args.get(3).map(String::as_str);
            run_file(&args[2], input_path);
        }
        "canon" => {
            if args.len() < 3 {
                eprintln!("Usage: pfac canon <doc.json>");
                std::process::exit(1);
            }
            canon_file(&args[2]);
        }
        "help" | "--help" | "-h" => print_usage(),
        "version" | "--version" | "-v" => println!("pfac {}", env!("CARGO_PKG_VERSION")),
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("pfac - PFA scoring engine CLI");
    println!();
    println!("Usage: pfac <command> [options]");
    println!();
    println!("Commands:");
    println!("  check <doc.json>              Parse and type check a PFA document");
    println!("  run <doc.json> [input.ndjson] Run a document against newline-delimited JSON input");
    println!("                                (reads stdin if input.ndjson is omitted)");
    println!("  canon <doc.json>              Print the canonical JSON form of a document");
    println!("  help                          Show this help message");
    println!("  version                       Show version information");
}

fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading '{path}': {e}");
            std::process::exit(1);
        }
    }
}

fn read_document(path: &str) -> serde_json::Value {
    let content = read_file(path);
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error parsing '{path}' as JSON: {e}");
            std::process::exit(1);
        }
    }
}

fn build_engine(path: &str) -> Engine {
    let doc = read_document(path);
    let parsed = match pfa_parse::parse_document(&doc) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Parse errors in '{path}':");
            eprintln!("  {e}");
            std::process::exit(1);
        }
    };
    match Engine::new(parsed.interner, parsed.registry, parsed.config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Type errors in '{path}':");
            eprintln!("  {e}");
            std::process::exit(1);
        }
    }
}

fn check_file(path: &str) {
    let engine = build_engine(path);
    println!(
        "OK: {path} (method: {:?}, input: {:?}, output: {:?})",
        engine.method(),
        engine.input_type(),
        engine.output_type()
    );
}

fn canon_file(path: &str) {
    let doc = read_document(path);
    let parsed = match pfa_parse::parse_document(&doc) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Parse errors in '{path}':");
            eprintln!("  {e}");
            std::process::exit(1);
        }
    };
    let canonical = pfa_parse::to_canonical_json(&parsed.config, &parsed.registry, &parsed.interner);
    println!("{}", serde_json::to_string_pretty(&canonical).expect("canonical json is always serializable"));
}

fn run_file(doc_path: &str, input_path: Option<&str>) {
    let engine = build_engine(doc_path);
    let mut actor = match engine.new_actor() {
        Ok(actor) => actor,
        Err(e) => {
            eprintln!("Error running `begin`: {e}");
            std::process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let lines: Box<dyn Iterator<Item = std::io::Result<String>>> = match input_path {
        Some(p) if p != "-" => {
            let file = std::fs::File::open(Path::new(p)).unwrap_or_else(|e| {
                eprintln!("Error reading '{p}': {e}");
                std::process::exit(1);
            });
            Box::new(std::io::BufReader::new(file).lines())
        }
        _ => Box::new(std::io::stdin().lock().lines()),
    };

    for (lineno, line) in lines.enumerate() {
        let line = line.unwrap_or_else(|e| {
            eprintln!("Error reading input line {}: {e}", lineno + 1);
            std::process::exit(1);
        });
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let json: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Line {}: invalid JSON: {e}", lineno + 1);
                std::process::exit(1);
            }
        };
        let input = match from_json(&json, engine.input_type(), engine.registry(), engine.interner()) {
            Some(v) => v,
            None => {
                eprintln!("Line {}: input does not match declared input type", lineno + 1);
                std::process::exit(1);
            }
        };

        let outcome = match actor.action(input) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Line {}: runtime error: {e}", lineno + 1);
                std::process::exit(1);
            }
        };

        match engine.method() {
            Method::Map | Method::Fold => {
                if let Some(output) = outcome.output {
                    let rendered = to_json(&output, engine.output_type(), engine.registry(), engine.interner());
                    writeln!(out, "{rendered}").expect("stdout write failed");
                }
            }
            Method::Emit => {
                for emitted in &outcome.emitted {
                    let rendered = to_json(emitted, engine.output_type(), engine.registry(), engine.interner());
                    writeln!(out, "{rendered}").expect("stdout write failed");
                }
            }
        }
    }

    if let Err(e) = actor.run_end() {
        eprintln!("Error running `end`: {e}");
        std::process::exit(1);
    }

    if engine.method() == Method::Fold {
        if let Some(tally) = actor.tally() {
            let rendered = to_json(tally, engine.output_type(), engine.registry(), engine.interner());
            writeln!(out, "{rendered}").expect("stdout write failed");
        }
    }
}
