//! A tiny demo CLI (SPEC_FULL §10.4): load a grammar file and an input file,
//! parse the input with the primary surface syntax, and print the parse
//! result or the rendered `ParseFailure`. Grounded on the teacher's own
//! `main.rs` (`parsley::define_parser` + `parse_string` + `println!`),
//! generalized from a grammar embedded in source to one read from the
//! filesystem. Binds an empty action table, since this demo has no way to
//! learn what actions an arbitrary grammar file expects — a real caller with
//! a concrete grammar would build its own `ActionTable` the way
//! `demos/rational.rs` does. A grammar whose top rule never reaches a
//! `{action}` still fails to unpack (spec §7: zero results is always an
//! error), so this only prints a result for a grammar whose top rule
//! transforms into one.

use std::env;
use std::fs;
use std::process::ExitCode;

use pegboot::dialect::bpeg::Bpeg;
use pegboot::{create_parser, ActionTable, ParserOptions};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let (grammar_path, input_path) = match (args.next(), args.next()) {
        (Some(g), Some(i)) => (g, i),
        _ => {
            eprintln!("usage: cli <grammar-file> <input-file>");
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&grammar_path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("failed to read {grammar_path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let input = match fs::read_to_string(&input_path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("failed to read {input_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let actions: ActionTable<String, String> = ActionTable::new();
    let parser = match create_parser::<String, String>(
        &source,
        &Bpeg::new(),
        actions,
        ParserOptions::default(),
    ) {
        Ok(parser) => parser,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match parser.parse_report(&input) {
        Ok(value) => {
            println!("{value:?}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("{failure}");
            ExitCode::FAILURE
        }
    }
}
