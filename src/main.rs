//! A terminal-driven integer spreadsheet with a reactive dependency
//! engine: every cell holds either a literal or one of a fixed set of
//! formulas, and editing a cell recomputes every transitive dependent.

mod cell;
mod command;
mod cycle;
mod engine;
mod error;
mod evaluator;
mod formula;
mod graph;
mod grid;
mod parser;
#[cfg(test)]
mod proptests;
mod view;

use std::env;
use std::io::{self, Write};
use std::process;
use std::time::Instant;

use crate::cell::{MAX_COL, MAX_ROW};
use crate::command::Command;
use crate::engine::Engine;

/// Parses and bounds-checks one of the two CLI dimension arguments.
/// Exits the process with status 1 on any parse or range failure, per
/// the usage contract.
fn parse_dimension(arg: &str, label: &str, max: u16) -> u16 {
    let Ok(n) = arg.parse::<u32>() else {
        eprintln!("invalid {label}: {arg}");
        process::exit(1);
    };
    if n == 0 || n > max as u32 {
        eprintln!("{label} must be in [1, {max}], got {n}");
        process::exit(1);
    }
    n as u16
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <rows> <cols>", args.first().map(String::as_str).unwrap_or("reactive-sheet"));
        process::exit(1);
    }

    let rows = parse_dimension(&args[1], "rows", MAX_ROW);
    let cols = parse_dimension(&args[2], "cols", MAX_COL);

    let mut engine = Engine::new(rows, cols);
    let mut last_elapsed = 0.0_f64;
    let mut last_status = "ok";
    let mut input = String::with_capacity(128);

    loop {
        if engine.output_enabled {
            view::print_viewport(&engine.grid, engine.viewport_row, engine.viewport_col);
        }

        print!("[{:.1}] ({}) > ", last_elapsed, last_status);
        io::stdout().flush().unwrap();

        input.clear();
        if io::stdin().read_line(&mut input).unwrap() == 0 {
            break;
        }

        let cmd = parser::parse(&input);
        if matches!(cmd, Command::Quit) {
            break;
        }

        let start = Instant::now();
        let result = engine.apply(&cmd);
        last_elapsed = start.elapsed().as_secs_f64();

        last_status = match result {
            Ok(()) => "ok",
            Err(e) => e.status_str(),
        };
    }
}
