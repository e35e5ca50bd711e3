//! Turns one trimmed line of input into a `Command`. Hand-rolled
//! byte-level parsing, no regex: every form in the grammar has a fixed
//! shape that a single scan over the bytes can recognise.

use crate::cell::{Coord, MAX_COL, MAX_ROW};
use crate::command::{Command, Control, ScrollDir};
use crate::formula::{AggKind, BinOp, Formula, Operand};
use crate::grid::Grid;

/// Parses a cell reference (`A1`, `ZZZ999`) into 0-based coordinates.
/// One to three uppercase letters, then one to three digits, no
/// surrounding whitespace. Returns `None` on any malformed input,
/// including a syntactically valid reference whose row or column
/// exceeds the grid's absolute maximum.
fn parse_cell_ref(s: &str) -> Option<Coord> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut split = 0;
    while split < bytes.len() && bytes[split].is_ascii_uppercase() {
        split += 1;
        if split > 3 {
            return None;
        }
    }
    if split == 0 || split == bytes.len() || bytes.len() - split > 3 {
        return None;
    }
    for &b in &bytes[split..] {
        if !b.is_ascii_digit() {
            return None;
        }
    }
    let col = Grid::parse_column(&s[..split]);
    let row: u32 = s[split..].parse().ok()?;
    if row == 0 || row as u16 > MAX_ROW || col > MAX_COL as u32 {
        return None;
    }
    Some(Coord::new((row - 1) as u16, col as u16))
}

/// Parses either a cell reference or a bare integer literal.
fn parse_operand(s: &str) -> Option<Operand> {
    if let Ok(v) = s.parse::<i32>() {
        return Some(Operand::Lit(v));
    }
    parse_cell_ref(s).map(Operand::Cell)
}

fn parse_range(s: &str) -> Option<(Coord, Coord)> {
    let (lhs, rhs) = s.split_once(':')?;
    Some((parse_cell_ref(lhs)?, parse_cell_ref(rhs)?))
}

/// Splits `A1+B1`, `A1+3`, `3+A1` etc. at the first binary operator,
/// scanning from index 1 so a leading `-` on a negative literal is
/// never mistaken for the operator.
fn split_binary_op(expr: &str) -> Option<(&str, BinOp, &str)> {
    let bytes = expr.as_bytes();
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        let op = match b {
            b'+' => BinOp::Add,
            b'-' => BinOp::Sub,
            b'*' => BinOp::Mul,
            b'/' => BinOp::Div,
            _ => continue,
        };
        let (lhs, rhs) = (&expr[..i], &expr[i + 1..]);
        if lhs.is_empty() || rhs.is_empty() {
            continue;
        }
        return Some((lhs, op, rhs));
    }
    None
}

fn parse_agg_kind(prefix: &str) -> Option<AggKind> {
    match prefix {
        "MIN" => Some(AggKind::Min),
        "MAX" => Some(AggKind::Max),
        "SUM" => Some(AggKind::Sum),
        "AVG" => Some(AggKind::Avg),
        "STDEV" => Some(AggKind::Stdev),
        _ => None,
    }
}

/// Parses the right-hand side of an assignment into a formula, or
/// `None` if it doesn't match any recognised form.
fn parse_expr(expr: &str) -> Option<Formula> {
    if let Some(inner) = expr.strip_prefix("SLEEP(").and_then(|s| s.strip_suffix(')')) {
        return parse_operand(inner).map(|arg| Formula::Sleep { arg });
    }
    for prefix in ["MIN", "MAX", "SUM", "AVG", "STDEV"] {
        if let Some(inner) = expr
            .strip_prefix(prefix)
            .and_then(|s| s.strip_prefix('('))
            .and_then(|s| s.strip_suffix(')'))
        {
            let (r1, r2) = parse_range(inner)?;
            let kind = parse_agg_kind(prefix)?;
            return Some(Formula::Aggregate { kind, r1, r2 });
        }
    }
    if let Some((lhs, op, rhs)) = split_binary_op(expr) {
        let lhs = parse_operand(lhs)?;
        let rhs = parse_operand(rhs)?;
        return Some(Formula::Arith { lhs, op, rhs });
    }
    if let Some(c) = parse_cell_ref(expr) {
        return Some(Formula::Ref { src: c });
    }
    None
}

/// Parses one trimmed line of user input into a `Command`. Never
/// returns an error: unparseable input becomes `Command::Invalid`,
/// which the engine turns into `Err(Unrecognised)` without mutating
/// anything.
pub fn parse(line: &str) -> Command {
    let line = line.trim();

    if line.len() == 1 {
        match line.as_bytes()[0] {
            b'w' => return Command::ScrollDir { dir: ScrollDir::Up },
            b's' => {
                return Command::ScrollDir {
                    dir: ScrollDir::Down,
                }
            }
            b'a' => {
                return Command::ScrollDir {
                    dir: ScrollDir::Left,
                }
            }
            b'd' => {
                return Command::ScrollDir {
                    dir: ScrollDir::Right,
                }
            }
            b'q' => return Command::Quit,
            _ => {}
        }
    }

    match line {
        "disable_output" => {
            return Command::Control {
                ctl: Control::DisableOutput,
            }
        }
        "enable_output" => {
            return Command::Control {
                ctl: Control::EnableOutput,
            }
        }
        _ => {}
    }

    if let Some(rest) = line.strip_prefix("scroll_to ") {
        return match parse_cell_ref(rest.trim()) {
            Some(target) => Command::ScrollTo { target },
            None => Command::Invalid,
        };
    }

    if let Some((cell_ref, expr)) = line.split_once('=') {
        let cell_ref = cell_ref.trim();
        let expr = expr.trim();
        let Some(target) = parse_cell_ref(cell_ref) else {
            return Command::Invalid;
        };
        if let Ok(v) = expr.parse::<i32>() {
            return Command::Set {
                target,
                formula: Formula::Empty,
                literal: Some(v),
            };
        }
        return match parse_expr(expr) {
            Some(formula) => Command::Set {
                target,
                formula,
                literal: None,
            },
            None => Command::Invalid,
        };
    }

    Command::Invalid
}
