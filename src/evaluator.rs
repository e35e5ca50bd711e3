//! The evaluator: a pure function from a formula and the current grid
//! to an integer result or an error. Never mutates the grid, never
//! blocks — `Formula::Sleep`'s actual blocking side effect lives in
//! `engine::Engine::apply`, which is the only caller allowed to act on
//! the duration this returns for the command's own target cell.

use crate::cell::CellValue;
use crate::error::ErrorKind;
use crate::formula::{AggKind, BinOp, Formula, Operand};
use crate::grid::Grid;

fn operand_value(grid: &Grid, op: &Operand) -> CellValue {
    match op {
        Operand::Lit(v) => CellValue::Integer(*v),
        Operand::Cell(c) => grid.get_value(*c),
    }
}

/// Evaluates `formula` against `grid`'s current values.
///
/// `Formula::Empty` is never passed here: its value is whatever was last
/// written directly (a literal assignment), and the engine never calls
/// evaluate on it.
pub fn evaluate(formula: &Formula, grid: &Grid) -> Result<CellValue, ErrorKind> {
    match formula {
        Formula::Empty => unreachable!("engine never evaluates an Empty formula"),
        Formula::Ref { src } => Ok(grid.get_value(*src)),
        Formula::Arith { lhs, op, rhs } => eval_arith(grid, lhs, *op, rhs),
        Formula::Aggregate { kind, r1, r2 } => eval_aggregate(grid, *kind, *r1, *r2),
        Formula::Sleep { arg } => eval_sleep_duration(grid, arg),
    }
}

fn eval_arith(grid: &Grid, lhs: &Operand, op: BinOp, rhs: &Operand) -> Result<CellValue, ErrorKind> {
    let (Some(l), Some(r)) = (
        operand_value(grid, lhs).as_int(),
        operand_value(grid, rhs).as_int(),
    ) else {
        return Ok(CellValue::Error);
    };
    let result = match op {
        BinOp::Add => l.wrapping_add(r),
        BinOp::Sub => l.wrapping_sub(r),
        BinOp::Mul => l.wrapping_mul(r),
        BinOp::Div => {
            if r == 0 {
                return Ok(CellValue::Error);
            }
            l.wrapping_div(r)
        }
    };
    Ok(CellValue::Integer(result))
}

fn collect_range(grid: &Grid, r1: crate::cell::Coord, r2: crate::cell::Coord) -> Option<Vec<i32>> {
    let mut values =
        Vec::with_capacity((r2.row - r1.row + 1) as usize * (r2.col - r1.col + 1) as usize);
    for row in r1.row..=r2.row {
        for col in r1.col..=r2.col {
            let v = grid.get_value(crate::cell::Coord::new(row, col));
            match v.as_int() {
                Some(i) => values.push(i),
                None => return None,
            }
        }
    }
    Some(values)
}

fn eval_aggregate(
    grid: &Grid,
    kind: AggKind,
    r1: crate::cell::Coord,
    r2: crate::cell::Coord,
) -> Result<CellValue, ErrorKind> {
    let Some(values) = collect_range(grid, r1, r2) else {
        return Ok(CellValue::Error);
    };
    let n = values.len() as i64;
    let result = match kind {
        AggKind::Min => *values.iter().min().expect("range validated non-empty"),
        AggKind::Max => *values.iter().max().expect("range validated non-empty"),
        AggKind::Sum => values.iter().fold(0i32, |acc, v| acc.wrapping_add(*v)),
        AggKind::Avg => {
            let sum: i64 = values.iter().map(|&v| v as i64).sum();
            (sum / n) as i32
        }
        AggKind::Stdev => {
            if n == 1 {
                0
            } else {
                let sum: i64 = values.iter().map(|&v| v as i64).sum();
                let mean = sum as f64 / n as f64;
                let sq_diff_sum: f64 = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
                let sample_variance = sq_diff_sum / (n - 1) as f64;
                sample_variance.sqrt().round() as i32
            }
        }
    };
    Ok(CellValue::Integer(result))
}

/// Resolves a `Sleep` argument to a duration, without blocking. Returns
/// `Err(SleepOutOfRange)` if the resolved value falls outside
/// `[0, 3600]`; otherwise returns the duration as the cell's would-be
/// value. Also returns `Ok(CellValue::Error)` if the argument cell
/// itself holds `ERROR`, consistent with "any ERROR parent yields
/// ERROR."
fn eval_sleep_duration(grid: &Grid, arg: &Operand) -> Result<CellValue, ErrorKind> {
    let Some(d) = operand_value(grid, arg).as_int() else {
        return Ok(CellValue::Error);
    };
    if !(0..=3600).contains(&d) {
        return Err(ErrorKind::SleepOutOfRange);
    }
    Ok(CellValue::Integer(d))
}
