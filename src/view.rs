//! Renders the 10x10 viewport to stdout. Pure presentation: reads the
//! grid and a cursor, writes nothing back.

use crate::cell::CellValue;
use crate::grid::Grid;

const VIEWPORT_SIZE: u16 = 10;

/// Prints the 10x10 (or smaller, near the grid edges) window starting
/// at `(top_row, top_col)`, with base-26 column headers and 1-based row
/// numbers.
pub fn print_viewport(grid: &Grid, top_row: u16, top_col: u16) {
    let display_rows = (grid.rows - top_row).min(VIEWPORT_SIZE);
    let display_cols = (grid.cols - top_col).min(VIEWPORT_SIZE);

    print!("     ");
    for j in 0..display_cols {
        print!("{:<8} ", Grid::column_name(top_col + j));
    }
    println!();

    for i in 0..display_rows {
        print!("{:<4} ", top_row + i + 1);
        for j in 0..display_cols {
            let c = crate::cell::Coord::new(top_row + i, top_col + j);
            match grid.get_value(c) {
                CellValue::Integer(v) => print!("{:<8} ", v),
                CellValue::Error => print!("{:<8} ", "ERR"),
            }
        }
        println!();
    }
}
