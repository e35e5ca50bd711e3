//! The `Command` record the parser hands to the reactive engine. This
//! module owns only the data shape; `parser.rs` is what turns input text
//! into one of these.

use crate::cell::Coord;
use crate::formula::Formula;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDir {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    EnableOutput,
    DisableOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A cell-setting command: install `formula` as `target`'s new
    /// formula. Covers `SetLiteral` (`formula` is `Formula::Empty` with
    /// the literal already written by the caller), `SetRef`, `Arith`,
    /// `Aggregate`, and `Sleep` — they all share the same engine path.
    Set { target: Coord, formula: Formula, literal: Option<i32> },
    ScrollTo { target: Coord },
    ScrollDir { dir: ScrollDir },
    Control { ctl: Control },
    Quit,
    Invalid,
}
