//! The formula model: the five formula kinds a cell can hold, and the
//! structural queries the reactive engine needs from them (what parents
//! does this formula read, is it well-formed against the grid bounds).

use crate::cell::{Coord, MAX_COL, MAX_ROW};
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Min,
    Max,
    Sum,
    Avg,
    Stdev,
}

/// An arithmetic or sleep operand: either a literal integer or a cell
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Lit(i32),
    Cell(Coord),
}

impl Operand {
    fn parent(&self) -> Option<Coord> {
        match self {
            Operand::Lit(_) => None,
            Operand::Cell(c) => Some(*c),
        }
    }

    fn validate(&self) -> Result<(), ErrorKind> {
        match self {
            Operand::Lit(_) => Ok(()),
            Operand::Cell(c) if c.in_bounds() => Ok(()),
            Operand::Cell(_) => Err(ErrorKind::InvalidCell),
        }
    }
}

/// A cell's formula: the declarative rule that produces its value from
/// other cells and literals. `Empty` means the cell holds a plain
/// literal and has no parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    Empty,
    Ref {
        src: Coord,
    },
    Arith {
        lhs: Operand,
        op: BinOp,
        rhs: Operand,
    },
    Aggregate {
        kind: AggKind,
        r1: Coord,
        r2: Coord,
    },
    Sleep {
        arg: Operand,
    },
}

impl Formula {
    /// The set of cells whose current value this formula reads. Finite,
    /// duplicate-free; order is not significant.
    pub fn parents(&self) -> Vec<Coord> {
        match self {
            Formula::Empty => Vec::new(),
            Formula::Ref { src } => vec![*src],
            Formula::Arith { lhs, rhs, .. } => {
                let mut v = Vec::with_capacity(2);
                if let Some(c) = lhs.parent() {
                    v.push(c);
                }
                if let Some(c) = rhs.parent() {
                    if !v.contains(&c) {
                        v.push(c);
                    }
                }
                v
            }
            Formula::Aggregate { r1, r2, .. } => {
                let mut v = Vec::with_capacity(
                    (r2.row - r1.row + 1) as usize * (r2.col - r1.col + 1) as usize,
                );
                for row in r1.row..=r2.row {
                    for col in r1.col..=r2.col {
                        v.push(Coord::new(row, col));
                    }
                }
                v
            }
            Formula::Sleep { arg } => arg.parent().into_iter().collect(),
        }
    }

    /// Whether this formula, if installed, represents a rectangular
    /// range dependency (worth storing compactly) rather than a handful
    /// of direct edges.
    pub fn range(&self) -> Option<(Coord, Coord)> {
        match self {
            Formula::Aggregate { r1, r2, .. } => Some((*r1, *r2)),
            _ => None,
        }
    }

    /// Structural validation: out-of-bounds references and
    /// inverted/out-of-bounds ranges. Does *not* check for
    /// self-reference or cycles — that is the cycle detector's job, run
    /// after this passes (e.g. `STDEV(A1:A1)` targeting `A1` is a cycle,
    /// not an invalid range).
    pub fn validate(&self) -> Result<(), ErrorKind> {
        match self {
            Formula::Empty => Ok(()),
            Formula::Ref { src } => {
                if src.in_bounds() {
                    Ok(())
                } else {
                    Err(ErrorKind::InvalidCell)
                }
            }
            Formula::Arith { lhs, rhs, .. } => {
                lhs.validate()?;
                rhs.validate()
            }
            Formula::Aggregate { r1, r2, .. } => {
                if !r1.in_bounds() || !r2.in_bounds() {
                    return Err(ErrorKind::InvalidRange);
                }
                if r1.row > r2.row || r1.col > r2.col {
                    return Err(ErrorKind::InvalidRange);
                }
                Ok(())
            }
            Formula::Sleep { arg } => arg.validate(),
        }
    }
}
