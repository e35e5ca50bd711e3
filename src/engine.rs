//! The reactive engine: the orchestrator invoked once per command.
//! `apply` validates, rewires the dependency graph, checks for cycles,
//! rolls back on failure, evaluates, commits, and propagates.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use crate::cell::{CellValue, Coord};
use crate::command::{Command, Control, ScrollDir};
use crate::error::ErrorKind;
use crate::evaluator::evaluate;
use crate::formula::Formula;
use crate::graph::DependencyGraph;
use crate::grid::Grid;

pub struct Engine {
    pub grid: Grid,
    pub graph: DependencyGraph,
    pub viewport_row: u16,
    pub viewport_col: u16,
    pub output_enabled: bool,
}

const VIEWPORT_SIZE: u16 = 10;

impl Engine {
    pub fn new(rows: u16, cols: u16) -> Self {
        Engine {
            grid: Grid::new(rows, cols),
            graph: DependencyGraph::new(),
            viewport_row: 0,
            viewport_col: 0,
            output_enabled: true,
        }
    }

    /// Applies one parsed command. Returns `Ok(())` on success; on
    /// `Err`, the grid and dependency graph are restored to exactly
    /// their pre-call state, with the one documented exception of
    /// `SleepOutOfRange` (see `apply_set`).
    pub fn apply(&mut self, cmd: &Command) -> Result<(), ErrorKind> {
        match cmd {
            Command::Set {
                target,
                formula,
                literal,
            } => self.apply_set(*target, formula, *literal),
            Command::ScrollTo { target } => self.apply_scroll_to(*target),
            Command::ScrollDir { dir } => {
                self.apply_scroll_dir(*dir);
                Ok(())
            }
            Command::Control { ctl } => {
                self.apply_control(*ctl);
                Ok(())
            }
            Command::Quit => Ok(()),
            Command::Invalid => Err(ErrorKind::Unrecognised),
        }
    }

    fn apply_scroll_to(&mut self, target: Coord) -> Result<(), ErrorKind> {
        if !target.in_bounds() || target.row >= self.grid.rows || target.col >= self.grid.cols {
            return Err(ErrorKind::InvalidCell);
        }
        self.viewport_row = target.row;
        self.viewport_col = target.col;
        Ok(())
    }

    fn apply_scroll_dir(&mut self, dir: ScrollDir) {
        match dir {
            ScrollDir::Up => {
                self.viewport_row = self.viewport_row.saturating_sub(VIEWPORT_SIZE);
            }
            ScrollDir::Down => {
                let max_start = self.grid.rows.saturating_sub(VIEWPORT_SIZE);
                self.viewport_row = (self.viewport_row + VIEWPORT_SIZE).min(max_start);
            }
            ScrollDir::Left => {
                self.viewport_col = self.viewport_col.saturating_sub(VIEWPORT_SIZE);
            }
            ScrollDir::Right => {
                let max_start = self.grid.cols.saturating_sub(VIEWPORT_SIZE);
                self.viewport_col = (self.viewport_col + VIEWPORT_SIZE).min(max_start);
            }
        }
    }

    fn apply_control(&mut self, ctl: Control) {
        self.output_enabled = match ctl {
            Control::EnableOutput => true,
            Control::DisableOutput => false,
        };
    }

    /// Validate, snapshot, rewire, cycle-check, evaluate, commit,
    /// propagate — the pipeline shared by every cell-setting command
    /// kind.
    fn apply_set(
        &mut self,
        target: Coord,
        new_formula: &Formula,
        literal: Option<i32>,
    ) -> Result<(), ErrorKind> {
        // Step 1: structural validation.
        new_formula.validate()?;

        // Step 2: snapshot for rollback.
        let old_formula = self.grid.get_formula(target);
        let old_value = self.grid.get_value(target);

        // Step 3: tentatively rewire and install the new formula.
        self.graph.replace_parents(target, &old_formula, new_formula);
        self.grid.set_formula(target, *new_formula);

        // Step 4: cycle check.
        if crate::cycle::reaches_self(&self.graph, target) {
            self.graph.replace_parents(target, new_formula, &old_formula);
            self.grid.set_formula(target, old_formula);
            self.grid.set_value(target, old_value);
            return Err(ErrorKind::Cycle);
        }

        // Literal assignment: the value is written directly, never
        // evaluated (formula is Empty and carries no parents).
        if let Some(v) = literal {
            self.grid.set_value(target, CellValue::Integer(v));
            self.propagate_from(target);
            return Ok(());
        }

        // Sleep is the one formula kind with a real side effect and an
        // error path that still commits.
        if let Formula::Sleep { .. } = new_formula {
            return self.apply_sleep(target, new_formula);
        }

        // Step 5-7: evaluate and commit.
        let new_value = match evaluate(new_formula, &self.grid) {
            Ok(v) => v,
            Err(_) => unreachable!("only Sleep evaluation can fail, handled above"),
        };
        self.grid.set_value(target, new_value);

        // Step 8: propagate to transitive dependents.
        self.propagate_from(target);
        Ok(())
    }

    /// Applies a `Sleep` command to its own target: resolves the
    /// duration, blocks for real time if in range, and — uniquely among
    /// command-level errors — commits `value(target) = 0` and the
    /// already-rewired formula/edges even when it returns
    /// `Err(SleepOutOfRange)`.
    fn apply_sleep(&mut self, target: Coord, formula: &Formula) -> Result<(), ErrorKind> {
        match evaluate(formula, &self.grid) {
            Ok(CellValue::Integer(d)) => {
                thread::sleep(Duration::from_secs(d as u64));
                self.grid.set_value(target, CellValue::Integer(d));
                self.propagate_from(target);
                Ok(())
            }
            Ok(CellValue::Error) => {
                self.grid.set_value(target, CellValue::Error);
                self.propagate_from(target);
                Ok(())
            }
            Err(ErrorKind::SleepOutOfRange) => {
                self.grid.set_value(target, CellValue::Integer(0));
                self.propagate_from(target);
                Err(ErrorKind::SleepOutOfRange)
            }
            Err(other) => Err(other),
        }
    }

    /// Topologically recomputes every transitive dependent of `target`
    /// (excluding `target` itself, whose value the caller already
    /// wrote). A cascaded `Sleep` cell recomputes its duration but never
    /// blocks; an evaluation failure during cascade (e.g. a `Sleep`
    /// argument drifting out of range, or a fresh division by zero)
    /// writes `CellValue::Error` rather than aborting the command.
    fn propagate_from(&mut self, target: Coord) {
        let order = self.topological_order(target);
        for c in order {
            let f = self.grid.get_formula(c);
            if matches!(f, Formula::Empty) {
                // Source cell unexpectedly reachable from target: a
                // graph/formula mismatch, not a value to recompute.
                // Leave it untouched.
                continue;
            }
            let value = match evaluate(&f, &self.grid) {
                Ok(v) => v,
                Err(_) => CellValue::Error,
            };
            self.grid.set_value(c, value);
        }
    }

    /// Post-order DFS over `children_of`, reversed, yielding every cell
    /// reachable from `target` (excluding `target`) such that each cell
    /// appears after all of its reachable predecessors. Assumes the
    /// graph is acyclic (checked by the caller before this runs).
    fn topological_order(&self, target: Coord) -> Vec<Coord> {
        let mut visited: HashSet<Coord> = HashSet::new();
        let mut post_order: Vec<Coord> = Vec::new();
        let mut stack: Vec<(Coord, bool)> = self
            .graph
            .children_of(target)
            .into_iter()
            .map(|c| (c, false))
            .collect();

        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                post_order.push(node);
                continue;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.push((node, true));
            for child in self.graph.children_of(node) {
                if !visited.contains(&child) {
                    stack.push((child, false));
                }
            }
        }
        post_order.reverse();
        post_order
    }
}
