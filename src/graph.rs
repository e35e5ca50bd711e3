//! The dependency graph: which cells does a change to `p` need to
//! reach? Maintained as two mirror relations (conceptually `parents` and
//! `children`), but `parents[c]` is never stored explicitly here — it is
//! always recoverable as `Formula::parents(&grid.get_formula(c))`, so the
//! graph only has to own the reverse (`children`) direction. This is the
//! arena+index strategy: the grid is the arena, coordinates are the
//! indices, and nothing here owns a formula copy.
//!
//! Aggregate ranges are stored as a single rectangle record rather than
//! one edge per cell in the range — `SUM(A1:ZZZ999)` would otherwise
//! materialize millions of entries for a relationship that is really
//! just "this cell depends on this rectangle."

use std::collections::{HashMap, HashSet};

use crate::cell::Coord;
use crate::formula::Formula;

#[derive(Debug, Clone, Copy)]
struct RangeEdge {
    r1: Coord,
    r2: Coord,
    child: Coord,
}

#[derive(Default)]
pub struct DependencyGraph {
    children: HashMap<Coord, HashSet<Coord>>,
    ranges: Vec<RangeEdge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Adds `p -> c`. Idempotent.
    pub fn add_edge(&mut self, p: Coord, c: Coord) {
        self.children.entry(p).or_default().insert(c);
    }

    /// Removes `p -> c`. No-op if absent.
    pub fn remove_edge(&mut self, p: Coord, c: Coord) {
        if let Some(set) = self.children.get_mut(&p) {
            set.remove(&c);
            if set.is_empty() {
                self.children.remove(&p);
            }
        }
    }

    fn add_range_edge(&mut self, r1: Coord, r2: Coord, child: Coord) {
        self.ranges.push(RangeEdge { r1, r2, child });
    }

    fn remove_range_edges_for(&mut self, child: Coord) {
        self.ranges.retain(|e| e.child != child);
    }

    /// Removes every edge `(p, c)` implied by `old`, then adds every
    /// edge implied by `new`. `c`'s resulting parent set equals
    /// `new.parents()` exactly.
    pub fn replace_parents(&mut self, c: Coord, old: &Formula, new: &Formula) {
        match old.range() {
            Some(_) => self.remove_range_edges_for(c),
            None => {
                for p in old.parents() {
                    self.remove_edge(p, c);
                }
            }
        }
        match new.range() {
            Some((r1, r2)) => self.add_range_edge(r1, r2, c),
            None => {
                for p in new.parents() {
                    self.add_edge(p, c);
                }
            }
        }
    }

    /// All cells whose formula reads `p`'s value: the union of direct
    /// edges and any range edge whose rectangle contains `p`.
    pub fn children_of(&self, p: Coord) -> Vec<Coord> {
        let mut out: Vec<Coord> = self
            .children
            .get(&p)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for e in &self.ranges {
            if p.in_rect(e.r1, e.r2) && !out.contains(&e.child) {
                out.push(e.child);
            }
        }
        out
    }
}
