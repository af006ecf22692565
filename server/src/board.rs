//! Board and cell state machine.
//!
//! Each cell moves through `free → held(p) → claimed(p)`, with
//! `held(p) → free` via release. A transition whose precondition fails is a
//! silent no-op so duplicate or late messages from a client that already
//! lost a race leave the board untouched. Cells are only mutated while the
//! owning session's lock is held.

use shared::{PlayerId, Verb};
use std::collections::HashMap;

/// One board square: at most one of holder/claimant is set at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    holder: Option<PlayerId>,
    claimant: Option<PlayerId>,
}

impl Cell {
    pub fn holder(&self) -> Option<PlayerId> {
        self.holder
    }

    pub fn claimant(&self) -> Option<PlayerId> {
        self.claimant
    }

    /// A cell can be held only while it has neither holder nor claimant.
    fn try_hold(&mut self, player: PlayerId) -> bool {
        if self.holder.is_some() || self.claimant.is_some() {
            return false;
        }
        self.holder = Some(player);
        true
    }

    /// Only the current holder may claim; claiming clears the hold.
    fn try_claim(&mut self, player: PlayerId) -> bool {
        if self.holder != Some(player) {
            return false;
        }
        self.claimant = Some(player);
        self.holder = None;
        true
    }

    /// Only the current holder may release.
    fn try_release(&mut self, player: PlayerId) -> bool {
        if self.holder != Some(player) {
            return false;
        }
        self.holder = None;
        true
    }
}

/// Fixed-size N×N grid of cells; shape is immutable after construction.
#[derive(Debug, Clone)]
pub struct Board {
    size: usize,
    cells: Vec<Vec<Cell>>,
}

impl Board {
    /// Creates an empty board. Size validation happens at session
    /// construction, before a board ever exists.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![vec![Cell::default(); size]; size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn total_cells(&self) -> usize {
        self.size * self.size
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.cells[row][col]
    }

    /// Applies one transition. Returns true when the board changed.
    /// Coordinates must already be bounds-checked by the caller.
    pub fn apply(&mut self, verb: Verb, row: usize, col: usize, player: PlayerId) -> bool {
        let cell = &mut self.cells[row][col];
        match verb {
            Verb::Hold => cell.try_hold(player),
            Verb::Claim => cell.try_claim(player),
            Verb::Release => cell.try_release(player),
        }
    }

    /// Number of cells each player has claimed. Players with no claims are
    /// absent from the map.
    pub fn claim_counts(&self) -> HashMap<PlayerId, usize> {
        let mut counts = HashMap::new();
        for row in &self.cells {
            for cell in row {
                if let Some(claimant) = cell.claimant {
                    *counts.entry(claimant).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    pub fn claimed_cells(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.claimant.is_some())
            .count()
    }

    /// Releases every cell the player currently holds (claims are left in
    /// place) and returns the freed coordinates.
    pub fn release_all_held_by(&mut self, player: PlayerId) -> Vec<(usize, usize)> {
        let mut released = Vec::new();
        for (r, row) in self.cells.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                if cell.holder == Some(player) {
                    cell.holder = None;
                    released.push((r, c));
                }
            }
        }
        released
    }
}
