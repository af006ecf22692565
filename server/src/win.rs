//! Win and tie evaluation.
//!
//! Pure function over the board's claim distribution; called synchronously
//! under the session lock immediately after every successful claim so the
//! verdict is consistent with the claim that triggered it.

use crate::board::Board;
use shared::PlayerId;

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Winner(PlayerId),
    Tie,
}

/// Evaluates the board against a roster of `roster_size` players.
///
/// A player wins outright on reaching `floor(total / roster_size) + 1`
/// claims. When every cell is claimed and nobody reached that threshold,
/// the highest claim count wins, with equal top counts declared a tie.
/// Any other state returns `None` and the game continues.
pub fn evaluate(board: &Board, roster_size: usize) -> Option<Verdict> {
    if roster_size == 0 {
        return None;
    }

    let total = board.total_cells();
    let threshold = total / roster_size + 1;
    let counts = board.claim_counts();

    if let Some((player, _)) = counts.iter().find(|(_, count)| **count >= threshold) {
        return Some(Verdict::Winner(*player));
    }

    if counts.values().sum::<usize>() == total {
        let mut ranked: Vec<(PlayerId, usize)> =
            counts.iter().map(|(id, count)| (*id, *count)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        return match ranked.as_slice() {
            [(_, top_count), (_, runner_up), ..] if top_count == runner_up => Some(Verdict::Tie),
            [(top, _), ..] => Some(Verdict::Winner(*top)),
            [] => None,
        };
    }

    None
}
