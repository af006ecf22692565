//! Client-side board view.
//!
//! Reconstructed purely from server broadcasts; never consulted for
//! authority, only for display and for the bot's choice of target cells.

use shared::{PlayerId, ServerEvent, Verb};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellView {
    pub holder: Option<PlayerId>,
    pub claimant: Option<PlayerId>,
}

/// Local mirror of the server's board.
#[derive(Debug, Clone)]
pub struct BoardView {
    size: usize,
    cells: Vec<Vec<CellView>>,
    finished: bool,
}

impl BoardView {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![vec![CellView::default(); size]; size],
            finished: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn cell(&self, row: usize, col: usize) -> CellView {
        self.cells[row][col]
    }

    /// Cells the view believes are free, as (row, col) pairs.
    pub fn free_cells(&self) -> Vec<(usize, usize)> {
        let mut free = Vec::new();
        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.holder.is_none() && cell.claimant.is_none() {
                    free.push((r, c));
                }
            }
        }
        free
    }

    /// Folds one broadcast into the view. Admission replies are ignored;
    /// updates outside the configured size are dropped (the server decides
    /// the board shape, a mismatch just means a stale `--board-size`).
    pub fn apply(&mut self, event: &ServerEvent) {
        match *event {
            ServerEvent::Update {
                verb,
                row,
                col,
                player_id,
            } => {
                if row >= self.size || col >= self.size {
                    return;
                }
                let cell = &mut self.cells[row][col];
                match verb {
                    Verb::Hold => cell.holder = Some(player_id),
                    Verb::Claim => {
                        cell.claimant = Some(player_id);
                        cell.holder = None;
                    }
                    Verb::Release => cell.holder = None,
                }
            }
            ServerEvent::Win { .. } => self.finished = true,
            ServerEvent::Accept { .. } | ServerEvent::Reject => {}
        }
    }

    /// One-character-per-cell sketch of the board: `.` free, `h` held,
    /// claimed cells show the claimant's id.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in &self.cells {
            for cell in row {
                let glyph = match (cell.claimant, cell.holder) {
                    (Some(id), _) => char::from_digit(id % 10, 10).unwrap_or('#'),
                    (None, Some(_)) => 'h',
                    (None, None) => '.',
                };
                out.push(glyph);
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(verb: Verb, row: usize, col: usize, player_id: PlayerId) -> ServerEvent {
        ServerEvent::Update {
            verb,
            row,
            col,
            player_id,
        }
    }

    #[test]
    fn test_view_tracks_hold_claim_release() {
        let mut view = BoardView::new(4);

        view.apply(&update(Verb::Hold, 1, 2, 0));
        assert_eq!(view.cell(1, 2).holder, Some(0));

        view.apply(&update(Verb::Claim, 1, 2, 0));
        assert_eq!(view.cell(1, 2).claimant, Some(0));
        assert_eq!(view.cell(1, 2).holder, None);

        view.apply(&update(Verb::Hold, 0, 0, 1));
        view.apply(&update(Verb::Release, 0, 0, 1));
        assert_eq!(view.cell(0, 0), CellView::default());
    }

    #[test]
    fn test_free_cells_shrink_with_updates() {
        let mut view = BoardView::new(2);
        assert_eq!(view.free_cells().len(), 4);

        view.apply(&update(Verb::Hold, 0, 0, 0));
        view.apply(&update(Verb::Hold, 1, 1, 1));
        view.apply(&update(Verb::Claim, 1, 1, 1));
        assert_eq!(view.free_cells(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_win_marks_finished() {
        let mut view = BoardView::new(2);
        assert!(!view.finished());
        view.apply(&ServerEvent::Win { winner: Some(1) });
        assert!(view.finished());
    }

    #[test]
    fn test_out_of_size_update_ignored() {
        let mut view = BoardView::new(2);
        view.apply(&update(Verb::Hold, 5, 5, 0));
        assert_eq!(view.free_cells().len(), 4);
    }

    #[test]
    fn test_render_glyphs() {
        let mut view = BoardView::new(2);
        view.apply(&update(Verb::Hold, 0, 0, 0));
        view.apply(&update(Verb::Hold, 0, 1, 1));
        view.apply(&update(Verb::Claim, 0, 1, 1));
        assert_eq!(view.render(), "h 1 \n. . \n");
    }
}
