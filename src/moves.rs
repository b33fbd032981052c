//! Move generation.
//!
//! Every movable piece slides along its own axis in both directions until it
//! hits an occupied cell or the edge of the grid. Each reachable offset is a
//! separate move, so a single move may cover several cells.

use crate::board::{cell_bit, Board, Move};

impl Board {
    /// Fills `buf` with every legal move, replacing its previous contents.
    ///
    /// Moves are ordered by piece index, and within a piece toward the start
    /// first (`-1, -2, ..`) and then toward the end (`+1, +2, ..`). The buffer
    /// is reused by callers so the search loops never allocate.
    pub fn moves(&self, buf: &mut Vec<Move>) {
        buf.clear();
        let width = self.width();
        let occupied = self.mask();

        for (index, piece) in self.pieces().iter().enumerate() {
            if piece.is_fixed() {
                continue;
            }
            let stride = piece.stride();
            let position = piece.position();
            let (reverse_limit, forward_limit) = if piece.is_horizontal() {
                let col = position % width;
                (col, width - piece.size() - col)
            } else {
                let row = position / width;
                (row, width - piece.size() - row)
            };

            // toward the row or column start
            let mut cell = position;
            for steps in 1..=reverse_limit {
                cell -= stride;
                if occupied & cell_bit(cell) != 0 {
                    break;
                }
                buf.push(Move::new(index, -(steps as i32)));
            }

            // toward the row or column end
            let mut cell = position + (piece.size() - 1) * stride;
            for steps in 1..=forward_limit {
                cell += stride;
                if occupied & cell_bit(cell) != 0 {
                    break;
                }
                buf.push(Move::new(index, steps as i32));
            }
        }
    }

    /// Convenience wrapper around [`Board::moves`] that allocates.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut buf = Vec::new();
        self.moves(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use crate::board::{Board, Piece};
    use crate::config::Config;

    fn small_config() -> Config {
        Config {
            width: 4,
            primary_row: 1,
            primary_size: 2,
            min_size: 2,
            max_size: 3,
            min_walls: 0,
            max_walls: 1,
        }
    }

    fn labels(board: &Board) -> Vec<String> {
        board.legal_moves().iter().map(|mv| mv.to_string()).collect()
    }

    #[test]
    fn test_empty_board_has_no_moves() {
        assert!(Board::new(6).legal_moves().is_empty());
    }

    #[test]
    fn test_multi_cell_slides() {
        let board = Board::parse(&small_config(), "...BAA.B........").unwrap();
        insta::assert_snapshot!(labels(&board).join(" "), @"A+1 B+1 B+2");
    }

    #[test]
    fn test_slides_stop_at_neighbours_and_walls() {
        let board = Board::parse(&small_config(), "x...AA.B...B....").unwrap();
        // A already sits at the start of its row and runs into B going right.
        insta::assert_snapshot!(labels(&board).join(" "), @"A+1 B-1 B+1");
    }

    #[test]
    fn test_walls_never_move() {
        let mut board = Board::new(4);
        board.add_piece(Piece::horizontal(4, 2));
        board.add_piece(Piece::wall(0));
        board.add_piece(Piece::wall(15));
        let moves = board.legal_moves();
        assert!(moves.iter().all(|mv| mv.piece == 0));
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn test_every_move_is_reversible() {
        let mut board: Board = "IBBxooIooLDDJAALooJoKEEMFFKooMGGHHHM".parse().unwrap();
        let key = board.key();
        for mv in board.legal_moves() {
            board.do_move(mv);
            assert!(board.legal_moves().contains(&-mv), "{mv} has no inverse");
            board.undo_move(mv);
            assert_eq!(board.key(), key);
        }
    }
}
