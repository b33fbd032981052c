//! Static impossibility check.
//!
//! Looking at one row in isolation, some cells are occupied in every
//! arrangement its horizontal pieces can take:
//!
//! ```text
//! AAA.BB  can become  AAABB.  AAA.BB  .AAABB
//! .xx.x.  is occupied in all three
//! ```
//!
//! Those cells are blocked for the vertical pieces crossing the row. Blocked
//! cells found on columns narrow the placements available on rows and the
//! other way round, so the analysis repeats until nothing changes. A board is
//! impossible when any cell between the primary piece and the exit ends up
//! blocked.

use crate::board::{cell_bit, cell_index, range_mask, Bitboard, Board};

/// Cells no horizontal piece can enter (`horz`) and cells no vertical piece
/// can enter (`vert`). Walls are in both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockedCells {
    pub horz: Bitboard,
    pub vert: Bitboard,
}

impl BlockedCells {
    /// Propagates blocked cells across rows and columns until a fixed point.
    pub fn analyze(board: &Board) -> Self {
        let walls = board
            .pieces()
            .iter()
            .filter(|piece| piece.is_fixed())
            .fold(0, |mask, piece| mask | piece.mask());
        let mut blocked = Self {
            horz: walls,
            vert: walls,
        };
        while blocked.step(board) {}
        blocked
    }

    #[inline]
    pub fn all(&self) -> Bitboard {
        self.horz | self.vert
    }

    /// One pass over every row, then every column. Returns whether any new
    /// cell was blocked.
    fn step(&mut self, board: &Board) -> bool {
        let width = board.width();
        let before = *self;
        let mut line = Vec::new();

        for row in 0..width {
            line.clear();
            line.extend(
                board
                    .pieces()
                    .iter()
                    .filter(|piece| piece.is_horizontal() && !piece.is_fixed())
                    .filter(|piece| piece.position() / width == row)
                    .map(|piece| (piece.position() % width, piece.size())),
            );
            if line.is_empty() {
                continue;
            }
            let obstacles = (0..width)
                .filter(|&col| self.horz & cell_bit(cell_index(width, row, col)) != 0)
                .fold(0, |mask, col| mask | cell_bit(col));
            let always = line_blocked(width, &mut line, obstacles);
            for col in (0..width).filter(|&col| always & cell_bit(col) != 0) {
                self.vert |= cell_bit(cell_index(width, row, col));
            }
        }

        for col in 0..width {
            line.clear();
            line.extend(
                board
                    .pieces()
                    .iter()
                    .filter(|piece| !piece.is_horizontal())
                    .filter(|piece| piece.position() % width == col)
                    .map(|piece| (piece.position() / width, piece.size())),
            );
            if line.is_empty() {
                continue;
            }
            let obstacles = (0..width)
                .filter(|&row| self.vert & cell_bit(cell_index(width, row, col)) != 0)
                .fold(0, |mask, row| mask | cell_bit(row));
            let always = line_blocked(width, &mut line, obstacles);
            for row in (0..width).filter(|&row| always & cell_bit(row) != 0) {
                self.horz |= cell_bit(cell_index(width, row, col));
            }
        }

        *self != before
    }
}

/// Cells of one line occupied in every arrangement of its pieces.
///
/// `pieces` holds `(offset, size)` pairs along the line and `obstacles` the
/// line cells the pieces cannot enter. Pieces keep their relative order and
/// never jump an obstacle. A line with no legal arrangement is blocked
/// everywhere.
fn line_blocked(len: usize, pieces: &mut [(usize, usize)], obstacles: Bitboard) -> Bitboard {
    pieces.sort_unstable();

    // every piece slides between the nearest obstacles on either side of it
    let ranges: Vec<(usize, usize, usize)> = pieces
        .iter()
        .map(|&(offset, size)| {
            let mut lo = 0;
            let mut hi = len - size;
            for cell in (0..len).filter(|&cell| obstacles & cell_bit(cell) != 0) {
                if cell < offset {
                    lo = lo.max(cell + 1);
                } else if cell >= offset + size {
                    hi = hi.min(cell - size);
                }
            }
            (lo, hi, size)
        })
        .collect();

    let mut always = range_mask(0, len);
    arrange(&ranges, 0, 0, 0, &mut always);
    always
}

/// Visits every non-overlapping placement of `ranges[index..]` starting at or
/// after `start`, intersecting the occupied cells of complete placements.
fn arrange(
    ranges: &[(usize, usize, usize)],
    index: usize,
    start: usize,
    occupied: Bitboard,
    always: &mut Bitboard,
) {
    let Some(&(lo, hi, size)) = ranges.get(index) else {
        *always &= occupied;
        return;
    };
    for offset in lo.max(start)..=hi {
        let cells = range_mask(offset, offset + size);
        arrange(ranges, index + 1, offset + size, occupied | cells, always);
    }
}

/// Whether static analysis proves `board` can never be solved.
pub fn is_blocked(board: &Board) -> bool {
    let Some(primary) = board.pieces().first() else {
        return true;
    };
    let lo = primary.position() + primary.size();
    let hi = board.target() + primary.size();
    BlockedCells::analyze(board).all() & range_mask(lo, hi) != 0
}

impl Board {
    /// Whether static analysis proves this board can never be solved.
    pub fn is_blocked(&self) -> bool {
        is_blocked(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs one line written as text: `x` an obstacle, letters pieces.
    fn line(desc: &str) -> String {
        let cells: Vec<char> = desc.chars().collect();
        let mut pieces = Vec::new();
        let mut obstacles = 0;
        let mut offset = 0;
        while offset < cells.len() {
            match cells[offset] {
                '.' => offset += 1,
                'x' => {
                    obstacles |= cell_bit(offset);
                    offset += 1;
                }
                label => {
                    let size = cells[offset..].iter().take_while(|&&c| c == label).count();
                    pieces.push((offset, size));
                    offset += size;
                }
            }
        }
        let always = line_blocked(cells.len(), &mut pieces, obstacles);
        (0..cells.len())
            .map(|cell| if always & cell_bit(cell) != 0 { 'x' } else { '.' })
            .collect()
    }

    #[test]
    fn test_line_blocked() {
        assert_eq!(line("..xAA."), "....x.");
        assert_eq!(line("AAA.BB"), ".xx.x.");
        assert_eq!(line("AA..BB"), "......");
        assert_eq!(line(".x.AA."), "......");
        assert_eq!(line(".xAA..BBx.."), "...........");
        assert_eq!(line(".xAAA.BBx.."), "...xx.x....");
    }

    #[test]
    fn test_truck_in_exit_row() {
        let board: Board = ["......", "......", "AA.BBB", "......", "......", "......"]
            .concat()
            .parse()
            .unwrap();
        assert!(board.is_blocked());
        assert!(!board.solve().solvable);
    }

    #[test]
    fn test_blocked_cells_propagate_across_lines() {
        // C and D always cover column 4 of row 3, which pins E over the exit
        let rows = ["....E.", "....E.", "AA..E.", "CCC.DD", "......", "......"];
        let board: Board = rows.concat().parse().unwrap();
        let blocked = BlockedCells::analyze(&board);
        assert_ne!(blocked.vert & cell_bit(cell_index(6, 3, 4)), 0);
        assert_ne!(blocked.horz & cell_bit(cell_index(6, 2, 4)), 0);
        assert!(board.is_blocked());
        assert!(!board.solve().solvable);

        // with D gone, E can drop below the exit row
        let rows = ["....E.", "....E.", "AA..E.", "CCC...", "......", "......"];
        let board: Board = rows.concat().parse().unwrap();
        assert!(!board.is_blocked());
        assert_eq!(board.solve().num_moves, 2);
    }

    #[test]
    fn test_walls_block_both_axes() {
        let config = crate::config::Config {
            width: 4,
            primary_row: 1,
            primary_size: 2,
            min_size: 2,
            max_size: 3,
            min_walls: 0,
            max_walls: 1,
        };
        let board = Board::parse(&config, "....AAx.........").unwrap();
        let blocked = BlockedCells::analyze(&board);
        assert_eq!(blocked.horz & blocked.vert, cell_bit(6));
        assert!(board.is_blocked());

        let open = Board::parse(&config, "...BAA.B........").unwrap();
        assert!(!open.is_blocked());
    }
}
