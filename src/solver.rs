//! Iterative-deepening solver.
//!
//! Key optimizations:
//! - Depth limit raised one move at a time, so the first hit is optimal
//! - FxHashMap transposition table keyed by board occupancy, storing the
//!   largest remaining height at which a state was already explored
//! - Admissible lower bound: occupied cells between the primary piece and
//!   the far end of its target span
//! - The piece moved on the previous ply is never moved again right away
//! - One reusable move buffer per depth, no allocation in the hot loop
//!
//! Deepening alone never terminates on an unsolvable board, so
//! [`Solver::solve`] first rules those out with the static blocked-cell check
//! and a reachability search.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::blocked::is_blocked;
use crate::board::{range_mask, Board, BoardKey, Move};

/// Result of a solve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    /// False when the board has no primary piece or no solved state is
    /// reachable from it.
    pub solvable: bool,
    /// Optimal move sequence.
    pub moves: Vec<Move>,
    pub num_moves: usize,
    /// Sum of absolute step counts over all moves.
    pub num_steps: usize,
    /// Depth limit of the last iteration.
    pub depth: usize,
    /// Transposition table entries at the end of the search.
    pub memo_size: usize,
}

impl Solution {
    /// Space-separated move list, e.g. `B-2 A+1`.
    pub fn format_moves(&self) -> String {
        self.moves
            .iter()
            .map(|mv| mv.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Search state for one board.
///
/// The solver owns a private copy of the board and mutates it in place while
/// searching; the caller's board is never touched.
pub struct Solver {
    board: Board,
    memo: FxHashMap<BoardKey, usize>,
    path: Vec<Move>,
    buffers: Vec<Vec<Move>>,
}

impl Solver {
    pub fn new(board: &Board) -> Self {
        Self {
            board: board.clone(),
            memo: FxHashMap::default(),
            path: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Finds a shortest solution, or reports the board unsolvable.
    pub fn solve(&mut self) -> Solution {
        if self.board.num_pieces() == 0 {
            return Solution::default();
        }
        if self.board.is_solved() {
            return Solution {
                solvable: true,
                ..Solution::default()
            };
        }
        if is_blocked(&self.board) {
            debug!("statically blocked: {}", self.board);
            return Solution::default();
        }
        if !self.goal_reachable() {
            debug!("no solved state reachable: {}", self.board);
            return Solution::default();
        }
        self.deepen()
    }

    /// Raises the depth limit until a solution turns up.
    ///
    /// The board must be solvable; otherwise this never returns.
    pub fn deepen(&mut self) -> Solution {
        if self.board.is_solved() {
            return Solution {
                solvable: true,
                ..Solution::default()
            };
        }

        let mut max_depth = 0;
        loop {
            max_depth += 1;
            self.path.clear();
            self.path.resize(max_depth, Move::default());
            if self.buffers.len() < max_depth {
                self.buffers.resize_with(max_depth, Vec::new);
            }

            if self.search(0, max_depth, None) {
                let moves = self.path.clone();
                let num_steps = moves.iter().map(Move::abs_steps).sum();
                return Solution {
                    solvable: true,
                    num_moves: moves.len(),
                    moves,
                    num_steps,
                    depth: max_depth,
                    memo_size: self.memo.len(),
                };
            }
            debug!("depth {max_depth}: no solution, {} states in memo", self.memo.len());
        }
    }

    /// Whether any state reachable from the board is solved. Stops at the
    /// first one found and leaves the board as it was.
    fn goal_reachable(&mut self) -> bool {
        let start: Vec<u8> = self.board.positions().collect();
        let stride = start.len();
        let mut arena = start.clone();
        let mut seen = FxHashSet::default();
        seen.insert(self.board.key());
        let mut moves = Vec::new();

        let mut found = false;
        let mut head = 0;
        while head < arena.len() && !found {
            self.board.set_positions(&arena[head..head + stride]);
            head += stride;
            self.board.moves(&mut moves);
            for &mv in &moves {
                self.board.do_move(mv);
                found = self.board.is_solved();
                if !found && seen.insert(self.board.key()) {
                    arena.extend(self.board.positions());
                }
                self.board.undo_move(mv);
                if found {
                    break;
                }
            }
        }

        self.board.set_positions(&start);
        found
    }

    /// Occupied cells between the primary piece's leading edge and the end of
    /// its target span. Each one must move at least once.
    #[inline]
    fn lower_bound(&self) -> usize {
        let primary = self.board.primary();
        let lo = primary.position() + primary.size();
        let hi = self.board.target() + primary.size();
        (self.board.mask() & range_mask(lo, hi)).count_ones() as usize
    }

    fn search(&mut self, depth: usize, max_depth: usize, previous: Option<u8>) -> bool {
        let height = max_depth - depth;
        if height == 0 {
            return self.board.is_solved();
        }

        // already explored at least this deep without reaching the goal
        let key = self.board.key();
        if let Some(&explored) = self.memo.get(&key) {
            if explored >= height {
                return false;
            }
        }
        self.memo.insert(key, height);

        if self.lower_bound() >= height {
            return false;
        }

        let mut moves = std::mem::take(&mut self.buffers[depth]);
        self.board.moves(&mut moves);

        let mut solved = false;
        for &mv in &moves {
            if Some(mv.piece) == previous {
                continue;
            }
            self.board.do_move(mv);
            solved = self.search(depth + 1, max_depth, Some(mv.piece));
            self.board.undo_move(mv);
            if solved {
                self.path[depth] = mv;
                // solvable here, so the entry must not block a later visit at this height
                self.memo.insert(key, height - 1);
                break;
            }
        }

        self.buffers[depth] = moves;
        solved
    }
}

/// Finds a shortest solution for `board`.
pub fn solve(board: &Board) -> Solution {
    Solver::new(board).solve()
}

/// Length of a shortest solution.
///
/// The board must be solvable, which callers establish beforehand (the
/// cluster analyzer only asks about states it has already seen reach the
/// goal). An unsolvable board never returns.
pub fn count_moves(board: &Board) -> usize {
    Solver::new(board).deepen().num_moves
}

impl Board {
    /// Finds a shortest solution for this board.
    pub fn solve(&self) -> Solution {
        solve(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn five_by_five() -> Config {
        Config {
            width: 5,
            primary_row: 2,
            primary_size: 2,
            min_size: 2,
            max_size: 3,
            min_walls: 0,
            max_walls: 1,
        }
    }

    fn replay(board: &Board, solution: &Solution) -> Board {
        let mut board = board.clone();
        for &mv in &solution.moves {
            assert!(board.legal_moves().contains(&mv), "illegal move {mv}");
            board.do_move(mv);
        }
        board
    }

    #[test]
    fn test_already_solved() {
        let board: Board = ["......", "......", "....AA", "......", "......", "......"]
            .concat()
            .parse()
            .unwrap();
        let solution = board.solve();
        assert!(solution.solvable);
        assert_eq!(solution.num_moves, 0);
        assert!(solution.moves.is_empty());
    }

    #[test]
    fn test_single_blocker() {
        let board: Board = ["......", "......", "...AAB", ".....B", "......", "......"]
            .concat()
            .parse()
            .unwrap();
        let solution = board.solve();
        assert!(solution.solvable);
        assert_eq!(solution.num_moves, 2);
        assert_eq!(solution.num_steps, 3);
        insta::assert_snapshot!(solution.format_moves(), @"B-2 A+1");
        assert!(replay(&board, &solution).is_solved());
        assert_eq!(count_moves(&board), 2);
    }

    #[test]
    fn test_small_board() {
        let board = Board::parse(&small_config(), "...BAA.B........").unwrap();
        let solution = board.solve();
        insta::assert_snapshot!(solution.format_moves(), @"B+2 A+2");
        assert_eq!(solution.num_steps, 4);
        assert!(replay(&board, &solution).is_solved());
    }

    #[test]
    fn test_wall_makes_board_unsolvable() {
        let board = Board::parse(&small_config(), "....AAx.........").unwrap();
        let solution = board.solve();
        assert!(!solution.solvable);
        assert!(solution.moves.is_empty());
    }

    #[test]
    fn test_chain_of_blockers() {
        // D pins C from above, so C can only clear the exit once B shifts left
        let board: Board = ["....D.", "....D.", "AA..C.", "....C.", "..BBB.", "......"]
            .concat()
            .parse()
            .unwrap();
        let solution = board.solve();
        assert!(solution.solvable);
        assert_eq!(solution.num_moves, 3);
        assert_eq!(solution.depth, 3);
        assert!(replay(&board, &solution).is_solved());
    }

    #[test]
    fn test_fifteen_move_puzzle() {
        let board: Board = "BB.C...D.CEE.DAAFGH.IIFGH.JKK.LLJ...".parse().unwrap();
        let solution = board.solve();
        assert!(solution.solvable);
        assert_eq!(solution.num_moves, 15);
        assert!(replay(&board, &solution).is_solved());
    }

    #[test]
    fn test_lower_bound_counts_blockers() {
        let board: Board = "IBBxooIooLDDJAALooJoKEEMFFKooMGGHHHM".parse().unwrap();
        assert_eq!(Solver::new(&board).lower_bound(), 1);

        let board: Board = ["......", "......", "AA.BCD", "...BCD", "......", "......"]
            .concat()
            .parse()
            .unwrap();
        assert_eq!(Solver::new(&board).lower_bound(), 3);
    }

    #[test]
    fn test_no_repeat_rule_keeps_deepening() {
        // depth 4 adds no memo entries, yet the solution needs 6 moves
        let board = Board::parse(&five_by_five(), "..BCD..BCDAA.EF..GEF..GHH").unwrap();
        let solution = board.solve();
        assert!(solution.solvable);
        assert_eq!(solution.num_moves, 6);
        assert!(replay(&board, &solution).is_solved());
        assert_eq!(count_moves(&board), 6);
    }

    #[test]
    fn test_unsolvable_lock_passes_static_check() {
        let board = Board::parse(&five_by_five(), "...B....B..AAC..D.C..DEE.").unwrap();
        assert!(!board.is_blocked());
        let solution = board.solve();
        assert!(!solution.solvable);
        assert_eq!(solution.num_moves, 0);
        assert!(solution.moves.is_empty());
    }

    #[test]
    fn test_empty_board_is_unsolvable() {
        assert!(!Board::new(6).solve().solvable);
    }

    #[test]
    fn test_memo_keeps_large_heights() {
        let board = Board::parse(&small_config(), "....AA..........").unwrap();
        let mut solver = Solver::new(&board);
        solver.path.resize(300, Move::default());
        solver.buffers.resize_with(300, Vec::new);
        // a lone piece may not move twice in a row, so nothing reaches height 0
        assert!(!solver.search(0, 300, None));
        assert_eq!(solver.memo.get(&board.key()), Some(&300));
    }
}
