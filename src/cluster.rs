//! Reachable-state analysis ("clusters").
//!
//! A cluster is the set of states reachable from a board by legal moves. Moves
//! are reversible, so every member of a cluster reaches every other member and
//! the cluster can be handled once, from its minimum-key member.

use log::debug;
use rustc_hash::FxHashMap;

use crate::board::{Board, BoardKey, Move};
use crate::solver::{count_moves, Solver};

const UNREACHED: u32 = u32::MAX;

/// Analysis of one generated board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: u64,
    pub group: u64,
    /// The input is the minimum-key member of its cluster.
    pub canonical: bool,
    /// Some member has the primary piece on its target.
    pub solvable: bool,
    /// No piece of the hardest member can be removed without shortening its
    /// optimal solution.
    pub minimal: bool,
    /// Members discovered. Exploration stops early for non-canonical inputs,
    /// so this is a lower bound for them.
    pub num_states: usize,
    /// Optimal solution length of the hardest member.
    pub num_moves: usize,
    pub num_pieces: usize,
    /// Hardest member, pieces sorted. `None` unless canonical and solvable.
    pub unsolved: Option<Board>,
    /// Members at each distance from the goal, `0..=num_moves`.
    pub histogram: Vec<usize>,
}

/// Reusable breadth-first search buffers.
///
/// One analyzer serves one worker; nothing is allocated per state once the
/// buffers have grown to the largest cluster seen.
#[derive(Debug, Default)]
pub struct ClusterAnalyzer {
    /// State key to state index.
    visited: FxHashMap<BoardKey, u32>,
    keys: Vec<BoardKey>,
    /// Piece anchors of every state, `num_pieces` bytes per state.
    positions: Vec<u8>,
    num_pieces: usize,
    distances: Vec<u32>,
    queue: Vec<u32>,
    moves: Vec<Move>,
}

impl ClusterAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explores the cluster of `board` and classifies it.
    ///
    /// Non-canonical inputs are reported as soon as a smaller member turns up,
    /// with only the part of the cluster explored so far counted.
    pub fn analyze(&mut self, id: u64, group: u64, board: &Board) -> Cluster {
        let mut cluster = Cluster {
            id,
            group,
            canonical: false,
            solvable: false,
            minimal: false,
            num_states: 0,
            num_moves: 0,
            num_pieces: board.num_pieces(),
            unsolved: None,
            histogram: Vec::new(),
        };

        let mut board = board.clone();
        cluster.canonical = self.explore(&mut board, true);
        cluster.num_states = self.keys.len();
        cluster.solvable = !self.queue.is_empty();
        if !cluster.canonical || !cluster.solvable {
            return cluster;
        }

        self.label_distances(&mut board);

        let mut hardest = 0;
        for (index, &distance) in self.distances.iter().enumerate() {
            let best = self.distances[hardest];
            if distance > best || (distance == best && self.keys[index] < self.keys[hardest]) {
                hardest = index;
            }
        }
        let num_moves = self.distances[hardest] as usize;
        let mut histogram = vec![0; num_moves + 1];
        for &distance in &self.distances {
            histogram[distance as usize] += 1;
        }

        board.set_positions(self.state_positions(hardest));
        board.sort_pieces();
        cluster.minimal = is_minimal(&board, num_moves);
        cluster.num_moves = num_moves;
        cluster.histogram = histogram;
        cluster.unsolved = Some(board);

        debug!(
            "cluster {id}: {} states, {num_moves} moves, minimal {}",
            cluster.num_states, cluster.minimal
        );
        cluster
    }

    /// Minimum-key member of the cluster of `board`, pieces sorted.
    pub fn canonicalize(&mut self, board: &Board) -> Board {
        let mut board = board.clone();
        self.explore(&mut board, false);
        let canonical = (0..self.keys.len())
            .min_by_key(|&index| self.keys[index])
            .unwrap_or(0);
        board.set_positions(self.state_positions(canonical));
        board.sort_pieces();
        board
    }

    fn reset(&mut self, num_pieces: usize) {
        self.num_pieces = num_pieces;
        self.visited.clear();
        self.keys.clear();
        self.positions.clear();
        self.distances.clear();
        self.queue.clear();
    }

    fn state_positions(&self, index: usize) -> &[u8] {
        let n = self.num_pieces;
        &self.positions[index * n..(index + 1) * n]
    }

    fn push_state(&mut self, board: &Board) {
        self.visited.insert(board.key(), self.keys.len() as u32);
        self.keys.push(board.key());
        self.positions.extend(board.positions());
    }

    /// Breadth-first search from `board` over its whole cluster. Solved
    /// members are collected into the queue as distance-0 seeds.
    ///
    /// Returns whether the start is the minimum-key member. With
    /// `stop_if_smaller` the search ends at the first smaller member found.
    fn explore(&mut self, board: &mut Board, stop_if_smaller: bool) -> bool {
        self.reset(board.num_pieces());
        let start = board.key();
        let mut canonical = true;
        let mut moves = std::mem::take(&mut self.moves);

        self.push_state(board);
        let mut next = 0;
        'search: while next < self.keys.len() {
            board.set_positions(self.state_positions(next));
            if board.is_solved() {
                self.queue.push(next as u32);
            }
            board.moves(&mut moves);
            for &mv in &moves {
                board.do_move(mv);
                let key = board.key();
                if key < start {
                    canonical = false;
                    if stop_if_smaller {
                        board.undo_move(mv);
                        break 'search;
                    }
                }
                if !self.visited.contains_key(&key) {
                    self.push_state(board);
                }
                board.undo_move(mv);
            }
            next += 1;
        }

        self.moves = moves;
        canonical
    }

    /// Multi-source breadth-first search from every solved member.
    fn label_distances(&mut self, board: &mut Board) {
        let mut moves = std::mem::take(&mut self.moves);
        self.distances.clear();
        self.distances.resize(self.keys.len(), UNREACHED);
        for &seed in &self.queue {
            self.distances[seed as usize] = 0;
        }

        let mut head = 0;
        while head < self.queue.len() {
            let index = self.queue[head] as usize;
            head += 1;
            let distance = self.distances[index] + 1;
            board.set_positions(self.state_positions(index));
            board.moves(&mut moves);
            for &mv in &moves {
                board.do_move(mv);
                if let Some(&neighbour) = self.visited.get(&board.key()) {
                    if self.distances[neighbour as usize] == UNREACHED {
                        self.distances[neighbour as usize] = distance;
                        self.queue.push(neighbour);
                    }
                }
                board.undo_move(mv);
            }
        }

        self.moves = moves;
        debug_assert!(self.distances.iter().all(|&d| d != UNREACHED));
    }
}

/// Whether every non-primary piece of `hardest` is needed for its
/// `num_moves`-move solution.
///
/// Only pieces the optimal solution never moves are tried: removing a piece
/// can only free cells, so the shortened board stays solvable.
fn is_minimal(hardest: &Board, num_moves: usize) -> bool {
    let solution = Solver::new(hardest).deepen();
    debug_assert_eq!(solution.num_moves, num_moves);

    let mut moved = vec![false; hardest.num_pieces()];
    for mv in &solution.moves {
        moved[mv.piece as usize] = true;
    }
    for index in (1..hardest.num_pieces()).filter(|&index| !moved[index]) {
        let mut reduced = hardest.clone();
        reduced.remove_piece(index);
        if count_moves(&reduced) == num_moves {
            return false;
        }
    }
    true
}

/// Minimum-key member of the cluster of `board`, pieces sorted.
pub fn canonicalize(board: &Board) -> Board {
    ClusterAnalyzer::new().canonicalize(board)
}

/// Whether `board` is the minimum-key member of its cluster.
pub fn is_canonical(board: &Board) -> bool {
    let mut board = board.clone();
    ClusterAnalyzer::new().explore(&mut board, true)
}
