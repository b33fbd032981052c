//! Sliding Block Puzzle Analyzer Library
//!
//! Enumerates every legal layout of a square sliding-block puzzle, groups the
//! layouts into clusters of mutually reachable states, and finds the hardest
//! state of each cluster together with its optimal solution.

pub mod blocked;
pub mod board;
pub mod cluster;
pub mod config;
pub mod enumerator;
pub mod error;
mod moves;
pub mod report;
pub mod solver;
pub mod universe;

pub use blocked::{is_blocked, BlockedCells};
pub use board::{Board, BoardKey, Move, Piece};
pub use cluster::{canonicalize, is_canonical, Cluster, ClusterAnalyzer};
pub use config::Config;
pub use enumerator::Enumerator;
pub use error::{ConfigError, EnumerateError, ParseError, RunError};
pub use solver::{count_moves, solve, Solution, Solver};
pub use universe::{Summary, UniverseOptions};
