//! Sliding Block Puzzle Analyzer
//!
//! Solves single boards and runs the exhaustive analysis of every legal
//! layout for a board configuration. Results go to stdout, logs to stderr.

use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use rush::board::{cell_bit, cell_index};
use rush::{
    report, universe, BlockedCells, Board, ClusterAnalyzer, Config, Enumerator, UniverseOptions,
};

/// Analyzes sliding block puzzles on square boards.
#[derive(Parser)]
#[command(name = "rush")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    board: BoardArgs,

    #[command(subcommand)]
    command: Command,
}

/// Board configuration shared by every command.
#[derive(Args)]
struct BoardArgs {
    /// Cells per row and column.
    #[arg(long, global = true, default_value_t = Config::DEFAULT.width)]
    width: usize,
    /// Row of the primary piece, counted from 0.
    #[arg(long, global = true, default_value_t = Config::DEFAULT.primary_row)]
    primary_row: usize,
    /// Length of the primary piece.
    #[arg(long, global = true, default_value_t = Config::DEFAULT.primary_size)]
    primary_size: usize,
    /// Shortest movable piece.
    #[arg(long, global = true, default_value_t = Config::DEFAULT.min_size)]
    min_size: usize,
    /// Longest movable piece.
    #[arg(long, global = true, default_value_t = Config::DEFAULT.max_size)]
    max_size: usize,
    /// Fewest walls in a generated layout.
    #[arg(long, global = true, default_value_t = Config::DEFAULT.min_walls)]
    min_walls: usize,
    /// Most walls in a generated layout.
    #[arg(long, global = true, default_value_t = Config::DEFAULT.max_walls)]
    max_walls: usize,
}

impl BoardArgs {
    fn config(&self) -> Result<Config> {
        let config = Config {
            width: self.width,
            primary_row: self.primary_row,
            primary_size: self.primary_size,
            min_size: self.min_size,
            max_size: self.max_size,
            min_walls: self.min_walls,
            max_walls: self.max_walls,
        };
        config.validate().context("invalid board configuration")?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Find a shortest solution for one board.
    Solve {
        /// Board cells in row-major order, e.g. `...BAA.B........`.
        board: String,
    },
    /// Analyze the cluster of one board and print its record line.
    Analyze {
        board: String,
    },
    /// Print the minimum-key member of a board's cluster.
    Canonical {
        board: String,
    },
    /// Show the cells static analysis proves blocked.
    Blocked {
        board: String,
    },
    /// Count the legal layouts.
    Count,
    /// Analyze every legal layout and print one record per reported cluster.
    Universe {
        /// Worker threads (defaults to the number of CPUs).
        #[arg(long)]
        workers: Option<usize>,
        /// Only analyze one group id.
        #[arg(long)]
        group: Option<u64>,
        /// Shortest solution worth reporting.
        #[arg(long, default_value_t = 2)]
        min_moves: usize,
        /// Only report minimal puzzles.
        #[arg(long)]
        minimal_only: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.board.config()?;

    match cli.command {
        Command::Solve { board } => run_solve(&config, &board),
        Command::Analyze { board } => run_analyze(&config, &board),
        Command::Canonical { board } => run_canonical(&config, &board),
        Command::Blocked { board } => run_blocked(&config, &board),
        Command::Count => run_count(&config),
        Command::Universe {
            workers,
            group,
            min_moves,
            minimal_only,
        } => {
            let defaults = UniverseOptions::default();
            let options = UniverseOptions {
                workers: workers.unwrap_or(defaults.workers),
                group,
                min_moves,
                minimal_only,
                ..defaults
            };
            run_universe(&config, &options)
        }
    }
}

fn parse_board(config: &Config, desc: &str) -> Result<Board> {
    Board::parse(config, desc).with_context(|| format!("invalid board {desc:?}"))
}

/// Prints the board and its optimal move list.
fn run_solve(config: &Config, desc: &str) -> Result<()> {
    let board = parse_board(config, desc)?;
    let solution = board.solve();
    print!("{}", report::format_solution(&board, &solution));
    info!("depth {}, {} states in memo", solution.depth, solution.memo_size);
    Ok(())
}

/// Prints the record line of a board's cluster, or why it has none.
fn run_analyze(config: &Config, desc: &str) -> Result<()> {
    let board = parse_board(config, desc)?;
    let cluster = ClusterAnalyzer::new().analyze(0, 0, &board);
    match report::format_record(&cluster) {
        Some(line) => {
            println!("{line}");
            println!("minimal: {}", cluster.minimal);
        }
        None if !cluster.canonical => println!("not canonical: {}", rush::canonicalize(&board)),
        None => println!("unsolvable: {} states", cluster.num_states),
    }
    Ok(())
}

fn run_canonical(config: &Config, desc: &str) -> Result<()> {
    let board = parse_board(config, desc)?;
    let canonical = rush::canonicalize(&board);
    println!("{canonical}");
    println!("{}", canonical.format_grid());
    Ok(())
}

/// Prints the board next to its blocked cells and whether it is impossible.
fn run_blocked(config: &Config, desc: &str) -> Result<()> {
    let board = parse_board(config, desc)?;
    let blocked = BlockedCells::analyze(&board).all();
    let width = board.width();
    for (row, line) in board.format_grid().lines().enumerate() {
        let cells: String = (0..width)
            .map(|col| {
                if blocked & cell_bit(cell_index(width, row, col)) != 0 {
                    'x'
                } else {
                    '.'
                }
            })
            .collect();
        println!("{line}  {cells}");
    }
    println!("impossible: {}", board.is_blocked());
    Ok(())
}

/// Prints the number of legal layouts and group ids.
fn run_count(config: &Config) -> Result<()> {
    let enumerator = Enumerator::new(config)?;
    println!("{} layouts", enumerator.count());
    println!(
        "{} size groups, {} group ids",
        enumerator.size_groups().len(),
        enumerator.num_groups()
    );
    Ok(())
}

fn run_universe(config: &Config, options: &UniverseOptions) -> Result<()> {
    let mut out = BufWriter::new(io::stdout());
    let summary = universe::run(config, options, &mut out)?;
    eprintln!("{summary}");
    Ok(())
}
