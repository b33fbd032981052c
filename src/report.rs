//! Text output for solutions and analyzed clusters.
//!
//! Record format, one line per reported cluster, space separated:
//! - optimal move count of the hardest member (two digits)
//! - piece count, walls included (two digits)
//! - hardest member in the flat board format
//! - number of states in the cluster
//! - enumeration id
//! - group id
//! - distance histogram, comma separated, starting at distance 0

use std::io::{self, Write};

use crate::board::Board;
use crate::cluster::Cluster;
use crate::solver::Solution;

/// Formats one record line (without newline), or `None` for clusters with no
/// hardest member (non-canonical or unsolvable).
pub fn format_record(cluster: &Cluster) -> Option<String> {
    let unsolved = cluster.unsolved.as_ref()?;
    Some(format!(
        "{:02} {:02} {} {} {} {} {}",
        cluster.num_moves,
        cluster.num_pieces,
        unsolved,
        cluster.num_states,
        cluster.id,
        cluster.group,
        format_histogram(&cluster.histogram)
    ))
}

/// Writes the record line of `cluster`, if it has one.
pub fn write_record<W: Write>(out: &mut W, cluster: &Cluster) -> io::Result<()> {
    match format_record(cluster) {
        Some(line) => writeln!(out, "{line}"),
        None => Ok(()),
    }
}

pub fn format_histogram(histogram: &[usize]) -> String {
    histogram
        .iter()
        .map(|count| count.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Starting grid, move and step counts, and the move list.
pub fn format_solution(board: &Board, solution: &Solution) -> String {
    let mut output = board.format_grid();
    output.push('\n');
    if !solution.solvable {
        output.push_str("no solution\n");
        return output;
    }
    output.push_str(&format!(
        "{} moves, {} steps\n",
        solution.num_moves, solution.num_steps
    ));
    if !solution.moves.is_empty() {
        output.push_str(&solution.format_moves());
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterAnalyzer;
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

    #[test]
    fn test_record_line() {
        let board: Board = [".....B", ".....B", "AA....", "......", "......", "......"]
            .concat()
            .parse()
            .unwrap();
        let cluster = ClusterAnalyzer::new().analyze(7, 3, &board);
        insta::assert_snapshot!(
            format_record(&cluster).unwrap(),
            @"02 02 ...........BAA...B.................. 23 7 3 3,12,8"
        );

        let mut out = Vec::new();
        write_record(&mut out, &cluster).unwrap();
        assert!(out.ends_with(b"3,12,8\n"));
    }

    #[test]
    fn test_no_record_without_hardest_member() {
        let board = Board::parse(&small_config(), "....AAx.........").unwrap();
        let cluster = ClusterAnalyzer::new().analyze(0, 0, &board);
        assert_eq!(format_record(&cluster), None);

        let mut out = Vec::new();
        write_record(&mut out, &cluster).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_format_solution() {
        let board = Board::parse(&small_config(), "...BAA.B........").unwrap();
        insta::assert_snapshot!(format_solution(&board, &board.solve()), @r"
        ...B
        AA.B
        ....
        ....
        2 moves, 4 steps
        B+2 A+2
        ");

        let stuck = Board::parse(&small_config(), "....AAx.........").unwrap();
        insta::assert_snapshot!(format_solution(&stuck, &stuck.solve()), @r"
        ....
        AAx.
        ....
        ....
        no solution
        ");
    }
}
