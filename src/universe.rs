//! Parallel analysis of every generated layout.
//!
//! Each worker replays the whole enumeration and analyzes only the ids
//! congruent to its index, so workers share nothing but the immutable
//! [`Enumerator`] and one mutex-guarded aggregator.

use std::fmt;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::board::Board;
use crate::cluster::{Cluster, ClusterAnalyzer};
use crate::config::Config;
use crate::enumerator::Enumerator;
use crate::error::{EnumerateError, RunError};
use crate::report;

/// Inputs a worker counts locally before merging into the shared summary.
const FLUSH_EVERY: u64 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseOptions {
    /// Worker threads.
    pub workers: usize,
    /// Restrict the run to one group id.
    pub group: Option<u64>,
    /// Shortest hardest-member solution worth reporting.
    pub min_moves: usize,
    /// Report minimal clusters only.
    pub minimal_only: bool,
    /// Inputs between progress log lines.
    pub progress_interval: u64,
}

impl Default for UniverseOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            group: None,
            min_moves: 2,
            minimal_only: false,
            progress_interval: 1_000_000,
        }
    }
}

/// Running counters of a universe run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Layouts analyzed.
    pub inputs: u64,
    pub canonical: u64,
    /// Canonical and solvable.
    pub solvable: u64,
    /// Solvable with at least `min_moves` moves.
    pub non_trivial: u64,
    /// Non-trivial and minimal.
    pub minimal: u64,
    /// Record lines written.
    pub reported: u64,
}

impl Summary {
    fn merge(&mut self, other: &Summary) {
        self.inputs += other.inputs;
        self.canonical += other.canonical;
        self.solvable += other.solvable;
        self.non_trivial += other.non_trivial;
        self.minimal += other.minimal;
        self.reported += other.reported;
    }

    /// Counts one analyzed cluster and returns whether it should be reported.
    fn count(&mut self, cluster: &Cluster, options: &UniverseOptions) -> bool {
        self.inputs += 1;
        if !cluster.canonical {
            return false;
        }
        self.canonical += 1;
        if !cluster.solvable {
            return false;
        }
        self.solvable += 1;
        if cluster.num_moves < options.min_moves {
            return false;
        }
        self.non_trivial += 1;
        if cluster.minimal {
            self.minimal += 1;
        }
        cluster.minimal || !options.minimal_only
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in, {} cn, {} sv, {} nt, {} mn, {} out",
            self.inputs,
            self.canonical,
            self.solvable,
            self.non_trivial,
            self.minimal,
            self.reported
        )
    }
}

/// Shared sink: totals plus the results stream.
struct Aggregator<'a, W> {
    summary: Summary,
    out: &'a mut W,
    /// First write failure; later records are dropped.
    error: Option<io::Error>,
    progress_interval: u64,
    started: Instant,
}

impl<W: Write> Aggregator<'_, W> {
    fn merge(&mut self, delta: &Summary) {
        let before = self.summary.inputs / self.progress_interval;
        self.summary.merge(delta);
        if self.summary.inputs / self.progress_interval > before {
            info!("{} - {:.1?}", self.summary, self.started.elapsed());
        }
    }

    fn write(&mut self, cluster: &Cluster) {
        if self.error.is_some() {
            return;
        }
        match report::write_record(&mut *self.out, cluster) {
            Ok(()) => self.summary.reported += 1,
            Err(err) => self.error = Some(err),
        }
    }
}

/// Analyzes every layout of `config` (or of one group) on a pool of workers
/// and writes one record line per reported cluster to `out`.
///
/// Record order depends on scheduling; the set of records does not.
pub fn run<W>(
    config: &Config,
    options: &UniverseOptions,
    out: &mut W,
) -> Result<Summary, RunError>
where
    W: Write + Send,
{
    let enumerator = Enumerator::new(config)?;
    if let Some(group) = options.group {
        if group >= enumerator.num_groups() {
            return Err(EnumerateError::GroupOutOfRange {
                group,
                max: enumerator.num_groups() - 1,
            }
            .into());
        }
    }

    let workers = options.workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;
    info!(
        "{}x{} board, {} group ids, {} workers",
        config.width,
        config.width,
        enumerator.num_groups(),
        workers
    );

    let aggregator = Mutex::new(Aggregator {
        summary: Summary::default(),
        out,
        error: None,
        progress_interval: options.progress_interval.max(1),
        started: Instant::now(),
    });

    pool.install(|| {
        (0..workers).into_par_iter().try_for_each(|worker| {
            run_worker(&enumerator, options, worker, workers, &aggregator)
        })
    })?;

    let Aggregator {
        summary,
        out,
        error,
        started,
        ..
    } = aggregator.into_inner().unwrap_or_else(PoisonError::into_inner);
    if let Some(err) = error {
        return Err(err.into());
    }
    out.flush()?;
    info!("done: {summary} - {:.1?}", started.elapsed());
    Ok(summary)
}

fn run_worker<W: Write>(
    enumerator: &Enumerator,
    options: &UniverseOptions,
    worker: usize,
    workers: usize,
    aggregator: &Mutex<Aggregator<'_, W>>,
) -> Result<(), EnumerateError> {
    let mut analyzer = ClusterAnalyzer::new();
    let mut delta = Summary::default();
    let (worker, workers) = (worker as u64, workers as u64);

    let flush = |delta: &mut Summary, cluster: Option<&Cluster>| {
        let mut aggregator = aggregator.lock().unwrap_or_else(PoisonError::into_inner);
        aggregator.merge(delta);
        if let Some(cluster) = cluster {
            aggregator.write(cluster);
        }
        *delta = Summary::default();
    };

    let mut visit = |id: u64, group: u64, board: &Board| {
        if id % workers != worker {
            return;
        }
        let cluster = analyzer.analyze(id, group, board);
        if delta.count(&cluster, options) {
            flush(&mut delta, Some(&cluster));
        } else if delta.inputs >= FLUSH_EVERY {
            flush(&mut delta, None);
        }
    };

    match options.group {
        Some(group) => enumerator.enumerate_group(group, &mut visit)?,
        None => enumerator.enumerate(&mut visit),
    }
    flush(&mut delta, None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn options(workers: usize) -> UniverseOptions {
        UniverseOptions {
            workers,
            group: None,
            min_moves: 2,
            minimal_only: false,
            progress_interval: 1000,
        }
    }

    /// Record lines and summary computed on one thread, without the pool.
    fn sequential(config: &Config, options: &UniverseOptions) -> (Vec<String>, Summary) {
        let enumerator = Enumerator::new(config).unwrap();
        let mut analyzer = ClusterAnalyzer::new();
        let mut summary = Summary::default();
        let mut lines = Vec::new();
        let mut visit = |id, group, board: &Board| {
            let cluster = analyzer.analyze(id, group, board);
            if summary.count(&cluster, options) {
                summary.reported += 1;
                lines.push(report::format_record(&cluster).unwrap());
            }
        };
        match options.group {
            Some(group) => enumerator.enumerate_group(group, &mut visit).unwrap(),
            None => enumerator.enumerate(&mut visit),
        }
        lines.sort();
        (lines, summary)
    }

    fn parallel(config: &Config, options: &UniverseOptions) -> (Vec<String>, Summary) {
        let mut out = Vec::new();
        let summary = run(config, options, &mut out).unwrap();
        let mut lines: Vec<String> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        (lines, summary)
    }

    #[test]
    fn test_workers_partition_the_universe() {
        let config = small_config();
        let expected = sequential(&config, &options(1));
        assert_eq!(expected.1.inputs, 9804);
        assert!(expected.1.reported > 0);
        assert!(expected.1.canonical < expected.1.inputs);

        assert_eq!(parallel(&config, &options(1)), expected);
        assert_eq!(parallel(&config, &options(3)), expected);
    }

    #[test]
    fn test_minimal_only() {
        let config = small_config();
        let options = UniverseOptions {
            minimal_only: true,
            ..options(2)
        };
        let (lines, summary) = parallel(&config, &options);
        assert_eq!(summary.reported, summary.minimal);
        assert_eq!(lines.len() as u64, summary.minimal);
        assert!(summary.minimal <= summary.non_trivial);
    }

    #[test]
    fn test_single_group() {
        let config = small_config();
        let enumerator = Enumerator::new(&config).unwrap();
        let mut group = None;
        enumerator.enumerate(|id, g, _| {
            if id == 100 {
                group = Some(g);
            }
        });
        let options = UniverseOptions {
            group,
            ..options(2)
        };
        let (lines, summary) = parallel(&config, &options);
        assert_eq!((lines, summary), sequential(&config, &options));
        assert!(summary.inputs >= 1);
    }

    #[test]
    fn test_rejects_unknown_group() {
        let options = UniverseOptions {
            group: Some(u64::MAX),
            ..options(1)
        };
        let err = run(&small_config(), &options, &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            RunError::Enumerate(EnumerateError::GroupOutOfRange { .. })
        ));
    }

    #[test]
    fn test_summary_display() {
        let summary = Summary {
            inputs: 10,
            canonical: 4,
            solvable: 3,
            non_trivial: 2,
            minimal: 1,
            reported: 2,
        };
        insta::assert_snapshot!(summary, @"10 in, 4 cn, 3 sv, 2 nt, 1 mn, 2 out");
    }
}
