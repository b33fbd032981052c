//! Exhaustive generator of legal starting layouts.
//!
//! Every row and column is precomputed as a list of *entries*: each
//! non-overlapping arrangement of pieces that fits in that line, tagged with
//! its size group (the sorted multiset of piece lengths) and a `require` mask.
//! The require mask holds the cells just before each movable piece. A layout
//! where one of those cells is empty has a piece that can slide toward the
//! start, so it is never the minimum-key member of its cluster and is skipped.
//!
//! Layouts are composed level by level: the primary row first, then the other
//! rows top to bottom, then the columns left to right. The group index of each
//! non-primary level is one digit of the layout's group id (most significant
//! first). Ids are handed out in group order, so [`Enumerator::enumerate_group`]
//! replays one group with the same ids the full enumeration assigns.

use std::ops::Range;

use log::debug;
use rustc_hash::FxHashMap;

use crate::board::{cell_bit, cell_index, Bitboard, Board, Piece};
use crate::config::Config;
use crate::error::{ConfigError, EnumerateError};

/// One arrangement of pieces inside a single row or column.
#[derive(Debug, Clone)]
struct Entry {
    pieces: Vec<Piece>,
    mask: Bitboard,
    require: Bitboard,
    walls: u8,
    group: usize,
}

impl Entry {
    /// `shift` moves a cell to its predecessor along the line; `exclude`
    /// drops predecessors that wrapped onto the previous line.
    fn new(pieces: Vec<Piece>, group: usize, shift: usize, exclude: Bitboard) -> Self {
        let mut mask = 0;
        let mut movable = 0;
        let mut walls = 0;
        for piece in &pieces {
            mask |= piece.mask();
            if piece.is_fixed() {
                walls += 1;
            } else {
                movable |= piece.mask();
            }
        }
        Self {
            pieces,
            mask,
            require: (movable >> shift) & !mask & !exclude,
            walls,
            group,
        }
    }
}

/// Entries for one row or column, sorted by group.
#[derive(Debug)]
struct Level {
    entries: Vec<Entry>,
    /// Entry range per group index.
    ranges: Vec<Range<usize>>,
    /// Cells of the column, or `None` for a row.
    column: Option<Bitboard>,
    /// The last row level enforces the lower wall bound.
    last_row: bool,
}

impl Level {
    fn new(
        mut entries: Vec<Entry>,
        num_groups: usize,
        column: Option<Bitboard>,
        last_row: bool,
    ) -> Self {
        entries.sort_by_key(|entry| entry.group);
        let ranges = (0..num_groups)
            .map(|group| {
                let start = entries.partition_point(|entry| entry.group < group);
                let end = entries.partition_point(|entry| entry.group <= group);
                start..end
            })
            .collect();
        Self {
            entries,
            ranges,
            column,
            last_row,
        }
    }
}

/// A partially composed layout.
#[derive(Debug, Clone, Copy)]
struct Partial {
    mask: Bitboard,
    require: Bitboard,
    walls: u8,
    /// Entry chosen at this partial's level.
    entry: u32,
    /// Index of the parent in the previous level's frontier.
    parent: u32,
}

impl Partial {
    #[inline]
    fn is_complete(&self) -> bool {
        self.mask & self.require == self.require
    }
}

/// Generator of every legal layout for one configuration.
///
/// The tables are immutable once built, so one instance can be shared by
/// every worker thread.
#[derive(Debug)]
pub struct Enumerator {
    config: Config,
    groups: Vec<Vec<u8>>,
    primary: Vec<Entry>,
    levels: Vec<Level>,
    num_groups: u64,
}

impl Enumerator {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let width = config.width;

        let groups = size_groups(config);
        let digits = 2 * width - 1;
        let num_groups = (groups.len() as u64)
            .checked_pow(digits as u32)
            .ok_or(ConfigError::GroupOverflow {
                groups: groups.len(),
                digits,
            })?;

        let index: FxHashMap<Vec<u8>, usize> = groups
            .iter()
            .enumerate()
            .map(|(group, sizes)| (sizes.clone(), group))
            .collect();

        let last_col = (0..width)
            .map(|row| cell_bit(cell_index(width, row, width - 1)))
            .fold(0, |mask, bit| mask | bit);
        let row_entry = |pieces: Vec<Piece>| {
            let group = group_of(&index, &pieces);
            Entry::new(pieces, group, 1, last_col)
        };

        let primary: Vec<Entry> = primary_arrangements(config)
            .into_iter()
            .map(row_entry)
            .collect();

        let rows: Vec<usize> = (0..width).filter(|&row| row != config.primary_row).collect();
        let mut levels = Vec::with_capacity(digits);
        for (i, &row) in rows.iter().enumerate() {
            let entries = LineBuilder::new(config, cell_index(width, row, 0), 1, true)
                .build()
                .into_iter()
                .map(row_entry)
                .collect();
            levels.push(Level::new(entries, groups.len(), None, i + 1 == rows.len()));
        }
        for col in 0..width {
            let entries = LineBuilder::new(config, col, width, false)
                .build()
                .into_iter()
                .map(|pieces| {
                    let group = group_of(&index, &pieces);
                    Entry::new(pieces, group, width, 0)
                })
                .collect();
            let column = (0..width)
                .map(|row| cell_bit(cell_index(width, row, col)))
                .fold(0, |mask, bit| mask | bit);
            levels.push(Level::new(entries, groups.len(), Some(column), false));
        }

        debug!(
            "enumerator: {} size groups, {} primary entries, {} line entries, {} group ids",
            groups.len(),
            primary.len(),
            levels.iter().map(|level| level.entries.len()).sum::<usize>(),
            num_groups
        );

        Ok(Self {
            config: *config,
            groups,
            primary,
            levels,
            num_groups,
        })
    }

    /// Size groups, each a sorted list of piece lengths (1 for walls).
    pub fn size_groups(&self) -> &[Vec<u8>] {
        &self.groups
    }

    /// Number of group ids: size groups raised to the number of digits.
    pub fn num_groups(&self) -> u64 {
        self.num_groups
    }

    /// Number of legal layouts.
    pub fn count(&self) -> u64 {
        self.roots()
            .iter()
            .map(|root| self.count_from(0, root))
            .sum()
    }

    /// Calls `visit(id, group, board)` for every legal layout.
    ///
    /// Ids run from 0 without gaps and increase with the group id.
    pub fn enumerate<F>(&self, visit: F)
    where
        F: FnMut(u64, u64, &Board),
    {
        let mut walk = Walk::new(self, visit);
        walk.frontiers[0] = self.roots();
        walk.descend(0, 0);
    }

    /// Calls `visit(id, group, board)` for the layouts of one group only,
    /// with the same ids [`Enumerator::enumerate`] assigns them.
    pub fn enumerate_group<F>(&self, group: u64, visit: F) -> Result<(), EnumerateError>
    where
        F: FnMut(u64, u64, &Board),
    {
        if group >= self.num_groups {
            return Err(EnumerateError::GroupOutOfRange {
                group,
                max: self.num_groups - 1,
            });
        }

        let digits = self.digits(group);
        let mut walk = Walk::new(self, visit);
        walk.frontiers[0] = self.roots();

        // every layout under a smaller digit comes first in the full enumeration
        let mut offset = 0;
        for (depth, (level, &digit)) in self.levels.iter().zip(&digits).enumerate() {
            let smaller = level.ranges[digit].start;
            for parent in &walk.frontiers[depth] {
                offset += (0..smaller)
                    .filter_map(|entry| self.extend(level, parent, 0, entry))
                    .map(|child| self.count_from(depth + 1, &child))
                    .sum::<u64>();
            }
            walk.expand(depth, level.ranges[digit].clone());
            if walk.frontiers[depth + 1].is_empty() {
                return Ok(());
            }
        }

        walk.next_id = offset;
        walk.emit(group);
        Ok(())
    }

    /// Mixed-radix digits of a group id, most significant first.
    fn digits(&self, mut group: u64) -> Vec<usize> {
        let radix = self.groups.len() as u64;
        let mut digits = vec![0; self.levels.len()];
        for digit in digits.iter_mut().rev() {
            *digit = (group % radix) as usize;
            group /= radix;
        }
        digits
    }

    fn roots(&self) -> Vec<Partial> {
        self.primary
            .iter()
            .enumerate()
            .map(|(index, entry)| Partial {
                mask: entry.mask,
                require: entry.require,
                walls: entry.walls,
                entry: index as u32,
                parent: 0,
            })
            .collect()
    }

    /// Adds one entry of `level` to `parent`, or `None` if they conflict.
    #[inline]
    fn extend(
        &self,
        level: &Level,
        parent: &Partial,
        parent_index: usize,
        entry_index: usize,
    ) -> Option<Partial> {
        let entry = &level.entries[entry_index];
        if entry.mask & parent.mask != 0 {
            return None;
        }
        let walls = parent.walls + entry.walls;
        match level.column {
            None => {
                let walls = walls as usize;
                if walls > self.config.max_walls
                    || (level.last_row && walls < self.config.min_walls)
                {
                    return None;
                }
            }
            Some(column) => {
                // rows are complete: only this column can still cover its required cells
                if parent.require & column & !entry.mask != 0 {
                    return None;
                }
                if entry.require & !parent.mask != 0 {
                    return None;
                }
            }
        }
        Some(Partial {
            mask: parent.mask | entry.mask,
            require: parent.require | entry.require,
            walls,
            entry: entry_index as u32,
            parent: parent_index as u32,
        })
    }

    /// Number of complete layouts below `partial`, which sits before `depth`.
    fn count_from(&self, depth: usize, partial: &Partial) -> u64 {
        let Some(level) = self.levels.get(depth) else {
            return partial.is_complete() as u64;
        };
        (0..level.entries.len())
            .filter_map(|entry| self.extend(level, partial, 0, entry))
            .map(|child| self.count_from(depth + 1, &child))
            .sum()
    }
}

/// Group-ordered walk over the levels, one frontier of partials per depth.
struct Walk<'a, F> {
    enumerator: &'a Enumerator,
    /// `frontiers[d]` holds partials covering the primary row and levels `..d`.
    frontiers: Vec<Vec<Partial>>,
    /// Chosen entry per depth, rebuilt for each emitted layout.
    chain: Vec<u32>,
    board: Board,
    next_id: u64,
    visit: F,
}

impl<'a, F> Walk<'a, F>
where
    F: FnMut(u64, u64, &Board),
{
    fn new(enumerator: &'a Enumerator, visit: F) -> Self {
        let depth = enumerator.levels.len() + 1;
        Self {
            enumerator,
            frontiers: vec![Vec::new(); depth],
            chain: vec![0; depth],
            board: Board::new(enumerator.config.width),
            next_id: 0,
            visit,
        }
    }

    /// Rebuilds `frontiers[depth + 1]` from `frontiers[depth]` and the given
    /// entries of level `depth`.
    fn expand(&mut self, depth: usize, entries: Range<usize>) {
        let enumerator = self.enumerator;
        let level = &enumerator.levels[depth];
        let (done, rest) = self.frontiers.split_at_mut(depth + 1);
        let next = &mut rest[0];
        next.clear();
        for (parent_index, parent) in done[depth].iter().enumerate() {
            for entry in entries.clone() {
                if let Some(child) = enumerator.extend(level, parent, parent_index, entry) {
                    next.push(child);
                }
            }
        }
    }

    fn descend(&mut self, depth: usize, group: u64) {
        let enumerator = self.enumerator;
        let Some(level) = enumerator.levels.get(depth) else {
            self.emit(group);
            return;
        };
        let radix = enumerator.groups.len() as u64;
        for (digit, range) in level.ranges.iter().enumerate() {
            if range.is_empty() {
                continue;
            }
            self.expand(depth, range.clone());
            if self.frontiers[depth + 1].is_empty() {
                continue;
            }
            self.descend(depth + 1, group * radix + digit as u64);
        }
    }

    /// Visits every complete layout in the last frontier.
    fn emit(&mut self, group: u64) {
        let depth = self.enumerator.levels.len();
        for leaf in 0..self.frontiers[depth].len() {
            if !self.frontiers[depth][leaf].is_complete() {
                continue;
            }
            self.build_board(leaf);
            (self.visit)(self.next_id, group, &self.board);
            self.next_id += 1;
        }
    }

    fn build_board(&mut self, leaf: usize) {
        let enumerator = self.enumerator;
        let mut index = leaf;
        for depth in (0..self.frontiers.len()).rev() {
            let partial = self.frontiers[depth][index];
            self.chain[depth] = partial.entry;
            index = partial.parent as usize;
        }

        self.board.clear();
        let primary = &enumerator.primary[self.chain[0] as usize];
        let chosen = enumerator
            .levels
            .iter()
            .zip(&self.chain[1..])
            .map(|(level, &entry)| &level.entries[entry as usize]);
        for entry in std::iter::once(primary).chain(chosen) {
            for &piece in &entry.pieces {
                let placed = self.board.add_piece(piece);
                debug_assert!(placed, "enumerated pieces overlap");
            }
        }
    }
}

/// Depth-first builder of every arrangement within one row or column.
struct LineBuilder<'a> {
    config: &'a Config,
    /// First cell of the line.
    start: usize,
    /// Cell distance between neighbours along the line.
    stride: usize,
    allow_walls: bool,
    pieces: Vec<Piece>,
    out: Vec<Vec<Piece>>,
}

impl<'a> LineBuilder<'a> {
    fn new(config: &'a Config, start: usize, stride: usize, allow_walls: bool) -> Self {
        Self {
            config,
            start,
            stride,
            allow_walls,
            pieces: Vec::new(),
            out: Vec::new(),
        }
    }

    fn build(mut self) -> Vec<Vec<Piece>> {
        self.place(0, 0, 0);
        self.out
    }

    fn place(&mut self, offset: usize, total: usize, walls: usize) {
        let width = self.config.width;
        if offset >= width {
            self.out.push(self.pieces.clone());
            return;
        }

        self.place(offset + 1, total, walls);

        let cell = self.start + offset * self.stride;
        for size in self.config.min_size..=self.config.max_size {
            if offset + size <= width && total + size < width {
                self.pieces.push(Piece::new(cell, size, self.stride));
                self.place(offset + size, total + size, walls);
                self.pieces.pop();
            }
        }

        if self.allow_walls && walls < self.config.max_walls && total + 1 < width {
            self.pieces.push(Piece::wall(cell));
            self.place(offset + 1, total + 1, walls + 1);
            self.pieces.pop();
        }
    }
}

/// Arrangements of the primary row: the primary piece anywhere along it, with
/// walls only behind it. The primary piece always comes first.
fn primary_arrangements(config: &Config) -> Vec<Vec<Piece>> {
    let width = config.width;
    let row = config.primary_row;
    let mut out = Vec::new();
    for col in 0..=width - config.primary_size {
        let primary = Piece::horizontal(cell_index(width, row, col), config.primary_size);
        for behind in 0u32..(1 << col) {
            let walls = behind.count_ones() as usize;
            if walls > config.max_walls || config.primary_size + walls >= width {
                continue;
            }
            let mut pieces = vec![primary];
            pieces.extend(
                (0..col)
                    .filter(|&c| behind & (1 << c) != 0)
                    .map(|c| Piece::wall(cell_index(width, row, c))),
            );
            out.push(pieces);
        }
    }
    out
}

/// Every sorted multiset of piece lengths whose total is below the width,
/// with at most `max_walls` walls.
fn size_groups(config: &Config) -> Vec<Vec<u8>> {
    let mut sizes = Vec::new();
    if config.max_walls > 0 {
        sizes.push(1);
    }
    sizes.extend(config.min_size..=config.max_size);

    let mut groups = Vec::new();
    collect_groups(config, &sizes, 0, &mut Vec::new(), &mut groups);
    groups
}

fn collect_groups(
    config: &Config,
    sizes: &[usize],
    start: usize,
    current: &mut Vec<u8>,
    groups: &mut Vec<Vec<u8>>,
) {
    groups.push(current.clone());
    let total: usize = current.iter().map(|&size| size as usize).sum();
    let walls = current.iter().filter(|&&size| size == 1).count();
    for (i, &size) in sizes.iter().enumerate().skip(start) {
        if total + size >= config.width || (size == 1 && walls >= config.max_walls) {
            continue;
        }
        current.push(size as u8);
        collect_groups(config, sizes, i, current, groups);
        current.pop();
    }
}

fn group_of(index: &FxHashMap<Vec<u8>, usize>, pieces: &[Piece]) -> usize {
    let mut sizes: Vec<u8> = pieces.iter().map(|piece| piece.size() as u8).collect();
    sizes.sort_unstable();
    match index.get(&sizes) {
        Some(&group) => group,
        None => panic!("no size group matches piece lengths {sizes:?}"),
    }
}
