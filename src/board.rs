//! Bitboard board model.
//!
//! Cells are indexed row-major (`idx = row * width + col`) and packed into a
//! single `u64`, one bit per cell. A [`Board`] keeps its pieces in order (the
//! primary piece first) together with two derived masks: the union of the
//! horizontal pieces and the union of the vertical pieces. Those two masks
//! form the [`BoardKey`], which identifies a state independently of piece order.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Neg;
use std::str::FromStr;

use crate::config::Config;
use crate::error::ParseError;

/// Packed set of cells, bit `i` for cell `i`.
pub type Bitboard = u64;

/// Labels handed out to movable pieces in first-appearance order.
///
/// `x` is missing on purpose: it marks walls.
pub const LABELS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvw";

/// Cell character for a wall (a fixed, length-1 piece).
pub const WALL_LABEL: char = 'x';

/// Cell character for an empty cell.
pub const EMPTY_LABEL: char = '.';

/// Converts a row and column to a cell index.
#[inline(always)]
pub const fn cell_index(width: usize, row: usize, col: usize) -> usize {
    row * width + col
}

/// Single-bit mask for one cell.
#[inline(always)]
pub const fn cell_bit(cell: usize) -> Bitboard {
    1 << cell
}

/// Mask with bits `lo..hi` set.
#[inline]
pub const fn range_mask(lo: usize, hi: usize) -> Bitboard {
    if lo >= hi {
        return 0;
    }
    let upper = if hi >= 64 { !0 } else { (1 << hi) - 1 };
    upper & !((1 << lo) - 1)
}

/// A straight piece: `size` cells starting at `position`, `stride` apart.
///
/// `stride` is 1 for horizontal pieces and the board width for vertical ones.
/// A piece of size 1 is a wall and never moves; walls use stride 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    position: u8,
    size: u8,
    stride: u8,
    mask: Bitboard,
}

impl Piece {
    pub fn new(position: usize, size: usize, stride: usize) -> Self {
        Self {
            position: position as u8,
            size: size as u8,
            stride: stride as u8,
            mask: Self::mask_for(position, size, stride),
        }
    }

    pub fn horizontal(position: usize, size: usize) -> Self {
        Self::new(position, size, 1)
    }

    pub fn vertical(position: usize, size: usize, width: usize) -> Self {
        Self::new(position, size, width)
    }

    pub fn wall(position: usize) -> Self {
        Self::new(position, 1, 1)
    }

    fn mask_for(position: usize, size: usize, stride: usize) -> Bitboard {
        (0..size).fold(0, |mask, i| mask | cell_bit(position + i * stride))
    }

    /// Anchor cell (the cell closest to the row or column start).
    #[inline]
    pub fn position(&self) -> usize {
        self.position as usize
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride as usize
    }

    #[inline]
    pub fn mask(&self) -> Bitboard {
        self.mask
    }

    /// Walls never move.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.size == 1
    }

    #[inline]
    pub fn is_horizontal(&self) -> bool {
        self.stride == 1
    }

    /// Slides the piece `steps` strides along its axis.
    #[inline]
    fn shift(&mut self, steps: i32) {
        let offset = self.stride as i32 * steps;
        self.position = (self.position as i32 + offset) as u8;
        if offset >= 0 {
            self.mask <<= offset;
        } else {
            self.mask >>= -offset;
        }
    }

    fn place(&mut self, position: usize) {
        self.position = position as u8;
        self.mask = Self::mask_for(position, self.size(), self.stride());
    }
}

/// A slide of one piece by a signed number of strides.
///
/// Negative steps move toward the row or column start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Move {
    pub piece: u8,
    pub steps: i8,
}

impl Move {
    pub const fn new(piece: usize, steps: i32) -> Self {
        Self {
            piece: piece as u8,
            steps: steps as i8,
        }
    }

    #[inline]
    pub fn abs_steps(&self) -> usize {
        self.steps.unsigned_abs() as usize
    }

    /// Letter of the moved piece, by piece index.
    pub fn label(&self) -> char {
        LABELS
            .get(self.piece as usize)
            .map_or('?', |&label| label as char)
    }
}

impl Neg for Move {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            piece: self.piece,
            steps: -self.steps,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:+}", self.label(), self.steps)
    }
}

/// State identity: horizontal occupancy first, vertical occupancy second.
///
/// The derived ordering is the canonical ranking of states, used only for
/// deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BoardKey {
    pub horz: Bitboard,
    pub vert: Bitboard,
}

/// A puzzle state.
///
/// Moves mutate the board in place; [`Board::undo_move`] with the same move
/// restores the exact prior masks.
#[derive(Debug, Clone)]
pub struct Board {
    width: u8,
    target: u8,
    pieces: Vec<Piece>,
    horz: Bitboard,
    vert: Bitboard,
}

impl Board {
    /// Creates an empty board. The first piece added becomes the primary piece.
    pub fn new(width: usize) -> Self {
        Self {
            width: width as u8,
            target: 0,
            pieces: Vec::new(),
            horz: 0,
            vert: 0,
        }
    }

    /// Parses the flat text format: `width * width` cells, `.` or `o` empty,
    /// `x` a wall, any other character one cell of a labelled piece.
    ///
    /// The primary piece must be labelled `A` and match the configured row and
    /// size, and walls may not exceed `config.max_walls`. Pieces are ordered
    /// primary first, then by first appearance, then walls.
    pub fn parse(config: &Config, desc: &str) -> Result<Self, ParseError> {
        let width = config.width;
        let cells: Vec<char> = desc.chars().collect();
        if cells.len() != config.cells() {
            return Err(ParseError::Length {
                expected: config.cells(),
                actual: cells.len(),
            });
        }

        let mut runs: Vec<(char, Vec<usize>)> = Vec::new();
        let mut walls = Vec::new();
        for (cell, &label) in cells.iter().enumerate() {
            match label {
                EMPTY_LABEL | 'o' => {}
                WALL_LABEL => walls.push(cell),
                _ => match runs.iter_mut().find(|(existing, _)| *existing == label) {
                    Some((_, run)) => run.push(cell),
                    None => runs.push((label, vec![cell])),
                },
            }
        }

        let primary = runs
            .iter()
            .position(|(label, _)| *label == 'A')
            .ok_or(ParseError::MissingPrimary)?;
        let primary_run = runs.remove(primary);
        runs.insert(0, primary_run);
        if runs.len() > LABELS.len() {
            return Err(ParseError::TooManyPieces { max: LABELS.len() });
        }

        if walls.len() > config.max_walls {
            return Err(ParseError::TooManyWalls {
                count: walls.len(),
                max: config.max_walls,
            });
        }

        let mut board = Self::new(width);
        for (index, (label, run)) in runs.iter().enumerate() {
            let piece = piece_from_run(config, *label, run)?;
            if index == 0 {
                if !piece.is_horizontal() {
                    return Err(ParseError::PrimaryNotHorizontal);
                }
                let row = piece.position() / width;
                if row != config.primary_row || piece.size() != config.primary_size {
                    return Err(ParseError::PrimaryPlacement {
                        row,
                        size: piece.size(),
                        expected_row: config.primary_row,
                        expected_size: config.primary_size,
                    });
                }
            }
            board.add_piece(piece);
        }
        for cell in walls {
            board.add_piece(Piece::wall(cell));
        }
        Ok(board)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width as usize
    }

    #[inline]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    #[inline]
    pub fn num_pieces(&self) -> usize {
        self.pieces.len()
    }

    /// The primary piece. Panics on a board with no pieces.
    #[inline]
    pub fn primary(&self) -> &Piece {
        &self.pieces[0]
    }

    /// Cell the primary piece's anchor must reach.
    #[inline]
    pub fn target(&self) -> usize {
        self.target as usize
    }

    #[inline]
    pub fn horz_mask(&self) -> Bitboard {
        self.horz
    }

    #[inline]
    pub fn vert_mask(&self) -> Bitboard {
        self.vert
    }

    /// Every occupied cell.
    #[inline]
    pub fn mask(&self) -> Bitboard {
        self.horz | self.vert
    }

    #[inline]
    pub fn key(&self) -> BoardKey {
        BoardKey {
            horz: self.horz,
            vert: self.vert,
        }
    }

    #[inline]
    pub fn is_solved(&self) -> bool {
        self.pieces
            .first()
            .is_some_and(|primary| primary.position == self.target)
    }

    /// Adds a piece unless it overlaps an occupied cell.
    pub fn add_piece(&mut self, piece: Piece) -> bool {
        if piece.mask & self.mask() != 0 {
            return false;
        }
        if self.pieces.is_empty() {
            let width = self.width();
            let row = piece.position() / width;
            self.target = (cell_index(width, row, width) - piece.size()) as u8;
        }
        if piece.is_horizontal() {
            self.horz |= piece.mask;
        } else {
            self.vert |= piece.mask;
        }
        self.pieces.push(piece);
        true
    }

    /// Removes a non-primary piece, shifting later pieces down one index.
    pub fn remove_piece(&mut self, index: usize) -> Piece {
        debug_assert!(index > 0, "the primary piece cannot be removed");
        let piece = self.pieces.remove(index);
        if piece.is_horizontal() {
            self.horz &= !piece.mask;
        } else {
            self.vert &= !piece.mask;
        }
        piece
    }

    /// Removes every piece.
    pub fn clear(&mut self) {
        self.pieces.clear();
        self.horz = 0;
        self.vert = 0;
        self.target = 0;
    }

    /// Applies a move. No legality check is performed.
    #[inline]
    pub fn do_move(&mut self, mv: Move) {
        let piece = &mut self.pieces[mv.piece as usize];
        let before = piece.mask;
        piece.shift(mv.steps as i32);
        let changed = before ^ piece.mask;
        if piece.is_horizontal() {
            self.horz ^= changed;
        } else {
            self.vert ^= changed;
        }
    }

    /// Reverts a move previously applied with [`Board::do_move`].
    #[inline]
    pub fn undo_move(&mut self, mv: Move) {
        self.do_move(-mv);
    }

    /// Anchor cells of every piece, in piece order.
    pub fn positions(&self) -> impl Iterator<Item = u8> + '_ {
        self.pieces.iter().map(|piece| piece.position)
    }

    /// Moves every piece to the given anchors (same order as [`Board::positions`]).
    pub fn set_positions(&mut self, positions: &[u8]) {
        debug_assert_eq!(positions.len(), self.pieces.len());
        self.horz = 0;
        self.vert = 0;
        for (piece, &position) in self.pieces.iter_mut().zip(positions) {
            piece.place(position as usize);
            if piece.is_horizontal() {
                self.horz |= piece.mask;
            } else {
                self.vert |= piece.mask;
            }
        }
    }

    /// Orders pieces primary first, then movable pieces by anchor, then walls.
    ///
    /// After sorting, move labels match the letters of the text format.
    pub fn sort_pieces(&mut self) {
        if let Some(rest) = self.pieces.get_mut(1..) {
            rest.sort_by_key(|piece| (piece.is_fixed(), piece.position));
        }
    }

    /// One byte per cell, labelled as in the text format.
    fn cells(&self) -> Vec<u8> {
        let width = self.width();
        let mut grid = vec![EMPTY_LABEL as u8; width * width];

        let mut order: Vec<usize> = (1..self.pieces.len())
            .filter(|&i| !self.pieces[i].is_fixed())
            .collect();
        order.sort_by_key(|&i| self.pieces[i].position);

        let mut paint = |piece: &Piece, label: u8| {
            for i in 0..piece.size() {
                grid[piece.position() + i * piece.stride()] = label;
            }
        };
        if let Some(primary) = self.pieces.first() {
            paint(primary, LABELS[0]);
        }
        for (rank, &i) in order.iter().enumerate() {
            paint(&self.pieces[i], LABELS[rank + 1]);
        }
        for wall in self.pieces.iter().skip(1).filter(|piece| piece.is_fixed()) {
            paint(wall, WALL_LABEL as u8);
        }
        grid
    }

    /// Formats the board as `width` rows of text.
    pub fn format_grid(&self) -> String {
        let width = self.width();
        self.cells()
            .chunks(width)
            .map(|row| String::from_utf8_lossy(row).into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Validates one labelled run of cells and turns it into a piece.
fn piece_from_run(config: &Config, label: char, run: &[usize]) -> Result<Piece, ParseError> {
    let width = config.width;
    let size = run.len();
    if size < config.min_size || size > config.max_size {
        return Err(ParseError::Size {
            label,
            size,
            min: config.min_size,
            max: config.max_size,
        });
    }

    let stride = run[1] - run[0];
    if stride != 1 && stride != width {
        return Err(ParseError::Shape { label });
    }
    if run.windows(2).any(|pair| pair[1] - pair[0] != stride) {
        return Err(ParseError::Shape { label });
    }
    // horizontal runs must not wrap onto the next row
    if stride == 1 && run[0] / width != run[size - 1] / width {
        return Err(ParseError::Shape { label });
    }

    Ok(Piece::new(run[0], size, stride))
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.cells()))
    }
}

/// Parses a classic 6x6 board. Walls are not bounded here, so published
/// puzzles that carry walls still parse.
impl FromStr for Board {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const CLASSIC: Config = Config {
            max_walls: usize::MAX,
            ..Config::DEFAULT
        };
        Self::parse(&CLASSIC, s)
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Board {}

impl PartialOrd for Board {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Board {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
