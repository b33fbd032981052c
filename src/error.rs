//! Error types for board parsing, configuration, enumeration and runs.

/// Errors raised while parsing the flat board text format.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The description does not have `width * width` cells.
    #[error("expected {expected} cells, got {actual}")]
    Length { expected: usize, actual: usize },

    /// A piece's cells are not one straight contiguous run.
    #[error("piece {label} has an invalid shape")]
    Shape { label: char },

    /// A piece's length is outside the configured size range.
    #[error("piece {label} has length {size}, expected {min}..={max}")]
    Size {
        label: char,
        size: usize,
        min: usize,
        max: usize,
    },

    /// No cell is labelled `A`.
    #[error("board has no primary piece 'A'")]
    MissingPrimary,

    /// The primary piece must slide along its row.
    #[error("primary piece must be horizontal")]
    PrimaryNotHorizontal,

    /// The primary piece is not on the exit row or has the wrong length.
    #[error("primary piece is on row {row} with length {size}, expected row {expected_row} with length {expected_size}")]
    PrimaryPlacement {
        row: usize,
        size: usize,
        expected_row: usize,
        expected_size: usize,
    },

    #[error("board has {count} walls, at most {max} allowed")]
    TooManyWalls { count: usize, max: usize },

    /// More pieces than the board can label.
    #[error("board has more than {max} movable pieces")]
    TooManyPieces { max: usize },
}

/// Configuration rules violated by a [`Config`](crate::config::Config).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board width must be in 3..=8, got {0}")]
    Width(usize),

    #[error("primary row {row} is outside a {width}-wide board")]
    PrimaryRow { row: usize, width: usize },

    #[error("piece sizes {min}..={max} are invalid for a {width}-wide board")]
    SizeRange {
        min: usize,
        max: usize,
        width: usize,
    },

    #[error("primary size {size} is outside {min}..={max}")]
    PrimarySize { size: usize, min: usize, max: usize },

    #[error("wall bounds {min}..={max} are empty")]
    WallRange { min: usize, max: usize },

    /// Mixed-radix group ids would not fit in 64 bits.
    #[error("{groups} groups over {digits} digits overflow a 64-bit group id")]
    GroupOverflow { groups: usize, digits: usize },
}

/// Errors raised by [`Enumerator`](crate::enumerator::Enumerator).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumerateError {
    #[error("group {group} is out of range (max {max})")]
    GroupOutOfRange { group: u64, max: u64 },
}

/// Errors that end a [`universe::run`](crate::universe::run).
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Enumerate(#[from] EnumerateError),

    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to write results: {0}")]
    Io(#[from] std::io::Error),
}
