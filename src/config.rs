//! Board configuration shared by every component.
//!
//! A [`Config`] is built once at startup, validated, and then passed around by
//! value. Nothing mutates it afterwards.

use crate::error::ConfigError;

/// Largest supported board width; the whole grid must fit in one `u64`.
pub const MAX_WIDTH: usize = 8;

/// Smallest supported board width.
pub const MIN_WIDTH: usize = 3;

/// Static puzzle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of cells per row and per column.
    pub width: usize,
    /// Row the primary piece lives on; its exit is the end of this row.
    pub primary_row: usize,
    /// Length of the primary piece.
    pub primary_size: usize,
    /// Shortest movable piece.
    pub min_size: usize,
    /// Longest movable piece.
    pub max_size: usize,
    /// Fewest walls (length-1 fixed pieces) a generated board may carry.
    pub min_walls: usize,
    /// Most walls a generated board may carry.
    pub max_walls: usize,
}

impl Config {
    /// The classic 6x6 layout: exit on the third row, cars and trucks, no walls.
    pub const DEFAULT: Self = Self {
        width: 6,
        primary_row: 2,
        primary_size: 2,
        min_size: 2,
        max_size: 3,
        min_walls: 0,
        max_walls: 0,
    };

    /// Checks every structural rule. Group-id overflow is checked by the
    /// enumerator, which knows the group table size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&self.width) {
            return Err(ConfigError::Width(self.width));
        }
        if self.primary_row >= self.width {
            return Err(ConfigError::PrimaryRow {
                row: self.primary_row,
                width: self.width,
            });
        }
        if self.min_size < 2 || self.min_size > self.max_size || self.max_size >= self.width {
            return Err(ConfigError::SizeRange {
                min: self.min_size,
                max: self.max_size,
                width: self.width,
            });
        }
        if !(self.min_size..=self.max_size).contains(&self.primary_size) {
            return Err(ConfigError::PrimarySize {
                size: self.primary_size,
                min: self.min_size,
                max: self.max_size,
            });
        }
        if self.min_walls > self.max_walls {
            return Err(ConfigError::WallRange {
                min: self.min_walls,
                max: self.max_walls,
            });
        }
        Ok(())
    }

    /// Total number of cells.
    #[inline]
    pub const fn cells(&self) -> usize {
        self.width * self.width
    }

    /// Cell the primary piece's anchor must reach.
    #[inline]
    pub const fn target(&self) -> usize {
        self.primary_row * self.width + self.width - self.primary_size
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
