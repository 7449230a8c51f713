//! N-tuple value function for 2048 boards.
//!
//! A [`Pattern`] picks a few board cells; their exponents form an index into
//! that pattern's [`WeightTable`]. The [`Network`] sums the looked-up weights
//! of every pattern over all eight board [`Symmetry`] images.
//!
//! ```
//! use td_2048::engine::Board;
//! use td_2048::ntuple::Network;
//!
//! let mut net = Network::quadrants();
//! assert_eq!(net.evaluate(Board::EMPTY), 0.0);
//!
//! net.allocate(&[65536; 4]).unwrap();
//! net.table_mut(0).add(0, 0.5);
//! // The empty board hits index 0 of the first table once per symmetry.
//! assert_eq!(net.evaluate(Board::EMPTY), 4.0);
//! ```

mod network;
mod pattern;
mod symmetry;

pub use network::{Network, WeightTable};
pub use pattern::{Pattern, MAX_PATTERN_LEN, QUADRANTS};
pub use symmetry::Symmetry;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("pattern length {0} outside 1..={max}", max = MAX_PATTERN_LEN)]
    PatternLength(usize),
    #[error("pattern position {0} is off the board")]
    PatternPosition(usize),
    #[error("pattern repeats position {0}")]
    PatternDuplicate(usize),
    #[error("{tables} weight tables for {patterns} patterns")]
    TableCount { tables: usize, patterns: usize },
    #[error("weight table {table} holds {actual} entries, its pattern needs {expected}")]
    TableSize { table: usize, expected: usize, actual: usize },
}
