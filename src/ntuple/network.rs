use crate::engine::Board;

use super::{NetworkError, Pattern, Symmetry};

/// Dense weights for one pattern, indexed by its feature index.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable(Box<[f32]>);

impl WeightTable {
    pub fn zeroed(len: usize) -> Self { WeightTable(vec![0.0; len].into_boxed_slice()) }

    pub fn from_vec(weights: Vec<f32>) -> Self { WeightTable(weights.into_boxed_slice()) }

    #[inline]
    pub fn len(&self) -> usize { self.0.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    #[inline]
    pub fn get(&self, index: usize) -> f32 { self.0[index] }

    #[inline]
    pub fn add(&mut self, index: usize, delta: f32) { self.0[index] += delta; }

    pub fn as_slice(&self) -> &[f32] { &self.0 }
}

/// Patterns paired in order with their weight tables.
///
/// A network may hold fewer tables than patterns (none at all when nothing
/// was configured); patterns without a table contribute nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    patterns: Vec<Pattern>,
    tables: Vec<WeightTable>,
}

impl Network {
    /// A network over `patterns` with no weight tables yet.
    pub fn new(patterns: Vec<Pattern>) -> Self { Self { patterns, tables: Vec::new() } }

    /// The four 2x2 quadrant patterns, untrained.
    pub fn quadrants() -> Self { Self::new(Pattern::quadrants()) }

    /// Allocate zeroed tables of the given sizes, replacing any present.
    ///
    /// Each size must match the `16^k` of the pattern it pairs with.
    pub fn allocate(&mut self, sizes: &[usize]) -> Result<(), NetworkError> {
        self.set_tables(sizes.iter().map(|&len| WeightTable::zeroed(len)).collect())
    }

    /// Install tables, e.g. freshly loaded ones.
    pub fn set_tables(&mut self, tables: Vec<WeightTable>) -> Result<(), NetworkError> {
        if tables.len() > self.patterns.len() {
            return Err(NetworkError::TableCount { tables: tables.len(), patterns: self.patterns.len() });
        }
        for (table, (pattern, weights)) in self.patterns.iter().zip(&tables).enumerate() {
            if weights.len() != pattern.table_size() {
                return Err(NetworkError::TableSize { table, expected: pattern.table_size(), actual: weights.len() });
            }
        }
        self.tables = tables;
        Ok(())
    }

    pub fn patterns(&self) -> &[Pattern] { &self.patterns }

    pub fn tables(&self) -> &[WeightTable] { &self.tables }

    pub fn table_mut(&mut self, table: usize) -> &mut WeightTable { &mut self.tables[table] }

    /// True when no weight tables are installed.
    pub fn is_empty(&self) -> bool { self.tables.is_empty() }

    /// Table sizes implied by the pattern set, in order.
    pub fn expected_sizes(&self) -> Vec<usize> { self.patterns.iter().map(Pattern::table_size).collect() }

    /// `(table, index)` of every weight `board` touches, symmetry not applied.
    pub fn features(&self, board: Board) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.patterns.iter().take(self.tables.len()).map(move |p| p.index(board)).enumerate()
    }

    /// Sum of every pattern's weight over all eight symmetric images.
    ///
    /// Pure: reads the current weights only.
    pub fn evaluate(&self, board: Board) -> f32 {
        if self.tables.is_empty() {
            return 0.0;
        }
        let images = Symmetry::images(board);
        self.patterns
            .iter()
            .zip(&self.tables)
            .map(|(pattern, table)| images.iter().map(|&image| table.get(pattern.index(image))).sum::<f32>())
            .sum()
    }
}
