//! Compressed-sparse-column storage for the expression matrix.
//!
//! The primary matrix is stored column-per-gene: `values` holds the non-zero
//! entries, `row_indices` the cell index of each entry, and `column_pointers`
//! (length `n_genes + 1`) bounds each gene's slice of the other two arrays.
//! The store is loaded once when a dataset is opened and never mutated; the
//! expression indexer and the differential-expression ranker read through it
//! concurrently without locking.

use crate::container::DataContainer;
use crate::error::{Error, Result};

/// CSC arrays for the primary expression matrix, plus dense-column
/// materialization.
#[derive(Debug, Clone)]
pub struct SparseMatrixStore {
    values: Vec<f32>,
    row_indices: Vec<i32>,
    column_pointers: Vec<i32>,
    n_cells: usize,
}

impl SparseMatrixStore {
    /// Build a store from raw CSC arrays, validating the structural
    /// invariants: `column_pointers` starts at 0, is non-decreasing, and ends
    /// at the entry count; every row index is a valid cell index.
    pub fn new(
        values: Vec<f32>,
        row_indices: Vec<i32>,
        column_pointers: Vec<i32>,
        n_cells: usize,
    ) -> Result<Self> {
        if row_indices.len() != values.len() {
            return Err(Error::MalformedData(format!(
                "row index count ({}) != value count ({})",
                row_indices.len(),
                values.len()
            )));
        }
        if column_pointers.is_empty() || column_pointers[0] != 0 {
            return Err(Error::MalformedData(
                "column pointers must start at 0".to_string(),
            ));
        }
        if column_pointers.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::MalformedData(
                "column pointers must be non-decreasing".to_string(),
            ));
        }
        let last = column_pointers[column_pointers.len() - 1];
        if last as usize != values.len() {
            return Err(Error::MalformedData(format!(
                "final column pointer ({last}) != value count ({})",
                values.len()
            )));
        }
        if let Some(&bad) = row_indices
            .iter()
            .find(|&&r| r < 0 || r as usize >= n_cells)
        {
            return Err(Error::MalformedData(format!(
                "row index {bad} outside [0, {n_cells})"
            )));
        }

        Ok(Self {
            values,
            row_indices,
            column_pointers,
            n_cells,
        })
    }

    /// Load the CSC arrays from `X/data`, `X/indices`, and `X/indptr`.
    ///
    /// Missing arrays are fatal ([`Error::SchemaMismatch`]); the expression
    /// matrix is mandatory.
    pub fn from_container(container: &dyn DataContainer, n_cells: usize) -> Result<Self> {
        let values = container.read_f32("X/data")?;
        let row_indices = container.read_i32("X/indices")?;
        let column_pointers = container.read_i32("X/indptr")?;
        Self::new(values, row_indices, column_pointers, n_cells)
    }

    /// Number of cells (matrix rows).
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Number of genes (matrix columns).
    pub fn n_genes(&self) -> usize {
        self.column_pointers.len() - 1
    }

    /// Total number of stored non-zero entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Number of non-zero entries in one gene's column.
    pub fn column_nnz(&self, gene: usize) -> Result<usize> {
        let (start, end) = self.column_bounds(gene)?;
        Ok(end - start)
    }

    /// Fraction of cells with a non-zero entry for `gene`.
    pub fn column_coverage(&self, gene: usize) -> Result<f32> {
        let nnz = self.column_nnz(gene)?;
        if self.n_cells == 0 {
            return Ok(0.0);
        }
        Ok(nnz as f32 / self.n_cells as f32)
    }

    /// Materialize one gene's expression as a dense vector of length
    /// [`n_cells`](Self::n_cells): zero-fill, then scatter the column's
    /// stored entries to their row positions.
    pub fn dense_column(&self, gene: usize) -> Result<Vec<f32>> {
        let (start, end) = self.column_bounds(gene)?;
        let mut column = vec![0.0f32; self.n_cells];
        for i in start..end {
            column[self.row_indices[i] as usize] = self.values[i];
        }
        Ok(column)
    }

    fn column_bounds(&self, gene: usize) -> Result<(usize, usize)> {
        if gene >= self.n_genes() {
            return Err(Error::OutOfRange {
                what: "gene",
                index: gene,
                bound: self.n_genes(),
            });
        }
        Ok((
            self.column_pointers[gene] as usize,
            self.column_pointers[gene + 1] as usize,
        ))
    }
}
