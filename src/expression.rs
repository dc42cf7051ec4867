//! Display-ready expression vectors for requested gene sets.
//!
//! Each requested gene's dense column is rescaled into the fixed `[0, 10]`
//! display range the rendering layer maps onto its color gradient. The
//! pre-normalization ceiling travels alongside so the host can label an axis
//! in real units.

use log::debug;
use rand::Rng;

use crate::error::{Error, Result};
use crate::genes::GeneCatalog;
use crate::matrix::SparseMatrixStore;

/// Upper end of the display range expression values are normalized into.
pub const DISPLAY_CEILING: f32 = 10.0;

/// Query configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// How many genes to sample when a fetch names none.
    pub random_sample_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            random_sample_size: 21,
        }
    }
}

/// Result of one expression fetch. All vectors are parallel and ordered
/// exactly like the requested gene indices.
#[derive(Debug, Clone)]
pub struct ExpressionQueryResult {
    /// The genes actually fetched (the request, or the random draw).
    pub gene_indices: Vec<usize>,
    /// Display names, parallel to `gene_indices`.
    pub gene_names: Vec<String>,
    /// One dense vector per gene, length `n_cells`, values in `[0, 10]`.
    pub expression: Vec<Vec<f32>>,
    /// Pre-normalization ceiling per gene (10 for an all-zero column).
    pub display_max: Vec<i32>,
}

/// Materializes and normalizes expression vectors on demand.
///
/// Holds only borrows of the immutable store and catalog; every call
/// allocates a fresh result, so concurrent fetches are safe.
#[derive(Debug)]
pub struct ExpressionIndexer<'a> {
    matrix: &'a SparseMatrixStore,
    genes: &'a GeneCatalog,
    config: FetchConfig,
}

impl<'a> ExpressionIndexer<'a> {
    /// Create an indexer over an open dataset's store and gene catalog.
    pub fn new(matrix: &'a SparseMatrixStore, genes: &'a GeneCatalog) -> Self {
        Self {
            matrix,
            genes,
            config: FetchConfig::default(),
        }
    }

    /// Replace the query configuration.
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Fetch display-normalized expression for `gene_indices`, or for a
    /// uniform random sample (with replacement) when the request is empty.
    ///
    /// Per gene: the ceiling is `max(column).ceil()`; an all-zero column is
    /// left untouched with a display ceiling of 10, anything else is
    /// rescaled by `10 / ceiling`.
    pub fn fetch(&self, gene_indices: &[usize]) -> Result<ExpressionQueryResult> {
        let indices: Vec<usize> = if gene_indices.is_empty() {
            if self.matrix.n_genes() == 0 {
                Vec::new()
            } else {
                let mut rng = rand::thread_rng();
                (0..self.config.random_sample_size)
                    .map(|_| rng.gen_range(0..self.matrix.n_genes()))
                    .collect()
            }
        } else {
            gene_indices.to_vec()
        };
        debug!("fetching expression for {} genes", indices.len());

        let mut gene_names = Vec::with_capacity(indices.len());
        let mut expression = Vec::with_capacity(indices.len());
        let mut display_max = Vec::with_capacity(indices.len());

        for &gene in &indices {
            let mut column = self.matrix.dense_column(gene)?;
            let name = self.genes.name(gene).ok_or(Error::OutOfRange {
                what: "gene",
                index: gene,
                bound: self.genes.len(),
            })?;

            let ceiling = column.iter().fold(0.0f32, |m, &v| m.max(v)).ceil();
            if ceiling <= 0.0 {
                display_max.push(DISPLAY_CEILING as i32);
            } else {
                let scale = DISPLAY_CEILING / ceiling;
                for v in &mut column {
                    *v *= scale;
                }
                display_max.push(ceiling as i32);
            }

            gene_names.push(name.to_string());
            expression.push(column);
        }

        Ok(ExpressionQueryResult {
            gene_indices: indices,
            gene_names,
            expression,
            display_max,
        })
    }
}
