//! Gene identifiers, display names, and the informative-gene set.

use log::info;

use crate::container::DataContainer;
use crate::error::{Error, Result};
use crate::matrix::SparseMatrixStore;

/// Genes must be expressed in more than this fraction of cells to enter the
/// differential-expression search space.
pub const COVERAGE_THRESHOLD: f32 = 0.2;

/// Parallel gene id/name arrays plus the coverage-filtered informative set.
#[derive(Debug, Clone)]
pub struct GeneCatalog {
    gene_ids: Vec<String>,
    gene_names: Vec<String>,
    informative_genes: Vec<usize>,
}

impl GeneCatalog {
    /// Load `var/gene_ids` and `var/gene_names` and compute the informative
    /// set from the matrix's per-column coverage.
    pub fn from_container(
        container: &dyn DataContainer,
        matrix: &SparseMatrixStore,
    ) -> Result<Self> {
        let gene_ids = container.read_strings("var/gene_ids")?;
        let gene_names = container.read_strings("var/gene_names")?;
        Self::new(gene_ids, gene_names, matrix)
    }

    /// Build a catalog from in-memory arrays, validating alignment with the
    /// matrix.
    pub fn new(
        gene_ids: Vec<String>,
        gene_names: Vec<String>,
        matrix: &SparseMatrixStore,
    ) -> Result<Self> {
        if gene_ids.len() != gene_names.len() {
            return Err(Error::SchemaMismatch(format!(
                "gene id count ({}) != gene name count ({})",
                gene_ids.len(),
                gene_names.len()
            )));
        }
        if gene_ids.len() != matrix.n_genes() {
            return Err(Error::SchemaMismatch(format!(
                "gene catalog length ({}) != matrix column count ({})",
                gene_ids.len(),
                matrix.n_genes()
            )));
        }

        let mut informative_genes = Vec::new();
        for gene in 0..matrix.n_genes() {
            if matrix.column_coverage(gene)? > COVERAGE_THRESHOLD {
                informative_genes.push(gene);
            }
        }
        info!(
            "gene catalog: {} genes, {} above {:.0}% coverage",
            gene_ids.len(),
            informative_genes.len(),
            COVERAGE_THRESHOLD * 100.0
        );

        Ok(Self {
            gene_ids,
            gene_names,
            informative_genes,
        })
    }

    /// Number of genes.
    pub fn len(&self) -> usize {
        self.gene_ids.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.gene_ids.is_empty()
    }

    /// Display name of a gene.
    pub fn name(&self, gene: usize) -> Option<&str> {
        self.gene_names.get(gene).map(String::as_str)
    }

    /// Stable identifier of a gene.
    pub fn id(&self, gene: usize) -> Option<&str> {
        self.gene_ids.get(gene).map(String::as_str)
    }

    /// Genes whose non-zero coverage exceeds [`COVERAGE_THRESHOLD`],
    /// ascending.
    pub fn informative_genes(&self) -> &[usize] {
        &self.informative_genes
    }

    /// Resolve a gene by display name, falling back to its identifier.
    /// Used by hosts resolving user-requested gene names.
    pub fn index_of(&self, query: &str) -> Option<usize> {
        self.gene_names
            .iter()
            .position(|n| n == query)
            .or_else(|| self.gene_ids.iter().position(|i| i == query))
    }
}
