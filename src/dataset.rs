//! Load-once dataset orchestration.
//!
//! [`Dataset::open`] reads every mandatory array out of a [`DataContainer`],
//! validates that the matrix, annotations, and embedding agree on the shared
//! cell index space, and then serves the query surface. All loaded state is
//! immutable afterward; queries allocate fresh results and are safe to issue
//! concurrently through a shared reference.

use log::info;
use serde::Serialize;

use crate::annotations::{AnnotationCatalog, CatalogConfig, MarkerTable};
use crate::container::DataContainer;
use crate::diffexp::{DeMethod, DifferentialExpressionRanker, RankedGene};
use crate::embedding::{read_embedding, Embedding};
use crate::error::Result;
use crate::expression::{ExpressionIndexer, ExpressionQueryResult, FetchConfig};
use crate::genes::GeneCatalog;
use crate::matrix::SparseMatrixStore;

/// An open, immutable single-cell dataset.
#[derive(Debug)]
pub struct Dataset<C: DataContainer> {
    container: C,
    cell_ids: Vec<String>,
    matrix: SparseMatrixStore,
    genes: GeneCatalog,
    annotations: AnnotationCatalog,
    embedding: Embedding,
    fetch_config: FetchConfig,
}

/// Summary of one annotation field for [`DatasetSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    /// Field name.
    pub name: String,
    /// Number of category labels.
    pub n_categories: usize,
    /// Whether the field fits the color-key cardinality ceiling.
    pub color_encodable: bool,
}

/// Serializable overview of an open dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    /// Number of cells.
    pub n_cells: usize,
    /// Number of genes.
    pub n_genes: usize,
    /// Stored non-zero matrix entries.
    pub nnz: usize,
    /// Genes above the differential-expression coverage threshold.
    pub n_informative_genes: usize,
    /// Discovered categorical annotation fields.
    pub annotation_fields: Vec<FieldSummary>,
    /// Name of the initially active annotation field, if any.
    pub default_field: Option<String>,
}

impl<C: DataContainer> Dataset<C> {
    /// Open a dataset with the cardinality ceiling derived from its size.
    pub fn open(container: C) -> Result<Self> {
        let cell_ids = container.read_strings("obs/_index")?;
        let config = CatalogConfig::for_dataset(cell_ids.len());
        Self::from_parts(container, cell_ids, config)
    }

    /// Open a dataset with an explicit discovery configuration.
    pub fn open_with_config(container: C, config: CatalogConfig) -> Result<Self> {
        let cell_ids = container.read_strings("obs/_index")?;
        Self::from_parts(container, cell_ids, config)
    }

    fn from_parts(container: C, cell_ids: Vec<String>, config: CatalogConfig) -> Result<Self> {
        let n_cells = cell_ids.len();

        let matrix = SparseMatrixStore::from_container(&container, n_cells)?;
        let genes = GeneCatalog::from_container(&container, &matrix)?;
        let annotations = AnnotationCatalog::discover(&container, n_cells, &config)?;
        let embedding = read_embedding(&container, n_cells)?;

        info!(
            "opened dataset: {} cells, {} genes, {} non-zeros, {} annotation fields",
            n_cells,
            matrix.n_genes(),
            matrix.nnz(),
            annotations.fields().len()
        );

        Ok(Self {
            container,
            cell_ids,
            matrix,
            genes,
            annotations,
            embedding,
            fetch_config: FetchConfig::default(),
        })
    }

    /// Replace the expression-fetch configuration.
    pub fn with_fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = config;
        self
    }

    /// Number of cells.
    pub fn n_cells(&self) -> usize {
        self.cell_ids.len()
    }

    /// Number of genes.
    pub fn n_genes(&self) -> usize {
        self.matrix.n_genes()
    }

    /// Cell identifiers, indexed by cell.
    pub fn cell_ids(&self) -> &[String] {
        &self.cell_ids
    }

    /// The sparse expression matrix.
    pub fn matrix(&self) -> &SparseMatrixStore {
        &self.matrix
    }

    /// The gene catalog.
    pub fn genes(&self) -> &GeneCatalog {
        &self.genes
    }

    /// The annotation catalog.
    pub fn annotations(&self) -> &AnnotationCatalog {
        &self.annotations
    }

    /// The 3D embedding.
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// Materialize one gene's dense expression column.
    pub fn dense_column(&self, gene: usize) -> Result<Vec<f32>> {
        self.matrix.dense_column(gene)
    }

    /// Fetch display-normalized expression; an empty request draws a random
    /// gene sample. See [`ExpressionIndexer::fetch`].
    pub fn fetch(&self, gene_indices: &[usize]) -> Result<ExpressionQueryResult> {
        ExpressionIndexer::new(&self.matrix, &self.genes)
            .with_config(self.fetch_config.clone())
            .fetch(gene_indices)
    }

    /// Rank genes separating `selected` from `background`. See
    /// [`DifferentialExpressionRanker::top_genes`].
    pub fn top_genes(
        &self,
        selected: &[usize],
        background: &[usize],
        method: DeMethod,
        top_k: usize,
    ) -> Result<Vec<usize>> {
        DifferentialExpressionRanker::new(&self.matrix, &self.genes)
            .top_genes(selected, background, method, top_k)
    }

    /// Like [`top_genes`](Self::top_genes), with p-values.
    pub fn ranked_genes(
        &self,
        selected: &[usize],
        background: &[usize],
        method: DeMethod,
        top_k: usize,
    ) -> Result<Vec<RankedGene>> {
        DifferentialExpressionRanker::new(&self.matrix, &self.genes)
            .ranked_genes(selected, background, method, top_k)
    }

    /// Category labels of one annotation field.
    pub fn categories_for(&self, field_index: usize) -> Result<&[String]> {
        self.annotations.categories_for(field_index)
    }

    /// Precomputed marker table of one field (all categories, or one).
    pub fn marker_table(
        &self,
        field_index: usize,
        category: Option<usize>,
    ) -> Result<MarkerTable> {
        self.annotations
            .marker_table(&self.container, field_index, category)
    }

    /// Index of the initially active annotation field.
    pub fn default_field(&self) -> Option<usize> {
        self.annotations.default_field()
    }

    /// Build a serializable overview of the dataset.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            n_cells: self.n_cells(),
            n_genes: self.n_genes(),
            nnz: self.matrix.nnz(),
            n_informative_genes: self.genes.informative_genes().len(),
            annotation_fields: self
                .annotations
                .fields()
                .iter()
                .map(|f| FieldSummary {
                    name: f.name.clone(),
                    n_categories: f.categories.len(),
                    color_encodable: f.color_encodable,
                })
                .collect(),
            default_field: self
                .annotations
                .default_field()
                .map(|i| self.annotations.fields()[i].name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::CategoryCodes;
    use crate::container::MemoryContainer;
    use crate::embedding::EMBEDDING_PATH;
    use crate::error::Error;

    fn container() -> MemoryContainer {
        MemoryContainer::new()
            .with_strings("obs/_index", vec!["c0", "c1", "c2", "c3", "c4"])
            .with_f32("X/data", vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .with_i32("X/indices", vec![0, 1, 2, 3, 4])
            .with_i32("X/indptr", vec![0, 0, 5])
            .with_strings("var/gene_ids", vec!["ENSG01", "ENSG02"])
            .with_strings("var/gene_names", vec!["Zero", "Linear"])
            .with_strings("obs/cluster/categories", vec!["a", "b", "c"])
            .with_codes("obs/cluster/codes", CategoryCodes::I8(vec![0, 1, 2, 1, 0]))
            .with_f32(EMBEDDING_PATH, (0..15).map(|i| i as f32).collect())
    }

    #[test]
    fn open_wires_all_components() {
        let ds = Dataset::open(container()).unwrap();
        assert_eq!(ds.n_cells(), 5);
        assert_eq!(ds.n_genes(), 2);
        assert_eq!(ds.embedding().len(), 5);
        assert_eq!(ds.annotations().fields().len(), 1);
        assert_eq!(ds.default_field(), Some(0));
    }

    #[test]
    fn missing_mandatory_array_is_fatal() {
        let c = MemoryContainer::new().with_strings("obs/_index", vec!["c0"]);
        assert!(matches!(Dataset::open(c), Err(Error::SchemaMismatch(_))));
    }

    #[test]
    fn misaligned_embedding_is_fatal() {
        let c = container().with_f32(EMBEDDING_PATH, vec![0.0; 12]);
        assert!(matches!(Dataset::open(c), Err(Error::SchemaMismatch(_))));
    }

    #[test]
    fn cell_index_read_once_on_open() {
        use crate::annotations::CategoryCodes as Codes;
        use crate::container::DataContainer;
        use std::cell::Cell;
        use std::rc::Rc;

        struct CountingContainer {
            inner: MemoryContainer,
            index_reads: Rc<Cell<usize>>,
        }

        impl DataContainer for CountingContainer {
            fn read_f32(&self, path: &str) -> crate::error::Result<Vec<f32>> {
                self.inner.read_f32(path)
            }
            fn read_i32(&self, path: &str) -> crate::error::Result<Vec<i32>> {
                self.inner.read_i32(path)
            }
            fn read_codes(&self, path: &str) -> crate::error::Result<Codes> {
                self.inner.read_codes(path)
            }
            fn read_strings(&self, path: &str) -> crate::error::Result<Vec<String>> {
                if path == "obs/_index" {
                    self.index_reads.set(self.index_reads.get() + 1);
                }
                self.inner.read_strings(path)
            }
            fn list(&self, group: &str) -> crate::error::Result<Vec<String>> {
                self.inner.list(group)
            }
            fn exists(&self, path: &str) -> bool {
                self.inner.exists(path)
            }
        }

        let index_reads = Rc::new(Cell::new(0));
        let counting = CountingContainer {
            inner: container(),
            index_reads: Rc::clone(&index_reads),
        };
        let ds = Dataset::open(counting).unwrap();
        assert_eq!(ds.n_cells(), 5);
        assert_eq!(index_reads.get(), 1);
    }

    #[test]
    fn summary_round_trips_to_json() {
        let ds = Dataset::open(container()).unwrap();
        let summary = ds.summary();
        assert_eq!(summary.n_cells, 5);
        assert_eq!(summary.nnz, 5);
        assert_eq!(summary.default_field.as_deref(), Some("cluster"));
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"n_genes\":2"));
    }
}
