//! # cellscape - Single-Cell Exploration Core
//!
//! `cellscape` is the ingestion and indexing core behind an interactive
//! (VR-capable) single-cell transcriptomics explorer. It owns everything
//! that is independent of the rendering engine: parsing the sparse
//! expression matrix out of a hierarchical scientific container, cataloging
//! categorical annotations, materializing display-ready expression vectors,
//! ranking genes that separate a selection from its background, and reading
//! the 3D embedding cells are placed by.
//!
//! ## Key Features
//!
//! - **CSC expression storage**: dense per-gene columns materialized on
//!   demand from compressed-sparse-column arrays, O(column non-zeros) per
//!   query.
//!
//! - **Tolerant annotation discovery**: categorical `obs` fields are
//!   enumerated and loaded once; non-categorical members and absent marker
//!   tables are logged and skipped, never fatal.
//!
//! - **Display normalization**: every fetched expression vector is rescaled
//!   into the fixed `[0, 10]` range the renderer maps to its color gradient,
//!   with the real-unit ceiling reported alongside.
//!
//! - **Differential expression**: rank-sum or Welch-t ranking of informative
//!   genes between two cell groups, top-K selected with a bounded heap.
//!
//! - **Pluggable containers**: an in-memory container ships by default; an
//!   HDF5/`.h5ad` backend sits behind the `hdf5` cargo feature.
//!
//! ## Quick Start
//!
//! ```rust
//! use cellscape::annotations::CategoryCodes;
//! use cellscape::container::MemoryContainer;
//! use cellscape::dataset::Dataset;
//!
//! // Assemble a tiny dataset: 5 cells, 2 genes.
//! let container = MemoryContainer::new()
//!     .with_strings("obs/_index", vec!["c0", "c1", "c2", "c3", "c4"])
//!     .with_f32("X/data", vec![1.0, 2.0, 3.0, 4.0, 5.0])
//!     .with_i32("X/indices", vec![0, 1, 2, 3, 4])
//!     .with_i32("X/indptr", vec![0, 0, 5])
//!     .with_strings("var/gene_ids", vec!["ENSG01", "ENSG02"])
//!     .with_strings("var/gene_names", vec!["Zero", "Linear"])
//!     .with_strings("obs/cluster/categories", vec!["a", "b"])
//!     .with_codes("obs/cluster/codes", CategoryCodes::I8(vec![0, 1, 1, 0, 0]))
//!     .with_f32("obsm/X_umap_3d", (0..15).map(|i| i as f32).collect());
//!
//! let dataset = Dataset::open(container)?;
//! let result = dataset.fetch(&[1])?;
//! assert_eq!(result.expression[0], vec![2.0, 4.0, 6.0, 8.0, 10.0]);
//! assert_eq!(result.display_max[0], 5);
//! # Ok::<(), cellscape::error::Error>(())
//! ```
//!
//! ## Expected Container Layout
//!
//! | Path | Type | Required | Description |
//! |------|------|----------|-------------|
//! | X/data | float32 | Yes | Non-zero values, CSC (column = gene) |
//! | X/indices | int32 | Yes | Cell index per value |
//! | X/indptr | int32 | Yes | Column pointers, length n_genes + 1 |
//! | var/gene_ids | string | Yes | Stable gene identifiers |
//! | var/gene_names | string | Yes | Display names |
//! | obs/_index | string | Yes | Cell identifiers (defines n_cells) |
//! | obs/&lt;field&gt;/categories | string | No | Category labels |
//! | obs/&lt;field&gt;/codes | int8/16/32 | No | Per-cell category codes |
//! | uns/markers/&lt;field&gt;/names | string | No | Flat marker names, 10/category |
//! | uns/markers/&lt;field&gt;/pvals | float32 | No | Flat marker p-values |
//! | uns/markers/&lt;field&gt;/logfoldchanges | float32 | No | Flat log fold-changes |
//! | obsm/X_umap_3d | float32 | Yes | Flat 3D embedding, 3 * n_cells |
//!
//! ## Architecture
//!
//! - [`container`]: access to the hierarchical array container
//! - [`matrix`]: CSC storage and dense-column materialization
//! - [`genes`]: gene catalog and the informative-gene set
//! - [`annotations`]: categorical field discovery and marker tables
//! - [`expression`]: display-normalized expression queries
//! - [`diffexp`]: two-group differential-expression ranking
//! - [`stats`]: the two-sample tests behind the ranking
//! - [`embedding`]: 3D coordinate loading
//! - [`dataset`]: the load-once orchestrator tying it all together
//!
//! ## Concurrency
//!
//! Every loaded structure is immutable after [`dataset::Dataset::open`];
//! queries borrow shared state, allocate fresh results, and may run
//! concurrently without locking. The crate exposes only synchronous calls;
//! hosts that need a responsive render loop run them on a worker.

#![warn(missing_docs)]
// Allow some patterns common in scientific code
#![allow(clippy::too_many_arguments)]

pub mod annotations;
pub mod container;
pub mod dataset;
pub mod diffexp;
pub mod embedding;
pub mod error;
pub mod expression;
pub mod genes;
pub mod matrix;
pub mod stats;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::annotations::{
        AnnotationCatalog, AnnotationField, CatalogConfig, CategoryCodes, MarkerTable,
        MARKERS_PER_CATEGORY,
    };
    pub use crate::container::{DataContainer, MemoryContainer};
    #[cfg(feature = "hdf5")]
    pub use crate::container::Hdf5Container;
    pub use crate::dataset::{Dataset, DatasetSummary, FieldSummary};
    pub use crate::diffexp::{DeMethod, DifferentialExpressionRanker, RankedGene};
    pub use crate::embedding::{Embedding, EMBEDDING_PATH};
    pub use crate::error::{Error, Result};
    pub use crate::expression::{
        ExpressionIndexer, ExpressionQueryResult, FetchConfig, DISPLAY_CEILING,
    };
    pub use crate::genes::{GeneCatalog, COVERAGE_THRESHOLD};
    pub use crate::matrix::SparseMatrixStore;
}
