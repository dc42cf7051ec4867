//! Categorical annotation discovery and precomputed marker tables.
//!
//! Annotation fields live under `obs/<name>` with a `categories` label array
//! and a per-cell `codes` array. Discovery is tolerant by design: an `obs`
//! member without a readable `categories` array is not categorical, gets
//! logged, and is skipped. Precomputed per-category marker-gene tables (top
//! [`MARKERS_PER_CATEGORY`] genes each, stored flat under
//! `uns/markers/<name>`) are optional in the same way.

use log::info;
use serde::Serialize;

use crate::container::DataContainer;
use crate::error::{Error, Result};

/// Number of marker genes stored per category in a precomputed table.
pub const MARKERS_PER_CATEGORY: usize = 10;

/// The field name preferred as the initially active annotation.
pub const DEFAULT_FIELD_NAME: &str = "cell_ontology_class";

/// Per-cell category codes, tagged with the scalar width they were stored
/// with. The kind is decided once at discovery time; every access goes
/// through the same uniformly-typed array.
#[derive(Debug, Clone)]
pub enum CategoryCodes {
    /// 8-bit codes.
    I8(Vec<i8>),
    /// 16-bit codes.
    I16(Vec<i16>),
    /// 32-bit codes.
    I32(Vec<i32>),
}

impl CategoryCodes {
    /// Number of cells covered.
    pub fn len(&self) -> usize {
        match self {
            CategoryCodes::I8(v) => v.len(),
            CategoryCodes::I16(v) => v.len(),
            CategoryCodes::I32(v) => v.len(),
        }
    }

    /// Whether the code array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Category code of one cell. Codes are validated against the label set
    /// at load time, so the result always indexes into the field's
    /// categories.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is out of bounds.
    pub fn code(&self, cell: usize) -> usize {
        match self {
            CategoryCodes::I8(v) => v[cell] as usize,
            CategoryCodes::I16(v) => v[cell] as usize,
            CategoryCodes::I32(v) => v[cell] as usize,
        }
    }

    /// Check that every code references an existing label.
    pub fn validate(&self, n_categories: usize) -> Result<()> {
        let bad = match self {
            CategoryCodes::I8(v) => v
                .iter()
                .find(|&&c| c < 0 || c as usize >= n_categories)
                .map(|&c| c as i64),
            CategoryCodes::I16(v) => v
                .iter()
                .find(|&&c| c < 0 || c as usize >= n_categories)
                .map(|&c| c as i64),
            CategoryCodes::I32(v) => v
                .iter()
                .find(|&&c| c < 0 || c as usize >= n_categories)
                .map(|&c| c as i64),
        };
        match bad {
            Some(code) => Err(Error::MalformedData(format!(
                "category code {code} references no label (have {n_categories} categories)"
            ))),
            None => Ok(()),
        }
    }
}

/// One categorical per-cell annotation.
#[derive(Debug, Clone)]
pub struct AnnotationField {
    /// Field name, e.g. `cell_ontology_class`.
    pub name: String,
    /// Ordered category labels; the index is the category code.
    pub categories: Vec<String>,
    /// Per-cell codes into `categories`.
    pub codes: CategoryCodes,
    /// Whether the field's cardinality allows rendering it as a color key.
    /// Fields over the ceiling stay available as per-cell metadata only.
    pub color_encodable: bool,
}

impl AnnotationField {
    /// The category label of one cell.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is out of bounds.
    pub fn category_of(&self, cell: usize) -> &str {
        &self.categories[self.codes.code(cell)]
    }
}

/// Discovery configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Maximum category count for a field to stay color-encodable.
    pub max_color_categories: usize,
}

impl CatalogConfig {
    /// The ceiling used historically: 16 categories for small datasets
    /// (under 1000 cells), 17 otherwise.
    pub fn for_dataset(n_cells: usize) -> Self {
        Self {
            max_color_categories: if n_cells < 1000 { 16 } else { 17 },
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_color_categories: 17,
        }
    }
}

/// Precomputed marker genes for the categories of one field.
///
/// The three outer vectors are parallel and hold one entry per returned
/// category, each of length [`MARKERS_PER_CATEGORY`]. A dataset without a
/// precomputed table for the field yields `n_categories` with empty vectors;
/// that is the expected absent-feature case, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerTable {
    /// Total category count of the field (even when the table is absent).
    pub n_categories: usize,
    /// Marker gene names per returned category.
    pub names: Vec<Vec<String>>,
    /// P-values per returned category, parallel to `names`.
    pub p_values: Vec<Vec<f32>>,
    /// Log fold-changes per returned category, parallel to `names`.
    pub log_fold_changes: Vec<Vec<f32>>,
}

impl MarkerTable {
    fn absent(n_categories: usize) -> Self {
        Self {
            n_categories,
            names: Vec::new(),
            p_values: Vec::new(),
            log_fold_changes: Vec::new(),
        }
    }

    /// Whether no precomputed table was present.
    pub fn is_absent(&self) -> bool {
        self.names.is_empty()
    }
}

/// All categorical annotation fields of an open dataset.
#[derive(Debug, Clone)]
pub struct AnnotationCatalog {
    fields: Vec<AnnotationField>,
    default_field: Option<usize>,
}

impl AnnotationCatalog {
    /// Enumerate `obs/` members and load every categorical field.
    ///
    /// Members without a readable `categories` array are skipped with an
    /// info-level log line. A present field with misaligned codes is fatal:
    /// wrong code count is [`Error::SchemaMismatch`], a code without a label
    /// is [`Error::MalformedData`].
    pub fn discover(
        container: &dyn DataContainer,
        n_cells: usize,
        config: &CatalogConfig,
    ) -> Result<Self> {
        let mut fields = Vec::new();

        let members = if container.exists("obs") {
            container.list("obs")?
        } else {
            Vec::new()
        };

        for name in members {
            if name == "_index" {
                continue;
            }
            let categories = match container.read_strings(&format!("obs/{name}/categories")) {
                Ok(c) => c,
                Err(err) => {
                    info!("skipping non-categorical obs field '{name}': {err}");
                    continue;
                }
            };
            let codes = container.read_codes(&format!("obs/{name}/codes"))?;
            if codes.len() != n_cells {
                return Err(Error::SchemaMismatch(format!(
                    "field '{name}' has {} codes for {n_cells} cells",
                    codes.len()
                )));
            }
            codes.validate(categories.len())?;

            let color_encodable = categories.len() <= config.max_color_categories;
            if !color_encodable {
                info!(
                    "field '{name}' has {} categories (ceiling {}), keeping as metadata only",
                    categories.len(),
                    config.max_color_categories
                );
            }
            fields.push(AnnotationField {
                name,
                categories,
                codes,
                color_encodable,
            });
        }

        let default_field = fields
            .iter()
            .position(|f| f.name == DEFAULT_FIELD_NAME)
            .or(if fields.is_empty() { None } else { Some(0) });

        info!("annotation catalog: {} categorical fields", fields.len());

        Ok(Self {
            fields,
            default_field,
        })
    }

    /// The loaded fields, in discovery order.
    pub fn fields(&self) -> &[AnnotationField] {
        &self.fields
    }

    /// Field names, in discovery order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Index of the initially active field: the one named
    /// [`DEFAULT_FIELD_NAME`] when present, else the first discovered field.
    pub fn default_field(&self) -> Option<usize> {
        self.default_field
    }

    /// Category labels of one field.
    pub fn categories_for(&self, field_index: usize) -> Result<&[String]> {
        Ok(&self.field(field_index)?.categories)
    }

    fn field(&self, field_index: usize) -> Result<&AnnotationField> {
        self.fields.get(field_index).ok_or(Error::OutOfRange {
            what: "annotation field",
            index: field_index,
            bound: self.fields.len(),
        })
    }

    /// Load the precomputed marker table for one field.
    ///
    /// With `category = None`, returns every category's slice; with
    /// `Some(c)`, a single-element table for that category. A field with no
    /// table under `uns/markers/<name>` yields an absent [`MarkerTable`].
    pub fn marker_table(
        &self,
        container: &dyn DataContainer,
        field_index: usize,
        category: Option<usize>,
    ) -> Result<MarkerTable> {
        let field = self.field(field_index)?;
        let n_categories = field.categories.len();
        if let Some(c) = category {
            if c >= n_categories {
                return Err(Error::OutOfRange {
                    what: "category",
                    index: c,
                    bound: n_categories,
                });
            }
        }

        let base = format!("uns/markers/{}", field.name);
        if !container.exists(&format!("{base}/names")) {
            info!("no precomputed marker table for field '{}'", field.name);
            return Ok(MarkerTable::absent(n_categories));
        }

        let flat_names = container.read_strings(&format!("{base}/names"))?;
        let flat_pvals = container.read_f32(&format!("{base}/pvals"))?;
        let flat_lfc = container.read_f32(&format!("{base}/logfoldchanges"))?;

        let expected = n_categories * MARKERS_PER_CATEGORY;
        for (what, len) in [
            ("names", flat_names.len()),
            ("pvals", flat_pvals.len()),
            ("logfoldchanges", flat_lfc.len()),
        ] {
            if len != expected {
                return Err(Error::SchemaMismatch(format!(
                    "marker table '{base}/{what}' has {len} entries, expected {expected}"
                )));
            }
        }

        let wanted: Vec<usize> = match category {
            Some(c) => vec![c],
            None => (0..n_categories).collect(),
        };

        let mut table = MarkerTable::absent(n_categories);
        for c in wanted {
            let slice = c * MARKERS_PER_CATEGORY..(c + 1) * MARKERS_PER_CATEGORY;
            table.names.push(flat_names[slice.clone()].to_vec());
            table.p_values.push(flat_pvals[slice.clone()].to_vec());
            table.log_fold_changes.push(flat_lfc[slice].to_vec());
        }
        Ok(table)
    }
}
