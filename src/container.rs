//! Access to the hierarchical dataset container.
//!
//! The ingestion layer never touches files directly; it reads named arrays
//! out of a [`DataContainer`]. Two implementations ship with the crate:
//!
//! - [`MemoryContainer`]: arrays held in memory, used by the test suite and
//!   by hosts that assemble a dataset themselves.
//! - `Hdf5Container` (behind the `hdf5` cargo feature): an AnnData-style
//!   `.h5ad` file on disk.
//!
//! Paths are `/`-separated, e.g. `X/data` or `obs/cell_ontology_class/codes`.
//! The expected layout is documented in the crate root.

use std::collections::BTreeMap;

use crate::annotations::CategoryCodes;
use crate::error::{Error, Result};

#[cfg(feature = "hdf5")]
mod hdf5;
#[cfg(feature = "hdf5")]
pub use self::hdf5::Hdf5Container;

/// Read access to a self-describing hierarchical array container.
///
/// Implementations report a missing or wrongly-typed array as
/// [`Error::SchemaMismatch`]; whether that is fatal depends on the caller
/// (mandatory arrays propagate, optional lookups are caught and logged).
pub trait DataContainer {
    /// Read a 1D float32 array.
    fn read_f32(&self, path: &str) -> Result<Vec<f32>>;

    /// Read a 1D int32 array.
    fn read_i32(&self, path: &str) -> Result<Vec<i32>>;

    /// Read a 1D integer array of whatever width it was stored with,
    /// preserving the scalar kind in the returned [`CategoryCodes`].
    fn read_codes(&self, path: &str) -> Result<CategoryCodes>;

    /// Read a 1D string array.
    fn read_strings(&self, path: &str) -> Result<Vec<String>>;

    /// List the immediate members of a group, in stable order.
    fn list(&self, group: &str) -> Result<Vec<String>>;

    /// Whether an array or group exists at `path`.
    fn exists(&self, path: &str) -> bool;
}

/// A single stored array in a [`MemoryContainer`].
#[derive(Debug, Clone)]
enum ArrayData {
    F32(Vec<f32>),
    I32(Vec<i32>),
    Codes(CategoryCodes),
    Strings(Vec<String>),
}

impl ArrayData {
    fn type_name(&self) -> &'static str {
        match self {
            ArrayData::F32(_) => "float32",
            ArrayData::I32(_) => "int32",
            ArrayData::Codes(_) => "codes",
            ArrayData::Strings(_) => "string",
        }
    }
}

/// An in-memory [`DataContainer`].
///
/// Built with the `with_*` methods; `BTreeMap` storage keeps [`list`] output
/// deterministic.
///
/// [`list`]: DataContainer::list
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    arrays: BTreeMap<String, ArrayData>,
}

impl MemoryContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a float32 array at `path`.
    pub fn with_f32(mut self, path: &str, values: Vec<f32>) -> Self {
        self.arrays.insert(path.to_string(), ArrayData::F32(values));
        self
    }

    /// Store an int32 array at `path`.
    pub fn with_i32(mut self, path: &str, values: Vec<i32>) -> Self {
        self.arrays.insert(path.to_string(), ArrayData::I32(values));
        self
    }

    /// Store a typed code array at `path`.
    pub fn with_codes(mut self, path: &str, codes: CategoryCodes) -> Self {
        self.arrays.insert(path.to_string(), ArrayData::Codes(codes));
        self
    }

    /// Store a string array at `path`.
    pub fn with_strings<S: Into<String>>(mut self, path: &str, values: Vec<S>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.arrays
            .insert(path.to_string(), ArrayData::Strings(values));
        self
    }

    fn get(&self, path: &str) -> Result<&ArrayData> {
        self.arrays
            .get(path)
            .ok_or_else(|| Error::SchemaMismatch(format!("missing array '{path}'")))
    }

    fn type_error(path: &str, expected: &str, found: &ArrayData) -> Error {
        Error::SchemaMismatch(format!(
            "array '{path}' has type {}, expected {expected}",
            found.type_name()
        ))
    }
}

impl DataContainer for MemoryContainer {
    fn read_f32(&self, path: &str) -> Result<Vec<f32>> {
        match self.get(path)? {
            ArrayData::F32(v) => Ok(v.clone()),
            other => Err(Self::type_error(path, "float32", other)),
        }
    }

    fn read_i32(&self, path: &str) -> Result<Vec<i32>> {
        match self.get(path)? {
            ArrayData::I32(v) => Ok(v.clone()),
            other => Err(Self::type_error(path, "int32", other)),
        }
    }

    fn read_codes(&self, path: &str) -> Result<CategoryCodes> {
        match self.get(path)? {
            ArrayData::Codes(c) => Ok(c.clone()),
            // Plain int32 arrays are acceptable code storage.
            ArrayData::I32(v) => Ok(CategoryCodes::I32(v.clone())),
            other => Err(Self::type_error(path, "integer codes", other)),
        }
    }

    fn read_strings(&self, path: &str) -> Result<Vec<String>> {
        match self.get(path)? {
            ArrayData::Strings(v) => Ok(v.clone()),
            other => Err(Self::type_error(path, "string", other)),
        }
    }

    fn list(&self, group: &str) -> Result<Vec<String>> {
        let prefix = format!("{group}/");
        let mut members: Vec<String> = Vec::new();
        for key in self.arrays.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                let member = rest.split('/').next().unwrap_or(rest);
                if members.last().map(String::as_str) != Some(member) {
                    members.push(member.to_string());
                }
            }
        }
        Ok(members)
    }

    fn exists(&self, path: &str) -> bool {
        let prefix = format!("{path}/");
        self.arrays.contains_key(path) || self.arrays.keys().any(|k| k.starts_with(&prefix))
    }
}
