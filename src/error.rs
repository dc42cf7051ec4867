//! Error taxonomy shared across the crate.

use std::path::PathBuf;

/// Errors that can occur while opening or querying a dataset.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dataset container does not exist at the given path.
    #[error("dataset not found: {0}")]
    DatasetNotFound(PathBuf),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An expected array or group is absent, or has the wrong shape or type.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A gene, cell, field, or category index outside its valid bounds.
    #[error("{what} index {index} out of range (bound {bound})")]
    OutOfRange {
        /// Which index space was violated ("gene", "cell", ...).
        what: &'static str,
        /// The offending index.
        index: usize,
        /// The exclusive upper bound of the index space.
        bound: usize,
    },

    /// Stored data violates a structural invariant (non-monotonic column
    /// pointers, a category code with no matching label, an embedding stream
    /// whose length is not a multiple of 3).
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// A degenerate argument the operation does not defend against
    /// (an empty cell group passed to a two-sample test).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Error from the HDF5 library.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
