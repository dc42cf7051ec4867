//! 3D embedding coordinates for spatial placement of cells.

use crate::container::DataContainer;
use crate::error::{Error, Result};

/// Container path of the mandatory 3D embedding.
pub const EMBEDDING_PATH: &str = "obsm/X_umap_3d";

/// One precomputed 3D coordinate per cell, in the shared cell index space.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    coordinates: Vec<[f32; 3]>,
}

impl Embedding {
    /// Group a flat coordinate stream into `(x, y, z)` triples, in stream
    /// order. The stream length must be a multiple of 3;
    /// [`Error::MalformedData`] otherwise.
    pub fn from_flat(stream: &[f32]) -> Result<Self> {
        if stream.len() % 3 != 0 {
            return Err(Error::MalformedData(format!(
                "embedding stream length {} is not a multiple of 3",
                stream.len()
            )));
        }
        let coordinates = stream
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self { coordinates })
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Whether the embedding is empty.
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Coordinate of one cell.
    pub fn get(&self, cell: usize) -> Option<[f32; 3]> {
        self.coordinates.get(cell).copied()
    }

    /// All coordinates, indexed by cell.
    pub fn coordinates(&self) -> &[[f32; 3]] {
        &self.coordinates
    }
}

/// Read the embedding at [`EMBEDDING_PATH`] and check it covers every cell.
pub fn read_embedding(container: &dyn DataContainer, n_cells: usize) -> Result<Embedding> {
    let stream = container.read_f32(EMBEDDING_PATH)?;
    let embedding = Embedding::from_flat(&stream)?;
    if embedding.len() != n_cells {
        return Err(Error::SchemaMismatch(format!(
            "embedding has {} coordinates for {n_cells} cells",
            embedding.len()
        )));
    }
    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryContainer;

    #[test]
    fn groups_triples_in_stream_order() {
        let stream = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let e = Embedding::from_flat(&stream).unwrap();
        assert_eq!(e.len(), 2);
        assert_eq!(e.get(0), Some([1.0, 2.0, 3.0]));
        assert_eq!(e.get(1), Some([4.0, 5.0, 6.0]));
        assert_eq!(e.get(2), None);
    }

    #[test]
    fn empty_stream_is_valid() {
        assert!(Embedding::from_flat(&[]).unwrap().is_empty());
    }

    #[test]
    fn non_multiple_of_three_is_malformed() {
        for n in [1, 2, 4, 7] {
            let stream = vec![0.0; n];
            assert!(
                matches!(Embedding::from_flat(&stream), Err(Error::MalformedData(_))),
                "length {n} should be rejected"
            );
        }
    }

    #[test]
    fn cell_count_checked_against_container() {
        let c = MemoryContainer::new().with_f32(EMBEDDING_PATH, vec![0.0; 9]);
        assert_eq!(read_embedding(&c, 3).unwrap().len(), 3);
        assert!(matches!(
            read_embedding(&c, 4),
            Err(Error::SchemaMismatch(_))
        ));
    }
}
