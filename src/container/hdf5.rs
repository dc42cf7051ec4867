//! HDF5-backed dataset container (AnnData-style `.h5ad` layout).
//!
//! Requires the `hdf5` cargo feature and a system libhdf5 installation
//! (`apt install libhdf5-dev` on Linux, `brew install hdf5` on macOS).

use std::path::Path;

use hdf5::types::VarLenUnicode;
use hdf5::File;

use crate::annotations::CategoryCodes;
use crate::container::DataContainer;
use crate::error::{Error, Result};

/// A read-only [`DataContainer`] over an HDF5 file.
#[derive(Debug)]
pub struct Hdf5Container {
    file: File,
}

impl Hdf5Container {
    /// Open an HDF5 file for reading. A missing path is
    /// [`Error::DatasetNotFound`]; an unreadable file is [`Error::Hdf5`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DatasetNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Ok(Self { file })
    }

    fn dataset(&self, path: &str) -> Result<hdf5::Dataset> {
        if !self.file.link_exists(path) {
            return Err(Error::SchemaMismatch(format!("missing array '{path}'")));
        }
        Ok(self.file.dataset(path)?)
    }
}

impl DataContainer for Hdf5Container {
    fn read_f32(&self, path: &str) -> Result<Vec<f32>> {
        Ok(self.dataset(path)?.read_1d::<f32>()?.to_vec())
    }

    fn read_i32(&self, path: &str) -> Result<Vec<i32>> {
        Ok(self.dataset(path)?.read_1d::<i32>()?.to_vec())
    }

    fn read_codes(&self, path: &str) -> Result<CategoryCodes> {
        let ds = self.dataset(path)?;
        // The stored scalar width decides the variant, once, here.
        let codes = match ds.dtype()?.size() {
            1 => CategoryCodes::I8(ds.read_1d::<i8>()?.to_vec()),
            2 => CategoryCodes::I16(ds.read_1d::<i16>()?.to_vec()),
            _ => CategoryCodes::I32(ds.read_1d::<i32>()?.to_vec()),
        };
        Ok(codes)
    }

    fn read_strings(&self, path: &str) -> Result<Vec<String>> {
        let ds = self.dataset(path)?;
        let values = ds
            .read_1d::<VarLenUnicode>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        Ok(values)
    }

    fn list(&self, group: &str) -> Result<Vec<String>> {
        if !self.file.link_exists(group) {
            return Err(Error::SchemaMismatch(format!("missing group '{group}'")));
        }
        let mut members = self.file.group(group)?.member_names()?;
        members.sort();
        Ok(members)
    }

    fn exists(&self, path: &str) -> bool {
        self.file.link_exists(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::embedding::EMBEDDING_PATH;
    use std::str::FromStr;

    fn write_str_array(file: &File, path: &str, values: &[&str]) {
        let data: Vec<VarLenUnicode> = values
            .iter()
            .map(|s| VarLenUnicode::from_str(s).unwrap())
            .collect();
        file.new_dataset_builder()
            .with_data(&ndarray::Array1::from(data))
            .create(path)
            .unwrap();
    }

    fn write_sample_file(path: &Path) {
        let file = File::create(path).unwrap();

        write_str_array(&file, "obs/_index", &["c0", "c1", "c2", "c3", "c4"]);

        file.new_dataset_builder()
            .with_data(&ndarray::arr1(&[1.0f32, 2.0, 3.0, 4.0, 5.0]))
            .create("X/data")
            .unwrap();
        file.new_dataset_builder()
            .with_data(&ndarray::arr1(&[0i32, 1, 2, 3, 4]))
            .create("X/indices")
            .unwrap();
        file.new_dataset_builder()
            .with_data(&ndarray::arr1(&[0i32, 0, 5]))
            .create("X/indptr")
            .unwrap();

        write_str_array(&file, "var/gene_ids", &["ENSG01", "ENSG02"]);
        write_str_array(&file, "var/gene_names", &["Zero", "Linear"]);

        write_str_array(&file, "obs/cluster/categories", &["a", "b", "c"]);
        file.new_dataset_builder()
            .with_data(&ndarray::arr1(&[0i8, 1, 2, 1, 0]))
            .create("obs/cluster/codes")
            .unwrap();

        let coords: Vec<f32> = (0..15).map(|i| i as f32).collect();
        file.new_dataset_builder()
            .with_data(&ndarray::Array1::from(coords))
            .create(EMBEDDING_PATH)
            .unwrap();
    }

    #[test]
    fn missing_file_is_dataset_not_found() {
        let err = Hdf5Container::open("/nonexistent/data.h5ad");
        assert!(matches!(err, Err(Error::DatasetNotFound(_))));
    }

    #[test]
    fn open_and_query_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.h5ad");
        write_sample_file(&path);

        let ds = Dataset::open(Hdf5Container::open(&path).unwrap()).unwrap();
        assert_eq!(ds.n_cells(), 5);
        assert_eq!(ds.n_genes(), 2);

        // Codes keep the 8-bit width they were stored with.
        assert!(matches!(
            ds.annotations().fields()[0].codes,
            CategoryCodes::I8(_)
        ));
        assert_eq!(ds.annotations().fields()[0].category_of(3), "b");

        let result = ds.fetch(&[0, 1]).unwrap();
        assert_eq!(result.expression[0], vec![0.0; 5]);
        assert_eq!(result.display_max[0], 10);
        assert_eq!(result.expression[1], vec![2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(result.display_max[1], 5);
    }
}
