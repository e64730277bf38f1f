//! Reading and writing `.npy` arrays and `.npz` archives.
//!
//! Arrays may be stored as `f32` or `f64`, both are accepted.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use ndarray::{Array1, Array2, ArrayD, Ix2, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, read_npy, write_npy};

use crate::{IrradianceErr, Result};

/// An opened `.npz` archive.
pub struct NpzArchive {
    path: PathBuf,
    npz: NpzReader<File>,
    names: Vec<String>,
}

impl NpzArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut npz = NpzReader::new(File::open(&path)?)?;
        let names = npz.names()?;
        Ok(Self { path, npz, names })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the archive holds an array named `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// Reads the array named `key`, with or without its `.npy` suffix.
    pub fn array(&mut self, key: &str) -> Result<ArrayD<f64>> {
        let entry = self
            .entry(key)
            .ok_or_else(|| IrradianceErr::MissingKey {
                archive: self.path.clone(),
                key: key.to_string(),
            })?
            .to_string();

        match self.npz.by_name::<OwnedRepr<f64>, IxDyn>(&entry) {
            Ok(array) => Ok(array),
            Err(err) => match self.npz.by_name::<OwnedRepr<f32>, IxDyn>(&entry) {
                Ok(array) => Ok(array.mapv(f64::from)),
                Err(_) => Err(err.into()),
            },
        }
    }

    pub fn matrix(&mut self, key: &str) -> Result<Array2<f64>> {
        into_matrix(self.array(key)?, key)
    }

    pub fn vector(&mut self, key: &str) -> Result<Array1<f64>> {
        Ok(into_vector(self.array(key)?))
    }

    fn entry(&self, key: &str) -> Option<&str> {
        self.names
            .iter()
            .map(String::as_str)
            .find(|name| *name == key || name.strip_suffix(".npy") == Some(key))
    }
}

/// Reads a `.npy` file as `f64`.
pub fn read_array<P: AsRef<Path>>(path: P) -> Result<ArrayD<f64>> {
    let path = path.as_ref();
    match read_npy::<_, ArrayD<f64>>(path) {
        Ok(array) => Ok(array),
        Err(err) => match read_npy::<_, ArrayD<f32>>(path) {
            Ok(array) => Ok(array.mapv(f64::from)),
            Err(_) => Err(err.into()),
        },
    }
}

/// Reads a `.npy` file as `f32`.
pub fn read_array_f32<P: AsRef<Path>>(path: P) -> Result<ArrayD<f32>> {
    let path = path.as_ref();
    match read_npy::<_, ArrayD<f32>>(path) {
        Ok(array) => Ok(array),
        Err(err) => match read_npy::<_, ArrayD<f64>>(path) {
            Ok(array) => Ok(array.mapv(|v| v as f32)),
            Err(_) => Err(err.into()),
        },
    }
}

/// Writes `array` to `path` through a temporary sibling file, so that `path` never holds a
/// partial array.
pub fn write_matrix<P: AsRef<Path>>(path: P, array: &Array2<f64>) -> Result<()> {
    let path = path.as_ref();
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".partial");
    let tmp = PathBuf::from(tmp);

    write_npy(&tmp, array)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn into_matrix<T>(array: ArrayD<T>, what: &str) -> Result<Array2<T>> {
    let shape = array.shape().to_vec();
    array
        .into_dimensionality::<Ix2>()
        .map_err(|_| IrradianceErr::InvalidShape {
            what: what.to_string(),
            got: shape,
        })
}

/// Flattens `array` in logical order, `(F,)` and `(1, F)` give the same vector.
pub fn into_vector<T: Copy>(array: ArrayD<T>) -> Array1<T> {
    array.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, array};
    use ndarray_npy::NpzWriter;

    use super::*;

    #[test]
    fn npz_arrays_are_read_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.npz");

        let mut npz = NpzWriter::new(File::create(&path).unwrap());
        npz.add_array("mean", &array![1.0f64, 2.0]).unwrap();
        npz.add_array("std", &array![[0.5f32, 0.25]]).unwrap();
        npz.finish().unwrap();

        let mut archive = NpzArchive::open(&path).unwrap();
        assert!(archive.contains("mean") && archive.contains("std"));
        assert_eq!(archive.vector("mean").unwrap(), array![1.0, 2.0]);
        assert_eq!(archive.vector("std").unwrap(), array![0.5, 0.25]);
        assert_eq!(archive.matrix("std").unwrap(), array![[0.5, 0.25]]);

        let err = archive.vector("sig").unwrap_err();
        assert!(matches!(err, IrradianceErr::MissingKey { key, .. } if key == "sig"));
    }

    #[test]
    fn npy_is_read_from_either_precision() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single.npy");
        let double = dir.path().join("double.npy");
        write_npy(&single, &array![[1.5f32, 2.0]]).unwrap();
        write_npy(&double, &array![[3.0f64], [4.0]]).unwrap();

        assert_eq!(into_matrix(read_array(&single).unwrap(), "x").unwrap(), array![[1.5, 2.0]]);
        assert_eq!(
            into_matrix(read_array_f32(&double).unwrap(), "x").unwrap(),
            array![[3.0f32], [4.0]]
        );
    }

    #[test]
    fn written_matrix_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pred.npy");
        let m = Array::from_shape_fn((3, 2), |(i, j)| (i * 2 + j) as f64);

        write_matrix(&path, &m).unwrap();

        assert_eq!(into_matrix(read_array(&path).unwrap(), "pred").unwrap(), m);
        assert!(!dir.path().join("pred.npy.partial").exists());
    }

    #[test]
    fn vectors_must_be_matrices_to_be_matrices() {
        let err = into_matrix(ArrayD::<f64>::zeros(vec![3]), "weights").unwrap_err();
        assert!(matches!(err, IrradianceErr::InvalidShape { what, .. } if what == "weights"));
    }
}
