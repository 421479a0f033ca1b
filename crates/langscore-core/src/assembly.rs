//! Labeled neural-response arrays.
//!
//! [`NeuralAssembly`] holds a dense `(sample, neuroid, subject)` cube of
//! recordings with named coordinates attached to each dimension. Collapsing one
//! dimension with [`NeuralAssembly::mean_over`] yields a [`DataMatrix`], the
//! unit that metrics compare.
//!
//! Means skip NaN entries; an all-NaN slice averages to NaN.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The three axes of an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dim {
    Sample,
    Neuroid,
    Subject,
}

impl Dim {
    /// All dimensions in storage order.
    pub fn all() -> &'static [Dim] {
        &[Dim::Sample, Dim::Neuroid, Dim::Subject]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dim::Sample => "sample",
            Dim::Neuroid => "neuroid",
            Dim::Subject => "subject",
        }
    }

    fn axis(self) -> usize {
        match self {
            Dim::Sample => 0,
            Dim::Neuroid => 1,
            Dim::Subject => 2,
        }
    }
}

impl std::fmt::Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dense `(sample, neuroid, subject)` array with per-dimension coordinates.
///
/// # Invariants
///
/// - `values.len() == shape[0] * shape[1] * shape[2]`
/// - every coordinate on a dimension has exactly one value per index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralAssembly {
    shape: [usize; 3],
    values: Vec<f64>,
    #[serde(default)]
    coords: BTreeMap<Dim, BTreeMap<String, Vec<String>>>,
}

impl NeuralAssembly {
    /// Create an assembly from row-major `(sample, neuroid, subject)` values.
    pub fn new(shape: [usize; 3], values: Vec<f64>) -> CoreResult<Self> {
        let expected = shape.iter().product::<usize>();
        if values.len() != expected {
            return Err(CoreError::LengthMismatch {
                name: "assembly values".to_string(),
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            shape,
            values,
            coords: BTreeMap::new(),
        })
    }

    /// Attach a coordinate to a dimension (builder style).
    pub fn with_coord(
        mut self,
        dim: Dim,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> CoreResult<Self> {
        let name = name.into();
        if values.len() != self.len(dim) {
            return Err(CoreError::LengthMismatch {
                name,
                expected: self.len(dim),
                actual: values.len(),
            });
        }
        self.coords.entry(dim).or_default().insert(name, values);
        Ok(self)
    }

    /// Load an assembly from a JSON file and check its invariants.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let file = File::open(path.as_ref())?;
        let assembly: NeuralAssembly = serde_json::from_reader(BufReader::new(file))?;
        assembly.validate()?;
        Ok(assembly)
    }

    /// Check value count and coordinate lengths.
    pub fn validate(&self) -> CoreResult<()> {
        let expected = self.shape.iter().product::<usize>();
        if self.values.len() != expected {
            return Err(CoreError::LengthMismatch {
                name: "assembly values".to_string(),
                expected,
                actual: self.values.len(),
            });
        }
        for (dim, coords) in &self.coords {
            for (name, values) in coords {
                if values.len() != self.len(*dim) {
                    return Err(CoreError::LengthMismatch {
                        name: name.clone(),
                        expected: self.len(*dim),
                        actual: values.len(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Number of indices along `dim`.
    pub fn len(&self, dim: Dim) -> usize {
        self.shape[dim.axis()]
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `(sample, neuroid, subject)`.
    pub fn get(&self, sample: usize, neuroid: usize, subject: usize) -> f64 {
        self.values[self.offset([sample, neuroid, subject])]
    }

    /// All dimensions carrying a coordinate with this name.
    pub fn dims_of(&self, name: &str) -> Vec<Dim> {
        Dim::all()
            .iter()
            .copied()
            .filter(|dim| {
                self.coords
                    .get(dim)
                    .is_some_and(|coords| coords.contains_key(name))
            })
            .collect()
    }

    /// The single dimension carrying `name`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::CoordinateNotFound`] if no dimension carries it
    /// - [`CoreError::AmbiguousCoordinate`] if several do
    pub fn coordinate_dim(&self, name: &str) -> CoreResult<Dim> {
        let dims = self.dims_of(name);
        match dims.as_slice() {
            [dim] => Ok(*dim),
            [] => Err(CoreError::CoordinateNotFound(name.to_string())),
            _ => Err(CoreError::AmbiguousCoordinate {
                name: name.to_string(),
                dims: dims.iter().map(|d| d.to_string()).collect(),
            }),
        }
    }

    /// Values of coordinate `name`, searched on every dimension.
    pub fn coordinate(&self, name: &str) -> CoreResult<&[String]> {
        let dim = self.coordinate_dim(name)?;
        Ok(self.coords[&dim][name].as_slice())
    }

    /// Coordinates attached to `dim`.
    pub fn coords_on(&self, dim: Dim) -> Option<&BTreeMap<String, Vec<String>>> {
        self.coords.get(&dim)
    }

    /// Keep only the indices of `dim` for which `mask` is true.
    pub fn select(&self, dim: Dim, mask: &[bool]) -> CoreResult<NeuralAssembly> {
        if mask.len() != self.len(dim) {
            return Err(CoreError::LengthMismatch {
                name: format!("{} mask", dim),
                expected: self.len(dim),
                actual: mask.len(),
            });
        }
        let kept: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();

        let mut shape = self.shape;
        shape[dim.axis()] = kept.len();

        let mut values = Vec::with_capacity(shape.iter().product());
        let [n0, n1, n2] = shape;
        for i in 0..n0 {
            for j in 0..n1 {
                for k in 0..n2 {
                    let mut index = [i, j, k];
                    index[dim.axis()] = kept[index[dim.axis()]];
                    values.push(self.values[self.offset(index)]);
                }
            }
        }

        let mut coords = self.coords.clone();
        if let Some(dim_coords) = coords.get_mut(&dim) {
            for values in dim_coords.values_mut() {
                let picked: Vec<String> = kept.iter().map(|&i| values[i].clone()).collect();
                *values = picked;
            }
        }

        Ok(NeuralAssembly {
            shape,
            values,
            coords,
        })
    }

    /// Keep indices of the dimension carrying `name` whose value is in `keep`.
    pub fn select_values(&self, name: &str, keep: &BTreeSet<&str>) -> CoreResult<NeuralAssembly> {
        let dim = self.coordinate_dim(name)?;
        let mask: Vec<bool> = self.coords[&dim][name]
            .iter()
            .map(|value| keep.contains(value.as_str()))
            .collect();
        self.select(dim, &mask)
    }

    /// Average over `dim`, skipping NaN, leaving the two other dimensions.
    pub fn mean_over(&self, dim: Dim) -> DataMatrix {
        let remaining: Vec<Dim> = Dim::all().iter().copied().filter(|d| *d != dim).collect();
        let (row_dim, col_dim) = (remaining[0], remaining[1]);
        let rows = self.len(row_dim);
        let cols = self.len(col_dim);
        let depth = self.len(dim);

        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let mut sum = 0.0;
                let mut count = 0usize;
                for d in 0..depth {
                    let mut index = [0usize; 3];
                    index[row_dim.axis()] = r;
                    index[col_dim.axis()] = c;
                    index[dim.axis()] = d;
                    let v = self.values[self.offset(index)];
                    if !v.is_nan() {
                        sum += v;
                        count += 1;
                    }
                }
                values.push(if count == 0 { f64::NAN } else { sum / count as f64 });
            }
        }

        DataMatrix {
            rows,
            cols,
            values,
            row_dim: row_dim.to_string(),
            col_dim: col_dim.to_string(),
        }
    }

    fn offset(&self, [i, j, k]: [usize; 3]) -> usize {
        (i * self.shape[1] + j) * self.shape[2] + k
    }
}

/// Row-major two-dimensional `f64` matrix with dimension labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    row_dim: String,
    col_dim: String,
}

impl DataMatrix {
    /// Create a matrix from row-major values.
    pub fn new(
        rows: usize,
        cols: usize,
        values: Vec<f64>,
        row_dim: impl Into<String>,
        col_dim: impl Into<String>,
    ) -> CoreResult<Self> {
        if values.len() != rows * cols {
            return Err(CoreError::LengthMismatch {
                name: "matrix values".to_string(),
                expected: rows * cols,
                actual: values.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            values,
            row_dim: row_dim.into(),
            col_dim: col_dim.into(),
        })
    }

    /// A single-column matrix, e.g. one prediction per stimulus.
    pub fn column_vector(values: Vec<f64>, row_dim: impl Into<String>) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            values,
            row_dim: row_dim.into(),
            col_dim: "value".to_string(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_dim(&self) -> &str {
        &self.row_dim
    }

    pub fn col_dim(&self) -> &str {
        &self.col_dim
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    /// Copy of column `col`.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    /// 2 samples x 2 neuroids x 3 subjects, value = 100*s + 10*n + j.
    fn cube() -> NeuralAssembly {
        let mut values = Vec::new();
        for s in 0..2 {
            for n in 0..2 {
                for j in 0..3 {
                    values.push((100 * s + 10 * n + j) as f64);
                }
            }
        }
        NeuralAssembly::new([2, 2, 3], values)
            .unwrap()
            .with_coord(Dim::Sample, "stimulus_id", labels("s", 2))
            .unwrap()
            .with_coord(Dim::Neuroid, "roi", labels("roi", 2))
            .unwrap()
            .with_coord(Dim::Subject, "subject_id", labels("subj", 3))
            .unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_value_count() {
        let err = NeuralAssembly::new([2, 2, 2], vec![0.0; 7]).unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { expected: 8, actual: 7, .. }));
    }

    #[test]
    fn test_coordinate_dim_resolution() {
        let asm = cube();
        assert_eq!(asm.coordinate_dim("subject_id").unwrap(), Dim::Subject);
        assert!(matches!(
            asm.coordinate_dim("voxel"),
            Err(CoreError::CoordinateNotFound(_))
        ));

        let asm = asm
            .with_coord(Dim::Neuroid, "subject_id", labels("subj", 2))
            .unwrap();
        assert!(matches!(
            asm.coordinate_dim("subject_id"),
            Err(CoreError::AmbiguousCoordinate { .. })
        ));
    }

    #[test]
    fn test_mean_over_subject_collapses_only_subject_axis() {
        let m = cube().mean_over(Dim::Subject);
        assert_eq!((m.rows(), m.cols()), (2, 2));
        assert_eq!(m.row_dim(), "sample");
        assert_eq!(m.col_dim(), "neuroid");
        // mean of j in {0,1,2} is 1
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 1), 111.0);
    }

    #[test]
    fn test_mean_skips_nan() {
        let asm = NeuralAssembly::new([1, 1, 3], vec![1.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(asm.mean_over(Dim::Subject).get(0, 0), 2.0);

        let all_nan = NeuralAssembly::new([1, 1, 2], vec![f64::NAN, f64::NAN]).unwrap();
        assert!(all_nan.mean_over(Dim::Subject).get(0, 0).is_nan());
    }

    #[test]
    fn test_select_values_subsets_dimension_and_coords() {
        let keep: BTreeSet<&str> = ["subj0", "subj2"].into_iter().collect();
        let half = cube().select_values("subject_id", &keep).unwrap();
        assert_eq!(half.shape(), [2, 2, 2]);
        assert_eq!(half.get(1, 0, 1), 102.0);
        assert_eq!(
            half.coordinate("subject_id").unwrap(),
            &["subj0".to_string(), "subj2".to_string()][..]
        );
    }

    #[test]
    fn test_data_matrix_column_vector() {
        let m = DataMatrix::column_vector(vec![1.0, 2.0, 3.0], "sample");
        assert_eq!((m.rows(), m.cols()), (3, 1));
        assert_eq!(m.column(0), vec![1.0, 2.0, 3.0]);
        assert!(DataMatrix::new(2, 2, vec![0.0; 3], "a", "b").is_err());
    }
}
