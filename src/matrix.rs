//! Borrowed row-major matrix views and the engine-owned augmented buffer.

use std::sync::Arc;

use crate::error::{AmipError, Result};

/// A read-only, row-major view over `rows × dim` floats owned by the caller.
#[derive(Debug, Clone, Copy)]
pub struct Matrix<'a> {
    data: &'a [f32],
    rows: usize,
    dim: usize,
}

impl<'a> Matrix<'a> {
    /// Wrap `data` as `rows` vectors of length `dim`.
    ///
    /// Fails if `dim` is zero or `data.len() != rows * dim`.
    pub fn new(data: &'a [f32], rows: usize, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(AmipError::InvalidParameter(
                "dimension must be at least 1".to_string(),
            ));
        }
        let expected = rows.checked_mul(dim).ok_or_else(|| {
            AmipError::InvalidParameter(format!("{rows} x {dim} overflows usize"))
        })?;
        if data.len() != expected {
            return Err(AmipError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, dim })
    }

    /// Wrap `data`, inferring the row count from `dim`.
    pub fn from_flat(data: &'a [f32], dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(AmipError::InvalidParameter(
                "dimension must be at least 1".to_string(),
            ));
        }
        if data.len() % dim != 0 {
            return Err(AmipError::DimensionMismatch {
                expected: (data.len() / dim + 1) * dim,
                actual: data.len(),
            });
        }
        Self::new(data, data.len() / dim, dim)
    }

    /// An empty view (no rows) of the given dimension.
    ///
    /// Fails if `dim` is zero.
    pub fn empty(dim: usize) -> Result<Self> {
        Self::new(&[], 0, dim)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Row `i`. Panics if out of range.
    #[inline]
    pub fn row(&self, i: usize) -> &'a [f32] {
        let start = i * self.dim;
        &self.data[start..start + self.dim]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [f32]> + 'a {
        self.data.chunks_exact(self.dim)
    }
}

/// Contiguous `n × dim` buffer of augmented vectors.
///
/// Written once at build time, then shared read-only with the index backend.
#[derive(Debug, Clone)]
pub struct AugmentedData {
    buf: Arc<[f32]>,
    rows: usize,
    dim: usize,
}

impl AugmentedData {
    /// Allocate the buffer and fill row `i` with `fill(i, row)`.
    pub fn from_rows<F>(rows: usize, dim: usize, mut fill: F) -> Self
    where
        F: FnMut(usize, &mut [f32]),
    {
        let mut buf = vec![0.0f32; rows * dim];
        if dim > 0 {
            for (i, row) in buf.chunks_exact_mut(dim).enumerate() {
                fill(i, row);
            }
        }
        Self {
            buf: buf.into(),
            rows,
            dim,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dim;
        &self.buf[start..start + self.dim]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.buf
    }

    /// Shared handle to the buffer, for index backends.
    pub fn shared(&self) -> Arc<[f32]> {
        Arc::clone(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_rejects_bad_shapes() {
        let data = [1.0f32, 2.0, 3.0];
        assert!(matches!(
            Matrix::new(&data, 2, 2),
            Err(AmipError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(matches!(
            Matrix::new(&data, 3, 0),
            Err(AmipError::InvalidParameter(_))
        ));
        assert!(Matrix::from_flat(&data, 2).is_err());
    }

    #[test]
    fn empty_view_needs_a_dimension() {
        let m = Matrix::empty(3).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.dim(), 3);
        assert_eq!(m.iter_rows().count(), 0);
        assert!(matches!(
            Matrix::empty(0),
            Err(AmipError::InvalidParameter(_))
        ));
    }

    #[test]
    fn matrix_rows() {
        let data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let m = Matrix::from_flat(&data, 3).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(m.iter_rows().count(), 2);
    }

    #[test]
    fn augmented_fill_is_row_major() {
        let aug = AugmentedData::from_rows(3, 2, |i, row| {
            row[0] = i as f32;
            row[1] = -(i as f32);
        });
        assert_eq!(aug.row(2), &[2.0, -2.0]);
        assert_eq!(aug.as_slice().len(), 6);
        assert_eq!(aug.shared().len(), 6);
    }
}
