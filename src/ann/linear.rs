//! Exact linear-scan backend.

use std::sync::Arc;

use super::traits::{EuclideanIndexBuilder, IndexStats, KnnIndex, SimilarityIndexBuilder};
use crate::error::{AmipError, Result};
use crate::simd;
use crate::topk::{MinKList, TopK};

/// Distance used by a [`LinearScanIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMetric {
    /// Euclidean distance.
    L2,
    /// Cosine distance `1 - cos(a, b)`.
    Cosine,
}

/// Brute-force index: every query examines all `n` points.
#[derive(Debug, Clone)]
pub struct LinearScanIndex {
    data: Arc<[f32]>,
    num_points: usize,
    dimension: usize,
    metric: ScanMetric,
}

impl LinearScanIndex {
    pub fn new(data: Arc<[f32]>, n: usize, dim: usize, metric: ScanMetric) -> Result<Self> {
        if n == 0 || dim == 0 {
            return Err(AmipError::IndexBuild(format!(
                "cannot index {n} points of dimension {dim}"
            )));
        }
        if data.len() != n * dim {
            return Err(AmipError::DimensionMismatch {
                expected: n * dim,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            num_points: n,
            dimension: dim,
            metric,
        })
    }

    pub fn metric(&self) -> ScanMetric {
        self.metric
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            ScanMetric::L2 => simd::l2_distance(a, b),
            ScanMetric::Cosine => 1.0 - simd::cosine(a, b).clamp(-1.0, 1.0),
        }
    }
}

impl KnnIndex for LinearScanIndex {
    fn knn(&self, radius: f32, query: &[f32], k: usize, out: &mut MinKList) -> Result<usize> {
        if query.len() != self.dimension {
            return Err(AmipError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(0);
        }
        for (id, v) in self.data.chunks_exact(self.dimension).enumerate() {
            let d = self.distance(v, query);
            if d <= radius {
                out.insert(d, id as u32);
            }
        }
        Ok(self.num_points)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn num_points(&self) -> usize {
        self.num_points
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            num_points: self.num_points,
            dimension: self.dimension,
            size_bytes: 0,
            algorithm: match self.metric {
                ScanMetric::L2 => "LinearScan-L2".to_string(),
                ScanMetric::Cosine => "LinearScan-Cosine".to_string(),
            },
        }
    }
}

/// Builder for [`LinearScanIndex`].
///
/// As a [`EuclideanIndexBuilder`] it scans with L2; as a
/// [`SimilarityIndexBuilder`] it scans with cosine distance and ignores the
/// hashing parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScan;

impl EuclideanIndexBuilder for LinearScan {
    type Index = LinearScanIndex;

    fn build(&self, data: Arc<[f32]>, n: usize, dim: usize, _ratio: f32) -> Result<Self::Index> {
        LinearScanIndex::new(data, n, dim, ScanMetric::L2)
    }
}

impl SimilarityIndexBuilder for LinearScan {
    type Index = LinearScanIndex;

    fn build(
        &self,
        data: Arc<[f32]>,
        n: usize,
        dim: usize,
        _num_tables: usize,
        _bits_per_table: usize,
        _ratio: f32,
    ) -> Result<Self::Index> {
        LinearScanIndex::new(data, n, dim, ScanMetric::Cosine)
    }
}
