//! Capability traits for nearest-neighbor backends.

use std::sync::Arc;

use crate::error::Result;
use crate::topk::MinKList;

/// A built, immutable k-nearest-neighbor index over augmented vectors.
pub trait KnnIndex {
    /// Search for the `k` nearest points to `query`.
    ///
    /// Candidates are inserted into `out` keyed by distance (smaller is
    /// better). `radius` bounds how far the search may widen; pass
    /// `f32::INFINITY` for an unbounded search.
    ///
    /// Returns the number of points whose exact distance was computed.
    fn knn(&self, radius: f32, query: &[f32], k: usize, out: &mut MinKList) -> Result<usize>;

    /// Dimension of indexed vectors.
    fn dimension(&self) -> usize;

    /// Number of indexed vectors.
    fn num_points(&self) -> usize;

    /// Index statistics.
    fn stats(&self) -> IndexStats;
}

/// Builds a Euclidean c-ANN index.
pub trait EuclideanIndexBuilder {
    type Index: KnnIndex;

    /// Index `n` row-major vectors of length `dim` with approximation ratio `ratio`.
    fn build(&self, data: Arc<[f32]>, n: usize, dim: usize, ratio: f32) -> Result<Self::Index>;
}

/// Builds a sign-random-projection (angular) similarity index.
pub trait SimilarityIndexBuilder {
    type Index: KnnIndex;

    /// Index `n` row-major vectors of length `dim`.
    ///
    /// `num_tables` (K) and `bits_per_table` (L) size the hashing; `ratio` is
    /// the approximation ratio the caller asked for.
    fn build(
        &self,
        data: Arc<[f32]>,
        n: usize,
        dim: usize,
        num_tables: usize,
        bits_per_table: usize,
        ratio: f32,
    ) -> Result<Self::Index>;
}

/// Statistics about a built index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub num_points: usize,
    pub dimension: usize,
    /// Approximate heap footprint owned by the index (excluding shared data).
    pub size_bytes: usize,
    pub algorithm: String,
}
