//! Sign-random-projection (SRP) index for angular similarity.
//!
//! Each of `K` tables keys a vector by `L` sign bits, one per Gaussian
//! direction. A query gathers the union of its `K` buckets. When that union
//! holds fewer than `k` points, the remaining points are ranked by Hamming
//! distance between their full `K·L`-bit codes and the query's, and the
//! closest fill the gap. Every candidate is then verified with its exact
//! cosine distance.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::gaussian_projections;
use crate::ann::traits::{IndexStats, KnnIndex, SimilarityIndexBuilder};
use crate::error::{AmipError, Result};
use crate::simd;
use crate::topk::{MinKList, TopK};

/// Maximum sign bits per table (keys are `u64`).
pub const MAX_BITS_PER_TABLE: usize = 64;

/// SRP configuration that does not depend on the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrpParams {
    /// Seed for the projection directions.
    pub seed: u64,
}

impl Default for SrpParams {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

/// SRP builder.
#[derive(Debug, Clone, Default)]
pub struct Srp {
    pub params: SrpParams,
}

impl Srp {
    pub fn new(params: SrpParams) -> Self {
        Self { params }
    }
}

impl SimilarityIndexBuilder for Srp {
    type Index = SrpIndex;

    fn build(
        &self,
        data: Arc<[f32]>,
        n: usize,
        dim: usize,
        num_tables: usize,
        bits_per_table: usize,
        ratio: f32,
    ) -> Result<SrpIndex> {
        SrpIndex::build(data, n, dim, num_tables, bits_per_table, ratio, &self.params)
    }
}

/// A built SRP index.
#[derive(Debug, Clone)]
pub struct SrpIndex {
    data: Arc<[f32]>,
    num_points: usize,
    dimension: usize,
    num_tables: usize,
    bits_per_table: usize,
    ratio: f32,
    /// `num_tables × bits_per_table × dimension` directions, row-major.
    projections: Vec<f32>,
    /// `num_points × num_tables` keys.
    codes: Vec<u64>,
    /// Per table: key -> ids.
    tables: Vec<HashMap<u64, Vec<u32>>>,
}

impl SrpIndex {
    pub fn build(
        data: Arc<[f32]>,
        n: usize,
        dim: usize,
        num_tables: usize,
        bits_per_table: usize,
        ratio: f32,
        params: &SrpParams,
    ) -> Result<Self> {
        if num_tables == 0 {
            return Err(AmipError::InvalidParameter(
                "number of hash tables must be at least 1".to_string(),
            ));
        }
        if bits_per_table == 0 || bits_per_table > MAX_BITS_PER_TABLE {
            return Err(AmipError::InvalidParameter(format!(
                "bits per table must be in 1..={MAX_BITS_PER_TABLE}, got {bits_per_table}"
            )));
        }
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
        if u32::try_from(n).is_err() {
            return Err(AmipError::IndexBuild(format!("{n} points exceed u32 ids")));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let projections = gaussian_projections(&mut rng, num_tables * bits_per_table, dim);

        let mut index = Self {
            data,
            num_points: n,
            dimension: dim,
            num_tables,
            bits_per_table,
            ratio,
            projections,
            codes: Vec::with_capacity(n * num_tables),
            tables: (0..num_tables).map(|_| HashMap::new()).collect(),
        };

        for id in 0..n {
            let start = id * dim;
            for t in 0..num_tables {
                let key = index.hash_code(t, &index.data[start..start + dim]);
                index.codes.push(key);
                index.tables[t].entry(key).or_default().push(id as u32);
            }
        }

        debug!(
            n,
            dim,
            num_tables,
            bits_per_table,
            buckets = index.tables.iter().map(HashMap::len).sum::<usize>(),
            "built SRP tables"
        );

        Ok(index)
    }

    /// Sign bits of `v` under table `t`'s directions.
    fn hash_code(&self, t: usize, v: &[f32]) -> u64 {
        let stride = self.bits_per_table * self.dimension;
        let directions = &self.projections[t * stride..(t + 1) * stride];
        let mut key = 0u64;
        for (bit, a) in directions.chunks_exact(self.dimension).enumerate() {
            if simd::dot(a, v) >= 0.0 {
                key |= 1u64 << bit;
            }
        }
        key
    }

    fn point(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn code_distance(&self, id: usize, query_codes: &[u64]) -> u32 {
        let codes = &self.codes[id * self.num_tables..(id + 1) * self.num_tables];
        codes
            .iter()
            .zip(query_codes)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    pub fn num_tables(&self) -> usize {
        self.num_tables
    }

    pub fn bits_per_table(&self) -> usize {
        self.bits_per_table
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }
}

impl KnnIndex for SrpIndex {
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

        let query_codes: SmallVec<[u64; 16]> =
            (0..self.num_tables).map(|t| self.hash_code(t, query)).collect();

        let mut seen = vec![false; self.num_points];
        let mut candidates: Vec<u32> = Vec::new();
        for (table, key) in self.tables.iter().zip(&query_codes) {
            if let Some(bucket) = table.get(key) {
                for &id in bucket {
                    if !seen[id as usize] {
                        seen[id as usize] = true;
                        candidates.push(id);
                    }
                }
            }
        }

        if candidates.len() < k {
            let need = k - candidates.len();
            let mut rest: Vec<(u32, u32)> = (0..self.num_points)
                .filter(|&id| !seen[id])
                .map(|id| (self.code_distance(id, &query_codes), id as u32))
                .collect();
            if rest.len() > need {
                rest.select_nth_unstable(need - 1);
                rest.truncate(need);
            }
            candidates.extend(rest.into_iter().map(|(_, id)| id));
        }

        for &id in &candidates {
            let d = 1.0 - simd::cosine(self.point(id), query).clamp(-1.0, 1.0);
            if d <= radius {
                out.insert(d, id);
            }
        }

        Ok(candidates.len())
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
            size_bytes: self.projections.len() * std::mem::size_of::<f32>()
                + self.codes.len() * std::mem::size_of::<u64>()
                + self.num_points * self.num_tables * std::mem::size_of::<u32>(),
            algorithm: "SRP-LSH".to_string(),
        }
    }
}
