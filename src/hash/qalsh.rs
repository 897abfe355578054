//! Query-aware LSH (QALSH) for Euclidean c-approximate nearest neighbors.
//!
//! ## Index layout
//!
//! For each of `m` Gaussian directions `a_i` the index stores the pairs
//! `(a_i·o, id)` sorted by projection. Nothing else is hashed: buckets are
//! formed at query time around `a_i·q`.
//!
//! ## Search
//!
//! Two cursors per table walk outward from the query's projection. In round
//! `R` a cursor advances while `|a_i·o - a_i·q| <= w·R/2`, bumping the
//! collision count of every point it passes. A point whose count reaches `l`
//! has its exact distance computed once. The search stops when
//!
//! 1. `k` candidates lie within `c·R` (the c-ANN condition),
//! 2. the candidate budget (`βn + k - 1`) is spent,
//! 3. every cursor has run off its table (all points verified), or
//! 4. the radius has grown past the caller's ceiling,
//!
//! and otherwise widens `R` to `c·R`.
//!
//! ## Parameters
//!
//! With `p(r) = erf(w / (2√2·r))` the collision probability at distance `r`:
//!
//! ```text
//! w  = sqrt(8c²·ln c / (c² - 1))
//! p1 = p(1),  p2 = p(c)
//! η  = sqrt(ln(2/β) / ln(1/δ))
//! α  = (η·p1 + p2) / (1 + η)
//! m  = ceil((sqrt(ln(2/β)) + sqrt(ln(1/δ)))² / (2(p1 - p2)²))
//! l  = ceil(α·m)
//! ```
//!
//! with `δ = 1/e` and `β = budget / n` (capped at 1).

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::gaussian_projections;
use crate::ann::traits::{EuclideanIndexBuilder, IndexStats, KnnIndex};
use crate::error::{AmipError, Result};
use crate::simd;
use crate::topk::{MinKList, TopK};

const DELTA: f64 = 1.0 / std::f64::consts::E;

/// User-facing QALSH configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QalshParams {
    /// Radius searched in the first round.
    pub initial_radius: f32,
    /// False-positive budget `βn`: candidates verified beyond `k - 1`.
    pub candidate_budget: usize,
    /// Seed for the projection directions.
    pub seed: u64,
}

impl Default for QalshParams {
    fn default() -> Self {
        Self {
            initial_radius: 0.01,
            candidate_budget: 100,
            seed: 42,
        }
    }
}

impl QalshParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_radius.is_finite() && self.initial_radius > 0.0) {
            return Err(AmipError::InvalidParameter(format!(
                "initial_radius must be positive and finite, got {}",
                self.initial_radius
            )));
        }
        if self.candidate_budget == 0 {
            return Err(AmipError::InvalidParameter(
                "candidate_budget must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Hash parameters derived from the ratio and dataset size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QalshHashParams {
    /// Number of hash functions (`m`).
    pub num_hashes: usize,
    /// Collision count that promotes a point to candidate (`l`).
    pub collision_threshold: usize,
    /// Bucket width `w` at radius 1.
    pub bucket_width: f32,
    /// Collision probability at distance 1.
    pub p1: f64,
    /// Collision probability at distance `c`.
    pub p2: f64,
}

impl QalshHashParams {
    pub fn derive(ratio: f32, n: usize, candidate_budget: usize) -> Result<Self> {
        if !(ratio.is_finite() && ratio > 1.0) {
            return Err(AmipError::InvalidParameter(format!(
                "approximation ratio must be > 1, got {ratio}"
            )));
        }
        if n == 0 {
            return Err(AmipError::InvalidParameter(
                "cannot derive hash parameters for an empty dataset".to_string(),
            ));
        }
        let c = ratio as f64;
        let w = (8.0 * c * c * c.ln() / (c * c - 1.0)).sqrt();
        let p1 = collision_probability(w, 1.0);
        let p2 = collision_probability(w, c);
        let gap = p1 - p2;
        if !(gap > 0.0) {
            return Err(AmipError::InvalidParameter(format!(
                "ratio {ratio} leaves no gap between p1 and p2"
            )));
        }

        let beta = (candidate_budget as f64 / n as f64).min(1.0);
        let log_beta = (2.0 / beta).ln();
        let log_delta = (1.0 / DELTA).ln();
        let eta = (log_beta / log_delta).sqrt();
        let alpha = (eta * p1 + p2) / (1.0 + eta);

        let m = ((log_beta.sqrt() + log_delta.sqrt()).powi(2) / (2.0 * gap * gap)).ceil();
        let num_hashes = (m as usize).max(1);
        let collision_threshold = ((alpha * num_hashes as f64).ceil() as usize).clamp(1, num_hashes);

        Ok(Self {
            num_hashes,
            collision_threshold,
            bucket_width: w as f32,
            p1,
            p2,
        })
    }
}

/// Probability that two points at distance `r` collide in a bucket of width `w`.
fn collision_probability(w: f64, r: f64) -> f64 {
    erf(w / (2.0 * std::f64::consts::SQRT_2 * r))
}

/// Abramowitz & Stegun 7.1.26 (absolute error < 1.5e-7).
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = ((((1.061_405_429 * t - 1.453_152_027) * t + 1.421_413_741) * t
        - 0.284_496_736)
        * t
        + 0.254_829_592)
        * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// QALSH builder.
#[derive(Debug, Clone, Default)]
pub struct Qalsh {
    pub params: QalshParams,
}

impl Qalsh {
    pub fn new(params: QalshParams) -> Self {
        Self { params }
    }
}

impl EuclideanIndexBuilder for Qalsh {
    type Index = QalshIndex;

    fn build(&self, data: Arc<[f32]>, n: usize, dim: usize, ratio: f32) -> Result<QalshIndex> {
        QalshIndex::build(data, n, dim, ratio, self.params.clone())
    }
}

/// A built QALSH index.
#[derive(Debug, Clone)]
pub struct QalshIndex {
    data: Arc<[f32]>,
    num_points: usize,
    dimension: usize,
    ratio: f32,
    params: QalshParams,
    hash: QalshHashParams,
    /// `num_hashes × dimension` directions, row-major.
    projections: Vec<f32>,
    /// Per hash function: `(projection, id)` sorted by projection.
    tables: Vec<Vec<(f32, u32)>>,
}

impl QalshIndex {
    pub fn build(
        data: Arc<[f32]>,
        n: usize,
        dim: usize,
        ratio: f32,
        params: QalshParams,
    ) -> Result<Self> {
        params.validate()?;
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

        let hash = QalshHashParams::derive(ratio, n, params.candidate_budget)?;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let projections = gaussian_projections(&mut rng, hash.num_hashes, dim);

        let tables: Vec<Vec<(f32, u32)>> = projections
            .chunks_exact(dim)
            .map(|a| {
                let mut table: Vec<(f32, u32)> = data
                    .chunks_exact(dim)
                    .enumerate()
                    .map(|(id, o)| (simd::dot(a, o), id as u32))
                    .collect();
                table.sort_unstable_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
                table
            })
            .collect();

        debug!(
            n,
            dim,
            ratio,
            num_hashes = hash.num_hashes,
            collision_threshold = hash.collision_threshold,
            bucket_width = hash.bucket_width,
            "built QALSH tables"
        );

        Ok(Self {
            data,
            num_points: n,
            dimension: dim,
            ratio,
            params,
            hash,
            projections,
            tables,
        })
    }

    pub fn hash_params(&self) -> &QalshHashParams {
        &self.hash
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    fn point(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }
}

impl KnnIndex for QalshIndex {
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

        let q_proj: Vec<f32> = self
            .projections
            .chunks_exact(self.dimension)
            .map(|a| simd::dot(a, query))
            .collect();

        // left[i]: entries still unread below the query; right[i]: next entry above.
        let mut left: Vec<usize> = Vec::with_capacity(self.tables.len());
        let mut right: Vec<usize> = Vec::with_capacity(self.tables.len());
        for (table, &qv) in self.tables.iter().zip(&q_proj) {
            let pos = table.partition_point(|e| e.0 < qv);
            left.push(pos);
            right.push(pos);
        }

        let threshold = self.hash.collision_threshold as u32;
        let budget = (self.params.candidate_budget + k - 1).min(self.num_points);
        let mut freq = vec![0u32; self.num_points];
        let mut examined = 0usize;

        let mut verify = |id: u32, examined: &mut usize, out: &mut MinKList| {
            let slot = &mut freq[id as usize];
            *slot += 1;
            if *slot == threshold {
                *examined += 1;
                let d = simd::l2_distance(self.point(id), query);
                out.insert(d, id);
            }
        };

        let mut search_radius = self.params.initial_radius;
        let mut rounds = 0usize;
        'rounds: loop {
            rounds += 1;
            let half_width = self.hash.bucket_width * search_radius / 2.0;
            let mut exhausted = 0usize;

            for (i, table) in self.tables.iter().enumerate() {
                let qv = q_proj[i];
                while left[i] > 0 {
                    let (v, id) = table[left[i] - 1];
                    if qv - v > half_width {
                        break;
                    }
                    left[i] -= 1;
                    verify(id, &mut examined, out);
                    if examined >= budget {
                        break 'rounds;
                    }
                }
                while right[i] < table.len() {
                    let (v, id) = table[right[i]];
                    if v - qv > half_width {
                        break;
                    }
                    right[i] += 1;
                    verify(id, &mut examined, out);
                    if examined >= budget {
                        break 'rounds;
                    }
                }
                if left[i] == 0 && right[i] == table.len() {
                    exhausted += 1;
                }
            }

            if out.len() >= k {
                if let Some(kth) = out.kth_score() {
                    if kth <= self.ratio * search_radius {
                        break;
                    }
                }
            }
            if exhausted == self.tables.len() {
                break;
            }
            search_radius *= self.ratio;
            if search_radius > radius {
                break;
            }
        }

        trace!(rounds, examined, search_radius, "qalsh knn");
        Ok(examined)
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
                + self
                    .tables
                    .iter()
                    .map(|t| t.len() * std::mem::size_of::<(f32, u32)>())
                    .sum::<usize>(),
            algorithm: "QALSH".to_string(),
        }
    }
}
