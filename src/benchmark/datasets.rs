//! Seeded synthetic datasets for MIP benchmarking.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::hash::gaussian;
use crate::matrix::Matrix;

/// Row-major data and query buffers of a common dimension.
#[derive(Debug, Clone)]
pub struct MipDataset {
    /// `n_data × dim` vectors to index.
    pub data: Vec<f32>,
    /// `n_queries × dim` query vectors.
    pub queries: Vec<f32>,
    pub dim: usize,
}

impl MipDataset {
    pub fn n_data(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn n_queries(&self) -> usize {
        self.queries.len() / self.dim
    }

    pub fn data_matrix(&self) -> Result<Matrix<'_>> {
        Matrix::from_flat(&self.data, self.dim)
    }

    pub fn query_matrix(&self) -> Result<Matrix<'_>> {
        Matrix::from_flat(&self.queries, self.dim)
    }

    /// Total memory footprint of raw vectors in bytes.
    pub fn memory_bytes(&self) -> usize {
        (self.data.len() + self.queries.len()) * std::mem::size_of::<f32>()
    }
}

/// Vectors uniform in `[-1, 1]^d`.
///
/// Norms concentrate around `sqrt(d/3)`, so this is the easy case for MIP.
pub fn uniform_dataset(n_data: usize, n_queries: usize, dim: usize, seed: u64) -> MipDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sample = |count: usize| -> Vec<f32> {
        (0..count * dim)
            .map(|_| rng.random::<f32>() * 2.0 - 1.0)
            .collect()
    };
    let data = sample(n_data);
    let queries = sample(n_queries);
    MipDataset { data, queries, dim }
}

/// Gaussian directions with norms drawn uniformly from `[1, 1 + spread]`.
///
/// With a large `spread` the top inner products are dominated by long
/// vectors, the regime the norm-augmentation reduction targets. Queries are
/// unit-norm.
pub fn gaussian_with_norm_spread(
    n_data: usize,
    n_queries: usize,
    dim: usize,
    spread: f32,
    seed: u64,
) -> MipDataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let direction = |rng: &mut StdRng| -> Vec<f32> {
        loop {
            let v: Vec<f32> = (0..dim).map(|_| gaussian(rng)).collect();
            let n = crate::simd::norm(&v);
            if n > 1e-6 {
                return v.into_iter().map(|x| x / n).collect();
            }
        }
    };

    let mut data = Vec::with_capacity(n_data * dim);
    for _ in 0..n_data {
        let len = 1.0 + rng.random::<f32>() * spread.max(0.0);
        data.extend(direction(&mut rng).into_iter().map(|x| x * len));
    }

    let mut queries = Vec::with_capacity(n_queries * dim);
    for _ in 0..n_queries {
        queries.extend(direction(&mut rng));
    }

    MipDataset { data, queries, dim }
}
