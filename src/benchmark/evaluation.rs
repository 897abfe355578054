//! Ground truth and quality metrics for c-AMIP search.
//!
//! | Metric | Formula | Interpretation |
//! |--------|---------|----------------|
//! | Recall@K | \|approx ∩ true\| / K | Fraction of true top-k found |
//! | Precision@K | \|approx ∩ true\| / \|approx\| | Fraction of returned ids that are correct |
//! | Ratio | mean_i ⟨q, approx_i⟩ / ⟨q, true_i⟩ | 1.0 when every rank is exact |
//! | Verifications | index-examined + k | Exact evaluations per query |

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::matrix::Matrix;
use crate::mips::MipIndex;
use crate::simd;
use crate::topk::{MaxKList, TopK};

/// Exact top-k by inner product: `(id, inner product)`, best first.
pub fn ground_truth_mip(data: &Matrix<'_>, query: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut list = MaxKList::new(k);
    for (id, row) in data.iter_rows().enumerate() {
        list.insert(simd::dot(row, query), id as u32);
    }
    list.iter().collect()
}

/// Recall@k for a single query.
pub fn recall_at_k(approx: &[u32], truth: &[u32], k: usize) -> f32 {
    let k = k.min(truth.len());
    if k == 0 {
        return 0.0;
    }
    let true_set: HashSet<u32> = truth.iter().take(k).copied().collect();
    let found = approx
        .iter()
        .take(k)
        .filter(|id| true_set.contains(id))
        .count();
    found as f32 / k as f32
}

/// Precision@k for a single query: the fraction of returned ids (up to `k`)
/// that belong to the true top-k.
pub fn precision_at_k(approx: &[u32], truth: &[u32], k: usize) -> f32 {
    let returned = approx.len().min(k);
    if returned == 0 {
        return 0.0;
    }
    let true_set: HashSet<u32> = truth.iter().take(k).copied().collect();
    let found = approx
        .iter()
        .take(k)
        .filter(|id| true_set.contains(id))
        .count();
    found as f32 / returned as f32
}

/// Mean rank-wise ratio of returned to exact inner products.
///
/// Ranks where the exact inner product is not positive are skipped (the
/// ratio is meaningless there); missing returned ranks count as 0.
pub fn mip_ratio(approx: &[f32], truth: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    let mut counted = 0usize;
    for (i, &t) in truth.iter().enumerate() {
        if t <= 0.0 {
            continue;
        }
        let a = approx.get(i).copied().unwrap_or(0.0);
        sum += a / t;
        counted += 1;
    }
    if counted == 0 {
        1.0
    } else {
        sum / counted as f32
    }
}

/// Aggregate results of [`evaluate`].
#[derive(Debug, Clone)]
pub struct EvalResults {
    pub algorithm: String,
    pub k: usize,
    pub recalls: Vec<f32>,
    pub precisions: Vec<f32>,
    pub ratios: Vec<f32>,
    pub verifications: Vec<usize>,
    pub latencies: Vec<Duration>,
}

impl EvalResults {
    pub fn mean_recall(&self) -> f32 {
        mean(&self.recalls)
    }

    pub fn mean_precision(&self) -> f32 {
        mean(&self.precisions)
    }

    pub fn mean_ratio(&self) -> f32 {
        mean(&self.ratios)
    }

    pub fn mean_verifications(&self) -> f64 {
        if self.verifications.is_empty() {
            return 0.0;
        }
        self.verifications.iter().sum::<usize>() as f64 / self.verifications.len() as f64
    }

    /// Queries per second.
    pub fn qps(&self) -> f64 {
        let total: Duration = self.latencies.iter().sum();
        if self.latencies.is_empty() || total.is_zero() {
            return 0.0;
        }
        self.latencies.len() as f64 / total.as_secs_f64()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}@{}: recall={:.3}, ratio={:.3}, verif={:.1}, qps={:.1}",
            self.algorithm,
            self.k,
            self.mean_recall(),
            self.mean_ratio(),
            self.mean_verifications(),
            self.qps()
        )
    }
}

fn mean(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f32>() / xs.len() as f32
    }
}

/// Run every query through `index` and score against exact ground truth.
pub fn evaluate<M: MipIndex>(
    index: &M,
    data: &Matrix<'_>,
    queries: &Matrix<'_>,
    k: usize,
) -> Result<EvalResults> {
    let mut results = EvalResults {
        algorithm: index.summary().algorithm.clone(),
        k,
        recalls: Vec::with_capacity(queries.rows()),
        precisions: Vec::with_capacity(queries.rows()),
        ratios: Vec::with_capacity(queries.rows()),
        verifications: Vec::with_capacity(queries.rows()),
        latencies: Vec::with_capacity(queries.rows()),
    };

    let mut list = MaxKList::new(k);
    for query in queries.iter_rows() {
        let truth = ground_truth_mip(data, query, k);

        list.clear();
        let start = Instant::now();
        let verifications = index.kmip(query, k, &mut list)?;
        results.latencies.push(start.elapsed());

        let approx_ids = list.ids();
        let truth_ids: Vec<u32> = truth.iter().map(|&(id, _)| id).collect();
        let approx_ips: Vec<f32> = (0..list.len()).filter_map(|i| list.ith_score(i)).collect();
        let truth_ips: Vec<f32> = truth.iter().map(|&(_, ip)| ip).collect();

        results.recalls.push(recall_at_k(&approx_ids, &truth_ids, k));
        results
            .precisions
            .push(precision_at_k(&approx_ids, &truth_ids, k));
        results.ratios.push(mip_ratio(&approx_ips, &truth_ips));
        results.verifications.push(verifications);
    }

    Ok(results)
}
