//! Reductions from maximum inner product search to nearest-neighbor search.
//!
//! Inner product is not a metric, so MIP search cannot use a metric index
//! directly. Both engines here transform the dataset once and every query on
//! the fly so that a nearest-neighbor index over the transformed vectors ranks
//! points approximately by their original inner product:
//!
//! | Engine | Transform | Backend |
//! |--------|-----------|---------|
//! | [`L2Alsh2`] | rescale, append norm powers and 1/2 pads (asymmetric) | Euclidean c-ANN |
//! | [`SimpleLsh`] | normalize by max norm, append `sqrt(1 - ‖x‖²)` | Angular (SRP) |
//!
//! Every engine follows the same pipeline:
//!
//! 1. **build**: validate, compute the global max norm `M`, write the
//!    augmented dataset into one contiguous buffer, build the index over it.
//! 2. **query**: transform the query with the *build-time* `M`, ask the
//!    index for `top_k` candidates, re-score each candidate by its exact
//!    inner product with the original query and insert it into the caller's
//!    [`TopK`] container.
//! 3. **account**: report `examined + top_k` exact evaluations.
//!
//! An engine value only exists once built, and dropping it releases the
//! augmented buffer and the index; there is no unbuilt or half-built state to
//! query.
//!
//! # Example
//!
//! ```rust
//! use amips::ann::LinearScan;
//! use amips::matrix::Matrix;
//! use amips::mips::{L2Alsh2, L2Alsh2Params, MipIndex};
//! use amips::topk::{MaxKList, TopK};
//!
//! # fn main() -> amips::Result<()> {
//! let data = [1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0];
//! let queries = [1.0, 1.0];
//! let params = L2Alsh2Params { m: 1, u: 0.9, ratio: 2.0 };
//!
//! let engine = L2Alsh2::build(
//!     Matrix::from_flat(&data, 2)?,
//!     Matrix::from_flat(&queries, 2)?,
//!     params,
//!     &LinearScan,
//! )?;
//!
//! let mut list = MaxKList::new(4);
//! engine.kmip(&[1.0, 1.0], 4, &mut list)?;
//! assert_eq!(list.ith_id(0), Some(3));
//! # Ok(())
//! # }
//! ```

pub mod l2_alsh2;
pub mod simple_lsh;

pub use l2_alsh2::{L2Alsh2, L2Alsh2Params, NormAugmentation};
pub use simple_lsh::{NormalizedProjection, SimpleLsh, SimpleLshParams};

use serde::{Deserialize, Serialize};

use crate::ann::KnnIndex;
use crate::error::{AmipError, Result};
use crate::matrix::Matrix;
use crate::simd;
use crate::topk::{MaxKList, MinKList, TopK};

/// Shared query contract of the MIP engines.
pub trait MipIndex {
    /// c-k-AMIP search.
    ///
    /// Inserts up to `top_k` `(inner product, id)` pairs into `list` and
    /// returns the number of verifications performed: the points the index
    /// examined plus `top_k` for the exact re-scoring pass.
    fn kmip<T: TopK + ?Sized>(&self, query: &[f32], top_k: usize, list: &mut T)
        -> Result<usize>;

    /// Parameters and statistics fixed at build time.
    fn summary(&self) -> &BuildSummary;

    /// The global scale statistic `M`.
    fn max_norm(&self) -> f32 {
        self.summary().max_norm
    }

    /// Convenience wrapper around [`kmip`](Self::kmip) returning `(id, inner product)`
    /// pairs, best first.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(u32, f32)>> {
        let mut list = MaxKList::new(top_k);
        self.kmip(query, top_k, &mut list)?;
        Ok(list.iter().collect())
    }
}

/// Build-time diagnostics: the parameter dump of an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub algorithm: String,
    /// Number of data points.
    pub n: usize,
    /// Original dimension.
    pub dim: usize,
    /// Dimension after augmentation.
    pub augmented_dim: usize,
    /// Approximation ratio `c`.
    pub ratio: f32,
    /// Global max norm `M`.
    pub max_norm: f32,
    /// Extra norm-power dimensions `m` (L2-ALSH2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_dims: Option<usize>,
    /// Target scale `U` (L2-ALSH2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_scale: Option<f32>,
    /// Hash tables `K` (Simple-LSH).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_tables: Option<usize>,
    /// Sign bits per table `L` (Simple-LSH).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits_per_table: Option<usize>,
}

/// Largest Euclidean norm over all `sets`.
///
/// Fails on a non-finite norm and on a maximum of zero, since the scale
/// factor divides by it.
pub(crate) fn global_max_norm(sets: &[Matrix<'_>]) -> Result<f32> {
    let mut max = 0.0f32;
    for set in sets.iter().filter(|s| !s.is_empty()) {
        for (i, row) in set.iter_rows().enumerate() {
            let n = simd::norm(row);
            if !n.is_finite() {
                return Err(AmipError::DegenerateInput(format!(
                    "vector {i} has a non-finite norm"
                )));
            }
            max = max.max(n);
        }
    }
    if max <= 0.0 {
        return Err(AmipError::DegenerateInput(
            "every vector has zero norm; max norm M would be 0".to_string(),
        ));
    }
    Ok(max)
}

pub(crate) fn check_query(query: &[f32], dim: usize, top_k: usize) -> Result<()> {
    if top_k == 0 {
        return Err(AmipError::InvalidParameter(
            "top_k must be at least 1".to_string(),
        ));
    }
    if query.len() != dim {
        return Err(AmipError::DimensionMismatch {
            expected: dim,
            actual: query.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_ratio(ratio: f32) -> Result<()> {
    if !(ratio.is_finite() && ratio > 1.0) {
        return Err(AmipError::InvalidParameter(format!(
            "approximation ratio must be finite and > 1, got {ratio}"
        )));
    }
    Ok(())
}

/// Ask `index` for candidates of `augmented_query`, then re-score them
/// against the original `query` into `list`.
pub(crate) fn search_and_verify<I, T>(
    index: &I,
    data: &Matrix<'_>,
    augmented_query: &[f32],
    query: &[f32],
    top_k: usize,
    list: &mut T,
) -> Result<usize>
where
    I: KnnIndex + ?Sized,
    T: TopK + ?Sized,
{
    let mut nn = MinKList::new(top_k);
    let examined = index
        .knn(f32::INFINITY, augmented_query, top_k, &mut nn)
        .map_err(|e| match e {
            AmipError::Query(_) => e,
            other => AmipError::Query(other.to_string()),
        })?;

    // Reject a bad id before touching `list`, so a failed query leaves it as it was.
    if let Some((id, _)) = nn.iter().find(|&(id, _)| id as usize >= data.rows()) {
        return Err(AmipError::Query(format!(
            "index returned id {id} for a dataset of {} points",
            data.rows()
        )));
    }
    for (id, _) in nn.iter() {
        let ip = simd::dot(data.row(id as usize), query);
        list.insert(ip, id);
    }

    Ok(examined + top_k)
}

/// Wrap backend build failures so configuration errors stay distinguishable.
pub(crate) fn into_build_error(e: AmipError) -> AmipError {
    match e {
        AmipError::IndexBuild(_) | AmipError::InvalidParameter(_) => e,
        other => AmipError::IndexBuild(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_norm_spans_every_set() {
        let data = [3.0f32, 4.0, 0.0, 1.0];
        let queries = [6.0f32, 8.0];
        let m = global_max_norm(&[
            Matrix::from_flat(&data, 2).unwrap(),
            Matrix::from_flat(&queries, 2).unwrap(),
        ])
        .unwrap();
        assert!((m - 10.0).abs() < 1e-6);
    }

    #[test]
    fn max_norm_skips_empty_sets() {
        let data = [3.0f32, 4.0];
        let m = global_max_norm(&[
            Matrix::from_flat(&data, 2).unwrap(),
            Matrix::empty(7).unwrap(),
        ])
        .unwrap();
        assert!((m - 5.0).abs() < 1e-6);
        assert!(global_max_norm(&[Matrix::empty(2).unwrap()]).is_err());
    }

    #[test]
    fn max_norm_rejects_all_zero_and_nan() {
        let zeros = [0.0f32; 6];
        assert!(matches!(
            global_max_norm(&[Matrix::from_flat(&zeros, 3).unwrap()]),
            Err(AmipError::DegenerateInput(_))
        ));
        let nan = [1.0f32, f32::NAN];
        assert!(matches!(
            global_max_norm(&[Matrix::from_flat(&nan, 2).unwrap()]),
            Err(AmipError::DegenerateInput(_))
        ));
    }

    #[test]
    fn query_checks() {
        assert!(check_query(&[1.0, 2.0], 2, 1).is_ok());
        assert!(check_query(&[1.0, 2.0], 2, 0).is_err());
        assert!(matches!(
            check_query(&[1.0], 2, 1),
            Err(AmipError::DimensionMismatch { .. })
        ));
        assert!(check_ratio(1.0).is_err());
        assert!(check_ratio(f32::INFINITY).is_err());
        assert!(check_ratio(1.5).is_ok());
    }

    #[test]
    fn summary_omits_unused_fields() {
        let s = BuildSummary {
            algorithm: "L2-ALSH2".to_string(),
            n: 4,
            dim: 2,
            augmented_dim: 4,
            ratio: 2.0,
            max_norm: 2.5,
            extra_dims: Some(1),
            target_scale: Some(0.9),
            num_tables: None,
            bits_per_table: None,
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["extra_dims"], 1);
        assert!(json.get("num_tables").is_none());
    }
}
