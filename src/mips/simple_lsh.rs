//! Simple-LSH: normalized projection onto angular similarity.
//!
//! Neyshabur & Srebro (2015), "On symmetric and asymmetric LSHs for inner
//! product search", ICML.
//!
//! ```text
//! P(x) = [ x/M ; sqrt(1 - ‖x/M‖²) ]      ‖P(x)‖ = 1 for every x
//! Q(q) = [ q/‖q‖ ; 0 ]                    ‖Q(q)‖ = 1
//! ```
//!
//! so `cos(P(x), Q(q)) = ⟨x, q⟩ / (M·‖q‖)`: for a fixed query the cosine is
//! a positive multiple of the inner product, and sign random projection over
//! the augmented vectors ranks by inner product.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    check_query, check_ratio, global_max_norm, into_build_error, search_and_verify,
    BuildSummary, MipIndex,
};
use crate::ann::{KnnIndex, SimilarityIndexBuilder};
use crate::error::{AmipError, Result};
use crate::matrix::{AugmentedData, Matrix};
use crate::simd;
use crate::topk::TopK;

const NORM_EPSILON: f32 = 1e-12;

/// Simple-LSH build parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleLshParams {
    /// Number of hash tables (`K`).
    pub num_tables: usize,
    /// Sign bits concatenated per table (`L`, at most 64).
    pub bits_per_table: usize,
    /// Approximation ratio `c` handed to the similarity index.
    pub ratio: f32,
}

impl Default for SimpleLshParams {
    fn default() -> Self {
        Self {
            num_tables: 16,
            bits_per_table: 8,
            ratio: 2.0,
        }
    }
}

impl SimpleLshParams {
    pub fn validate(&self) -> Result<()> {
        if self.num_tables == 0 {
            return Err(AmipError::InvalidParameter(
                "number of hash tables K must be at least 1".to_string(),
            ));
        }
        if self.bits_per_table == 0 || self.bits_per_table > 64 {
            return Err(AmipError::InvalidParameter(format!(
                "hash layers L must be in 1..=64, got {}",
                self.bits_per_table
            )));
        }
        check_ratio(self.ratio)
    }
}

/// The Simple-LSH transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedProjection {
    dim: usize,
    inv_max_norm: f32,
}

impl NormalizedProjection {
    pub fn new(dim: usize, max_norm: f32) -> Self {
        Self {
            dim,
            inv_max_norm: 1.0 / max_norm,
        }
    }

    #[inline]
    pub fn augmented_dim(&self) -> usize {
        self.dim + 1
    }

    /// `P(x)`: scaled into the unit ball, completed to unit norm.
    pub fn transform_data(&self, x: &[f32], out: &mut [f32]) {
        debug_assert_eq!(x.len(), self.dim);
        debug_assert_eq!(out.len(), self.augmented_dim());
        let (head, last) = out.split_at_mut(self.dim);
        for (o, v) in head.iter_mut().zip(x) {
            *o = v * self.inv_max_norm;
        }
        let sq = simd::dot(head, head);
        last[0] = (1.0 - sq).max(0.0).sqrt();
    }

    /// `Q(q)`: unit-normalized, zero in the extra coordinate.
    pub fn transform_query(&self, q: &[f32], out: &mut [f32]) {
        debug_assert_eq!(q.len(), self.dim);
        debug_assert_eq!(out.len(), self.augmented_dim());
        let (head, last) = out.split_at_mut(self.dim);
        let n = simd::norm(q);
        if n > NORM_EPSILON {
            for (o, v) in head.iter_mut().zip(q) {
                *o = v / n;
            }
        } else {
            head.fill(0.0);
        }
        last[0] = 0.0;
    }
}

/// Simple-LSH engine over a caller-owned dataset.
#[derive(Debug)]
pub struct SimpleLsh<'a, I> {
    data: Matrix<'a>,
    params: SimpleLshParams,
    transform: NormalizedProjection,
    augmented: AugmentedData,
    index: I,
    summary: BuildSummary,
}

impl<'a, I: KnnIndex> SimpleLsh<'a, I> {
    /// Build the engine. `M` is taken over the dataset alone.
    pub fn build<B>(data: Matrix<'a>, params: SimpleLshParams, builder: &B) -> Result<Self>
    where
        B: SimilarityIndexBuilder<Index = I> + ?Sized,
    {
        params.validate()?;
        if data.is_empty() {
            return Err(AmipError::InvalidParameter(
                "dataset must contain at least one vector".to_string(),
            ));
        }

        let max_norm = global_max_norm(&[data])?;
        let transform = NormalizedProjection::new(data.dim(), max_norm);
        let augmented =
            AugmentedData::from_rows(data.rows(), transform.augmented_dim(), |i, row| {
                transform.transform_data(data.row(i), row)
            });

        let index = builder
            .build(
                augmented.shared(),
                augmented.rows(),
                augmented.dim(),
                params.num_tables,
                params.bits_per_table,
                params.ratio,
            )
            .map_err(into_build_error)?;

        let summary = BuildSummary {
            algorithm: "Simple-LSH".to_string(),
            n: data.rows(),
            dim: data.dim(),
            augmented_dim: transform.augmented_dim(),
            ratio: params.ratio,
            max_norm,
            extra_dims: None,
            target_scale: None,
            num_tables: Some(params.num_tables),
            bits_per_table: Some(params.bits_per_table),
        };
        info!(
            n = summary.n,
            d = summary.dim,
            k = params.num_tables,
            l = params.bits_per_table,
            c = params.ratio,
            max_norm,
            "built Simple-LSH index"
        );
        let stats = index.stats();
        debug!(
            backend = %stats.algorithm,
            points = stats.num_points,
            dim = stats.dimension,
            size_bytes = stats.size_bytes,
            "backend index ready"
        );

        Ok(Self {
            data,
            params,
            transform,
            augmented,
            index,
            summary,
        })
    }

    /// `Q(query)`.
    pub fn augment_query(&self, query: &[f32]) -> Result<Vec<f32>> {
        check_query(query, self.data.dim(), 1)?;
        let mut out = vec![0.0f32; self.transform.augmented_dim()];
        self.transform.transform_query(query, &mut out);
        Ok(out)
    }

    pub fn params(&self) -> &SimpleLshParams {
        &self.params
    }

    pub fn transform(&self) -> &NormalizedProjection {
        &self.transform
    }

    pub fn augmented(&self) -> &AugmentedData {
        &self.augmented
    }

    pub fn index(&self) -> &I {
        &self.index
    }
}

impl<I: KnnIndex> MipIndex for SimpleLsh<'_, I> {
    fn kmip<T: TopK + ?Sized>(
        &self,
        query: &[f32],
        top_k: usize,
        list: &mut T,
    ) -> Result<usize> {
        check_query(query, self.data.dim(), top_k)?;
        let mut augmented_query = vec![0.0f32; self.transform.augmented_dim()];
        self.transform.transform_query(query, &mut augmented_query);
        search_and_verify(
            &self.index,
            &self.data,
            &augmented_query,
            query,
            top_k,
            list,
        )
    }

    fn summary(&self) -> &BuildSummary {
        &self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ann::LinearScan;
    use crate::hash::Srp;
    use crate::topk::MaxKList;

    const DATA: [f32; 8] = [1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0];

    fn engine() -> SimpleLsh<'static, crate::ann::LinearScanIndex> {
        SimpleLsh::build(
            Matrix::from_flat(&DATA, 2).unwrap(),
            SimpleLshParams::default(),
            &LinearScan,
        )
        .unwrap()
    }

    #[test]
    fn augmented_data_has_unit_norm() {
        let e = engine();
        for i in 0..e.augmented().rows() {
            let n = simd::norm(e.augmented().row(i));
            assert!((n - 1.0).abs() < 1e-5, "row {i} has norm {n}");
        }
        // The max-norm point lands on the sphere with nothing left over.
        assert!(e.augmented().row(3)[2].abs() < 1e-3);
    }

    #[test]
    fn query_is_normalized_with_zero_tail() {
        let e = engine();
        let q = e.augment_query(&[3.0, 4.0]).unwrap();
        assert!((q[0] - 0.6).abs() < 1e-6 && (q[1] - 0.8).abs() < 1e-6);
        assert_eq!(q[2], 0.0);

        let z = e.augment_query(&[0.0, 0.0]).unwrap();
        assert_eq!(z, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn exact_backend_recovers_mip_order() {
        let e = engine();
        let mut list = MaxKList::new(2);
        let verifications = e.kmip(&[1.0, 1.0], 2, &mut list).unwrap();
        assert_eq!(list.ids(), vec![3, 2]);
        assert_eq!(verifications, 4 + 2);
    }

    #[test]
    fn srp_backend_builds_and_answers() {
        let e = SimpleLsh::build(
            Matrix::from_flat(&DATA, 2).unwrap(),
            SimpleLshParams {
                num_tables: 4,
                bits_per_table: 4,
                ratio: 2.0,
            },
            &Srp::default(),
        )
        .unwrap();
        assert_eq!(e.index().num_tables(), 4);

        let mut list = MaxKList::new(4);
        let v = e.kmip(&[1.0, 1.0], 4, &mut list).unwrap();
        assert_eq!(list.len(), 4);
        assert_eq!(list.ith_id(0), Some(3));
        assert_eq!(v, 4 + 4);
    }

    #[test]
    fn rejects_bad_hash_shape() {
        let data = Matrix::from_flat(&DATA, 2).unwrap();
        for params in [
            SimpleLshParams { num_tables: 0, ..Default::default() },
            SimpleLshParams { bits_per_table: 0, ..Default::default() },
            SimpleLshParams { bits_per_table: 65, ..Default::default() },
            SimpleLshParams { ratio: 0.5, ..Default::default() },
        ] {
            assert!(matches!(
                SimpleLsh::build(data, params, &LinearScan),
                Err(AmipError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn summary_records_hash_shape() {
        let e = engine();
        let s = e.summary();
        assert_eq!(s.algorithm, "Simple-LSH");
        assert_eq!(s.augmented_dim, 3);
        assert_eq!(s.num_tables, Some(16));
        assert_eq!(s.extra_dims, None);
        assert!((s.max_norm - 8.0f32.sqrt()).abs() < 1e-6);
    }
}
