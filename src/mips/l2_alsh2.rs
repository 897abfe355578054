//! L2-ALSH2: asymmetric norm augmentation onto Euclidean nearest neighbors.
//!
//! Shrivastava & Li (2014), "Asymmetric LSH (ALSH) for sublinear time
//! maximum inner product search (MIPS)", NIPS.
//!
//! With `s = U / M` and `r = ‖x‖·s`, `t = ‖q‖·s`:
//!
//! ```text
//! P(x) = [ s·x ; r², r⁴, …, r^(2^m) ; ½, …, ½ ]
//! Q(q) = [ s·q ; ½, …, ½ ; t², t⁴, …, t^(2^m) ]
//! ```
//!
//! Expanding the squared distance,
//!
//! ```text
//! ‖P(x) - Q(q)‖² = m/2 + Σ r^(2^(j+2)) + Σ t^(2^(j+2)) - 2s²·⟨x, q⟩
//! ```
//!
//! Since `r <= U < 1`, the norm-power sums vanish as `m` grows, so the
//! nearest augmented point approaches the largest inner product.
//!
//! The pad positions are swapped between the two sides. [`NormAugmentation`]
//! keeps the two layouts in separate functions so they cannot drift.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    check_query, check_ratio, global_max_norm, into_build_error, search_and_verify,
    BuildSummary, MipIndex,
};
use crate::ann::{EuclideanIndexBuilder, KnnIndex};
use crate::error::{AmipError, Result};
use crate::matrix::{AugmentedData, Matrix};
use crate::simd;
use crate::topk::TopK;

const PAD: f32 = 0.5;

/// L2-ALSH2 build parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct L2Alsh2Params {
    /// Number of norm-power coordinates `m` (the augmentation adds `2m`).
    pub m: usize,
    /// Target scale `U`: the largest rescaled norm.
    pub u: f32,
    /// Approximation ratio `c` handed to the Euclidean index.
    pub ratio: f32,
}

impl Default for L2Alsh2Params {
    fn default() -> Self {
        Self {
            m: 3,
            u: 0.83,
            ratio: 2.0,
        }
    }
}

impl L2Alsh2Params {
    pub fn validate(&self) -> Result<()> {
        if !(self.u.is_finite() && self.u > 0.0) {
            return Err(AmipError::InvalidParameter(format!(
                "target scale U must be positive and finite, got {}",
                self.u
            )));
        }
        check_ratio(self.ratio)?;
        // U^(2^m) must stay representable.
        let exponent = 2f64.powf(self.m as f64);
        if (self.u as f64).powf(exponent) > f32::MAX as f64 {
            return Err(AmipError::InvalidParameter(format!(
                "U = {} with m = {} overflows the norm-power coordinates",
                self.u, self.m
            )));
        }
        Ok(())
    }
}

/// The L2-ALSH2 transform: scale factor plus layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormAugmentation {
    dim: usize,
    m: usize,
    scale: f32,
}

impl NormAugmentation {
    pub fn new(dim: usize, m: usize, scale: f32) -> Self {
        Self { dim, m, scale }
    }

    #[inline]
    pub fn augmented_dim(&self) -> usize {
        self.dim + 2 * self.m
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// `P(x)`: rescaled vector, norm powers, then pads.
    pub fn transform_data(&self, x: &[f32], out: &mut [f32]) {
        debug_assert_eq!(x.len(), self.dim);
        debug_assert_eq!(out.len(), self.augmented_dim());
        let (head, tail) = out.split_at_mut(self.dim);
        let (powers, pads) = tail.split_at_mut(self.m);

        scale_into(x, self.scale, head);
        norm_powers(simd::norm(x) * self.scale, powers);
        pads.fill(PAD);
    }

    /// `Q(q)`: rescaled vector, pads, then norm powers.
    pub fn transform_query(&self, q: &[f32], out: &mut [f32]) {
        debug_assert_eq!(q.len(), self.dim);
        debug_assert_eq!(out.len(), self.augmented_dim());
        let (head, tail) = out.split_at_mut(self.dim);
        let (pads, powers) = tail.split_at_mut(self.m);

        scale_into(q, self.scale, head);
        pads.fill(PAD);
        norm_powers(simd::norm(q) * self.scale, powers);
    }
}

fn scale_into(v: &[f32], scale: f32, out: &mut [f32]) {
    for (o, x) in out.iter_mut().zip(v) {
        *o = x * scale;
    }
}

/// `out[j] = base^(2^(j+1))`, by repeated squaring.
fn norm_powers(base: f32, out: &mut [f32]) {
    let mut p = base;
    for slot in out {
        p *= p;
        *slot = p;
    }
}

/// L2-ALSH2 engine over a caller-owned dataset.
#[derive(Debug)]
pub struct L2Alsh2<'a, I> {
    data: Matrix<'a>,
    params: L2Alsh2Params,
    transform: NormAugmentation,
    augmented: AugmentedData,
    index: I,
    summary: BuildSummary,
}

impl<'a, I: KnnIndex> L2Alsh2<'a, I> {
    /// Build the engine.
    ///
    /// `queries` only contributes to the max norm `M`; it is not indexed or
    /// retained and may be empty, but must share the data dimension.
    pub fn build<B>(
        data: Matrix<'a>,
        queries: Matrix<'_>,
        params: L2Alsh2Params,
        builder: &B,
    ) -> Result<Self>
    where
        B: EuclideanIndexBuilder<Index = I> + ?Sized,
    {
        params.validate()?;
        if data.is_empty() {
            return Err(AmipError::InvalidParameter(
                "dataset must contain at least one vector".to_string(),
            ));
        }
        if queries.dim() != data.dim() {
            return Err(AmipError::DimensionMismatch {
                expected: data.dim(),
                actual: queries.dim(),
            });
        }

        let max_norm = global_max_norm(&[data, queries])?;
        let transform = NormAugmentation::new(data.dim(), params.m, params.u / max_norm);

        let augmented =
            AugmentedData::from_rows(data.rows(), transform.augmented_dim(), |i, row| {
                transform.transform_data(data.row(i), row)
            });

        let index = builder
            .build(
                augmented.shared(),
                augmented.rows(),
                augmented.dim(),
                params.ratio,
            )
            .map_err(into_build_error)?;

        let summary = BuildSummary {
            algorithm: "L2-ALSH2".to_string(),
            n: data.rows(),
            dim: data.dim(),
            augmented_dim: transform.augmented_dim(),
            ratio: params.ratio,
            max_norm,
            extra_dims: Some(params.m),
            target_scale: Some(params.u),
            num_tables: None,
            bits_per_table: None,
        };
        info!(
            n = summary.n,
            d = summary.dim,
            m = params.m,
            u = params.u,
            c = params.ratio,
            max_norm,
            "built L2-ALSH2 index"
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

    /// `Q(query)` under the build-time scale factor.
    pub fn augment_query(&self, query: &[f32]) -> Result<Vec<f32>> {
        check_query(query, self.data.dim(), 1)?;
        let mut out = vec![0.0f32; self.transform.augmented_dim()];
        self.transform.transform_query(query, &mut out);
        Ok(out)
    }

    pub fn params(&self) -> &L2Alsh2Params {
        &self.params
    }

    pub fn transform(&self) -> &NormAugmentation {
        &self.transform
    }

    pub fn augmented(&self) -> &AugmentedData {
        &self.augmented
    }

    pub fn index(&self) -> &I {
        &self.index
    }
}

impl<I: KnnIndex> MipIndex for L2Alsh2<'_, I> {
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
    use std::sync::Arc;

    use super::*;
    use crate::ann::{IndexStats, LinearScan, LinearScanIndex};
    use crate::topk::{MaxKList, MinKList};

    const SCENARIO: [f32; 8] = [1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0];

    fn scenario_params() -> L2Alsh2Params {
        L2Alsh2Params {
            m: 1,
            u: 0.9,
            ratio: 2.0,
        }
    }

    fn scenario_engine() -> L2Alsh2<'static, LinearScanIndex> {
        L2Alsh2::build(
            Matrix::from_flat(&SCENARIO, 2).unwrap(),
            Matrix::from_flat(&[1.0, 1.0], 2).unwrap(),
            scenario_params(),
            &LinearScan,
        )
        .unwrap()
    }

    /// Builder that always fails.
    struct Broken;

    impl EuclideanIndexBuilder for Broken {
        type Index = LinearScanIndex;

        fn build(&self, _: Arc<[f32]>, _: usize, _: usize, _: f32) -> Result<LinearScanIndex> {
            Err(AmipError::IndexBuild("out of buckets".to_string()))
        }
    }

    /// Index that reports a fixed examined count and answers with the first k ids.
    struct Fixed {
        examined: usize,
        n: usize,
    }

    impl KnnIndex for Fixed {
        fn knn(&self, _: f32, _: &[f32], k: usize, out: &mut MinKList) -> Result<usize> {
            for id in 0..k.min(self.n) {
                out.insert(id as f32, id as u32);
            }
            Ok(self.examined)
        }

        fn dimension(&self) -> usize {
            0
        }

        fn num_points(&self) -> usize {
            self.n
        }

        fn stats(&self) -> IndexStats {
            IndexStats {
                num_points: self.n,
                dimension: 0,
                size_bytes: 0,
                algorithm: "Fixed".to_string(),
            }
        }
    }

    struct FixedBuilder(usize);

    impl EuclideanIndexBuilder for FixedBuilder {
        type Index = Fixed;

        fn build(&self, _: Arc<[f32]>, n: usize, _: usize, _: f32) -> Result<Fixed> {
            Ok(Fixed {
                examined: self.0,
                n,
            })
        }
    }

    /// Index whose queries go wrong: either an error, or an id past the end.
    struct Faulty {
        stray_id: bool,
        n: usize,
    }

    impl KnnIndex for Faulty {
        fn knn(&self, _: f32, _: &[f32], _: usize, out: &mut MinKList) -> Result<usize> {
            if !self.stray_id {
                return Err(AmipError::IndexBuild("table evicted".to_string()));
            }
            out.insert(0.0, 0);
            out.insert(1.0, self.n as u32);
            Ok(2)
        }

        fn dimension(&self) -> usize {
            0
        }

        fn num_points(&self) -> usize {
            self.n
        }

        fn stats(&self) -> IndexStats {
            IndexStats {
                num_points: self.n,
                dimension: 0,
                size_bytes: 0,
                algorithm: "Faulty".to_string(),
            }
        }
    }

    struct FaultyBuilder {
        stray_id: bool,
    }

    impl EuclideanIndexBuilder for FaultyBuilder {
        type Index = Faulty;

        fn build(&self, _: Arc<[f32]>, n: usize, _: usize, _: f32) -> Result<Faulty> {
            Ok(Faulty {
                stray_id: self.stray_id,
                n,
            })
        }
    }

    fn faulty_engine(stray_id: bool) -> L2Alsh2<'static, Faulty> {
        L2Alsh2::build(
            Matrix::from_flat(&SCENARIO, 2).unwrap(),
            Matrix::empty(2).unwrap(),
            scenario_params(),
            &FaultyBuilder { stray_id },
        )
        .unwrap()
    }

    #[test]
    fn data_and_query_layouts_are_swapped() {
        let t = NormAugmentation::new(2, 2, 0.5);
        let v = [0.6f32, 0.8];
        let mut p = vec![0.0; 6];
        let mut q = vec![0.0; 6];
        t.transform_data(&v, &mut p);
        t.transform_query(&v, &mut q);

        // r = 1.0 * 0.5 -> powers 0.25, 0.0625
        assert_eq!(&p[..2], &[0.3, 0.4]);
        assert!((p[2] - 0.25).abs() < 1e-6 && (p[3] - 0.0625).abs() < 1e-6);
        assert_eq!(&p[4..], &[0.5, 0.5]);

        assert_eq!(&q[..2], &[0.3, 0.4]);
        assert_eq!(&q[2..4], &[0.5, 0.5]);
        assert!((q[4] - 0.25).abs() < 1e-6 && (q[5] - 0.0625).abs() < 1e-6);
    }

    #[test]
    fn scenario_ranks_largest_inner_product_first() {
        let engine = scenario_engine();
        let mut list = MaxKList::new(4);
        let verifications = engine.kmip(&[1.0, 1.0], 4, &mut list).unwrap();

        assert_eq!(list.ith_id(0), Some(3));
        assert!((list.ith_score(0).unwrap() - 4.0).abs() < 1e-6);
        // Linear scan examines all 4 points.
        assert_eq!(verifications, 4 + 4);
        assert!((engine.max_norm() - 8.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn augmented_rows_respect_the_scale_bound() {
        let engine = scenario_engine();
        let u = engine.params().u;
        for i in 0..engine.augmented().rows() {
            let row = engine.augmented().row(i);
            assert_eq!(row.len(), 4);
            assert!(simd::norm(&row[..2]) <= u + 1e-6);
            assert!(row[2] <= u * u + 1e-6);
            assert_eq!(row[3], 0.5);
        }
    }

    #[test]
    fn verification_count_is_examined_plus_top_k() {
        let data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let engine = L2Alsh2::build(
            Matrix::from_flat(&data, 2).unwrap(),
            Matrix::empty(2).unwrap(),
            L2Alsh2Params::default(),
            &FixedBuilder(17),
        )
        .unwrap();
        let mut list = MaxKList::new(2);
        assert_eq!(engine.kmip(&[1.0, 0.0], 2, &mut list).unwrap(), 17 + 2);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn index_failure_is_propagated() {
        let err = L2Alsh2::build(
            Matrix::from_flat(&SCENARIO, 2).unwrap(),
            Matrix::empty(2).unwrap(),
            scenario_params(),
            &Broken,
        )
        .unwrap_err();
        assert_eq!(err, AmipError::IndexBuild("out of buckets".to_string()));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let data = Matrix::from_flat(&SCENARIO, 2).unwrap();
        for params in [
            L2Alsh2Params { u: 0.0, ..scenario_params() },
            L2Alsh2Params { u: -1.0, ..scenario_params() },
            L2Alsh2Params { ratio: 1.0, ..scenario_params() },
            L2Alsh2Params { u: 10.0, m: 12, ratio: 2.0 },
        ] {
            let err = L2Alsh2::build(data, Matrix::empty(2).unwrap(), params, &LinearScan)
                .unwrap_err();
            assert!(matches!(err, AmipError::InvalidParameter(_)), "{err}");
        }

        let empty = Matrix::empty(2).unwrap();
        let no_queries = Matrix::empty(2).unwrap();
        assert!(L2Alsh2::build(empty, no_queries, scenario_params(), &LinearScan).is_err());
    }

    #[test]
    fn all_zero_input_is_degenerate() {
        let zeros = [0.0f32; 4];
        let err = L2Alsh2::build(
            Matrix::from_flat(&zeros, 2).unwrap(),
            Matrix::empty(2).unwrap(),
            scenario_params(),
            &LinearScan,
        )
        .unwrap_err();
        assert!(matches!(err, AmipError::DegenerateInput(_)));
    }

    #[test]
    fn query_dimension_mismatch_is_rejected() {
        let data = Matrix::from_flat(&SCENARIO, 2).unwrap();
        let queries = [1.0f32, 1.0, 1.0];
        assert!(matches!(
            L2Alsh2::build(
                data,
                Matrix::from_flat(&queries, 3).unwrap(),
                scenario_params(),
                &LinearScan
            ),
            Err(AmipError::DimensionMismatch { .. })
        ));

        let engine = scenario_engine();
        let mut list = MaxKList::new(1);
        assert!(engine.kmip(&[1.0], 1, &mut list).is_err());
        assert!(engine.kmip(&[1.0, 1.0], 0, &mut list).is_err());
    }

    #[test]
    fn empty_query_sample_must_match_dimension() {
        let data = Matrix::from_flat(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        let err = L2Alsh2::build(data, Matrix::empty(3).unwrap(), scenario_params(), &LinearScan)
            .unwrap_err();
        assert_eq!(
            err,
            AmipError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
        assert!(Matrix::empty(0).is_err());

        let engine =
            L2Alsh2::build(data, Matrix::empty(2).unwrap(), scenario_params(), &LinearScan)
                .unwrap();
        assert!((engine.max_norm() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn backend_query_error_surfaces_as_query_error() {
        let engine = faulty_engine(false);
        let mut list = MaxKList::new(2);
        list.insert(9.0, 7);

        let err = engine.kmip(&[1.0, 1.0], 2, &mut list).unwrap_err();
        assert!(matches!(err, AmipError::Query(_)), "{err}");
        assert!(!err.is_configuration());
        assert_eq!(list.ids(), vec![7]);
    }

    #[test]
    fn out_of_range_candidate_leaves_list_untouched() {
        let engine = faulty_engine(true);
        let mut list = MaxKList::new(3);
        list.insert(9.0, 7);

        let err = engine.kmip(&[1.0, 1.0], 2, &mut list).unwrap_err();
        assert!(matches!(err, AmipError::Query(_)), "{err}");
        assert!(err.to_string().contains("id 4"), "{err}");
        assert_eq!(list.ids(), vec![7]);
        assert_eq!(list.ith_score(0), Some(9.0));

        let mut fresh = MaxKList::new(2);
        assert!(engine.kmip(&[1.0, 1.0], 2, &mut fresh).is_err());
        assert!(fresh.is_empty());
    }

    #[test]
    fn unseen_large_query_uses_build_time_scale() {
        let engine = scenario_engine();
        let before = engine.max_norm();
        let q = engine.augment_query(&[30.0, 40.0]).unwrap();
        let scale = engine.transform().scale();

        assert!((q[0] - 30.0 * scale).abs() < 1e-4);
        assert!(simd::norm(&q[..2]) > engine.params().u);
        assert_eq!(engine.max_norm(), before);
    }
}
