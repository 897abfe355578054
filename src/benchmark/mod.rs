//! Evaluation utilities for c-AMIP search.
//!
//! - **Ground truth**: exact top-k inner products by linear scan
//! - **Accuracy**: recall@k, precision@k, and the *ratio*: how close the returned inner
//!   products come to the exact ones, rank by rank (1.0 is exact)
//! - **Cost**: verifications per query (the count `kmip` returns) and latency
//! - **Data**: seeded synthetic datasets with controlled norm spread
//!
//! MIP search is sensitive to the norm distribution: a handful of long vectors
//! dominate every top-k list. [`datasets::gaussian_with_norm_spread`] makes
//! that skew explicit, which is where the reductions' `M` scaling matters.

pub mod datasets;
pub mod evaluation;

pub use datasets::{gaussian_with_norm_spread, uniform_dataset, MipDataset};
pub use evaluation::{
    evaluate, ground_truth_mip, mip_ratio, precision_at_k, recall_at_k, EvalResults,
};
