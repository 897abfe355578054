//! Nearest-neighbor backends consumed by the MIP reductions.
//!
//! The reductions never look inside an index. They need two things:
//!
//! - a builder that ingests the augmented dataset exactly once
//!   ([`EuclideanIndexBuilder`] for L2 backends, [`SimilarityIndexBuilder`]
//!   for sign-projection backends), and
//! - a [`KnnIndex`] that, given a transformed query, fills a
//!   [`MinKList`](crate::topk::MinKList) with its best candidates and reports
//!   how many points it examined.
//!
//! [`LinearScanIndex`] is the exact reference backend. It examines every
//! point, which makes it the natural stand-in when testing a reduction in
//! isolation from hashing error.

pub mod linear;
pub mod traits;

pub use linear::{LinearScan, LinearScanIndex, ScanMetric};
pub use traits::{EuclideanIndexBuilder, IndexStats, KnnIndex, SimilarityIndexBuilder};
