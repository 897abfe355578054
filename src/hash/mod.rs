//! Hash-based nearest-neighbor backends for the MIP reductions.
//!
//! Both backends project vectors onto random Gaussian directions. They differ
//! in what they keep from the projection:
//!
//! | Backend | Keeps | Similarity | Used by |
//! |---------|-------|------------|---------|
//! | [QALSH][qalsh] | raw projection value | Euclidean | L2-ALSH2 |
//! | [SRP][srp] | sign of the projection | Angular | Simple-LSH |
//!
//! ## QALSH: query-aware buckets
//!
//! Classic E2LSH fixes bucket boundaries at index time with a random offset,
//! so a query that lands near a boundary misses its neighbors. QALSH (Huang et
//! al., 2015) keeps the sorted projections instead and centers each bucket on
//! the query:
//!
//! ```text
//! h(o) = a·o,   o collides with q  iff  |h(o) - h(q)| <= w·R/2
//! ```
//!
//! A point becomes a candidate once it collides in at least `l` of `m`
//! functions. Widening `R` by the ratio `c` each round ("virtual rehashing")
//! searches radius `R, cR, c²R, ...` without rebuilding anything.
//!
//! ## SRP: sign random projection
//!
//! Charikar (2002): for a Gaussian direction `r`,
//!
//! ```text
//! P[sign(r·a) = sign(r·b)] = 1 - θ(a,b)/π
//! ```
//!
//! Concatenating `L` signs into a key and repeating over `K` tables gives the
//! usual AND/OR amplification.
//!
//! ## References
//!
//! - Huang, Feng, Zhang, Fang, Ng (2015). "Query-aware locality-sensitive
//!   hashing for approximate nearest neighbor search." VLDB.
//! - Charikar (2002). "Similarity estimation techniques from rounding algorithms."

pub mod qalsh;
pub mod srp;

pub use qalsh::{Qalsh, QalshIndex, QalshParams};
pub use srp::{Srp, SrpIndex, SrpParams};

use rand::Rng;

/// Standard normal sample via Box-Muller.
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    // 1 - U keeps u1 in (0, 1] so ln() stays finite.
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32
}

/// `dims` Gaussian directions of length `dim`, row-major.
pub(crate) fn gaussian_projections<R: Rng + ?Sized>(
    rng: &mut R,
    dims: usize,
    dim: usize,
) -> Vec<f32> {
    (0..dims * dim).map(|_| gaussian(rng)).collect()
}
