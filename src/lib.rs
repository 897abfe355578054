//! amips: c-approximate maximum inner product search.
//!
//! Given a dataset `X ⊂ R^d` and a query `q`, find points whose inner product
//! `⟨x, q⟩` is within a factor of the best. Inner product is not a metric, so
//! this crate reduces the problem to nearest-neighbor search over transformed
//! vectors and re-ranks the candidates by their exact inner product:
//!
//! - `mips/`: the two reductions, L2-ALSH2 (norm augmentation, Euclidean
//!   backend) and Simple-LSH (normalized projection, angular backend)
//! - `hash/`: the hash backends they plug into (QALSH, sign random projection)
//! - `ann/`: the backend capability traits and an exact linear scan
//! - `topk/`: bounded result containers shared by both sides of a reduction
//! - `benchmark/`: ground truth, recall and ratio metrics, synthetic data
//!
//! # Critical Nuances
//!
//! ## Norms decide everything
//!
//! `⟨x, q⟩ = ‖x‖·‖q‖·cos θ`. A long vector at a mediocre angle beats a short
//! one pointing straight at the query, which is exactly what a Euclidean or
//! cosine index will not find on its own. Both reductions divide by the global
//! max norm `M` and then encode the *remaining* norm into extra coordinates, so
//! that the nearest transformed point is also the best inner product.
//!
//! ## The scale is frozen at build time
//!
//! `M` is computed once, over the data (and, for L2-ALSH2, a query sample).
//! Later queries are transformed with that same `M`, even if they are longer
//! than anything seen at build time. The guarantees assume the build-time
//! sample is representative.
//!
//! ## Cost is counted, not just timed
//!
//! Every search returns its number of *verifications*: the points the backend
//! examined plus `top_k` exact inner products in the re-ranking pass. This is
//! the quantity the hashing parameters trade against recall.

pub mod ann;
pub mod benchmark;
pub mod error;
pub mod hash;
pub mod matrix;
pub mod mips;
pub mod simd;
pub mod topk;

// Re-exports
pub use ann::traits::KnnIndex;
pub use error::{AmipError, Result};
pub use matrix::Matrix;
pub use mips::{L2Alsh2, L2Alsh2Params, MipIndex, SimpleLsh, SimpleLshParams};
pub use topk::{MaxKList, MinKList, TopK};
