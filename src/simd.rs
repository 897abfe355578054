//! Dense vector kernels.
//!
//! Every engine and backend in the crate funnels its arithmetic through these
//! functions. With the `innr` feature (default) they are the SIMD kernels of
//! the `innr` crate; otherwise a portable fallback written over
//! `chunks_exact(4)` with independent accumulators, which the compiler can
//! auto-vectorize on stable Rust.
//!
//! Both sides expect slices of equal length.
//!
//! ```rust
//! use amips::simd::{dot, norm};
//!
//! let a = [3.0_f32, 4.0];
//! assert!((norm(&a) - 5.0).abs() < 1e-6);
//! assert!((dot(&a, &a) - 25.0).abs() < 1e-5);
//! ```

#[cfg(feature = "innr")]
pub use innr::{cosine, dot, l2_distance, l2_distance_squared, norm};

#[cfg(not(feature = "innr"))]
mod fallback {
    //! Portable kernels for builds without `innr`.

    const NORM_EPSILON: f32 = 1e-9;

    /// Dot product of two vectors.
    #[inline]
    #[must_use]
    pub fn dot(a: &[f32], b: &[f32]) -> f32 {
        let n = a.len().min(b.len());
        let (a, b) = (&a[..n], &b[..n]);

        let mut acc = [0.0f32; 4];
        let ca = a.chunks_exact(4);
        let cb = b.chunks_exact(4);
        let (ra, rb) = (ca.remainder(), cb.remainder());
        for (x, y) in ca.zip(cb) {
            acc[0] += x[0] * y[0];
            acc[1] += x[1] * y[1];
            acc[2] += x[2] * y[2];
            acc[3] += x[3] * y[3];
        }
        let tail: f32 = ra.iter().zip(rb).map(|(x, y)| x * y).sum();
        (acc[0] + acc[1]) + (acc[2] + acc[3]) + tail
    }

    /// L2 norm of a vector.
    #[inline]
    #[must_use]
    pub fn norm(v: &[f32]) -> f32 {
        dot(v, v).sqrt()
    }

    /// Squared L2 distance (monotone in L2, cheaper to compare).
    #[inline]
    #[must_use]
    pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
        let n = a.len().min(b.len());
        let (a, b) = (&a[..n], &b[..n]);

        let mut acc = [0.0f32; 4];
        let ca = a.chunks_exact(4);
        let cb = b.chunks_exact(4);
        let (ra, rb) = (ca.remainder(), cb.remainder());
        for (x, y) in ca.zip(cb) {
            for lane in 0..4 {
                let d = x[lane] - y[lane];
                acc[lane] += d * d;
            }
        }
        let tail: f32 = ra
            .iter()
            .zip(rb)
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum();
        (acc[0] + acc[1]) + (acc[2] + acc[3]) + tail
    }

    /// L2 (Euclidean) distance.
    #[inline]
    #[must_use]
    pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
        l2_distance_squared(a, b).sqrt()
    }

    /// Cosine similarity; zero when either side has (near) zero norm.
    #[inline]
    #[must_use]
    pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let na = norm(a);
        let nb = norm(b);
        if na > NORM_EPSILON && nb > NORM_EPSILON {
            dot(a, b) / (na * nb)
        } else {
            0.0
        }
    }
}

#[cfg(not(feature = "innr"))]
pub use fallback::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_basic() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [4.0_f32, 5.0, 6.0];
        assert!((dot(&a, &b) - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_crosses_chunk_boundary() {
        let a: Vec<f32> = (0..11).map(|i| i as f32).collect();
        let expected: f32 = a.iter().map(|x| x * x).sum();
        assert!((dot(&a, &a) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_norm() {
        assert!((norm(&[3.0_f32, 4.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_zero() {
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!(cosine(&[0.0, 0.0], &[1.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_l2_distance() {
        let a = [0.0_f32, 0.0, 0.0, 0.0, 1.0];
        let b = [3.0_f32, 4.0, 0.0, 0.0, 1.0];
        assert!((l2_distance(&a, &b) - 5.0).abs() < 1e-6);
        assert!((l2_distance_squared(&a, &b) - 25.0).abs() < 1e-5);
    }

    #[test]
    fn test_kernels_match_scalar_reference() {
        // Odd lengths exercise both the vector body and the remainder.
        for len in [1usize, 7, 16, 37] {
            let a: Vec<f32> = (0..len).map(|i| (i as f32 * 0.7).sin()).collect();
            let b: Vec<f32> = (0..len).map(|i| (i as f32 * 1.3).cos()).collect();
            let dot_ref: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
            let l2_ref: f32 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();
            let norm_ref = a.iter().map(|x| x * x).sum::<f32>().sqrt();

            assert!((dot(&a, &b) - dot_ref).abs() < 1e-4, "dot, len {len}");
            assert!((l2_distance_squared(&a, &b) - l2_ref).abs() < 1e-4, "l2, len {len}");
            assert!((norm(&a) - norm_ref).abs() < 1e-4, "norm, len {len}");
        }
    }
}
