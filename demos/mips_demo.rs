//! Maximum Inner Product Search, both ways
//!
//! Builds L2-ALSH2 (over QALSH) and Simple-LSH (over SRP) on the same
//! skewed-norm dataset and compares them against exact search.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example mips_demo --release
//! ```

use amips::benchmark::{evaluate, gaussian_with_norm_spread, ground_truth_mip};
use amips::hash::{Qalsh, QalshParams, Srp};
use amips::mips::{L2Alsh2, L2Alsh2Params, MipIndex, SimpleLsh, SimpleLshParams};

fn main() -> amips::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // 2000 points in 32-d, norms spread over [1, 5]: long vectors win.
    let ds = gaussian_with_norm_spread(2000, 20, 32, 4.0, 42);
    let data = ds.data_matrix()?;
    let queries = ds.query_matrix()?;
    let k = 10;

    // 1. L2-ALSH2: append norm powers, search in Euclidean space.
    //    - m=3 extra power coordinates, U=0.83 target scale
    //    - QALSH verifies up to 200 false positives per query
    let l2 = L2Alsh2::build(
        data,
        queries,
        L2Alsh2Params::default(),
        &Qalsh::new(QalshParams {
            candidate_budget: 200,
            ..Default::default()
        }),
    )?;

    // 2. Simple-LSH: push everything onto the unit sphere, search by angle.
    let simple = SimpleLsh::build(
        data,
        SimpleLshParams {
            num_tables: 32,
            bits_per_table: 10,
            ratio: 2.0,
        },
        &Srp::default(),
    )?;

    println!("Build-time max norm M: {:.3}", l2.max_norm());

    // 3. One query, side by side.
    let q = queries.row(0);
    let exact = ground_truth_mip(&data, q, 5);
    println!("\nExact top 5:");
    for (id, ip) in &exact {
        println!("  id={id:4}, ip={ip:.4}");
    }
    println!("L2-ALSH2 top 5:");
    for (id, ip) in l2.search(q, 5)? {
        println!("  id={id:4}, ip={ip:.4}");
    }
    println!("Simple-LSH top 5:");
    for (id, ip) in simple.search(q, 5)? {
        println!("  id={id:4}, ip={ip:.4}");
    }

    // 4. Aggregate quality and cost.
    println!();
    println!("{}", evaluate(&l2, &data, &queries, k)?.summary());
    println!("{}", evaluate(&simple, &data, &queries, k)?.summary());

    Ok(())
}
