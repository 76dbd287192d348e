//! Benchmark utilities for strata.
//!
//! - **Microbenchmarks**: single runtime operations (staging, commit, iteration, sorting)
//! - **Scenario benchmarks**: a particle workload exercising the full commit-then-run cycle
//! - **Memory tracking**: per-pool allocation counts through the memory resource hook
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p strata_bench
//!
//! # Run specific benchmark group
//! cargo bench -p strata_bench -- commit
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports.

pub mod components;
pub mod memory;
pub mod scenarios;
