//! Worker threads for running systems in parallel.

mod executor;

pub use executor::{Executor, Scope};
