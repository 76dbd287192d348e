//! `strata`: a range-addressed entity component system.
//!
//! Entities are plain integer ids. Components live in per-type pools addressed by inclusive
//! entity ranges, and systems are ordinary functions whose arguments name the components they
//! need. See [`ecs::Runtime`] for the commit-then-run cycle.

// Lets `::strata::...` paths emitted by the derive macros resolve inside this crate.
extern crate self as strata;

pub mod core;
pub mod ecs;
