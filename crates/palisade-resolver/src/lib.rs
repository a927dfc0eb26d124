//! # Palisade Profile Resolver
//!
//! The algorithmic core of the compiler: flattening a profile's
//! inheritance chain and control references into one concrete rule set
//! with effective variable values.
//!
//! ## Layer order
//!
//! Resolution applies strictly ordered layers, each overriding the prior
//! for overlapping variable keys, with rule membership a pure union until
//! the final exclusion step:
//!
//! 1. the recursively resolved parent (`extends`), if any
//! 2. each referenced control, in declared order
//! 3. the profile's own selections, inline refinements winning
//!    unconditionally
//! 4. the profile's exclusions — applied last and absolute, removing a
//!    rule no matter which layer introduced it
//!
//! ## Memoization
//!
//! A [`Resolver`] memoizes per profile id with a tagged state
//! (resolving / resolved / failed), which makes the extends-graph a safe
//! DAG traversal: a parent shared by several children is computed once,
//! a parent that failed reports the same error to every child without
//! recomputation, and an id re-encountered while still resolving is a
//! cycle.
//!
//! ## Batch orchestration
//!
//! [`resolve_batch`] loads many sources, builds the id-to-profile
//! registry, and resolves every profile, collecting per-source and
//! per-profile failures instead of aborting: a handful of malformed draft
//! profiles must never stop the rest of a build.

mod error;
mod orchestrator;
mod resolver;

pub use error::ResolutionError;
pub use orchestrator::{
    load_registry, resolve_batch, resolve_registry, BatchError, BatchOutcome, Failure,
};
pub use resolver::{Registry, Resolver};
