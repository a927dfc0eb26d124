//! # Palisade Core Types
//!
//! Data model shared by every layer of the profile compiler.
//!
//! ## Overview
//!
//! A [`Profile`] names a set of configuration rules to check or enforce,
//! possibly inheriting from a parent profile (`extends`) and pulling in
//! reusable [`Control`] baselines (e.g. a "moderate impact level").
//! Resolution flattens both graphs into a [`ResolvedProfile`]: one concrete
//! rule set plus effective variable values.
//!
//! All entities here are immutable after construction. Profiles and
//! controls are built once by their loaders and never mutated during
//! resolution; a `ResolvedProfile` is produced once per profile and is safe
//! to share across threads.
//!
//! ## Key Components
//!
//! - [`Profile`]: a layered rule-set definition
//! - [`Selection`]: a rule reference, optionally refined as `rule_id=value`
//! - [`Control`]: a reusable, possibly nested baseline of selections
//! - [`ControlStatus`]: coverage tag on a control, reporting-only
//! - [`ResolvedProfile`]: the flattened output of resolution
//! - [`SubstitutionContext`]: product-specific placeholder expansion

mod control;
mod profile;
mod resolved;
mod substitution;

pub use control::{Control, ControlId, ControlStatus};
pub use profile::{Profile, Selection, SelectionParseError};
pub use resolved::ResolvedProfile;
pub use substitution::{expand_optional, SubstitutionContext, SubstitutionError};
