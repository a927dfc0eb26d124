//! # Palisade Control Store
//!
//! Loads a directory of control-policy definitions into an indexed,
//! cycle-checked registry and expands nested control references into flat
//! rule/variable sets.
//!
//! ## Source layout
//!
//! Each YAML file in the controls directory is one *policy* document: a
//! policy `id` plus a flat list of control entries. A control's registry
//! key is `policy:control`; a bare name in an `includes` list is qualified
//! against the enclosing policy, while an id already containing `:`
//! crosses into another policy as written.
//!
//! ## Expansion
//!
//! Every control is expanded exactly once, at load: `includes` targets are
//! merged first in declared order (a later include overrides an earlier
//! one for overlapping variables), then the control's own selections and
//! variables are applied on top — local always wins. An include chain that
//! re-enters a control still being expanded is a fatal
//! [`ControlError::CyclicIncludes`]: controls are shared, author-maintained
//! infrastructure, and a cycle there is a build-breaking defect rather
//! than a per-profile condition.

mod error;
mod store;

pub use error::ControlError;
pub use store::{ControlExpansion, ControlStore};
