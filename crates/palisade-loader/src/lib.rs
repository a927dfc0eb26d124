//! # Palisade Profile Loader
//!
//! Parses one profile source document into an immutable
//! [`palisade_types::Profile`], expanding product-specific placeholders
//! along the way, and discovers profile sources under a product's profile
//! root.
//!
//! The loader is deliberately single-document: it fails with a
//! [`ParseError`] for the one source it was given and never aggregates.
//! Batch behavior — skipping malformed sources and carrying on — belongs
//! to the resolution orchestrator, which records each loader failure and
//! continues with the rest.

mod discover;
mod error;
mod load;

pub use discover::discover_profiles;
pub use error::{ParseError, ParseErrorKind};
pub use load::{load_file, load_str};
