//! Semantic registry and declaration builders.
//!
//! Turns the scanner's raw [`TagSet`](scriptbind_scanner::TagSet) into the
//! validated [`ApiRegistry`] the emitters consume:
//!
//! - [`registry`]: the registry itself: name universe, ordered declaration
//!   lists and lookup tables
//! - [`resolver`]: the two type-spelling front ends (engine C++ spellings and
//!   script annotation spellings) that both land on
//!   [`UnifiedType`](scriptbind_core::UnifiedType)
//! - [`builders`]: one builder per tag family, run in dependency order
//! - [`postprocess`]: synthesized per-entity enums and cross-declaration
//!   invariant checks

pub mod builders;
pub mod postprocess;
pub mod registry;
pub mod resolver;

pub use builders::build_registry;
pub use registry::ApiRegistry;
