//! Concord Consolidation Layer
//!
//! Projects raw claims onto canonical claims: one row per (subject, kind,
//! scope) group with a representative value and a maturity label summarizing
//! how much independent corroboration the group has. The projection is pure
//! and idempotent - run it twice over the same raw claims and the output is
//! identical, so it can be recomputed at any time.

pub mod config;
pub mod consolidator;

pub use config::ConsolidatorConfig;
pub use consolidator::Consolidator;
