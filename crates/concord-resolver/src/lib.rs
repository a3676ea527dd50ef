//! Concord Subject Resolution Layer
//!
//! Maps raw subject mentions to stable canonical identities, or creates new
//! ones. Resolution is an explicit ordered list of strategies, each tried in
//! turn and short-circuited on the first success:
//!
//! 1. exact match (normalized) against canonical names and explicit aliases
//! 2. exact match against learned aliases
//! 3. embedding similarity, gated by a threshold *and* a runner-up delta -
//!    a high score with a close runner-up is `Ambiguous`, never auto-linked
//! 4. creation of a new subject, gated by a validity filter
//!
//! Two existing subjects are never merged here; at most, a possible
//! equivalence is suggested for human review.

pub mod config;
pub mod resolver;
pub mod strategies;

pub use config::ResolverConfig;
pub use resolver::{MatchType, Resolution, ResolutionStatus, ResolverError, SubjectResolver};
