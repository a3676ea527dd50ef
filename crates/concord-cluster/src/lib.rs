//! Concord Clustering Layer
//!
//! Groups raw claims that assert the same fact across documents. The design
//! is intentionally conservative: a missed merge costs a little redundancy,
//! a wrong merge corrupts the knowledge base, so every candidate pair must
//! survive strict validation (shared entities, matching deontic modality,
//! matching negation polarity, lexical overlap) before union-find joins it.

pub mod clusterer;
pub mod config;
pub mod modality;
pub mod similarity;
pub mod union_find;

pub use clusterer::{ClaimClusterer, ClusterOutcome};
pub use config::ClusterConfig;
pub use modality::{classify_modality, is_negated, Modality};
pub use similarity::{content_words, jaccard_similarity};
