//! HNSW Vector Index for Subject Candidate Search
//!
//! This module wraps the HNSW algorithm for efficient nearest-neighbor
//! search over subject embeddings, so embedding-based resolution does not
//! scan every subject linearly.
//!
//! # Architecture
//!
//! - In-memory index, rebuildable from the SQLite store on startup
//! - Separated from SQLite for query performance
//!
//! # HNSW Parameters
//!
//! - **M**: number of bi-directional links per node (default: 16)
//! - **efConstruction**: candidate list size during construction (default: 200)
//! - **efSearch**: candidate list size during search (passed per query)

use concord_domain::SubjectId;
use hnsw_rs::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Default HNSW parameters, tuned for 384-dimensional embeddings
const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_MAX_ELEMENTS: usize = 1_000_000;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// Internal HNSW error
    #[error("HNSW error: {0}")]
    Internal(String),
}

/// A wrapper around HNSW for subject similarity search
///
/// Stores (subject_id, embedding) pairs and answers k-nearest-neighbor
/// queries with cosine distance.
///
/// # Examples
///
/// ```no_run
/// use concord_store::vector_index::VectorIndex;
/// use concord_domain::SubjectId;
///
/// let index = VectorIndex::new(384);
/// let subject_id = SubjectId::new();
/// let embedding = vec![0.1; 384];
/// index.add(subject_id, &embedding).unwrap();
///
/// let results = index.search(&embedding, 5, 64).unwrap();
/// ```
pub struct VectorIndex {
    /// Expected embedding dimension
    dimension: usize,

    /// HNSW index (wrapped in Arc<Mutex> for thread-safe access)
    hnsw: Arc<Mutex<Hnsw<'static, f32, DistCosine>>>,

    /// Mapping from internal HNSW ids to SubjectIds
    id_map: Arc<Mutex<HashMap<usize, SubjectId>>>,

    /// Counter for the next internal id
    next_id: Arc<Mutex<usize>>,
}

impl VectorIndex {
    /// Create a new vector index with the specified dimension
    pub fn new(dimension: usize) -> Self {
        let nb_layer = 16.min((DEFAULT_MAX_ELEMENTS as f32).ln().trunc() as usize);

        let hnsw = Hnsw::<'static, f32, DistCosine>::new(
            DEFAULT_M,
            DEFAULT_MAX_ELEMENTS,
            nb_layer,
            DEFAULT_EF_CONSTRUCTION,
            DistCosine {},
        );

        Self {
            dimension,
            hnsw: Arc::new(Mutex::new(hnsw)),
            id_map: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(0)),
        }
    }

    /// The dimension this index expects
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Add a subject embedding to the index
    pub fn add(&self, subject_id: SubjectId, embedding: &[f32]) -> Result<(), VectorIndexError> {
        if embedding.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let mut next_id = self
            .next_id
            .lock()
            .map_err(|e| VectorIndexError::Internal(e.to_string()))?;
        let internal_id = *next_id;
        *next_id += 1;
        drop(next_id);

        let mut id_map = self
            .id_map
            .lock()
            .map_err(|e| VectorIndexError::Internal(e.to_string()))?;
        id_map.insert(internal_id, subject_id);
        drop(id_map);

        let embedding_vec = embedding.to_vec();
        let hnsw = self
            .hnsw
            .lock()
            .map_err(|e| VectorIndexError::Internal(e.to_string()))?;
        hnsw.insert((&embedding_vec, internal_id));

        Ok(())
    }

    /// Search for the k nearest neighbors to the given embedding
    ///
    /// Returns (SubjectId, similarity) pairs sorted by similarity descending.
    /// Cosine distance d maps to similarity 1 - d.
    pub fn search(
        &self,
        embedding: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(SubjectId, f32)>, VectorIndexError> {
        if embedding.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let hnsw = self
            .hnsw
            .lock()
            .map_err(|e| VectorIndexError::Internal(e.to_string()))?;
        let neighbors = hnsw.search(embedding, k, ef_search);
        drop(hnsw);

        let id_map = self
            .id_map
            .lock()
            .map_err(|e| VectorIndexError::Internal(e.to_string()))?;

        let mut results: Vec<(SubjectId, f32)> = neighbors
            .iter()
            .filter_map(|n| {
                id_map
                    .get(&n.d_id)
                    .map(|subject_id| (*subject_id, 1.0 - n.distance))
            })
            .collect();
        results.sort_by(|(ia, sa), (ib, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ia.cmp(ib))
        });

        Ok(results)
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.id_map.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
