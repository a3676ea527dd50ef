//! Background worker for periodic reconsolidation

use crate::engine::Engine;
use crate::error::EngineError;
use concord_domain::traits::{ClaimStore, GraphStore, SubjectStore};
use tokio::time::{interval, Duration};

/// Background worker that re-derives clusters and canonical claims
///
/// Both derivations are idempotent projections of the raw claim snapshot,
/// so re-running them periodically is always safe: late-arriving documents
/// fold in, and nothing is lost if a cycle is skipped or interrupted.
///
/// The engine's synchronous entry points remain the source of truth; this
/// worker only keeps derived state fresh between explicit calls.
pub struct ReconsolidationWorker {
    tenants: Vec<String>,
    interval: Duration,
}

impl ReconsolidationWorker {
    /// Create a worker covering the given tenants at the given interval
    pub fn new(tenants: Vec<String>, interval: Duration) -> Self {
        Self { tenants, interval }
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    pub async fn run<S>(&mut self, engine: &Engine<S>) -> Result<(), EngineError>
    where
        S: SubjectStore + ClaimStore + GraphStore,
        <S as SubjectStore>::Error: std::fmt::Display,
        <S as ClaimStore>::Error: std::fmt::Display,
        <S as GraphStore>::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!(
            tenants = self.tenants.len(),
            "reconsolidation worker started (interval: {:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once(engine).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping worker");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Run a fixed number of cycles (useful for testing)
    pub async fn run_cycles<S>(
        &mut self,
        engine: &Engine<S>,
        cycles: usize,
    ) -> Result<(), EngineError>
    where
        S: SubjectStore + ClaimStore + GraphStore,
        <S as SubjectStore>::Error: std::fmt::Display,
        <S as ClaimStore>::Error: std::fmt::Display,
        <S as GraphStore>::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);
        for _ in 0..cycles {
            ticker.tick().await;
            self.run_once(engine).await;
        }
        Ok(())
    }

    async fn run_once<S>(&self, engine: &Engine<S>)
    where
        S: SubjectStore + ClaimStore + GraphStore,
        <S as SubjectStore>::Error: std::fmt::Display,
        <S as ClaimStore>::Error: std::fmt::Display,
        <S as GraphStore>::Error: std::fmt::Display,
    {
        for tenant in &self.tenants {
            match engine.cluster_claims(tenant).await {
                Ok(outcome) => {
                    tracing::debug!(
                        tenant,
                        clusters = outcome.clusters.len(),
                        trimmed = outcome.trimmed.len(),
                        "reclustered"
                    );
                }
                Err(e) => {
                    tracing::error!(tenant, error = %e, "clustering cycle failed");
                }
            }
            match engine.consolidate_claims(tenant).await {
                Ok(canonical) => {
                    tracing::debug!(tenant, rows = canonical.len(), "reconsolidated");
                }
                Err(e) => {
                    tracing::error!(tenant, error = %e, "consolidation cycle failed");
                }
            }
        }
    }
}
