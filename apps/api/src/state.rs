use crate::session::orchestrator::Orchestrator;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Extractor + comparator pipeline. Holds no per-session data.
    pub orchestrator: Orchestrator,
}
