use std::sync::Arc;

use crate::checkin::hooks::HookList;
use crate::config::Config;
use crate::recommendations::generator::RecommendationGenerator;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Persistence seam. `PgStore` in production.
    pub store: Arc<dyn Store>,
    /// Pluggable recommendation backend. Default: `LlmRecommendationGenerator`.
    pub recommender: Arc<dyn RecommendationGenerator>,
    /// Enrichments run after every stored check-in, in order.
    pub hooks: HookList,
    pub config: Config,
}
