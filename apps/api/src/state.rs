use std::sync::Arc;

use crate::config::Config;
use crate::extraction::ContentExtractor;
use crate::intake::flow::IntakeFlow;
use crate::intake::session::SessionStore;
use crate::parser_client::JobParser;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub extractor: Arc<ContentExtractor>,
    /// Remote job parser. Default: `ParsingClient` against `PARSER_BASE_URL`.
    pub parser: Arc<dyn JobParser>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn intake_flow(&self) -> IntakeFlow {
        IntakeFlow::new(
            self.extractor.clone(),
            self.parser.clone(),
            self.sessions.clone(),
        )
    }
}
