use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::generation::GenerationClient;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    generation: GenerationClient,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, generation: GenerationClient) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, generation }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn generation(&self) -> &GenerationClient {
        &self.inner.generation
    }
}
