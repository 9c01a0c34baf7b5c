//! Shared state for the API layer.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::notify::adapter::NotificationChannels;
use crate::notify::dispatcher::DEFAULT_CONCURRENCY;
use crate::pipeline::provider::ModelClient;

/// Shared context for all API routes. Every collaborator is constructed once
/// at startup and injected — handlers never reach for globals.
#[derive(Clone)]
pub struct ApiContext {
    /// Single shared connection; the mutex serializes aggregate mutations.
    pub db: Arc<Mutex<Connection>>,
    pub model: Arc<ModelClient>,
    pub channels: Arc<NotificationChannels>,
    pub dispatch_concurrency: usize,
}

impl ApiContext {
    pub fn new(
        db: Connection,
        model: ModelClient,
        channels: NotificationChannels,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            model: Arc::new(model),
            channels: Arc::new(channels),
            dispatch_concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_dispatch_concurrency(mut self, concurrency: usize) -> Self {
        self.dispatch_concurrency = concurrency.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::pipeline::provider::MockModelClient;

    #[test]
    fn context_is_cloneable_and_shares_state() {
        let ctx = ApiContext::new(
            open_memory_database().unwrap(),
            ModelClient::Mock(MockModelClient::new()),
            NotificationChannels::simulation(),
        );
        let clone = ctx.clone();
        assert!(Arc::ptr_eq(&ctx.db, &clone.db));
        assert!(Arc::ptr_eq(&ctx.model, &clone.model));
        assert_eq!(clone.dispatch_concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn concurrency_override_is_clamped() {
        let ctx = ApiContext::new(
            open_memory_database().unwrap(),
            ModelClient::Mock(MockModelClient::new()),
            NotificationChannels::simulation(),
        )
        .with_dispatch_concurrency(0);
        assert_eq!(ctx.dispatch_concurrency, 1);
    }
}
