pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod ops;
pub mod validation;

use std::sync::Arc;

use db::DbPool;
use engine::bus::RealtimeChannel;

pub use error::AppError;

/// Shared state handed to every pipeline operation by the transport glue.
/// Holds the store pool and the real-time publish capability; per-request
/// data stays on the call stack.
pub struct AppState {
    pub db: DbPool,
    pub realtime: Arc<dyn RealtimeChannel>,
}

impl AppState {
    pub fn new(db: DbPool, realtime: Arc<dyn RealtimeChannel>) -> Self {
        Self { db, realtime }
    }

    pub(crate) fn dispatch_ctx<'a>(&'a self, actor: &'a str) -> engine::dispatch::DispatchContext<'a> {
        engine::dispatch::DispatchContext {
            pool: &self.db,
            realtime: self.realtime.as_ref(),
            actor,
        }
    }
}
