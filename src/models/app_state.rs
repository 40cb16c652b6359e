use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::SubmitterTrait;
use crate::models::Block;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub submitter: Arc<dyn SubmitterTrait>,
    /// Latest block accepted by the block monitor, `None` until the first one arrives.
    pub current_block: watch::Receiver<Option<Block>>,
    /// Receipt wait used when the caller does not ask for one.
    pub receipt_timeout: Duration,
}

impl AppState {
    pub fn submitter(&self) -> Arc<dyn SubmitterTrait> {
        self.submitter.clone()
    }

    pub fn current_block(&self) -> Option<Block> {
        self.current_block.borrow().clone()
    }
}
