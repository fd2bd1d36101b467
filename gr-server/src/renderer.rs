//! Renderer that fans render batches out to stream subscribers

use gr_core::{RenderBatch, Renderer};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Publishes every batch on a broadcast channel.
///
/// Having no subscribers is not an error; the batch is simply dropped.
/// Slow subscribers lag and skip batches rather than holding up playback.
pub struct BroadcastRenderer {
    tx: broadcast::Sender<Arc<RenderBatch>>,
    published: u64,
}

impl BroadcastRenderer {
    pub fn new(tx: broadcast::Sender<Arc<RenderBatch>>) -> Self {
        Self { tx, published: 0 }
    }

    /// Number of batches handed to the channel so far
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl Renderer for BroadcastRenderer {
    fn render(&mut self, batch: &RenderBatch) {
        self.published += 1;
        let _ = self.tx.send(Arc::new(batch.clone()));
    }
}
