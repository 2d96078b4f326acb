//! Fire-and-forget analytics recording.
//!
//! Events travel over an unbounded channel to a worker task that upserts
//! the daily aggregation rows. Nothing on the response path ever waits for
//! the sink; failed writes are logged and dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use vitrine_core::domain::analytics::{AnalyticsAction, AnalyticsEvent};
use vitrine_core::domain::block::BlockId;
use vitrine_core::domain::config::ConfigId;
use vitrine_core::domain::product::ProductId;

use crate::gateway::AnalyticsSink;

#[derive(Clone)]
pub struct AnalyticsRecorder {
    tx: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl AnalyticsRecorder {
    /// Start the recorder and its worker. The worker drains the channel
    /// until every recorder handle has been dropped; await the returned
    /// handle to flush on shutdown.
    pub fn spawn(sink: Arc<dyn AnalyticsSink>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AnalyticsEvent>();
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(error) = sink.record(&event).await {
                    warn!(
                        block = %event.block_id,
                        config = %event.config_id,
                        action = event.action.as_str(),
                        %error,
                        "dropping analytics event"
                    );
                }
            }
        });
        (Self { tx }, handle)
    }

    /// Queue one event. Never blocks and never fails the caller; a closed
    /// channel is logged and ignored.
    pub fn record(
        &self,
        block_id: BlockId,
        config_id: ConfigId,
        product_id: Option<ProductId>,
        subject: impl Into<String>,
        action: AnalyticsAction,
    ) {
        let event = AnalyticsEvent {
            block_id,
            config_id,
            product_id,
            subject: subject.into(),
            action,
            occurred_at: Utc::now(),
        };
        if self.tx.send(event).is_err() {
            warn!("analytics worker is gone, dropping event");
        }
    }
}
