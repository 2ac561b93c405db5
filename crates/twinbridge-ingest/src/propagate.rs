//! Twin state-change propagation to the time-series sink.
//!
//! Each change notification produces at most one sink document, and only
//! when there is something to report and a target twin is known.

use tracing::{debug, info};
use twinbridge_core::{
    DynEventSink, DynTwinStore, FanoutMode, IngestConfig, SinkError,
};

use crate::batch::BatchProcessor;
use crate::decoder::TelemetryEvent;
use crate::diff::{extract_changes, ChangeNotification};
use crate::error::Result;
use crate::fanout::{build_capability, build_direct, capability_property_name, FanoutEvent};
use crate::resolver::RelationshipResolver;

/// Model of twins that represent a stateful object.
pub const STATE_MODEL_ID: &str = "dtmi:digitaltwins:rec_3_3:core:State;1";

/// Propagates twin change notifications to the event sink.
pub struct StatePropagator {
    store: DynTwinStore,
    sink: DynEventSink,
    resolver: RelationshipResolver,
    mode: FanoutMode,
    require_state_model: bool,
    batch: BatchProcessor,
}

impl StatePropagator {
    pub fn new(store: DynTwinStore, sink: DynEventSink) -> Self {
        Self {
            resolver: RelationshipResolver::new(store.clone()),
            store,
            sink,
            mode: FanoutMode::Direct,
            require_state_model: false,
            batch: BatchProcessor::new(),
        }
    }

    pub fn from_config(store: DynTwinStore, sink: DynEventSink, config: &IngestConfig) -> Self {
        Self::new(store, sink)
            .with_mode(config.fanout_mode)
            .with_state_model_required(config.require_state_model)
            .with_batch(BatchProcessor::with_concurrency(config.batch_concurrency))
    }

    pub fn with_mode(mut self, mode: FanoutMode) -> Self {
        self.mode = mode;
        self
    }

    /// Only fan out direct updates of twins that are State instances.
    pub fn with_state_model_required(mut self, required: bool) -> Self {
        self.require_state_model = required;
        self
    }

    pub fn with_batch(mut self, batch: BatchProcessor) -> Self {
        self.batch = batch;
        self
    }

    pub fn mode(&self) -> FanoutMode {
        self.mode
    }

    /// Build the fan-out event for a notification, if one should be emitted.
    pub async fn build_event(
        &self,
        notification: &ChangeNotification,
    ) -> Result<Option<FanoutEvent>> {
        match self.mode {
            FanoutMode::Direct => self.build_direct_event(notification).await,
            FanoutMode::Capability => self.build_capability_event(notification).await,
        }
    }

    async fn build_direct_event(
        &self,
        notification: &ChangeNotification,
    ) -> Result<Option<FanoutEvent>> {
        if self.require_state_model
            && !self
                .store
                .is_of_model(&notification.twin_id, STATE_MODEL_ID)
                .await?
        {
            debug!(
                "Twin '{}' is not a State instance, skipping fan-out",
                notification.twin_id
            );
            return Ok(None);
        }
        Ok(build_direct(notification))
    }

    async fn build_capability_event(
        &self,
        notification: &ChangeNotification,
    ) -> Result<Option<FanoutEvent>> {
        if extract_changes(notification).is_empty() {
            return Ok(None);
        }

        let twin = self.store.get_twin(&notification.twin_id).await?;
        let Some(property_name) = twin.as_ref().and_then(capability_property_name) else {
            debug!(
                "Capability twin '{}' has no name, skipping fan-out",
                notification.twin_id
            );
            return Ok(None);
        };

        let Some(target_id) = self.resolver.capability_parent(&notification.twin_id).await else {
            debug!(
                "Capability twin '{}' has no parent, skipping fan-out",
                notification.twin_id
            );
            return Ok(None);
        };

        Ok(build_capability(notification, &property_name, &target_id))
    }

    /// Process one notification event. Returns the emitted event, if any.
    pub async fn propagate(&self, event: &TelemetryEvent) -> Result<Option<FanoutEvent>> {
        let notification = ChangeNotification::from_event(event)?;
        info!(
            "Reading change of twin '{}' ({} patch operation(s))",
            notification.twin_id,
            notification.patch.len()
        );

        let Some(fanout) = self.build_event(&notification).await? else {
            return Ok(None);
        };

        let payload = fanout
            .to_payload()
            .map_err(|e| SinkError::Append(e.to_string()))?;
        self.sink.append(payload).await?;
        debug!(
            "Emitted {} propert(ies) for twin '{}'",
            fanout.properties().len(),
            fanout.target_id()
        );
        Ok(Some(fanout))
    }

    /// Process a batch of notification events under the 0 / 1 / many rule.
    pub async fn propagate_batch(&self, events: &[TelemetryEvent]) -> Result<usize> {
        self.batch
            .run(events, |_, event| async move {
                self.propagate(event).await.map(|_| ())
            })
            .await
            .into_result()
    }
}
