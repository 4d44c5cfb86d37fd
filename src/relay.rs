use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::error::{RelayError, Result};
use crate::events::{JobEvent, PipelineEvent, WebhookEvent};
use crate::notifier::Notifier;
use crate::reconciler::{reconcile_job, reconcile_pipeline, Action};
use crate::registry::PipelineRegistry;
use crate::render::render;
use crate::state::PipelineState;

/// What happened to the chat message after an event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A new message was posted.
    Sent,
    /// The message was edited after a pipeline hook.
    PipelineUpdated,
    /// The message was edited after a job hook.
    JobUpdated,
}

/// Applies webhook events to the registry and mirrors the result in the chat.
///
/// The registry slot of a pipeline stays locked from reconciliation until the
/// message handle is stored, so two events for the same pipeline never
/// interleave.
pub struct Relay {
    registry: Arc<PipelineRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl Relay {
    pub fn new(registry: Arc<PipelineRegistry>, notifier: Arc<dyn Notifier>) -> Self {
        Self { registry, notifier }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &Arc<PipelineRegistry> {
        &self.registry
    }

    /// # Errors
    ///
    /// - [`RelayError::PipelineNotFound`] for a job event of an unknown pipeline
    /// - [`RelayError::SendFailed`] / [`RelayError::UpdateFailed`] when the chat
    ///   could not be reached; the reconciled state is kept either way
    pub async fn handle(&self, event: WebhookEvent) -> Result<Delivery> {
        match event {
            WebhookEvent::Pipeline(event) => self.handle_pipeline(event).await,
            WebhookEvent::Job(event) => self.handle_job(event).await,
        }
    }

    async fn handle_pipeline(&self, event: PipelineEvent) -> Result<Delivery> {
        let id = event.id;
        let mut slot = self.registry.lock(id).await;

        let action = reconcile_pipeline(slot.entry(), event);
        match action {
            Action::Create => info!("Registered new pipeline {id}"),
            Action::Update => debug!("Pipeline {id} already exists, updating it"),
        }

        let state = slot.state_mut().ok_or(RelayError::PipelineNotFound(id))?;
        self.deliver(state, Delivery::PipelineUpdated).await
    }

    async fn handle_job(&self, event: JobEvent) -> Result<Delivery> {
        let id = event.pipeline_id;
        let Some(mut slot) = self.registry.lock_existing(id).await else {
            warn!("Pipeline {id} not found for job {:?}", event.job_id);
            return Err(RelayError::PipelineNotFound(id));
        };

        let state = slot.state_mut().ok_or(RelayError::PipelineNotFound(id))?;
        reconcile_job(state, event);
        self.deliver(state, Delivery::JobUpdated).await
    }

    /// Edits the pipeline's message, or posts a new one if no send has
    /// succeeded yet for this pipeline.
    async fn deliver(&self, state: &mut PipelineState, edited: Delivery) -> Result<Delivery> {
        let text = render(state);

        let result = match state.message {
            Some(handle) => self
                .notifier
                .update(handle, &text)
                .await
                .map(|()| edited)
                .map_err(as_update_failure),
            None => {
                if state.last_delivery_error.is_some() {
                    info!("Retrying first message for pipeline {}", state.id);
                }
                self.notifier
                    .send(&text)
                    .await
                    .map(|handle| {
                        state.attach_message(handle);
                        Delivery::Sent
                    })
                    .map_err(as_send_failure)
            }
        };

        match &result {
            Ok(_) => state.last_delivery_error = None,
            Err(e) => {
                error!("Delivery for pipeline {} failed: {e}", state.id);
                state.last_delivery_error = Some(e.to_string());
            }
        }
        result
    }
}

fn as_send_failure(err: RelayError) -> RelayError {
    match err {
        RelayError::SendFailed(_) => err,
        other => RelayError::SendFailed(other.to_string()),
    }
}

fn as_update_failure(err: RelayError) -> RelayError {
    match err {
        RelayError::UpdateFailed(_) => err,
        other => RelayError::UpdateFailed(other.to_string()),
    }
}
