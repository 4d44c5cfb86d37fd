//! Merges decoded webhook events into stored pipeline state.
//!
//! Functions here are pure: they operate on a registry slot the caller has
//! already locked and report whether a new chat message is needed.

use std::collections::BTreeMap;

use log::debug;

use crate::events::{JobEvent, JobSummary, PipelineEvent};
use crate::state::{JobState, PipelineState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// First event for this pipeline; a new message must be sent.
    Create,
    /// Existing pipeline changed; its message should be edited.
    Update,
}

/// Applies a pipeline hook to a slot.
///
/// A vacant slot is filled with a fully built state. An occupied one gets its
/// status and duration overwritten, and each job summary is matched:
///
/// - by id: the job's status is overwritten;
/// - by name: the existing job is left untouched, so a job reported under a
///   new id is not listed twice;
/// - otherwise the summary is dropped.
pub fn reconcile_pipeline(slot: &mut Option<PipelineState>, event: PipelineEvent) -> Action {
    if let Some(state) = slot {
        merge_pipeline(state, event);
        return Action::Update;
    }

    *slot = Some(new_pipeline(event));
    Action::Create
}

fn new_pipeline(event: PipelineEvent) -> PipelineState {
    let mut jobs = BTreeMap::new();
    for summary in event.jobs {
        let Some(id) = summary.id else {
            debug!("Skipping job '{}' without id in pipeline {}", summary.name, event.id);
            continue;
        };
        jobs.insert(
            id,
            JobState {
                id,
                name: summary.name,
                status: summary.status,
                duration: 0,
            },
        );
    }

    PipelineState {
        id: event.id,
        ref_: event.ref_,
        status: event.status,
        duration: event.duration,
        project: event.project,
        commit: event.commit,
        username: event.username,
        jobs,
        message: None,
        last_delivery_error: None,
    }
}

fn merge_pipeline(state: &mut PipelineState, event: PipelineEvent) {
    state.status = event.status;
    state.duration = event.duration;

    for summary in event.jobs {
        merge_job_summary(state, summary);
    }
}

fn merge_job_summary(state: &mut PipelineState, summary: JobSummary) {
    if let Some(job) = summary.id.and_then(|id| state.jobs.get_mut(&id)) {
        job.status = summary.status;
        return;
    }

    if let Some(existing) = state.job_by_name(&summary.name) {
        debug!(
            "Job {:?} '{}' matched existing job {} by name, keeping its status",
            summary.id, summary.name, existing.id
        );
        return;
    }

    debug!(
        "Dropping unknown job {:?} '{}' for pipeline {}",
        summary.id, summary.name, state.id
    );
}

/// Applies a job hook to an existing pipeline.
///
/// Only a job already known by id is changed (status and duration); an
/// unknown job id leaves the pipeline as it is.
pub fn reconcile_job(state: &mut PipelineState, event: JobEvent) -> Action {
    match event.job_id.and_then(|id| state.jobs.get_mut(&id)) {
        Some(job) => {
            job.status = event.status;
            job.duration = event.duration;
        }
        None => debug!(
            "Ignoring unknown job {:?} '{}' for pipeline {}",
            event.job_id, event.name, state.id
        ),
    }
    Action::Update
}
