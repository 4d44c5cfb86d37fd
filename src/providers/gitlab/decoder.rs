use log::debug;
use serde_json::Value;

use super::types::{BuildPayload, JobHook, PipelineHook};
use crate::events::{EventKind, JobEvent, JobSummary, PipelineEvent, WebhookEvent};
use crate::state::{Commit, Project, Status};

/// Normalizes a webhook body of the given kind.
///
/// Never fails: missing or malformed fields decode to defaults and a body that
/// is not an object decodes as if it were empty.
pub fn decode(kind: EventKind, payload: &Value) -> WebhookEvent {
    let event = match kind {
        EventKind::Pipeline => {
            let hook: PipelineHook = serde_json::from_value(payload.clone()).unwrap_or_default();
            WebhookEvent::Pipeline(pipeline_event(hook))
        }
        EventKind::Job => {
            let hook: JobHook = serde_json::from_value(payload.clone()).unwrap_or_default();
            WebhookEvent::Job(job_event(hook))
        }
    };
    debug!("Decoded {kind:?} event: {event:?}");
    event
}

fn pipeline_event(hook: PipelineHook) -> PipelineEvent {
    let attributes = hook.object_attributes;

    PipelineEvent {
        id: attributes.id.unwrap_or_default(),
        ref_: attributes.ref_,
        status: Status::parse(&attributes.status),
        duration: attributes.duration,
        project: Project {
            name: hook.project.name,
            namespace: hook.project.namespace,
            web_url: hook.project.web_url,
        },
        commit: Commit {
            url: hook.commit.url,
            message: hook.commit.message,
        },
        username: hook.user.name,
        jobs: hook.builds.into_iter().map(job_summary).collect(),
    }
}

fn job_summary(build: BuildPayload) -> JobSummary {
    JobSummary {
        id: build.id,
        name: build.name,
        status: Status::parse(&build.status),
    }
}

fn job_event(hook: JobHook) -> JobEvent {
    JobEvent {
        pipeline_id: hook.commit.id.or(hook.pipeline_id).unwrap_or_default(),
        job_id: hook.build_id,
        name: hook.build_name,
        status: Status::parse(&hook.build_status),
        duration: hook.build_duration,
    }
}
