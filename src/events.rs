use crate::error::{RelayError, Result};
use crate::state::{Commit, JobId, PipelineId, Project, Status};

pub const EVENT_HEADER: &str = "X-Gitlab-Event";

/// Webhook kinds this service understands, selected by [`EVENT_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Pipeline,
    Job,
}

impl EventKind {
    pub fn from_header(value: &str) -> Result<Self> {
        match value {
            "Pipeline Hook" => Ok(Self::Pipeline),
            "Job Hook" => Ok(Self::Job),
            other => Err(RelayError::UnsupportedEventKind(other.to_string())),
        }
    }
}

/// Job entry carried by a pipeline hook. GitLab does not report durations here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub id: Option<JobId>,
    pub name: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineEvent {
    pub id: PipelineId,
    pub ref_: String,
    pub status: Status,
    pub duration: u64,
    pub project: Project,
    pub commit: Commit,
    pub username: String,
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub pipeline_id: PipelineId,
    pub job_id: Option<JobId>,
    pub name: String,
    pub status: Status,
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Pipeline(PipelineEvent),
    Job(JobEvent),
}

impl WebhookEvent {
    pub fn pipeline_id(&self) -> PipelineId {
        match self {
            Self::Pipeline(event) => event.id,
            Self::Job(event) => event.pipeline_id,
        }
    }
}
