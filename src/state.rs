use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// GitLab pipeline identifier (numeric `object_attributes.id`).
pub type PipelineId = u64;

/// GitLab job identifier, unique within its pipeline.
pub type JobId = u64;

/// Opaque handle of a message previously delivered to the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(i64);

impl MessageHandle {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline or job status as reported by GitLab.
///
/// GitLab keeps adding statuses (`preparing`, `waiting_for_resource`,
/// `scheduled`, ...); anything not listed here is carried verbatim in
/// [`Status::Other`] and rendered with the fallback icon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Created,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Other(String),
}

pub const FALLBACK_ICON: &str = "❔";

impl Status {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "pending" => Self::Pending,
            "running" => Self::Running,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            "skipped" => Self::Skipped,
            "manual" => Self::Manual,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
            Self::Manual => "manual",
            Self::Other(raw) => raw,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Failed => "❌",
            Self::Success => "✅",
            Self::Canceled => "⏹",
            Self::Running => "▶️",
            Self::Created => "⏸️",
            Self::Skipped => "⏭️",
            Self::Manual => "✋",
            Self::Pending => "🕒️",
            Self::Other(_) => FALLBACK_ICON,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job tracked inside a [`PipelineState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    /// Job identifier, stable once assigned
    pub id: JobId,
    /// Job name as defined in .gitlab-ci.yml (not unique)
    pub name: String,
    pub status: Status,
    /// Execution duration in whole seconds, 0 until a job hook reports it
    pub duration: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub namespace: String,
    /// Project web URL, base for pipeline and job links
    pub web_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub url: String,
    pub message: String,
}

/// Aggregated view of one pipeline, rebuilt from webhook fragments.
///
/// Owned by the registry and only mutated while its slot is locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    pub id: PipelineId,
    /// Branch or tag the pipeline runs for
    pub ref_: String,
    pub status: Status,
    /// Total pipeline duration in seconds
    pub duration: u64,
    pub project: Project,
    pub commit: Commit,
    /// Display name of the user who triggered the pipeline
    pub username: String,
    /// Jobs keyed by id; iteration order is ascending id
    pub jobs: BTreeMap<JobId, JobState>,
    /// Chat message showing this pipeline, set by the first successful send
    pub message: Option<MessageHandle>,
    /// Reason the most recent delivery attempt failed, cleared on success
    pub last_delivery_error: Option<String>,
}

impl PipelineState {
    /// Records the handle of the first successful send.
    ///
    /// Returns `false` and keeps the existing handle if one is already set.
    pub fn attach_message(&mut self, handle: MessageHandle) -> bool {
        if self.message.is_some() {
            return false;
        }
        self.message = Some(handle);
        true
    }

    pub fn job_by_name(&self, name: &str) -> Option<&JobState> {
        self.jobs.values().find(|job| job.name == name)
    }
}
