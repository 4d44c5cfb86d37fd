//! Raw GitLab webhook payloads.
//!
//! Every field is optional and tolerant of the wrong JSON type: a field that
//! cannot be read falls back to its default instead of rejecting the hook.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Body of a `Pipeline Hook` delivery.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PipelineHook {
    #[serde(deserialize_with = "lenient")]
    pub object_attributes: PipelineAttributes,
    #[serde(deserialize_with = "lenient")]
    pub project: ProjectPayload,
    #[serde(deserialize_with = "lenient")]
    pub commit: CommitPayload,
    #[serde(deserialize_with = "lenient")]
    pub user: UserPayload,
    #[serde(deserialize_with = "each_lenient")]
    pub builds: Vec<BuildPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PipelineAttributes {
    #[serde(deserialize_with = "id")]
    pub id: Option<u64>,
    #[serde(rename = "ref", deserialize_with = "text")]
    pub ref_: String,
    #[serde(deserialize_with = "text")]
    pub status: String,
    #[serde(deserialize_with = "seconds")]
    pub duration: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectPayload {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub namespace: String,
    #[serde(deserialize_with = "text")]
    pub web_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommitPayload {
    #[serde(deserialize_with = "text")]
    pub url: String,
    #[serde(deserialize_with = "text")]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserPayload {
    #[serde(deserialize_with = "text")]
    pub name: String,
}

/// Entry of `builds` in a pipeline hook.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BuildPayload {
    #[serde(deserialize_with = "id")]
    pub id: Option<u64>,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub status: String,
}

/// Body of a `Job Hook` delivery.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobHook {
    #[serde(deserialize_with = "lenient")]
    pub commit: JobCommitPayload,
    #[serde(deserialize_with = "id")]
    pub pipeline_id: Option<u64>,
    #[serde(deserialize_with = "id")]
    pub build_id: Option<u64>,
    #[serde(deserialize_with = "text")]
    pub build_name: String,
    #[serde(deserialize_with = "text")]
    pub build_status: String,
    #[serde(deserialize_with = "seconds")]
    pub build_duration: u64,
}

/// In job hooks `commit.id` is the id of the pipeline, not a SHA.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobCommitPayload {
    #[serde(deserialize_with = "id")]
    pub id: Option<u64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Reads a list entry by entry, skipping entries that are not objects of `T`.
fn each_lenient<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => truncate_seconds(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => truncate_seconds(s.trim().parse().unwrap_or(0.0)),
        _ => 0,
    })
}

/// Truncates toward zero; negative, NaN and infinite values become 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(super) fn truncate_seconds(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}
