use crate::state::{JobId, PipelineId};

/// Builds the link to a pipeline page from the project's web URL.
///
/// # Arguments
///
/// * `web_url` - Project web URL (e.g., <https://gitlab.com/group/project>)
/// * `id` - Numeric pipeline identifier
///
/// # Returns
///
/// Clickable URL to the pipeline (e.g., <https://gitlab.com/group/project/pipelines/123>)
pub fn pipeline_url(web_url: &str, id: PipelineId) -> String {
    format!("{}/pipelines/{id}", web_url.trim_end_matches('/'))
}

/// Builds the link to a job page from the project's web URL.
///
/// Clickable URL to the job (e.g., <https://gitlab.com/group/project/-/jobs/456>)
pub fn job_url(web_url: &str, id: JobId) -> String {
    format!("{}/-/jobs/{id}", web_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_url() {
        let url = pipeline_url("https://gitlab.com/group/project", 123_456);
        assert_eq!(url, "https://gitlab.com/group/project/pipelines/123456");
    }

    #[test]
    fn test_job_url() {
        let url = job_url("https://gitlab.com/group/project", 789_012);
        assert_eq!(url, "https://gitlab.com/group/project/-/jobs/789012");
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        assert_eq!(
            job_url("https://gitlab.com/group/project/", 1),
            "https://gitlab.com/group/project/-/jobs/1"
        );
    }
}
