use crate::providers::gitlab::{job_url, pipeline_url};
use crate::state::{JobState, PipelineState};

/// Renders the chat message for a pipeline using Telegram's legacy Markdown.
///
/// Layout:
/// - header with project namespace/name and the triggering user
/// - code block with the commit link, ref and commit message
/// - one line per job, ordered by job id
/// - pipeline status icon linking to the pipeline, with its duration
///
/// Output depends only on `pipeline`, so re-rendering an unchanged state
/// produces identical text.
pub fn render(pipeline: &PipelineState) -> String {
    let web_url = &pipeline.project.web_url;

    let jobs = pipeline
        .jobs
        .values()
        .map(|job| job_line(web_url, job))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🔥 *{namespace}/{name}*\n\
         🙂 {user}\n\
         ```\n\
         [⎇]({commit_url}) {ref_}\n\
         {message}\n\
         ```\n\
         {jobs}\n\n\
         [{icon}]({url}) {duration}",
        namespace = pipeline.project.namespace,
        name = pipeline.project.name,
        user = pipeline.username,
        commit_url = pipeline.commit.url,
        ref_ = pipeline.ref_,
        message = pipeline.commit.message,
        icon = pipeline.status.icon(),
        url = pipeline_url(web_url, pipeline.id),
        duration = duration_text(pipeline.duration),
    )
}

fn job_line(web_url: &str, job: &JobState) -> String {
    format!(
        "{}: [{}]({}) {}",
        job.name,
        job.status.icon(),
        job_url(web_url, job.id),
        duration_text(job.duration)
    )
}

fn duration_text(seconds: u64) -> String {
    if seconds > 0 {
        format!("{seconds} seconds")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Commit, JobId, Project, Status};
    use std::collections::BTreeMap;

    fn job(id: JobId, name: &str, status: Status, duration: u64) -> (JobId, JobState) {
        (
            id,
            JobState {
                id,
                name: name.to_string(),
                status,
                duration,
            },
        )
    }

    fn pipeline() -> PipelineState {
        PipelineState {
            id: 31,
            ref_: "main".to_string(),
            status: Status::Success,
            duration: 13,
            project: Project {
                name: "app".to_string(),
                namespace: "team".to_string(),
                web_url: "https://gitlab.example.com/team/app".to_string(),
            },
            commit: Commit {
                url: "https://gitlab.example.com/team/app/-/commit/abc".to_string(),
                message: "Fix build".to_string(),
            },
            username: "Jane".to_string(),
            jobs: BTreeMap::from([
                job(12, "deploy", Status::Other("scheduled".to_string()), 0),
                job(10, "build", Status::Success, 12),
                job(11, "test", Status::Failed, 3),
            ]),
            message: None,
            last_delivery_error: None,
        }
    }

    #[test]
    fn renders_full_message() {
        let expected = "🔥 *team/app*\n\
                        🙂 Jane\n\
                        ```\n\
                        [⎇](https://gitlab.example.com/team/app/-/commit/abc) main\n\
                        Fix build\n\
                        ```\n\
                        build: [✅](https://gitlab.example.com/team/app/-/jobs/10) 12 seconds\n\
                        test: [❌](https://gitlab.example.com/team/app/-/jobs/11) 3 seconds\n\
                        deploy: [❔](https://gitlab.example.com/team/app/-/jobs/12) \n\
                        \n\
                        [✅](https://gitlab.example.com/team/app/pipelines/31) 13 seconds";

        assert_eq!(render(&pipeline()), expected);
    }

    #[test]
    fn jobs_are_ordered_by_id() {
        let text = render(&pipeline());
        let build = text.find("build:").unwrap();
        let test = text.find("test:").unwrap();
        let deploy = text.find("deploy:").unwrap();
        assert!(build < test && test < deploy);
    }

    #[test]
    fn zero_durations_are_omitted() {
        let mut pipeline = pipeline();
        pipeline.duration = 0;
        pipeline.jobs.clear();

        let text = render(&pipeline);
        assert!(!text.contains("seconds"));
        assert!(text.ends_with("[✅](https://gitlab.example.com/team/app/pipelines/31) "));
    }

    #[test]
    fn rendering_is_deterministic() {
        let pipeline = pipeline();
        assert_eq!(render(&pipeline), render(&pipeline.clone()));
    }
}
