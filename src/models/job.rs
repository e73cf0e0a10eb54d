use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// What kind of generation a job drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    ImageTryOn,
    VideoGeneration,
}

impl JobKind {
    pub(crate) fn slot(self) -> usize {
        match self {
            JobKind::ImageTryOn => 0,
            JobKind::VideoGeneration => 1,
        }
    }

    fn fallback_error(self) -> &'static str {
        match self {
            JobKind::ImageTryOn => "try-on failed",
            JobKind::VideoGeneration => "video generation failed",
        }
    }
}

/// Lifecycle of a single generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Uploading,
    Submitted,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Normalized poll outcome handed over by the job API layer.
#[derive(Debug, Clone)]
pub struct PollUpdate {
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// One try-on or video generation job, mutated only by the orchestrator
/// driving it through its poll loop. Not persisted.
#[derive(Debug, Clone)]
pub struct TryOnJob {
    /// Identifier assigned by the external job API at submission.
    pub id: Option<String>,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Display progress in [0,100]; never regresses.
    pub progress: u8,
    /// Uploaded input reference URLs, in upload order.
    pub input_refs: Vec<String>,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl TryOnJob {
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: None,
            kind,
            status: JobStatus::Pending,
            progress: 0,
            input_refs: Vec::new(),
            result: None,
            error: None,
        }
    }

    /// Stage transition with a progress floor.
    pub(crate) fn advance(&mut self, status: JobStatus, floor: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.progress = self.progress.max(floor.min(100));
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = Some(reason.into());
    }

    /// Fold a poll response into the job. Terminal states are sticky: once
    /// Succeeded or Failed, later updates (e.g. from a stale timer) are
    /// ignored. Progress only ever moves forward.
    pub fn apply_poll(&mut self, update: &PollUpdate) {
        if self.status.is_terminal() {
            return;
        }
        match update.status {
            JobStatus::Succeeded => match &update.result {
                Some(url) => {
                    self.status = JobStatus::Succeeded;
                    self.progress = 100;
                    self.result = Some(url.clone());
                }
                None => self.fail("no output returned"),
            },
            JobStatus::Failed => {
                let reason = update
                    .error
                    .clone()
                    .unwrap_or_else(|| self.kind.fallback_error().to_string());
                self.fail(reason);
            }
            _ => {
                self.status = JobStatus::Processing;
                if let Some(p) = update.progress {
                    self.progress = self.progress.max(p.min(100));
                }
            }
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            kind: self.kind,
            status: self.status,
            progress: self.progress,
            result_ref: self.result.clone(),
            error_message: self.error.clone(),
        }
    }
}

/// Outcome surfaced to the UI layer on every poll tick and terminal
/// transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: u8,
    pub result_ref: Option<String>,
    pub error_message: Option<String>,
}

impl JobSnapshot {
    pub(crate) fn idle() -> Self {
        Self {
            kind: JobKind::ImageTryOn,
            status: JobStatus::Pending,
            progress: 0,
            result_ref: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processing(progress: u8) -> PollUpdate {
        PollUpdate {
            status: JobStatus::Processing,
            progress: Some(progress),
            result: None,
            error: None,
        }
    }

    #[test]
    fn test_progress_never_regresses() {
        let mut job = TryOnJob::new(JobKind::ImageTryOn);
        job.apply_poll(&processing(40));
        assert_eq!(job.progress, 40);
        job.apply_poll(&processing(25));
        assert_eq!(job.progress, 40);
        job.apply_poll(&processing(75));
        assert_eq!(job.progress, 75);
    }

    #[test]
    fn test_stage_floor_respects_prior_progress() {
        let mut job = TryOnJob::new(JobKind::ImageTryOn);
        job.apply_poll(&processing(80));
        job.advance(JobStatus::Processing, 70);
        assert_eq!(job.progress, 80);
    }

    #[test]
    fn test_terminal_success_is_sticky() {
        let mut job = TryOnJob::new(JobKind::ImageTryOn);
        job.apply_poll(&PollUpdate {
            status: JobStatus::Succeeded,
            progress: None,
            result: Some("https://cdn.example/r.jpg".to_string()),
            error: None,
        });
        assert_eq!(job.status, JobStatus::Succeeded);

        // A stale poll after the terminal transition changes nothing.
        job.apply_poll(&PollUpdate {
            status: JobStatus::Failed,
            progress: Some(10),
            result: None,
            error: Some("late failure".to_string()),
        });
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result.as_deref(), Some("https://cdn.example/r.jpg"));
        assert!(job.error.is_none());
    }

    #[test]
    fn test_failure_uses_api_error_verbatim() {
        let mut job = TryOnJob::new(JobKind::VideoGeneration);
        job.apply_poll(&PollUpdate {
            status: JobStatus::Failed,
            progress: None,
            result: None,
            error: Some("model overloaded".to_string()),
        });
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("model overloaded"));
    }

    #[test]
    fn test_failure_falls_back_to_generic_reason() {
        let mut job = TryOnJob::new(JobKind::VideoGeneration);
        job.apply_poll(&PollUpdate {
            status: JobStatus::Failed,
            progress: None,
            result: None,
            error: None,
        });
        assert_eq!(job.error.as_deref(), Some("video generation failed"));
    }

    #[test]
    fn test_success_without_output_fails() {
        let mut job = TryOnJob::new(JobKind::ImageTryOn);
        job.apply_poll(&PollUpdate {
            status: JobStatus::Succeeded,
            progress: None,
            result: None,
            error: None,
        });
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("no output returned"));
    }
}
