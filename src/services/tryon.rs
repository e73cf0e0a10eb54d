use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use crate::models::job::{JobKind, JobSnapshot, JobStatus, TryOnJob};
use crate::models::profile::TryOnRecord;
use crate::services::api::{ApiError, ImageJobRequest, JobApi, TryOnParams, VideoJobRequest, AUTO_DETECT};
use crate::services::history::HistoryStore;
use crate::services::images::{ImageError, ImageFetcher, ImageSource};

/// Poll cadence and overall ceiling for one job.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Inputs for one image try-on run.
#[derive(Debug, Clone)]
pub struct ImageJobSpec {
    pub human: ImageSource,
    pub garment: ImageSource,
    pub garment_name: String,
    pub params: TryOnParams,
}

/// Inputs for a follow-on video run, parameterized by a prior Succeeded
/// try-on result. Always a separate user-initiated action.
#[derive(Debug, Clone)]
pub struct VideoJobSpec {
    pub image_url: String,
    pub motion_type: String,
    pub duration_seconds: u32,
    pub fps: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("a {} job is already active", .0.as_ref())]
    AlreadyActive(JobKind),

    #[error("orchestrator has been cancelled")]
    Disposed,
}

enum JobFailure {
    Input(ImageError),
    Transport(ApiError),
    TimedOut,
    Cancelled,
}

impl JobFailure {
    fn message(&self) -> String {
        match self {
            JobFailure::Input(e) => format!("upload failed: {e}"),
            JobFailure::Transport(e) => e.to_string(),
            JobFailure::TimedOut => "timed out".to_string(),
            JobFailure::Cancelled => "cancelled".to_string(),
        }
    }
}

/// Drives a single try-on (or video) job through upload, submission and
/// polling, emitting a snapshot on every transition.
///
/// Owns its own lifecycle rather than borrowing the hosting UI's: callers
/// invoke `cancel` on teardown, which stops further polling and side
/// effects once the in-flight call settles. One image job and one video
/// job may be active at a time; a second launch of the same kind is
/// rejected rather than superseding the first.
pub struct TryOnOrchestrator {
    api: Arc<dyn JobApi>,
    fetcher: ImageFetcher,
    history: Arc<dyn HistoryStore>,
    settings: PollSettings,
    progress_tx: watch::Sender<JobSnapshot>,
    active: [AtomicBool; 2],
    cancelled: AtomicBool,
}

impl TryOnOrchestrator {
    pub fn new(
        api: Arc<dyn JobApi>,
        fetcher: ImageFetcher,
        history: Arc<dyn HistoryStore>,
        settings: PollSettings,
    ) -> Self {
        let (progress_tx, _) = watch::channel(JobSnapshot::idle());
        Self {
            api,
            fetcher,
            history,
            settings,
            progress_tx,
            active: [AtomicBool::new(false), AtomicBool::new(false)],
            cancelled: AtomicBool::new(false),
        }
    }

    /// Snapshots are emitted on every poll tick and terminal transition.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.progress_tx.subscribe()
    }

    /// Tear down: no further polls, no further history writes. The
    /// orchestrator cannot be reused afterwards.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run one image try-on to a terminal state. Failures are carried in
    /// the returned job, not thrown; `Err` here only means the launch
    /// itself was refused.
    pub async fn run_image_job(
        &self,
        user: Option<&str>,
        spec: ImageJobSpec,
    ) -> Result<TryOnJob, LaunchError> {
        let _guard = self.acquire(JobKind::ImageTryOn)?;
        let mut job = TryOnJob::new(JobKind::ImageTryOn);

        if let Err(failure) = self.drive_image(&mut job, &spec).await {
            let reason = failure.message();
            tracing::warn!(kind = job.kind.as_ref(), error = %reason, "try-on job failed");
            job.fail(reason);
            self.emit(&job);
        }

        if job.status == JobStatus::Succeeded && !self.is_cancelled() {
            if let (Some(user_id), Some(result)) = (user, job.result.clone()) {
                self.record_history(user_id, &job, &spec, result).await;
            }
        }
        Ok(job)
    }

    /// Run one video generation to a terminal state.
    pub async fn run_video_job(
        &self,
        spec: VideoJobSpec,
    ) -> Result<TryOnJob, LaunchError> {
        let _guard = self.acquire(JobKind::VideoGeneration)?;
        let mut job = TryOnJob::new(JobKind::VideoGeneration);
        job.input_refs.push(spec.image_url.clone());

        if let Err(failure) = self.drive_video(&mut job, &spec).await {
            let reason = failure.message();
            tracing::warn!(kind = job.kind.as_ref(), error = %reason, "video job failed");
            job.fail(reason);
            self.emit(&job);
        }
        Ok(job)
    }

    async fn drive_image(&self, job: &mut TryOnJob, spec: &ImageJobSpec) -> Result<(), JobFailure> {
        job.advance(JobStatus::Uploading, 10);
        self.emit(job);

        let human_bytes = self
            .fetcher
            .resolve(&spec.human)
            .await
            .map_err(JobFailure::Input)?;
        let human = self
            .api
            .upload_image(human_bytes, &upload_name("human"))
            .await
            .map_err(JobFailure::Transport)?;
        job.input_refs.push(human.url.clone());
        job.advance(JobStatus::Uploading, 30);
        self.emit(job);

        let garment_bytes = self
            .fetcher
            .resolve(&spec.garment)
            .await
            .map_err(JobFailure::Input)?;
        let garment = self
            .api
            .upload_image(garment_bytes, &upload_name("garment"))
            .await
            .map_err(JobFailure::Transport)?;
        job.input_refs.push(garment.url.clone());
        job.advance(JobStatus::Submitted, 50);
        self.emit(job);

        let request = ImageJobRequest::new(human.url, garment.url, spec.params.clone());
        let submitted = self
            .api
            .submit_try_on(&request)
            .await
            .map_err(JobFailure::Transport)?;
        tracing::info!(job_id = %submitted.id, kind = job.kind.as_ref(), "generation job submitted");
        job.id = Some(submitted.id.clone());
        job.advance(JobStatus::Processing, 70);
        self.emit(job);

        self.poll_to_completion(job, &submitted.id).await
    }

    async fn drive_video(&self, job: &mut TryOnJob, spec: &VideoJobSpec) -> Result<(), JobFailure> {
        job.advance(JobStatus::Submitted, 10);
        self.emit(job);

        let request = VideoJobRequest::new(
            spec.image_url.clone(),
            spec.motion_type.clone(),
            spec.duration_seconds,
            spec.fps,
        );
        let submitted = self
            .api
            .submit_video(&request)
            .await
            .map_err(JobFailure::Transport)?;
        tracing::info!(job_id = %submitted.id, kind = job.kind.as_ref(), "generation job submitted");
        job.id = Some(submitted.id.clone());
        job.advance(JobStatus::Processing, 30);
        self.emit(job);

        self.poll_to_completion(job, &submitted.id).await
    }

    /// One poll at a time: a request must settle before the next is issued.
    async fn poll_to_completion(&self, job: &mut TryOnJob, job_id: &str) -> Result<(), JobFailure> {
        let deadline = Instant::now() + self.settings.timeout;
        loop {
            if self.is_cancelled() {
                return Err(JobFailure::Cancelled);
            }
            if Instant::now() >= deadline {
                return Err(JobFailure::TimedOut);
            }

            let update = self
                .api
                .job_status(job_id)
                .await
                .map_err(JobFailure::Transport)?
                .into_update();
            job.apply_poll(&update);
            self.emit(job);

            if job.status.is_terminal() {
                return Ok(());
            }
            sleep(self.settings.interval).await;
        }
    }

    async fn record_history(
        &self,
        user_id: &str,
        job: &TryOnJob,
        spec: &ImageJobSpec,
        result: String,
    ) {
        let record = TryOnRecord {
            id: Uuid::new_v4(),
            human_image: job.input_refs.first().cloned().unwrap_or_default(),
            garment_image: job.input_refs.get(1).cloned().unwrap_or_default(),
            result_image: result,
            garment_name: spec.garment_name.clone(),
            garment_type: AUTO_DETECT.to_string(),
            created_at: Utc::now(),
        };
        // Best-effort: a failed write never alters the job outcome.
        if let Err(e) = self.history.record_try_on(user_id, record).await {
            tracing::warn!(user_id, error = %e, "failed to record try-on history");
        }
    }

    fn emit(&self, job: &TryOnJob) {
        self.progress_tx.send_replace(job.snapshot());
    }

    fn acquire(&self, kind: JobKind) -> Result<ActiveGuard<'_>, LaunchError> {
        if self.is_cancelled() {
            return Err(LaunchError::Disposed);
        }
        let flag = &self.active[kind.slot()];
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LaunchError::AlreadyActive(kind));
        }
        Ok(ActiveGuard { flag })
    }
}

fn upload_name(prefix: &str) -> String {
    format!("{prefix}-{}.jpg", Uuid::new_v4())
}

struct ActiveGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
