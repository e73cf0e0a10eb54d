use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::job::{JobStatus, PollUpdate};

/// Garment type sent with submissions and recorded in history.
pub const AUTO_DETECT: &str = "auto_detect";

/// Fixed generation parameters for an image try-on submission.
#[derive(Debug, Clone, Serialize)]
pub struct TryOnParams {
    pub category: String,
    pub crop: bool,
    pub force_dc: bool,
    pub mask_only: bool,
    pub steps: u32,
    /// Deterministic seed for the image path.
    pub seed: u64,
}

impl Default for TryOnParams {
    fn default() -> Self {
        Self {
            category: "upper_body".to_string(),
            crop: false,
            force_dc: false,
            mask_only: false,
            steps: 20,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageJobRequest {
    pub human_img: String,
    pub garm_img: String,
    pub garment_type: String,
    pub use_vision: bool,
    pub params: TryOnParams,
}

impl ImageJobRequest {
    pub fn new(human_img: String, garm_img: String, params: TryOnParams) -> Self {
        Self {
            human_img,
            garm_img,
            garment_type: AUTO_DETECT.to_string(),
            use_vision: true,
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoJobRequest {
    pub image_url: String,
    pub motion_type: String,
    pub duration: u32,
    pub fps: u32,
}

impl VideoJobRequest {
    /// Duration is bounded to [2,10] seconds and frame rate to [12,30].
    pub fn new(image_url: String, motion_type: String, duration: u32, fps: u32) -> Self {
        Self {
            image_url,
            motion_type,
            duration: duration.clamp(2, 10),
            fps: fps.clamp(12, 30),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiJobStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

/// The API returns either a single output URL or a list; the first entry
/// wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    One(String),
    Many(Vec<String>),
}

impl JobOutput {
    pub fn into_first(self) -> Option<String> {
        match self {
            JobOutput::One(url) => Some(url),
            JobOutput::Many(urls) => urls.into_iter().next(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub status: ApiJobStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub output: Option<JobOutput>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatusResponse {
    pub fn into_update(self) -> PollUpdate {
        PollUpdate {
            status: match self.status {
                ApiJobStatus::Pending => JobStatus::Pending,
                ApiJobStatus::Processing => JobStatus::Processing,
                ApiJobStatus::Succeeded => JobStatus::Succeeded,
                ApiJobStatus::Failed => JobStatus::Failed,
            },
            progress: self.progress,
            result: self.output.and_then(JobOutput::into_first),
            error: self.error,
        }
    }
}

/// Opaque asynchronous job API: upload inputs, submit a generation request,
/// poll its status.
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn upload_image(&self, bytes: Vec<u8>, filename: &str) -> Result<UploadResponse, ApiError>;
    async fn submit_try_on(&self, request: &ImageJobRequest) -> Result<SubmitResponse, ApiError>;
    async fn submit_video(&self, request: &VideoJobRequest) -> Result<SubmitResponse, ApiError>;
    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError>;
}

/// Client for the Vizzle generation service.
pub struct VizzleClient {
    http: Client,
    base_url: String,
    api_token: String,
}

impl VizzleClient {
    pub fn new(base_url: &str, api_token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        }
    }

    async fn parse<T>(response: reqwest::Response) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(ApiError::Http);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[async_trait]
impl JobApi for VizzleClient {
    async fn upload_image(&self, bytes: Vec<u8>, filename: &str) -> Result<UploadResponse, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")
            .map_err(ApiError::Http)?;
        let form = Form::new().part("image", part);

        let response = self
            .http
            .post(format!("{}/v1/uploads", self.base_url))
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::Http)?;
        Self::parse(response).await
    }

    async fn submit_try_on(&self, request: &ImageJobRequest) -> Result<SubmitResponse, ApiError> {
        let response = self
            .http
            .post(format!("{}/v1/tryon", self.base_url))
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await
            .map_err(ApiError::Http)?;
        Self::parse(response).await
    }

    async fn submit_video(&self, request: &VideoJobRequest) -> Result<SubmitResponse, ApiError> {
        let response = self
            .http
            .post(format!("{}/v1/videos", self.base_url))
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await
            .map_err(ApiError::Http)?;
        Self::parse(response).await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ApiError> {
        let response = self
            .http
            .get(format!("{}/v1/jobs/{}", self.base_url, job_id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(ApiError::Http)?;
        Self::parse(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },
}
