use base64::Engine;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;

/// A try-on input as supplied by the UI layer.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// `data:<mime>;base64,<payload>` string, e.g. a compressed camera shot.
    DataUrl(String),
    /// Reference URL, e.g. a product image.
    Url(String),
    Bytes(Vec<u8>),
}

/// Resolves input references into raw bytes and verifies they decode as an
/// image before anything is uploaded.
pub struct ImageFetcher {
    http: Client,
    fetch_timeout: Duration,
}

impl ImageFetcher {
    pub fn new(fetch_timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            fetch_timeout,
        }
    }

    pub async fn resolve(&self, source: &ImageSource) -> Result<Vec<u8>, ImageError> {
        let bytes = match source {
            ImageSource::DataUrl(data) => decode_data_url(data)?,
            ImageSource::Url(url) => self.fetch(url).await?,
            ImageSource::Bytes(bytes) => bytes.clone(),
        };
        image::load_from_memory(&bytes)?;
        Ok(bytes)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let response = timeout(self.fetch_timeout, self.http.get(url).send())
            .await
            .map_err(|_| ImageError::Timeout)?
            .map_err(ImageError::Fetch)?
            .error_for_status()
            .map_err(ImageError::Fetch)?;
        let bytes = timeout(self.fetch_timeout, response.bytes())
            .await
            .map_err(|_| ImageError::Timeout)?
            .map_err(ImageError::Fetch)?;
        Ok(bytes.to_vec())
    }
}

fn decode_data_url(data: &str) -> Result<Vec<u8>, ImageError> {
    let payload = data
        .strip_prefix("data:")
        .ok_or(ImageError::MalformedDataUrl)?;
    let (meta, body) = payload.split_once(',').ok_or(ImageError::MalformedDataUrl)?;
    if !meta.ends_with(";base64") {
        return Err(ImageError::MalformedDataUrl);
    }
    base64::engine::general_purpose::STANDARD
        .decode(body.trim())
        .map_err(ImageError::Base64)
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("malformed data URL")]
    MalformedDataUrl,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to fetch image: {0}")]
    Fetch(reqwest::Error),

    #[error("image fetch timed out")]
    Timeout,

    #[error("input is not a decodable image: {0}")]
    Undecodable(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG.
    const PNG_1X1_B64: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    #[tokio::test]
    async fn test_resolves_data_url_to_decodable_bytes() {
        let fetcher = ImageFetcher::new(Duration::from_secs(5));
        let source = ImageSource::DataUrl(format!("data:image/png;base64,{PNG_1X1_B64}"));
        let bytes = fetcher.resolve(&source).await.expect("resolve");
        assert!(!bytes.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_undecodable_bytes() {
        let fetcher = ImageFetcher::new(Duration::from_secs(5));
        let source = ImageSource::Bytes(b"definitely not an image".to_vec());
        assert!(matches!(
            fetcher.resolve(&source).await,
            Err(ImageError::Undecodable(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_data_url_without_base64_marker() {
        let fetcher = ImageFetcher::new(Duration::from_secs(5));
        let source = ImageSource::DataUrl("data:image/png,rawpayload".to_string());
        assert!(matches!(
            fetcher.resolve(&source).await,
            Err(ImageError::MalformedDataUrl)
        ));
    }

    #[tokio::test]
    async fn test_rejects_plain_string() {
        let fetcher = ImageFetcher::new(Duration::from_secs(5));
        let source = ImageSource::DataUrl("not a data url".to_string());
        assert!(matches!(
            fetcher.resolve(&source).await,
            Err(ImageError::MalformedDataUrl)
        ));
    }
}
