//! Image loading for `init`: fetch the background and optional overlay in
//! parallel, decode off the async runtime, bound the whole thing by a timeout.

use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use tracing::debug;

use crate::config::LoadTimeouts;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("image location is empty")]
    EmptyLocation,

    #[error("request for {location} failed: {message}")]
    Request { location: String, message: String },

    #[error("{location} answered with status {status}")]
    Status { location: String, status: u16 },

    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: image::ImageError,
    },

    #[error("image load timed out after {millis} ms")]
    Timeout { millis: u64 },

    #[error("decode task failed: {0}")]
    Join(String),

    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl frames::ErrorCode for LoadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyLocation => "E_EMPTY_LOCATION",
            Self::Request { .. } => "E_FETCH",
            Self::Status { .. } => "E_FETCH_STATUS",
            Self::Io { .. } => "E_IO",
            Self::Decode { .. } => "E_DECODE_IMAGE",
            Self::Timeout { .. } => "E_TIMEOUT",
            Self::Join(_) => "E_JOIN",
            Self::ClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request { .. } | Self::Timeout { .. } | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// Where image bytes come from.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, LoadError>;
}

/// `http(s)://` through reqwest, everything else (plain paths, `file://`)
/// through the filesystem.
pub struct HttpSource {
    http: reqwest::Client,
}

impl HttpSource {
    /// # Errors
    ///
    /// Returns [`LoadError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(timeouts: LoadTimeouts) -> Result<Self, LoadError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.load_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LoadError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }

    async fn fetch_http(&self, location: &str) -> Result<Vec<u8>, LoadError> {
        let request_error = |e: reqwest::Error| LoadError::Request { location: location.to_owned(), message: e.to_string() };

        let response = self.http.get(location).send().await.map_err(request_error)?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(LoadError::Status { location: location.to_owned(), status });
        }
        let bytes = response.bytes().await.map_err(request_error)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageSource for HttpSource {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, LoadError> {
        match Scheme::of(location) {
            Scheme::Http => self.fetch_http(location).await,
            Scheme::File(path) => tokio::fs::read(path)
                .await
                .map_err(|source| LoadError::Io { location: location.to_owned(), source }),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Scheme<'a> {
    Http,
    File(&'a str),
}

impl<'a> Scheme<'a> {
    fn of(location: &'a str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Http
        } else {
            Self::File(location.strip_prefix("file://").unwrap_or(location))
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Decoded bitmaps for one session.
#[derive(Debug)]
pub struct LoadedImages {
    pub background: RgbaImage,
    pub overlay: Option<RgbaImage>,
}

/// Fetch and decode the background and overlay concurrently. The first
/// failure wins; nothing is returned unless both succeed.
///
/// # Errors
///
/// Returns the first fetch or decode error, or [`LoadError::Timeout`] when
/// the pair is not ready within `limit`.
pub async fn load_images(
    source: &dyn ImageSource,
    background: &str,
    overlay: Option<&str>,
    limit: Duration,
) -> Result<LoadedImages, LoadError> {
    let both = async {
        let overlay = async {
            match overlay {
                Some(location) => load_one(source, location).await.map(Some),
                None => Ok(None),
            }
        };
        tokio::try_join!(load_one(source, background), overlay)
    };

    let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
    let (background, overlay) = tokio::time::timeout(limit, both).await.map_err(|_| LoadError::Timeout { millis })??;
    Ok(LoadedImages { background, overlay })
}

async fn load_one(source: &dyn ImageSource, location: &str) -> Result<RgbaImage, LoadError> {
    if location.trim().is_empty() {
        return Err(LoadError::EmptyLocation);
    }
    let bytes = source.fetch(location).await?;
    debug!(location, bytes = bytes.len(), "image fetched");

    let location = location.to_owned();
    tokio::task::spawn_blocking(move || decode(&location, &bytes))
        .await
        .map_err(|e| LoadError::Join(e.to_string()))?
}

/// Decode any supported image format into RGBA8.
///
/// # Errors
///
/// Returns [`LoadError::Decode`] when the bytes are not a supported image.
pub fn decode(location: &str, bytes: &[u8]) -> Result<RgbaImage, LoadError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| LoadError::Decode { location: location.to_owned(), source })
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
