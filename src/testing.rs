//! In-memory image source and fixtures for async tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};

use crate::loader::{ImageSource, LoadError};

#[derive(Default)]
pub(crate) struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    delay: Option<Duration>,
}

impl MemorySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, location: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(location.to_owned(), bytes);
        self
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ImageSource for MemorySource {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, LoadError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.files.get(location).cloned().ok_or_else(|| LoadError::Io {
            location: location.to_owned(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// A `width`×`height` horizontal gradient, opaque.
pub(crate) fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = u8::try_from(x * 255 / width.max(1)).unwrap_or(u8::MAX);
        let g = u8::try_from(y * 255 / height.max(1)).unwrap_or(u8::MAX);
        Rgba([r, g, 100, 255])
    })
}

pub(crate) fn png(image: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).expect("png encode");
    out.into_inner()
}
