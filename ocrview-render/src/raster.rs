use std::fs;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use ocrview_core::{
    document_id_for_source, DocumentBackend, DocumentFormat, DocumentInfo, DocumentSource,
    RenderImage, RenderRequest, Size,
};
use tracing::{debug, instrument};

use crate::SourceError;

/// A scanned page uploaded as a single PNG or JPEG image.
pub struct RasterDocument {
    info: DocumentInfo,
    image: RgbaImage,
}

impl RasterDocument {
    pub fn open(source: &DocumentSource, format: DocumentFormat) -> Result<Self> {
        let bytes = match source {
            DocumentSource::Path(path) => {
                fs::read(path).with_context(|| format!("failed to read {:?}", path))?
            }
            DocumentSource::Bytes(data) => data.to_vec(),
            DocumentSource::Url(url) => return Err(SourceError::Remote(url.clone()).into()),
        };
        let image = image::load_from_memory(&bytes)
            .context("failed to decode image")?
            .to_rgba8();
        debug!(width = image.width(), height = image.height(), "image opened");

        Ok(Self {
            info: DocumentInfo {
                id: document_id_for_source(source),
                source: source.clone(),
                format,
                page_sizes: vec![Size::new(image.width() as f32, image.height() as f32)],
            },
            image,
        })
    }
}

impl DocumentBackend for RasterDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    #[instrument(skip(self))]
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage> {
        if request.page_number != 1 {
            return Err(anyhow!("page {} out of range", request.page_number));
        }
        let scale = if request.scale.is_finite() {
            request.scale.max(0.01)
        } else {
            1.0
        };
        let width = ((self.image.width() as f32 * scale).round() as u32).max(1);
        let height = ((self.image.height() as f32 * scale).round() as u32).max(1);

        let pixels = if width == self.image.width() && height == self.image.height() {
            self.image.as_raw().clone()
        } else {
            imageops::resize(&self.image, width, height, FilterType::Triangle).into_raw()
        };
        Ok(RenderImage {
            width,
            height,
            pixels,
        })
    }
}
