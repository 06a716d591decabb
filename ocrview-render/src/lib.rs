//! Page rasterisation for the viewer: Pdfium for PDFs, the `image` crate for
//! scanned PNG/JPEG uploads, plus frame composition for the terminal host.

mod cache;
pub mod compose;
#[cfg(feature = "pdf")]
mod pdf;
mod raster;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ocrview_core::{DocumentBackend, DocumentFormat, DocumentProvider, DocumentSource};
use thiserror::Error;
use tracing::{debug, instrument};

pub use cache::PageRenderer;
pub use compose::{compose_frame, Frame, HighlightStyle, PlacedPage};
#[cfg(feature = "pdf")]
pub use pdf::PdfiumProvider;
pub use raster::RasterDocument;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("remote sources must be fetched before opening: {0}")]
    Remote(String),
    #[error("unrecognised document format")]
    UnknownFormat,
    #[error("this build has no PDF support")]
    PdfDisabled,
}

/// Opens any supported source, choosing the backend from the payload's
/// leading bytes.
pub struct DocumentLoader {
    #[cfg(feature = "pdf")]
    pdf: Option<PdfiumProvider>,
}

impl DocumentLoader {
    /// Binds Pdfium when available. A missing library only disables PDF
    /// support; images still open.
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "pdf")]
            pdf: match PdfiumProvider::new() {
                Ok(provider) => Some(provider),
                Err(err) => {
                    tracing::warn!(?err, "pdfium unavailable; only images can be opened");
                    None
                }
            },
        }
    }

    #[cfg(feature = "pdf")]
    fn open_pdf(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentBackend>> {
        let provider = self.pdf.as_ref().ok_or(SourceError::PdfDisabled)?;
        provider.open_source(source)
    }

    #[cfg(not(feature = "pdf"))]
    fn open_pdf(&self, _source: &DocumentSource) -> Result<Arc<dyn DocumentBackend>> {
        Err(SourceError::PdfDisabled.into())
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentProvider for DocumentLoader {
    #[instrument(skip(self))]
    async fn open(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentBackend>> {
        let head = leading_bytes(source)?;
        let format = DocumentFormat::sniff(&head).ok_or(SourceError::UnknownFormat)?;
        debug!(?format, "detected document format");
        match format {
            DocumentFormat::Pdf => self.open_pdf(source),
            DocumentFormat::Png | DocumentFormat::Jpeg => {
                Ok(Arc::new(RasterDocument::open(source, format)?))
            }
        }
    }
}

fn leading_bytes(source: &DocumentSource) -> Result<Vec<u8>> {
    match source {
        DocumentSource::Bytes(data) => Ok(data.iter().take(16).copied().collect()),
        DocumentSource::Path(path) => {
            use std::io::Read;
            let mut head = Vec::with_capacity(16);
            fs::File::open(path)
                .with_context(|| format!("failed to open {:?}", path))?
                .take(16)
                .read_to_end(&mut head)
                .with_context(|| format!("failed to read {:?}", path))?;
            Ok(head)
        }
        DocumentSource::Url(url) => Err(SourceError::Remote(url.clone()).into()),
    }
}
