use std::convert::TryFrom;
use std::env;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ocrview_core::{
    document_id_for_source, DocumentBackend, DocumentFormat, DocumentInfo, DocumentProvider,
    DocumentSource, RenderImage, RenderRequest, Size,
};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use tracing::{debug, instrument, warn};

use crate::SourceError;

const LIBRARY_PATH_VAR: &str = "OCRVIEW_PDFIUM_LIBRARY_PATH";

/// Smallest factor handed to Pdfium; tinier bitmaps are not worth drawing.
const MIN_RENDER_SCALE: f32 = 0.05;

pub struct PdfiumProvider {
    pdfium: Arc<Pdfium>,
}

impl PdfiumProvider {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_env() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }

    pub(crate) fn open_source(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentBackend>> {
        let source = match source {
            DocumentSource::Path(path) => DocumentSource::Path(
                path.canonicalize()
                    .with_context(|| format!("failed to resolve path for {:?}", path))?,
            ),
            other => other.clone(),
        };
        let document = PdfiumDocument::new(Arc::clone(&self.pdfium), source)?;
        Ok(Arc::new(document))
    }
}

#[async_trait]
impl DocumentProvider for PdfiumProvider {
    async fn open(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentBackend>> {
        self.open_source(source)
    }
}

struct PdfiumDocument {
    // Declared ahead of `pdfium` so it is dropped first.
    document: Mutex<Option<PdfDocument<'static>>>,
    pdfium: Arc<Pdfium>,
    info: DocumentInfo,
}

impl PdfiumDocument {
    fn new(pdfium: Arc<Pdfium>, source: DocumentSource) -> Result<Self> {
        let document = load_document(&pdfium, &source)?;
        let page_sizes = document
            .pages()
            .iter()
            .map(|page| Size::new(page.width().value, page.height().value))
            .collect::<Vec<_>>();
        debug!(pages = page_sizes.len(), ?source, "pdf opened");

        let info = DocumentInfo {
            id: document_id_for_source(&source),
            source,
            format: DocumentFormat::Pdf,
            page_sizes,
        };
        // SAFETY: the document borrows the bindings owned by `pdfium`, which
        // this struct keeps alive and drops after `document`.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        Ok(Self {
            document: Mutex::new(Some(document)),
            pdfium,
            info,
        })
    }

    fn with_document<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&PdfDocument<'static>) -> Result<R>,
    {
        let mut guard = self.document.lock();
        let document = match guard.take() {
            Some(document) => document,
            None => {
                let document = load_document(&self.pdfium, &self.info.source)?;
                // SAFETY: see `PdfiumDocument::new`.
                unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) }
            }
        };
        let document = guard.insert(document);
        f(document)
    }

    fn render_internal(
        &self,
        document: &PdfDocument<'_>,
        request: &RenderRequest,
    ) -> Result<RenderImage> {
        let index = request
            .page_number
            .checked_sub(1)
            .ok_or_else(|| anyhow!("page numbers start at 1"))?;
        let page_index: PdfPageIndex = index
            .try_into()
            .map_err(|_| anyhow!("page {} is out of supported range", request.page_number))?;
        let page = document
            .pages()
            .get(page_index)
            .with_context(|| format!("page {} out of range", request.page_number))?;

        let config =
            PdfRenderConfig::new().scale_page_by_factor(request.scale.max(MIN_RENDER_SCALE));
        let bitmap = page
            .render_with_config(&config)
            .with_context(|| format!("failed to render page {}", request.page_number))?;
        let image = bitmap.as_image().to_rgba8();

        Ok(RenderImage {
            width: u32::try_from(bitmap.width()).unwrap_or_default(),
            height: u32::try_from(bitmap.height()).unwrap_or_default(),
            pixels: image.into_raw(),
        })
    }
}

impl DocumentBackend for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    #[instrument(skip(self))]
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage> {
        self.with_document(|document| self.render_internal(document, &request))
    }
}

fn load_document<'a>(pdfium: &'a Pdfium, source: &DocumentSource) -> Result<PdfDocument<'a>> {
    match source {
        DocumentSource::Path(path) => pdfium
            .load_pdf_from_file(path, None)
            .with_context(|| format!("failed to open {:?}", path)),
        DocumentSource::Bytes(data) => pdfium
            .load_pdf_from_byte_vec(data.to_vec(), None)
            .context("failed to parse in-memory pdf"),
        DocumentSource::Url(url) => Err(SourceError::Remote(url.clone()).into()),
    }
}

fn bind_pdfium_from_env() -> Option<Pdfium> {
    let path = env::var_os(LIBRARY_PATH_VAR).map(PathBuf::from)?;
    if path.as_os_str().is_empty() {
        return None;
    }
    let path = if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(&path)
    } else {
        path
    };
    match Pdfium::bind_to_library(&path) {
        Ok(bindings) => Some(Pdfium::new(bindings)),
        Err(err) => {
            warn!(
                "failed to load Pdfium from {} ({}): {}",
                path.display(),
                LIBRARY_PATH_VAR,
                err
            );
            None
        }
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => errors.push(format!("{}: {}", cwd_path.display(), err)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; set {} or install it ({})",
                LIBRARY_PATH_VAR,
                errors.join(", ")
            ))
        }
    }
}
