use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::ViewerError;
use crate::geometry::Size;

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("3f0d4c52-8d1e-5b8a-9a40-6f2de1c4b7a9").expect("valid namespace UUID")
});

/// Where a document's bytes come from.
#[derive(Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Url(String),
    Bytes(Arc<[u8]>),
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            DocumentSource::Url(url) => f.debug_tuple("Url").field(url).finish(),
            DocumentSource::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
        }
    }
}

impl DocumentSource {
    /// Accepts `data:` URLs with a base64 payload, `file://` URLs, remote URLs
    /// and plain filesystem paths.
    pub fn parse(input: &str) -> Result<Self, ViewerError> {
        let trimmed = input.trim();
        if let Some(rest) = trimmed.strip_prefix("data:") {
            return parse_data_url(rest);
        }
        match Url::parse(trimmed) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(DocumentSource::Path)
                .map_err(|_| ViewerError::UnsupportedSource(trimmed.to_string())),
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Ok(DocumentSource::Url(url.to_string()))
            }
            _ => Ok(DocumentSource::Path(PathBuf::from(trimmed))),
        }
    }

    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        DocumentSource::Bytes(data.into())
    }

    /// Last path segment of the source, if it has one.
    pub fn file_name(&self) -> Option<String> {
        match self {
            DocumentSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            DocumentSource::Url(raw) => Url::parse(raw)
                .ok()
                .and_then(|url| {
                    url.path_segments()
                        .and_then(|mut segments| segments.next_back().map(str::to_owned))
                })
                .filter(|segment| !segment.is_empty()),
            DocumentSource::Bytes(_) => None,
        }
    }
}

fn parse_data_url(rest: &str) -> Result<DocumentSource, ViewerError> {
    let Some((header, payload)) = rest.split_once(',') else {
        return Err(ViewerError::InvalidDataUrl("missing ',' separator".into()));
    };
    if !header.ends_with(";base64") {
        return Err(ViewerError::InvalidDataUrl(format!(
            "unsupported encoding in header {header:?}"
        )));
    }
    let data = BASE64.decode(payload.trim())?;
    Ok(DocumentSource::Bytes(data.into()))
}

pub fn document_id_for_source(source: &DocumentSource) -> DocumentId {
    match source {
        DocumentSource::Path(path) => {
            let resolved = path
                .canonicalize()
                .or_else(|_| {
                    if path.is_absolute() {
                        Ok(path.to_path_buf())
                    } else {
                        std::env::current_dir().map(|cwd| cwd.join(path))
                    }
                })
                .unwrap_or_else(|_| path.to_path_buf());
            Uuid::new_v5(&*DOCUMENT_NAMESPACE, resolved.to_string_lossy().as_bytes())
        }
        DocumentSource::Url(url) => Uuid::new_v5(&*DOCUMENT_NAMESPACE, url.as_bytes()),
        DocumentSource::Bytes(data) => Uuid::new_v5(&*DOCUMENT_NAMESPACE, &data[..]),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Pdf,
    Png,
    Jpeg,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Png => "png",
            DocumentFormat::Jpeg => "jpg",
        }
    }

    /// Guesses the format from leading magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"%PDF") {
            Some(DocumentFormat::Pdf)
        } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(DocumentFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(DocumentFormat::Jpeg)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub source: DocumentSource,
    pub format: DocumentFormat,
    /// Unscaled page sizes in pixels at scale 1.0, first page first.
    pub page_sizes: Vec<Size>,
}

impl DocumentInfo {
    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderRequest {
    /// 1-based.
    pub page_number: usize,
    pub scale: f32,
}

#[derive(Debug, Clone)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major.
    pub pixels: Vec<u8>,
}

impl RenderImage {
    pub fn dims(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }
}

/// Page-rendering capability for one opened document.
pub trait DocumentBackend: Send + Sync {
    fn info(&self) -> &DocumentInfo;
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage>;
}

#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentBackend>>;
}

/// Saves a copy of a document somewhere the user can reach it.
pub trait Downloader {
    fn save(&self, source: &DocumentSource, file_name: &str) -> Result<PathBuf>;
}

/// Name offered for a download: the display name if given, else the source's
/// last path segment, else `document`. The native extension is appended when
/// missing.
pub fn download_file_name(
    display_name: Option<&str>,
    source: &DocumentSource,
    format: DocumentFormat,
) -> String {
    let extension = format.extension();
    let base = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .or_else(|| source.file_name())
        .unwrap_or_else(|| "document".to_string());

    let suffix = format!(".{extension}");
    if base.to_ascii_lowercase().ends_with(&suffix) {
        base
    } else {
        format!("{base}{suffix}")
    }
}

/// Writes downloads into a directory, never overwriting an existing file.
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unique_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let as_path = Path::new(file_name);
        let stem = as_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let extension = as_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut counter = 1;
        loop {
            let path = self.dir.join(format!("{stem} ({counter}){extension}"));
            if !path.exists() {
                return path;
            }
            counter += 1;
        }
    }
}

impl Downloader for DirectoryDownloader {
    fn save(&self, source: &DocumentSource, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create download directory {:?}", self.dir))?;
        let target = self.unique_path(file_name);
        match source {
            DocumentSource::Path(path) => {
                fs::copy(path, &target)
                    .with_context(|| format!("failed to copy {:?} to {:?}", path, target))?;
            }
            DocumentSource::Bytes(data) => {
                fs::write(&target, data)
                    .with_context(|| format!("failed to write {:?}", target))?;
            }
            DocumentSource::Url(url) => bail!("cannot download remote source {url}"),
        }
        debug!(path = %target.display(), "document saved");
        Ok(target)
    }
}
