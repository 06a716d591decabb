//! Viewport, navigation and field-highlight logic for a paged document
//! viewer. Rendering, input and drawing are supplied by the host.

pub mod auth;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod fields;
pub mod geometry;
pub mod layout;
pub mod navigation;
pub mod progress;
pub mod regions;
pub mod scroll;
pub mod toolbar;
pub mod viewport;
pub mod visibility;

pub use auth::{authorization_header, AuthSession, JwtSession, Token};
pub use config::ViewerConfig;
pub use controller::{Command, DocumentViewerController, OverlayLayer, OverlayRenderer, ViewerEvent};
pub use document::{
    document_id_for_source, download_file_name, DirectoryDownloader, DocumentBackend,
    DocumentFormat, DocumentId, DocumentInfo, DocumentProvider, DocumentSource, Downloader,
    RenderImage, RenderRequest,
};
pub use error::ViewerError;
pub use fields::{
    ConfidenceBand, Field, FieldFocus, FieldListEditor, FieldPolicy, HighlightRegion,
    MANUAL_CONFIDENCE,
};
pub use geometry::{NormalizedBox, PageBox, PageDims, PixelRect, Point, ScrollOffset, Size};
pub use layout::PageLayout;
pub use navigation::{NavigationController, NavigationState};
pub use progress::EaseOutProgress;
pub use regions::PageDimensionTable;
pub use scroll::{ScrollPort, ScrollSurface};
pub use toolbar::{ToolbarBreakpoints, ToolbarLayout, ToolbarMode};
pub use viewport::{ViewportState, ZoomLimits};
pub use visibility::{determine_current_page, PageVisibilityTracker};
