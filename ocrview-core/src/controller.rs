use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::ViewerConfig;
use crate::document::{
    download_file_name, DocumentBackend, DocumentId, DocumentInfo, DocumentProvider,
    DocumentSource, Downloader,
};
use crate::error::ViewerError;
use crate::fields::FieldFocus;
use crate::geometry::{PageBox, PageDims, PixelRect, Point, ScrollOffset, Size};
use crate::layout::PageLayout;
use crate::navigation::{NavigationController, NavigationState};
use crate::regions::{scroll_target_for, PageDimensionTable};
use crate::scroll::ScrollSurface;
use crate::toolbar::ToolbarLayout;
use crate::viewport::{
    clamp_scroll, container_center, fit_scale, max_scroll, zoom_at, ViewportState, ZoomLimits,
};
use crate::visibility::{determine_current_page, PageVisibilityTracker};

/// Host-supplied drawing for the layer laid over each rendered page.
pub trait OverlayRenderer {
    type Output;

    fn render_overlay(&self, page_number: usize, dims: PageDims) -> Self::Output;
}

impl<F, O> OverlayRenderer for F
where
    F: Fn(usize, PageDims) -> O,
{
    type Output = O;

    fn render_overlay(&self, page_number: usize, dims: PageDims) -> O {
        self(page_number, dims)
    }
}

/// Overlay output positioned to cover exactly one page. Overlays never
/// receive input.
#[derive(Debug, Clone)]
pub struct OverlayLayer<O> {
    pub page_number: usize,
    /// The page's box in content-space.
    pub frame: PixelRect,
    pub content: O,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NextPage { count: usize },
    PrevPage { count: usize },
    GotoPage { page: usize },
    ZoomIn,
    ZoomOut,
    ZoomTo { scale: f32 },
    ResetZoom,
    /// Ctrl+wheel; `anchor` is relative to the container's top-left corner.
    WheelZoom { anchor: Point, delta_y: f32 },
    ScrollBy { delta_x: f32, delta_y: f32 },
    HoverPage { page: Option<usize> },
    HoverField { focus: Option<FieldFocus> },
    ContainerResized { size: Size },
    ToolbarResized { width: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    DocumentLoaded { id: DocumentId, page_count: usize },
    PageChanged { page: usize },
    ScaleChanged { scale: f32 },
    RedrawNeeded,
    Downloaded { path: PathBuf },
}

pub struct DocumentViewerController<S: ScrollSurface> {
    config: ViewerConfig,
    zoom: ZoomLimits,
    surface: S,
    backend: Option<Arc<dyn DocumentBackend>>,
    display_name: Option<String>,
    viewport: ViewportState,
    dims: PageDimensionTable,
    layout: PageLayout,
    navigation: NavigationController,
    visibility: PageVisibilityTracker,
    /// Anchored scroll computed at zoom time, applied on the following tick
    /// once layout reflects the new scale.
    pending_zoom_scroll: Option<ScrollOffset>,
    hovered_page: Option<usize>,
    hovered_field: Option<FieldFocus>,
    /// Field waiting for its page to render before it can be centred.
    pending_field_focus: Option<FieldFocus>,
    toolbar: ToolbarLayout,
    events: Arc<Mutex<Vec<ViewerEvent>>>,
}

impl<S: ScrollSurface> DocumentViewerController<S> {
    pub fn new(config: ViewerConfig, surface: S) -> Self {
        Self {
            zoom: config.zoom_limits(),
            navigation: NavigationController::new(config.suppression_window),
            visibility: PageVisibilityTracker::new(config.scroll_debounce),
            config,
            surface,
            backend: None,
            display_name: None,
            viewport: ViewportState::default(),
            dims: PageDimensionTable::new(),
            layout: PageLayout::default(),
            pending_zoom_scroll: None,
            hovered_page: None,
            hovered_field: None,
            pending_field_focus: None,
            toolbar: ToolbarLayout::default(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn events(&self) -> Arc<Mutex<Vec<ViewerEvent>>> {
        Arc::clone(&self.events)
    }

    fn emit(&self, event: ViewerEvent) {
        self.events.lock().push(event);
    }

    pub fn set_display_name(&mut self, name: Option<String>) {
        self.display_name = name;
    }

    /// Opens `source` through `provider`. On failure the viewer is left empty
    /// and the error is handed back for the host to report.
    #[instrument(skip(self, provider))]
    pub async fn load<P>(&mut self, provider: &P, source: DocumentSource) -> Result<(), ViewerError>
    where
        P: DocumentProvider + ?Sized,
    {
        self.reset();
        match provider.open(&source).await {
            Ok(backend) => {
                self.open(backend);
                Ok(())
            }
            Err(err) => {
                warn!(?err, "document failed to load");
                Err(ViewerError::Load(err))
            }
        }
    }

    /// Installs an already parsed document and fits its first page.
    pub fn open(&mut self, backend: Arc<dyn DocumentBackend>) {
        self.reset();
        let info = backend.info();
        let page_count = info.page_count();
        let id = info.id;
        let first = info.page_sizes.first().copied().unwrap_or_default();
        let baseline = fit_scale(first, self.surface.container_size(), self.config.fit_margin);
        debug!(page_count, baseline, "document opened");

        self.viewport = ViewportState::with_baseline(baseline);
        self.navigation.reset(page_count);
        self.backend = Some(backend);
        self.relayout();
        self.surface.scroll_to(ScrollOffset::ORIGIN);

        self.emit(ViewerEvent::DocumentLoaded { id, page_count });
        self.emit(ViewerEvent::ScaleChanged { scale: baseline });
        self.emit(ViewerEvent::RedrawNeeded);
    }

    fn reset(&mut self) {
        self.backend = None;
        self.viewport = ViewportState::default();
        self.dims.clear();
        self.layout = PageLayout::default();
        self.navigation.reset(0);
        self.visibility.cancel();
        self.pending_zoom_scroll = None;
        self.hovered_page = None;
        self.hovered_field = None;
        self.pending_field_focus = None;
        self.surface.scroll_to(ScrollOffset::ORIGIN);
    }

    pub fn backend(&self) -> Option<&Arc<dyn DocumentBackend>> {
        self.backend.as_ref()
    }

    pub fn info(&self) -> Option<&DocumentInfo> {
        self.backend.as_deref().map(|backend| backend.info())
    }

    pub fn page_count(&self) -> usize {
        self.navigation.page_count()
    }

    pub fn current_page(&self) -> usize {
        self.navigation.current_page()
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.navigation.state()
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.navigation.is_suppressed(now)
    }

    pub fn can_go_next(&self) -> bool {
        self.navigation.can_go_next()
    }

    pub fn can_go_prev(&self) -> bool {
        self.navigation.can_go_prev()
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn scale(&self) -> f32 {
        self.viewport.scale
    }

    pub fn zoom_percent(&self) -> u32 {
        self.viewport.zoom_percent()
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn scroll_offset(&self) -> ScrollOffset {
        self.surface.scroll_offset()
    }

    pub fn max_scroll(&self) -> ScrollOffset {
        max_scroll(self.layout.content_size(), self.surface.container_size())
    }

    pub fn toolbar(&self) -> ToolbarLayout {
        self.toolbar
    }

    pub fn hovered_field(&self) -> Option<FieldFocus> {
        self.hovered_field
    }

    /// Most recent rendered dimensions for `page_number`, whatever the scale.
    pub fn rendered_dims(&self, page_number: usize) -> Option<PageDims> {
        self.dims.latest(page_number)
    }

    /// Rendered dimensions for `page_number` at the current scale, if known.
    pub fn current_dims(&self, page_number: usize) -> Option<PageDims> {
        self.dims.at_scale(page_number, self.viewport.scale)
    }

    pub fn visible_pages(&self) -> Vec<PageBox> {
        self.layout
            .visible(self.surface.scroll_offset(), self.surface.container_size())
            .copied()
            .collect()
    }

    /// Records the pixel size a page rendered at under the current scale.
    /// Arrival order across pages does not matter.
    pub fn on_page_rendered(&mut self, page_number: usize, dims: PageDims) {
        if page_number == 0 || page_number > self.page_count() {
            debug!(page_number, "render result for unknown page ignored");
            return;
        }
        self.dims.record(page_number, dims, self.viewport.scale);
        self.relayout();
        self.emit(ViewerEvent::RedrawNeeded);
    }

    fn relayout(&mut self) {
        let natural: &[Size] = match self.backend.as_deref() {
            Some(backend) => &backend.info().page_sizes,
            None => &[],
        };
        self.layout = PageLayout::compute(
            natural,
            &self.dims,
            self.viewport.scale,
            self.surface.container_size().width,
            self.config.page_gap,
        );
        self.clamp_surface();
    }

    fn clamp_surface(&mut self) {
        let current = self.surface.scroll_offset();
        let clamped = clamp_scroll(current, self.max_scroll());
        if clamped != current {
            self.surface.scroll_to(clamped);
        }
    }

    pub fn on_container_resized(&mut self, size: Size) {
        self.surface.resize(size);
        self.relayout();
        self.emit(ViewerEvent::RedrawNeeded);
    }

    /// Reclassifies the toolbar; viewport state is untouched.
    pub fn on_toolbar_resized(&mut self, width: f32) -> bool {
        let next = ToolbarLayout::classify(width, &self.config.toolbar);
        let changed = next != self.toolbar;
        self.toolbar = next;
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        let step = self.zoom.step(self.viewport.baseline_scale);
        let anchor = container_center(self.surface.container_size());
        self.set_scale(self.viewport.scale + step, anchor)
    }

    pub fn zoom_out(&mut self) -> bool {
        let step = self.zoom.step(self.viewport.baseline_scale);
        let anchor = container_center(self.surface.container_size());
        self.set_scale(self.viewport.scale - step, anchor)
    }

    pub fn zoom_to(&mut self, scale: f32) -> bool {
        let anchor = container_center(self.surface.container_size());
        self.set_scale(scale, anchor)
    }

    /// Zooms one step around `anchor`; negative `delta_y` (wheel up) zooms in.
    pub fn wheel_zoom(&mut self, anchor: Point, delta_y: f32) -> bool {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return false;
        }
        let step = self.zoom.step(self.viewport.baseline_scale);
        let delta = if delta_y < 0.0 { step } else { -step };
        self.set_scale(self.viewport.scale + delta, anchor)
    }

    pub fn reset_zoom(&mut self, now: Instant) -> bool {
        if self.backend.is_none() {
            return false;
        }
        self.pending_zoom_scroll = None;
        self.viewport.scale = self.viewport.baseline_scale;
        self.relayout();
        self.surface.scroll_to(ScrollOffset::ORIGIN);
        self.on_scroll(now);
        self.emit(ViewerEvent::ScaleChanged {
            scale: self.viewport.scale,
        });
        self.emit(ViewerEvent::RedrawNeeded);
        true
    }

    /// First phase of a zoom: apply the scale now and remember where the
    /// anchor should land. The scroll is set on the next [`tick`](Self::tick).
    fn set_scale(&mut self, requested: f32, anchor: Point) -> bool {
        if self.backend.is_none() {
            return false;
        }
        let old_scale = self.viewport.scale;
        let new_scale = self.zoom.clamp(requested, self.viewport.baseline_scale);
        if (new_scale - old_scale).abs() <= f32::EPSILON * old_scale.max(1.0) {
            return false;
        }
        let target = zoom_at(anchor, old_scale, new_scale, self.surface.scroll_offset());
        debug!(old_scale, new_scale, "scale changed");

        self.viewport.scale = new_scale;
        self.relayout();
        self.pending_zoom_scroll = Some(target);
        self.emit(ViewerEvent::ScaleChanged { scale: new_scale });
        self.emit(ViewerEvent::RedrawNeeded);
        true
    }

    /// User-driven scroll.
    pub fn scroll_by(&mut self, delta_x: f32, delta_y: f32, now: Instant) -> bool {
        let current = self.surface.scroll_offset();
        self.scroll_to(
            ScrollOffset::new(current.left + delta_x, current.top + delta_y),
            now,
        )
    }

    pub fn scroll_to(&mut self, offset: ScrollOffset, now: Instant) -> bool {
        let target = clamp_scroll(offset, self.max_scroll());
        if target == self.surface.scroll_offset() {
            return false;
        }
        self.surface.scroll_to(target);
        self.on_scroll(now);
        self.emit(ViewerEvent::RedrawNeeded);
        true
    }

    /// Every change of scroll position lands here, user-driven or not.
    fn on_scroll(&mut self, now: Instant) {
        if self.navigation.is_suppressed(now) {
            return;
        }
        self.visibility.schedule(now);
    }

    pub fn request_page(&mut self, page: usize, now: Instant) -> bool {
        match self.navigation.request_page(page, now) {
            Some(target) => {
                self.after_navigation(target, now);
                true
            }
            None => false,
        }
    }

    pub fn next_page(&mut self, count: usize, now: Instant) -> bool {
        match self.navigation.next(count, now) {
            Some(target) => {
                self.after_navigation(target, now);
                true
            }
            None => false,
        }
    }

    pub fn prev_page(&mut self, count: usize, now: Instant) -> bool {
        match self.navigation.prev(count, now) {
            Some(target) => {
                self.after_navigation(target, now);
                true
            }
            None => false,
        }
    }

    fn after_navigation(&mut self, target: usize, now: Instant) {
        self.visibility.cancel();
        if let Some(page) = self.layout.page(target) {
            let destination = clamp_scroll(
                ScrollOffset::new(self.surface.scroll_offset().left, page.top),
                self.max_scroll(),
            );
            self.surface.smooth_scroll_to(destination, now);
        }
        self.emit(ViewerEvent::PageChanged { page: target });
        self.emit(ViewerEvent::RedrawNeeded);
    }

    /// Hover signal from a sibling page list; acts only when it changes.
    pub fn set_hovered_page(&mut self, page: Option<usize>, now: Instant) -> bool {
        if page == self.hovered_page {
            return false;
        }
        self.hovered_page = page;
        match page {
            Some(page) if page != self.current_page() => self.request_page(page, now),
            _ => false,
        }
    }

    /// Hover signal from the field list: go to the field's page and centre its
    /// box. Centring waits for the page to render when its size is unknown.
    pub fn set_hovered_field(&mut self, focus: Option<FieldFocus>, now: Instant) -> bool {
        if focus == self.hovered_field {
            return false;
        }
        self.hovered_field = focus;
        self.pending_field_focus = None;
        let Some(focus) = focus else {
            self.emit(ViewerEvent::RedrawNeeded);
            return true;
        };
        if self.backend.is_none() {
            return false;
        }
        let focus = FieldFocus {
            page_number: self.navigation.clamp_page(focus.page_number),
            ..focus
        };

        if let Some(target) = self.navigation.request_page(focus.page_number, now) {
            self.visibility.cancel();
            self.emit(ViewerEvent::PageChanged { page: target });
        }

        if self
            .dims
            .at_scale(focus.page_number, self.viewport.scale)
            .is_some()
        {
            self.center_on(focus, now);
        } else {
            self.pending_field_focus = Some(focus);
            if self.navigation.is_suppressed(now) {
                if let Some(page) = self.layout.page(focus.page_number) {
                    let destination = clamp_scroll(
                        ScrollOffset::new(self.surface.scroll_offset().left, page.top),
                        self.max_scroll(),
                    );
                    self.surface.smooth_scroll_to(destination, now);
                }
            }
        }
        self.emit(ViewerEvent::RedrawNeeded);
        true
    }

    fn center_on(&mut self, focus: FieldFocus, now: Instant) {
        let Some(page) = self.layout.page(focus.page_number).copied() else {
            return;
        };
        let target = scroll_target_for(
            &focus.bounding_box,
            &page,
            self.surface.container_size(),
            self.max_scroll(),
        );
        self.navigation.suppress(now);
        self.visibility.cancel();
        self.surface.smooth_scroll_to(target, now);
    }

    /// Drives every timer: one animation frame, the deferred zoom scroll, the
    /// suppression deadline and the debounced page detection. Call once per
    /// frame. Returns true when a redraw is due.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if self.surface.advance(now) {
            self.clamp_surface();
            self.on_scroll(now);
            changed = true;
        }

        if let Some(target) = self.pending_zoom_scroll.take() {
            let clamped = clamp_scroll(target, self.max_scroll());
            if clamped != self.surface.scroll_offset() {
                self.surface.scroll_to(clamped);
                self.on_scroll(now);
                changed = true;
            }
        }

        self.navigation.poll(now);

        if let Some(focus) = self.pending_field_focus {
            if self
                .dims
                .at_scale(focus.page_number, self.viewport.scale)
                .is_some()
            {
                self.pending_field_focus = None;
                self.center_on(focus, now);
                changed = true;
            }
        }

        if self.visibility.poll(now) {
            if self.navigation.is_suppressed(now) {
                debug!("page detection discarded during navigation");
            } else {
                let offset = self.surface.scroll_offset();
                let container = self.surface.container_size();
                let page = determine_current_page(
                    offset.top,
                    container.height,
                    self.layout.pages(),
                    self.current_page(),
                );
                if self.navigation.observe_page(page, now) {
                    debug!(page, "current page follows scroll");
                    self.emit(ViewerEvent::PageChanged { page });
                    changed = true;
                }
            }
        }

        if changed {
            self.emit(ViewerEvent::RedrawNeeded);
        }
        changed
    }

    /// Calls `renderer` for every page whose current-scale dimensions are
    /// known and positions each result over its page.
    pub fn overlays<R>(&self, renderer: &R) -> Vec<OverlayLayer<R::Output>>
    where
        R: OverlayRenderer + ?Sized,
    {
        self.layout
            .pages()
            .iter()
            .filter_map(|page| {
                self.dims
                    .at_scale(page.page_number, self.viewport.scale)
                    .map(|dims| OverlayLayer {
                        page_number: page.page_number,
                        frame: page.rect(),
                        content: renderer.render_overlay(page.page_number, dims),
                    })
            })
            .collect()
    }

    /// Saves the document under its display name (or a derived one).
    pub fn download(&self, downloader: &dyn Downloader) -> Result<PathBuf, ViewerError> {
        let info = self.info().ok_or(ViewerError::NoDocument)?;
        let file_name = download_file_name(self.display_name.as_deref(), &info.source, info.format);
        let path = downloader
            .save(&info.source, &file_name)
            .map_err(ViewerError::Download)?;
        self.emit(ViewerEvent::Downloaded { path: path.clone() });
        Ok(path)
    }

    pub fn apply(&mut self, command: Command, now: Instant) -> bool {
        match command {
            Command::NextPage { count } => self.next_page(count, now),
            Command::PrevPage { count } => self.prev_page(count, now),
            Command::GotoPage { page } => self.request_page(page, now),
            Command::ZoomIn => self.zoom_in(),
            Command::ZoomOut => self.zoom_out(),
            Command::ZoomTo { scale } => self.zoom_to(scale),
            Command::ResetZoom => self.reset_zoom(now),
            Command::WheelZoom { anchor, delta_y } => self.wheel_zoom(anchor, delta_y),
            Command::ScrollBy { delta_x, delta_y } => self.scroll_by(delta_x, delta_y, now),
            Command::HoverPage { page } => self.set_hovered_page(page, now),
            Command::HoverField { focus } => self.set_hovered_field(focus, now),
            Command::ContainerResized { size } => {
                self.on_container_resized(size);
                true
            }
            Command::ToolbarResized { width } => self.on_toolbar_resized(width),
        }
    }
}
