use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType};
use directories::{ProjectDirs, UserDirs};
use ocrview_core::{
    DirectoryDownloader, DocumentBackend, DocumentProvider, DocumentSource,
    DocumentViewerController, EaseOutProgress, FieldListEditor, FieldPolicy, ScrollPort,
    ScrollSurface, Size, ToolbarMode, ViewerConfig, ViewerEvent,
};
use ocrview_render::{compose_frame, DocumentLoader, HighlightStyle, PageRenderer, PlacedPage};
use ocrview_tty::{
    combine_status, field_line, progress_bar, toolbar_lines, truncate_with_ellipsis, DrawParams,
    EventMapper, KittyRenderer, ToolbarState, UiEvent,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

const LOG_ENV: &str = "OCRVIEW_LOG";
const FALLBACK_CELL: Size = Size::new(8.0, 16.0);
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Parser)]
#[command(
    name = "ocrview",
    version,
    about = "kitty-native viewer for scanned documents and their extracted fields"
)]
struct Args {
    /// Document to open: a path, a file:// URL or a base64 data: URL
    source: String,

    /// JSON array of extracted fields to highlight
    #[arg(short = 'f', long = "fields")]
    fields: Option<PathBuf>,

    /// Name offered when saving a copy
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Page to open on (1-based)
    #[arg(short = 'p', long = "page")]
    page: Option<usize>,

    /// Config file; defaults to config.toml in the platform config dir
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FieldMode::Validate)]
    mode: FieldMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FieldMode {
    /// Blank near-zero-confidence values on load
    Validate,
    /// Keep every value as extracted
    Edit,
}

impl FieldMode {
    fn policy(self) -> FieldPolicy {
        match self {
            FieldMode::Validate => FieldPolicy::validation(),
            FieldMode::Edit => FieldPolicy::edit(),
        }
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), EnableMouseCapture, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(
            stdout,
            DisableMouseCapture,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0),
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Runs the wrapped provider on the blocking pool so the progress bar keeps
/// animating while a large document is parsed.
struct BackgroundProvider<P> {
    inner: Arc<P>,
}

#[async_trait]
impl<P> DocumentProvider for BackgroundProvider<P>
where
    P: DocumentProvider + 'static,
{
    async fn open(&self, source: &DocumentSource) -> Result<Arc<dyn DocumentBackend>> {
        let inner = Arc::clone(&self.inner);
        let source = source.clone();
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || handle.block_on(inner.open(&source)))
            .await
            .context("document loader stopped unexpectedly")?
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TermGeometry {
    columns: u16,
    rows: u16,
    cell: Size,
    toolbar_rows: u16,
}

impl TermGeometry {
    fn query() -> Result<Self> {
        let window = terminal::window_size()?;
        let columns = window.columns.max(1);
        let rows = window.rows.max(3);
        let cell = if window.width > 0 && window.height > 0 {
            Size::new(
                f32::from(window.width) / f32::from(columns),
                f32::from(window.height) / f32::from(rows),
            )
        } else {
            FALLBACK_CELL
        };
        Ok(Self {
            columns,
            rows,
            cell,
            toolbar_rows: 1,
        })
    }

    fn pixel_width(&self) -> f32 {
        f32::from(self.columns) * self.cell.width
    }

    fn status_row(&self) -> u16 {
        self.rows.saturating_sub(1)
    }

    fn content_rows(&self) -> u16 {
        self.rows.saturating_sub(self.toolbar_rows + 1).max(1)
    }

    fn container(&self) -> Size {
        Size::new(
            self.pixel_width(),
            f32::from(self.content_rows()) * self.cell.height,
        )
    }
}

enum LoopAction {
    Continue,
    ContinueRedraw,
    Quit,
}

struct App {
    controller: DocumentViewerController<ScrollPort>,
    editor: FieldListEditor,
    renderer: Option<PageRenderer>,
    downloader: DirectoryDownloader,
    mapper: EventMapper,
    geometry: TermGeometry,
    message: Option<String>,
    style: HighlightStyle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("org", "ocrview", "ocrview")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dirs.config_dir().join("config.toml"));
    let config = ViewerConfig::load(&config_path)?;
    let source = DocumentSource::parse(&args.source)
        .with_context(|| format!("cannot open {:?}", args.source))?;
    let editor = load_fields(args.fields.as_deref(), args.mode.policy())?;
    info!(?source, fields = editor.len(), "starting viewer");

    let _raw = RawModeGuard::new()?;
    let mut kitty = KittyRenderer::new(io::stdout());
    kitty.clear_all()?;

    let mut geometry = TermGeometry::query()?;
    let mut controller = DocumentViewerController::new(
        config.clone(),
        ScrollPort::with_smooth_duration(geometry.container(), config.smooth_scroll),
    );
    controller.set_display_name(args.name.clone());
    controller.on_toolbar_resized(geometry.pixel_width());
    geometry.toolbar_rows = toolbar_row_count(&controller);
    controller.on_container_resized(geometry.container());

    let provider = BackgroundProvider {
        inner: Arc::new(DocumentLoader::new()),
    };
    load_with_progress(&mut controller, &provider, source, &geometry).await?;

    let now = Instant::now();
    if let Some(page) = args.page {
        controller.request_page(page, now);
    }

    let mut mapper = EventMapper::with_scroll_step(config.scroll_step);
    mapper.set_geometry(geometry.cell, geometry.toolbar_rows);

    let mut app = App {
        renderer: controller.backend().cloned().map(PageRenderer::new),
        controller,
        editor,
        downloader: DirectoryDownloader::new(download_dir(&project_dirs)),
        mapper,
        geometry,
        message: None,
        style: HighlightStyle::default(),
    };

    let mut dirty = true;
    let mut needs_clear = true;
    loop {
        let now = Instant::now();
        if app.controller.tick(now) {
            dirty = true;
        }
        dirty |= app.drain_events();

        if dirty {
            if needs_clear {
                kitty.clear_all()?;
                needs_clear = false;
            }
            app.redraw(&mut kitty)?;
            dirty = false;
        }

        let timeout = if app.controller.surface().is_animating() {
            FRAME_INTERVAL
        } else {
            IDLE_POLL
        };
        if event::poll(timeout)? {
            let ui_event = app.mapper.map_event(event::read()?);
            if matches!(ui_event, UiEvent::Resized) {
                needs_clear = true;
            }
            match app.handle_event(ui_event, Instant::now())? {
                LoopAction::ContinueRedraw => dirty = true,
                LoopAction::Continue => {
                    if app.mapper.pending_input().is_some() {
                        app.draw_status(&mut kitty)?;
                    }
                }
                LoopAction::Quit => break,
            }
        }
    }

    Ok(())
}

async fn load_with_progress<P: DocumentProvider>(
    controller: &mut DocumentViewerController<ScrollPort>,
    provider: &P,
    source: DocumentSource,
    geometry: &TermGeometry,
) -> Result<()> {
    let mut progress = EaseOutProgress::new(0.0, 0.95);
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let load = controller.load(provider, source);
    tokio::pin!(load);

    let result = loop {
        tokio::select! {
            result = &mut load => break result,
            _ = ticker.tick() => {
                draw_progress(geometry, progress.step())?;
            }
        }
    };
    progress.finish();
    draw_progress(geometry, progress.value())?;
    result.context("failed to load document")
}

fn draw_progress(geometry: &TermGeometry, value: f32) -> Result<()> {
    let mut stdout = io::stdout();
    let bar = progress_bar(value, usize::from(geometry.columns));
    crossterm::execute!(
        stdout,
        cursor::MoveTo(0, geometry.status_row()),
        Clear(ClearType::CurrentLine),
        Print(bar)
    )?;
    Ok(())
}

fn load_fields(path: Option<&Path>, policy: FieldPolicy) -> Result<FieldListEditor> {
    let Some(path) = path else {
        return Ok(FieldListEditor::new(Vec::new(), policy));
    };
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    FieldListEditor::from_json(&raw, policy).with_context(|| format!("invalid fields in {:?}", path))
}

fn download_dir(project_dirs: &ProjectDirs) -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| project_dirs.data_local_dir().join("downloads"))
}

fn toolbar_row_count(controller: &DocumentViewerController<ScrollPort>) -> u16 {
    match controller.toolbar().mode {
        ToolbarMode::Stacked => 2,
        ToolbarMode::Full | ToolbarMode::NavigationHidden => 1,
    }
}

impl App {
    fn drain_events(&mut self) -> bool {
        let events: Vec<ViewerEvent> = self.controller.events().lock().drain(..).collect();
        let mut redraw = false;
        for event in events {
            match event {
                ViewerEvent::Downloaded { path } => {
                    self.message = Some(format!("saved {}", path.display()));
                    redraw = true;
                }
                ViewerEvent::PageChanged { .. }
                | ViewerEvent::ScaleChanged { .. }
                | ViewerEvent::RedrawNeeded => redraw = true,
                ViewerEvent::DocumentLoaded { .. } => {}
            }
        }
        redraw
    }

    fn handle_event(&mut self, event: UiEvent, now: Instant) -> Result<LoopAction> {
        match event {
            UiEvent::Command(cmd) => {
                if self.controller.apply(cmd, now) {
                    Ok(LoopAction::ContinueRedraw)
                } else {
                    Ok(LoopAction::Continue)
                }
            }
            UiEvent::HoverNextField => {
                self.editor.hover_next();
                self.sync_hover(now)
            }
            UiEvent::HoverPrevField => {
                self.editor.hover_prev();
                self.sync_hover(now)
            }
            UiEvent::ClearHover => {
                self.editor.hover(None);
                self.sync_hover(now)
            }
            UiEvent::Download => {
                if let Err(err) = self.controller.download(&self.downloader) {
                    warn!(?err, "download failed");
                    self.message = Some(err.to_string());
                }
                Ok(LoopAction::ContinueRedraw)
            }
            UiEvent::Resized => {
                self.resize()?;
                Ok(LoopAction::ContinueRedraw)
            }
            UiEvent::Quit => Ok(LoopAction::Quit),
            UiEvent::None => Ok(LoopAction::Continue),
        }
    }

    fn sync_hover(&mut self, now: Instant) -> Result<LoopAction> {
        self.message = None;
        self.controller.set_hovered_field(self.editor.focus(), now);
        Ok(LoopAction::ContinueRedraw)
    }

    fn resize(&mut self) -> Result<()> {
        let mut geometry = TermGeometry::query()?;
        self.controller.on_toolbar_resized(geometry.pixel_width());
        geometry.toolbar_rows = toolbar_row_count(&self.controller);
        self.controller.on_container_resized(geometry.container());
        self.mapper.set_geometry(geometry.cell, geometry.toolbar_rows);
        self.geometry = geometry;
        Ok(())
    }

    fn redraw(&mut self, kitty: &mut KittyRenderer<io::Stdout>) -> Result<()> {
        kitty.begin_sync_update()?;
        self.draw_toolbar(kitty)?;
        self.draw_pages(kitty)?;
        self.draw_status(kitty)?;
        kitty.end_sync_update()?;
        // Layout changes reported while drawing are already on screen.
        self.controller.events().lock().retain(|event| *event != ViewerEvent::RedrawNeeded);
        Ok(())
    }

    fn draw_toolbar(&self, kitty: &mut KittyRenderer<io::Stdout>) -> Result<()> {
        let state = ToolbarState {
            layout: self.controller.toolbar(),
            current_page: self.controller.current_page(),
            page_count: self.controller.page_count(),
            zoom_percent: self.controller.zoom_percent(),
            can_go_prev: self.controller.can_go_prev(),
            can_go_next: self.controller.can_go_next(),
        };
        let width = usize::from(self.geometry.columns);
        let writer = kitty.writer();
        for (row, line) in toolbar_lines(&state).into_iter().enumerate() {
            crossterm::queue!(
                writer,
                cursor::MoveTo(0, row as u16),
                SetAttribute(Attribute::Reverse),
                Print(truncate_with_ellipsis(&line, width)),
                SetAttribute(Attribute::Reset)
            )?;
        }
        Ok(())
    }

    fn draw_pages(&mut self, kitty: &mut KittyRenderer<io::Stdout>) -> Result<()> {
        let Some(renderer) = self.renderer.as_ref() else {
            return Ok(());
        };
        let scale = self.controller.scale();
        let current = self.controller.current_page();

        let mut images = Vec::new();
        for page in self.controller.visible_pages() {
            match renderer.render(page.page_number, scale, current) {
                Ok(image) => images.push((page.page_number, image)),
                Err(err) => warn!(?err, page = page.page_number, "failed to render page"),
            }
        }
        for (page_number, image) in &images {
            if self.controller.current_dims(*page_number) != Some(image.dims()) {
                self.controller.on_page_rendered(*page_number, image.dims());
            }
        }

        let placed: Vec<PlacedPage<'_>> = images
            .iter()
            .filter_map(|(page_number, image)| {
                self.controller
                    .layout()
                    .page(*page_number)
                    .map(|frame| PlacedPage {
                        frame: *frame,
                        image: image.as_ref(),
                    })
            })
            .collect();
        let overlays = self.controller.overlays(&self.editor);
        let container = self.controller.surface().container_size();
        let frame = compose_frame(
            container.width.round() as u32,
            container.height.round() as u32,
            self.controller.scroll_offset(),
            &placed,
            &overlays,
            &self.style,
        );

        crossterm::queue!(kitty.writer(), cursor::MoveTo(0, self.geometry.toolbar_rows))?;
        kitty.draw(
            &frame.into_image(),
            DrawParams::clamped(
                u32::from(self.geometry.columns),
                u32::from(self.geometry.content_rows()),
            ),
        )?;

        if let Err(err) = renderer.prefetch_neighbors(current, 1, scale) {
            warn!(?err, page = current, "failed to prefetch neighboring pages");
        }
        Ok(())
    }

    fn draw_status(&self, kitty: &mut KittyRenderer<io::Stdout>) -> Result<()> {
        let base = self
            .editor
            .hovered_field()
            .map(field_line)
            .or_else(|| self.message.clone())
            .or_else(|| Some(self.document_status()));
        let status = combine_status(base, self.mapper.pending_input().as_deref()).unwrap_or_default();
        let writer = kitty.writer();
        crossterm::queue!(
            writer,
            cursor::MoveTo(0, self.geometry.status_row()),
            Clear(ClearType::CurrentLine),
            Print(truncate_with_ellipsis(&status, usize::from(self.geometry.columns)))
        )?;
        writer.flush()?;
        Ok(())
    }

    fn document_status(&self) -> String {
        let name = self
            .controller
            .info()
            .and_then(|info| info.source.file_name())
            .unwrap_or_else(|| "<document>".to_owned());
        format!(
            "{} | page {}/{} | {}%",
            name,
            self.controller.current_page(),
            self.controller.page_count(),
            self.controller.zoom_percent()
        )
    }
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "ocrview.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the graphics protocol, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
