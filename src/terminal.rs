// SPDX-License-Identifier: GPL-3.0-only

//! Terminal preview
//!
//! Renders the filtered camera feed and the QR panel to the terminal using
//! Unicode half-block characters for improved vertical resolution.

use crate::app::{
    FilterRenderer, FilterType, PreviewState, QrRenderer, RasterSurface, RenderLoop, RenderOutcome,
};
use crate::backends::camera::frame_loop::LoopAction;
use crate::backends::camera::{
    CameraBackend, CameraStreamer, CaptureRequest, backend_from_config,
};
use crate::config::Config;
use crate::constants::timing;
use crate::errors::{AppResult, CameraError};
use crate::fl;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use image::RgbaImage;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use std::io::{self, stdout};
use tracing::{info, warn};

/// Run the interactive terminal preview
pub fn run(config: &Config) -> AppResult<()> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
) -> AppResult<()> {
    let backend = backend_from_config(config);
    let request = config.capture_request(backend.as_ref());
    let (mut streamer, start_error) = start_camera(backend.as_ref(), &request);

    let mut state = config.preview_state();
    let mut renderer = FilterRenderer::new();
    let mut frame_widget = FrameWidget::default();
    let qr_panel = QrPanel::new(&config.qr_data);

    let mut render_loop = RenderLoop::with_refresh_rate(config.refresh_rate());
    let mut rendered = 0u64;
    let mut deferred = 0u64;

    while render_loop.is_running() {
        render_loop.tick(|| {
            match preview_tick(streamer.as_mut(), &mut renderer, &state, &mut frame_widget) {
                Some(RenderOutcome::Rendered { .. }) => rendered += 1,
                Some(RenderOutcome::Deferred(_)) => deferred += 1,
                None => {}
            }
            LoopAction::Continue
        });

        // A stream that died after start is shown like a refused one
        let camera_error = start_error
            .clone()
            .or_else(|| streamer.as_ref().and_then(CameraStreamer::fault));

        if render_loop.ticks() % timing::TICK_LOG_INTERVAL == 0 {
            info!(
                ticks = render_loop.ticks(),
                rendered,
                deferred,
                filter = %state.filter,
                "Preview statistics"
            );
        }

        terminal.draw(|f| {
            let [preview_area, controls_area, status_area] = Layout::vertical([
                Constraint::Min(1),
                Constraint::Length(if state.pixel_size_adjustable() { 2 } else { 1 }),
                Constraint::Length(1),
            ])
            .areas(f.area());

            let [camera_area, qr_area] = Layout::horizontal([
                Constraint::Min(1),
                Constraint::Length(qr_panel.width()),
            ])
            .areas(preview_area);

            match &camera_error {
                Some(e) => f.render_widget(CameraMessage::denied(e), camera_area),
                None => {
                    frame_widget.area = camera_area;
                    f.render_widget(&frame_widget, camera_area);
                }
            }
            f.render_widget(&qr_panel, qr_area);
            f.render_widget(FilterControls { state: &state }, controls_area);

            let status = if state.pixel_size_adjustable() {
                fl!("status-keys-retro")
            } else {
                fl!("status-keys")
            };
            f.render_widget(StatusBar { message: &status }, status_area);
        })?;

        // Handle input until the next tick is due
        if event::poll(render_loop.time_until_next_tick())?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key(key, &mut state) == LoopAction::Stop
        {
            render_loop.cancel();
        }
    }

    info!(ticks = render_loop.ticks(), rendered, deferred, "Preview closed");

    // Release the camera before the terminal is restored
    if let Some(mut streamer) = streamer.take() {
        streamer.stop();
    }

    Ok(())
}

/// Acquire the camera for the preview
///
/// A refused device leaves the preview up with the denial message and no
/// raster; there is no retry.
fn start_camera(
    backend: &dyn CameraBackend,
    request: &CaptureRequest,
) -> (Option<CameraStreamer>, Option<CameraError>) {
    match CameraStreamer::start(backend, request) {
        Ok(streamer) => (Some(streamer), None),
        Err(e) => {
            warn!(error = %e, "Preview started without a camera");
            (None, Some(e))
        }
    }
}

/// Render the newest frame, or nothing at all without a camera
fn preview_tick(
    streamer: Option<&mut CameraStreamer>,
    renderer: &mut FilterRenderer,
    state: &PreviewState,
    surface: &mut dyn RasterSurface,
) -> Option<RenderOutcome> {
    let streamer = streamer?;
    Some(renderer.render_tick(streamer.latest_frame(), state, surface))
}

/// Apply one key press to the preview state
fn handle_key(key: KeyEvent, state: &mut PreviewState) -> LoopAction {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return LoopAction::Stop;
        }
        KeyCode::Char('q') | KeyCode::Esc => return LoopAction::Stop,
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            state.select_filter(FilterType::ALL[index]);
        }
        KeyCode::Right | KeyCode::Tab => state.select_filter(state.filter.next()),
        KeyCode::Left | KeyCode::BackTab => state.select_filter(state.filter.previous()),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => state.increase_pixel_size(),
        KeyCode::Char('-') | KeyCode::Down => state.decrease_pixel_size(),
        _ => {}
    }
    LoopAction::Continue
}

/// Widget that renders the filtered frame using half-block characters
#[derive(Default)]
struct FrameWidget {
    image: Option<RgbaImage>,
    /// Where the frame was last drawn; empty until the first draw
    area: Rect,
}

impl RasterSurface for FrameWidget {
    fn is_ready(&self) -> bool {
        !self.area.is_empty()
    }

    fn present(&mut self, image: &RgbaImage) {
        match &mut self.image {
            Some(existing) if existing.dimensions() == image.dimensions() => {
                existing.copy_from_slice(image);
            }
            slot => *slot = Some(image.clone()),
        }
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match &self.image {
            Some(image) => paint_half_blocks(image, area, buf),
            None => CameraMessage::waiting().render(area, buf),
        }
    }
}

/// Centered one-line message in place of the camera feed
struct CameraMessage {
    text: String,
    style: Style,
}

impl CameraMessage {
    fn waiting() -> Self {
        Self {
            text: fl!("waiting-for-camera"),
            style: Style::default(),
        }
    }

    fn denied(error: &CameraError) -> Self {
        let text = if error.is_access_denied() {
            fl!("camera-access-denied")
        } else {
            error.to_string()
        };
        Self {
            text,
            style: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        }
    }
}

impl Widget for CameraMessage {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let len = self.text.chars().count() as u16;
        let x = area.x + area.width.saturating_sub(len) / 2;
        let y = area.y + area.height / 2;
        buf.set_stringn(x, y, &self.text, area.width as usize, self.style);
    }
}

/// QR code with its caption, one module per cell column
struct QrPanel {
    renderer: Option<QrRenderer>,
    data: String,
}

impl QrPanel {
    fn new(data: &str) -> Self {
        let renderer = match QrRenderer::pixel_per_module(data) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                warn!(error = %e, "QR panel disabled");
                None
            }
        };
        Self {
            renderer,
            data: data.to_string(),
        }
    }

    fn side(&self) -> u16 {
        self.renderer
            .as_ref()
            .map_or(0, |r| u16::try_from(r.dimensions().0).unwrap_or(u16::MAX))
    }

    /// Columns the panel wants
    fn width(&self) -> u16 {
        if self.renderer.is_some() {
            self.side().saturating_add(2)
        } else {
            0
        }
    }
}

impl Widget for &QrPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(raster) = self.renderer.as_ref().and_then(QrRenderer::raster) else {
            return;
        };
        let code_rows = self.side().div_ceil(2);
        let [code_area, caption_area, data_area] = Layout::vertical([
            Constraint::Length(code_rows),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        paint_half_blocks(raster, code_area, buf);

        let caption = fl!("qr-caption");
        let style = Style::default().fg(Color::Gray);
        buf.set_stringn(caption_area.x + 1, caption_area.y, &caption, caption_area.width as usize, style);
        buf.set_stringn(
            data_area.x + 1,
            data_area.y,
            &self.data,
            data_area.width.saturating_sub(1) as usize,
            style.add_modifier(Modifier::UNDERLINED),
        );
    }
}

/// Filter radio row, plus the pixel-size slider while retro is selected
struct FilterControls<'a> {
    state: &'a PreviewState,
}

impl Widget for FilterControls<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }

        let mut x = area.x;
        for (i, filter) in FilterType::ALL.iter().enumerate() {
            let selected = *filter == self.state.filter;
            let marker = if selected { '●' } else { '○' };
            let label = format!("{} {} {}  ", i + 1, marker, filter.label());
            let style = if selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let remaining = (area.x + area.width).saturating_sub(x) as usize;
            let (next_x, _) = buf.set_stringn(x, area.y, &label, remaining, style);
            x = next_x;
        }

        if self.state.pixel_size_adjustable() && area.height > 1 {
            let size = self.state.pixel_size;
            let track_len = 24usize;
            let filled = (size.fraction() * track_len as f32).round() as usize;
            let slider = format!(
                "{}: [{}{}] {}px",
                fl!("pixel-size"),
                "█".repeat(filled),
                "░".repeat(track_len - filled),
                size
            );
            buf.set_stringn(area.x, area.y + 1, &slider, area.width as usize, Style::default());
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        buf.set_stringn(
            area.x,
            area.y,
            self.message,
            area.width as usize,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

/// Draw `image` into `area`, aspect-fit and centered
///
/// Each terminal cell shows two vertical pixels: the upper half (▀) in the
/// foreground colour and the lower half in the background colour.
fn paint_half_blocks(image: &RgbaImage, area: Rect, buf: &mut Buffer) {
    if area.is_empty() || image.width() == 0 || image.height() == 0 {
        return;
    }

    let aspect = image.width() as f64 / image.height() as f64;
    let term_width = area.width as f64;
    let term_height = (area.height * 2) as f64;

    let (display_width, display_height) = if term_width / term_height > aspect {
        // Terminal is wider - fit to height
        ((term_height * aspect) as u16, area.height)
    } else {
        // Terminal is taller - fit to width
        (area.width, ((term_width / aspect) / 2.0).ceil() as u16)
    };
    let display_width = display_width.clamp(1, area.width);
    let display_height = display_height.clamp(1, area.height);

    let x_offset = area.x + (area.width - display_width) / 2;
    let y_offset = area.y + (area.height - display_height) / 2;

    let x_scale = image.width() as f64 / display_width as f64;
    let y_scale = image.height() as f64 / (display_height as f64 * 2.0);

    for ty in 0..display_height {
        for tx in 0..display_width {
            let src_x = ((tx as f64 * x_scale) as u32).min(image.width() - 1);
            let src_y_top = ((ty as f64 * 2.0 * y_scale) as u32).min(image.height() - 1);
            let src_y_bottom =
                (((ty as f64 * 2.0 + 1.0) * y_scale) as u32).min(image.height() - 1);

            if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                cell.set_char('▀');
                cell.set_fg(rgb(image, src_x, src_y_top));
                cell.set_bg(rgb(image, src_x, src_y_bottom));
            }
        }
    }
}

fn rgb(image: &RgbaImage, x: u32, y: u32) -> Color {
    let [r, g, b, _] = image.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}
