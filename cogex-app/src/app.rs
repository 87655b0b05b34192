use crate::host::WindowHost;
use crate::present::Presenter;
use anyhow::{Result, anyhow};
use cogex_core::TrialRecord;
use cogex_experiment::{Host, Plugin, Timeline, TimelineRecord};
use cogex_render::{ImageStore, TextRasterizer};
use cogex_timing::Timer;
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    presenter: Option<Presenter>,
    text: Option<TextRasterizer>,
    fullscreen: bool,
    refresh_rate: Option<f64>,

    timeline: Timeline,
    host: WindowHost,
    current: Option<Box<dyn Plugin>>,
    next_trial: usize,
    resume_at: Duration,
    records: Vec<TimelineRecord>,

    last_frame: Option<u64>,
    failure: Option<anyhow::Error>,
    should_exit: bool,
}

impl App {
    pub fn new(
        timeline: Timeline,
        images: ImageStore,
        text: Option<TextRasterizer>,
        fullscreen: bool,
    ) -> Self {
        let host = WindowHost::new(&timeline.settings, images);
        Self {
            window: None,
            pixels: None,
            presenter: None,
            text,
            fullscreen,
            refresh_rate: None,
            timeline,
            host,
            current: None,
            next_trial: 0,
            resume_at: Duration::ZERO,
            records: Vec::new(),
            last_frame: None,
            failure: None,
            should_exit: false,
        }
    }

    /// Runs the timeline to the end, or until the window is closed, and
    /// returns the records collected so far.
    pub fn run(mut self) -> Result<Vec<TimelineRecord>> {
        let event_loop = EventLoop::new()?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            trials = self.timeline.trials.len(),
            "starting experiment, ESC aborts"
        );

        event_loop.run_app(&mut self)?;

        let stats = self.host.clock().calibration_stats();
        info!(
            fps = stats.effective_fps,
            jitter_ms = stats.jitter_ns / 1e6,
            max_frame_ms = stats.max_frame_time_ns / 1e6,
            "frame timing"
        );
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(std::mem::take(&mut self.records)),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;
        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut attributes = Window::default_attributes()
            .with_title("Cogex")
            .with_resizable(!self.fullscreen);
        if self.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        }
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale = window.scale_factor(),
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.presenter = Some(
            Presenter::new(size.width, size.height, self.text.take())
                .ok_or_else(|| anyhow!("cannot allocate {}x{} canvas", size.width, size.height))?,
        );
        self.host.mount_mut().resize(size.width, size.height);

        if self.fullscreen {
            window.set_cursor_visible(false);
        }
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Starts the next trial once the inter-trial interval has passed
    fn advance(&mut self) {
        if let Some(plugin) = self.current.as_mut() {
            if let Some(record) = self.host.poll(plugin.as_mut()) {
                self.complete(record);
            }
            return;
        }
        if self.host.now() < self.resume_at {
            return;
        }
        let Some(spec) = self.timeline.trials.get(self.next_trial) else {
            info!(trials = self.records.len(), "timeline complete");
            self.should_exit = true;
            return;
        };
        let mut plugin = spec.plugin();
        info!(
            trial = self.next_trial + 1,
            total = self.timeline.trials.len(),
            plugin = plugin.info().name,
            "running trial"
        );
        self.host.start(plugin.as_mut());
        self.current = Some(plugin);
    }

    fn complete(&mut self, record: TrialRecord) {
        let now = self.host.now();
        debug!(correct = ?record.correct(), "trial record collected");
        self.records.push(TimelineRecord {
            trial_index: self.next_trial,
            time_elapsed_ms: now.as_nanos() as f64 / 1e6,
            record,
        });
        self.current = None;
        self.next_trial += 1;
        let iti = Duration::from_millis(self.timeline.settings.inter_trial_interval_ms);
        self.resume_at = now + iti;
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(presenter)) = (self.pixels.as_mut(), self.presenter.as_mut())
        else {
            return Ok(());
        };
        if presenter.is_stale(self.host.mount()) {
            presenter.compose(self.host.mount(), self.host.images());
            presenter.copy_to(pixels.frame_mut());
        }
        pixels.render()?;

        let clock = self.host.clock_mut();
        let now = clock.now();
        if let Some(last) = self.last_frame {
            clock.record_frame(Duration::from_nanos(now.saturating_sub(last)));
        }
        self.last_frame = Some(now);
        Ok(())
    }

    fn handle_key(&mut self, key: &Key, repeat: bool, event_loop: &ActiveEventLoop) {
        if matches!(key, Key::Named(NamedKey::Escape)) {
            warn!(completed = self.records.len(), "experiment aborted");
            self.exit(event_loop);
            return;
        }
        let Some(name) = key_name(key) else {
            return;
        };
        if let Some(plugin) = self.current.as_mut() {
            if let Some(record) = self.host.key(plugin.as_mut(), &name, repeat) {
                self.complete(record);
            }
        }
    }

    fn handle_resize(&mut self, width: u32, height: u32) {
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(width, height) {
                error!("failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(width, height) {
                error!("failed to resize buffer: {e}");
            }
        }
        if let Some(presenter) = &mut self.presenter {
            presenter.resize(width, height);
        }
        self.host.mount_mut().resize(width, height);
        debug!(width, height, "display resized");
    }

    fn fail(&mut self, err: anyhow::Error, event_loop: &ActiveEventLoop) {
        error!("{err:#}");
        self.failure = Some(err);
        self.exit(event_loop);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

/// Key name as a browser would report it: the character for printable keys,
/// the named key otherwise.
fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Character(s) => Some(s.to_string()),
        Key::Named(NamedKey::Space) => Some(" ".to_string()),
        Key::Named(named) => Some(format!("{named:?}")),
        _ => None,
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.fail(e.context("failed to create window and surface"), event_loop);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),
            WindowEvent::RedrawRequested => {
                self.advance();
                if let Err(e) = self.render() {
                    self.fail(e, event_loop);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_key(&event.logical_key, event.repeat, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size.width, size.height),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size.width, size.height);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
