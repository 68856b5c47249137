mod egui_host;
mod input;
mod timing;

use crate::assets::TextureSet;
use crate::config::ViewerConfig;
use crate::render::blit_fit;
use crate::ui::{ControlPanel, UiAction};
use crate::viewer::{ExportTarget, FrameLoop, ShutdownSignal, Viewer};
use egui_host::EguiHost;
use input::{key_action, KeyAction};
use timing::FrameTiming;

use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("pixel surface error: {0}")]
    Surface(#[from] pixels::Error),
    #[error("failed to resize pixel surface: {0}")]
    Resize(#[from] pixels::TextureError),
}

/// Window, surface and UI host; created on the first `resumed`.
struct Presenter {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    egui: EguiHost,
    size: (u32, u32),
}

impl Presenter {
    fn new(event_loop: &ActiveEventLoop, config: &ViewerConfig) -> Result<Self, AppError> {
        let (width, height) = config.viewport.initial_size();
        let window_attrs = WindowAttributes::default()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let inner = window.inner_size();
        let size = (inner.width.max(1), inner.height.max(1));
        let surface = SurfaceTexture::new(size.0, size.1, Arc::clone(&window));
        let pixels = Pixels::new(size.0, size.1, surface)?;
        let egui = EguiHost::new(&window);
        log::info!("Window created: {}x{}", size.0, size.1);

        Ok(Self {
            window,
            pixels,
            egui,
            size,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) -> Result<(), AppError> {
        let size = (new_size.width.max(1), new_size.height.max(1));
        if size == self.size {
            return Ok(());
        }
        self.pixels.resize_surface(size.0, size.1)?;
        self.pixels.resize_buffer(size.0, size.1)?;
        self.size = size;
        Ok(())
    }
}

pub struct App {
    viewer: Viewer,
    presenter: Option<Presenter>,
    panel: ControlPanel,
    timing: FrameTiming,
    frame_loop: FrameLoop,
    shutdown: ShutdownSignal,
    wants_keyboard_input: bool,
    screenshot_requested: bool,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    error: Option<AppError>,
}

impl App {
    pub fn new(viewer: Viewer) -> Self {
        let shutdown = ShutdownSignal::new();
        let title = viewer.config().title.clone();
        Self {
            viewer,
            presenter: None,
            panel: ControlPanel::new(),
            timing: FrameTiming::new(title),
            frame_loop: FrameLoop::new(shutdown.clone()),
            shutdown,
            wants_keyboard_input: false,
            screenshot_requested: false,
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            error: None,
        }
    }

    fn fail(&mut self, err: AppError) {
        log::error!("{}", err);
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.shutdown.raise();
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(millihz) = window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz())
        {
            let hz = millihz as f32 / 1000.0;
            if hz > 1.0 {
                target = Duration::from_secs_f32(1.0 / hz);
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(presenter) = &mut self.presenter else {
            return;
        };
        if let Err(err) = presenter.resize(new_size) {
            self.fail(err);
            return;
        }
        self.viewer.resize_window(new_size.width, new_size.height);
    }

    fn apply_action(&mut self, action: UiAction) {
        match action {
            UiAction::SetControl(id, value) => {
                if self.viewer.set_control(id, value).is_none() {
                    log::warn!("Control {} rejected value {}", id, value);
                }
            }
            UiAction::TakeScreenshot => self.screenshot_requested = true,
        }
    }

    fn render(&mut self) -> Result<(), AppError> {
        let Some(presenter) = &mut self.presenter else {
            return Ok(());
        };
        let frame_start = Instant::now();

        let panel = &mut self.panel;
        let controls = self.viewer.controls();
        let mut actions = Vec::new();
        let output = presenter.egui.run_ui(&presenter.window, |ctx| {
            actions = panel.show(ctx, controls);
        });
        self.wants_keyboard_input = output.wants_keyboard_input;
        for action in actions {
            self.apply_action(action);
        }

        let Some(presenter) = &mut self.presenter else {
            return Ok(());
        };
        let scale = if self.panel.is_interacting() {
            self.viewer.config().preview_scale
        } else {
            1.0
        };
        let render_start = Instant::now();
        let scene = self.viewer.current_frame(scale);
        let render_ms = render_start.elapsed().as_secs_f32() * 1000.0;
        self.timing.set_render(render_ms, scene.dimensions());

        let (width, height) = presenter.size;
        blit_fit(scene, presenter.pixels.frame_mut(), width, height);
        presenter
            .egui
            .paint(&output, presenter.pixels.frame_mut(), width, height);
        presenter.pixels.render()?;
        self.timing.update(Some(presenter.window.as_ref()), frame_start);
        Ok(())
    }

    fn take_screenshot(&mut self) {
        let config = self.viewer.config();
        let target = if config.ask_save_path {
            let picked = rfd::FileDialog::new()
                .set_directory(&config.screenshot_dir)
                .set_file_name(self.viewer.screenshot_file_name())
                .add_filter("PNG", &["png"])
                .save_file();
            match picked {
                Some(path) => ExportTarget::File(path),
                None => {
                    self.panel.set_status("Screenshot cancelled");
                    return;
                }
            }
        } else {
            ExportTarget::Directory(config.screenshot_dir.clone())
        };

        match self.viewer.export_screenshot(&target) {
            Ok(path) => self.panel.set_status(format!("Saved {}", path.display())),
            Err(err) => {
                log::error!("Screenshot failed: {}", err);
                self.panel.set_status(format!("Screenshot failed: {}", err));
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.presenter.is_some() {
            return;
        }
        match Presenter::new(event_loop, self.viewer.config()) {
            Ok(presenter) => {
                let window = Arc::clone(&presenter.window);
                let size = window.inner_size();
                self.presenter = Some(presenter);
                self.viewer.resize_window(size.width, size.height);
                self.update_target_frame_duration(&window);
            }
            Err(err) => {
                self.fail(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match &mut self.presenter {
            Some(presenter) => presenter.egui.on_window_event(&presenter.window, &event),
            None => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                self.shutdown.raise();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if consumed || self.wants_keyboard_input || event.state != ElementState::Pressed {
                    return;
                }
                match key_action(event.physical_key) {
                    Some(KeyAction::Quit) => {
                        log::info!("Escape pressed, shutting down...");
                        self.shutdown.raise();
                    }
                    Some(KeyAction::Screenshot) if !event.repeat => {
                        self.screenshot_requested = true
                    }
                    _ => {}
                }
            }
            WindowEvent::Resized(new_size) => {
                log::debug!("Window resized to {}x{}", new_size.width, new_size.height);
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.presenter.as_ref().map(|p| p.window.inner_size()) {
                    self.handle_resize(size);
                }
            }
            WindowEvent::RedrawRequested => {
                if self.frame_loop.next_frame().is_none() {
                    return;
                }
                if let Err(err) = self.render() {
                    self.fail(err);
                }
                if std::mem::take(&mut self.screenshot_requested) {
                    self.take_screenshot();
                }
            }
            _ => {}
        }

        if self.shutdown.is_raised() {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.shutdown.is_raised() {
            event_loop.exit();
            return;
        }
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(presenter) = &self.presenter {
                presenter.window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

/// Opens the viewer window and blocks until it is closed.
pub fn run(config: ViewerConfig, textures: Arc<TextureSet>) -> Result<(), AppError> {
    let viewer = Viewer::new(config, textures);
    log::info!("Press ESC or close the window to exit, F12 or P for a screenshot");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(viewer);
    event_loop.run_app(&mut app)?;
    log::info!("Viewer closed after {} frames", app.frame_loop.frame_index());

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
