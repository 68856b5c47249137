use std::time::{Duration, Instant};
use winit::window::Window;

/// Frame cadence and render cost, reported in the window title twice a second.
pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    frame_dt: f32,
    render_ms: f32,
    render_size: (u32, u32),
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: Instant::now(),
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            render_ms: 0.0,
            render_size: (0, 0),
            base_title,
        }
    }

    pub fn set_render(&mut self, render_ms: f32, size: (u32, u32)) {
        self.render_ms = render_ms;
        self.render_size = size;
    }

    fn title(&self, fps: f32) -> String {
        format!(
            "{} - {:.1} fps (cadence {:.1} ms, render {:.1} ms at {}x{})",
            self.base_title,
            fps,
            self.frame_dt * 1000.0,
            self.render_ms,
            self.render_size.0,
            self.render_size.1
        )
    }

    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::from_millis(16),
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt.as_secs_f32();

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() >= 0.5 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            if let Some(window) = window {
                window.set_title(&self.title(fps));
            }
            self.frame_count = 0;
            self.last_fps_time = now;
        }
    }
}
