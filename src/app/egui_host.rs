use crate::render::EguiOverlay;
use winit::event::WindowEvent;
use winit::window::Window;

pub struct EguiFrameOutput {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
    pub wants_keyboard_input: bool,
}

/// egui context wired to winit input and painted in software.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
    overlay: EguiOverlay,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Self {
            context,
            winit_state,
            overlay: EguiOverlay::new(),
        }
    }

    /// Returns true when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    pub fn run_ui<F>(&mut self, window: &Window, run_ui: F) -> EguiFrameOutput
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        let pixels_per_point = full_output.pixels_per_point;
        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, pixels_per_point);

        EguiFrameOutput {
            clipped_primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
            wants_keyboard_input: self.context.wants_keyboard_input(),
        }
    }

    /// Uploads texture changes and composites the UI over `frame`.
    pub fn paint(&mut self, output: &EguiFrameOutput, frame: &mut [u8], width: u32, height: u32) {
        if let Err(err) = self.overlay.update(&output.textures_delta) {
            log::warn!("egui texture update failed: {}", err);
        }
        self.overlay.paint(
            &output.clipped_primitives,
            output.pixels_per_point,
            frame,
            width,
            height,
        );
    }
}
