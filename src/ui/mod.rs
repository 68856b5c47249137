use crate::controls::{
    ControlBinding, ControlGroup, ControlId, ControlKind, ControlSpec, ControlValue,
};

/// What the user asked for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiAction {
    SetControl(ControlId, ControlValue),
    TakeScreenshot,
}

/// The floating control panel: one collapsible section per control group and
/// the screenshot button.
pub struct ControlPanel {
    status: String,
    interacting: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self {
            status: String::new(),
            interacting: false,
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// A slider is being dragged; the scene can render at preview resolution.
    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn show(&mut self, ctx: &egui::Context, controls: &ControlBinding) -> Vec<UiAction> {
        let mut actions = Vec::new();
        let mut interacting = false;

        egui::Window::new("Controls")
            .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
            .resizable(false)
            .default_width(280.0)
            .show(ctx, |ui| {
                for group in ControlGroup::ALL {
                    egui::CollapsingHeader::new(group.title())
                        .default_open(true)
                        .show(ui, |ui| {
                            for spec in controls.specs_in(group) {
                                interacting |= control_row(ui, spec, controls, &mut actions);
                            }
                        });
                }

                ui.separator();
                if ui.button("Take Screenshot").clicked() {
                    actions.push(UiAction::TakeScreenshot);
                }
                if !self.status.is_empty() {
                    ui.label(&self.status);
                }
            });

        self.interacting = interacting;
        actions
    }
}

/// One slider or checkbox. Returns whether a slider is being dragged.
fn control_row(
    ui: &mut egui::Ui,
    spec: &ControlSpec,
    controls: &ControlBinding,
    actions: &mut Vec<UiAction>,
) -> bool {
    let enabled = controls.is_enabled(spec.id);
    match (spec.kind, controls.value(spec.id)) {
        (ControlKind::Slider { min, max }, ControlValue::Number(mut value)) => {
            let slider = egui::Slider::new(&mut value, min..=max).text(spec.id.label());
            let response = ui.add_enabled(enabled, slider);
            if response.changed() {
                actions.push(UiAction::SetControl(spec.id, ControlValue::Number(value)));
            }
            response.dragged()
        }
        (ControlKind::Toggle, ControlValue::Toggle(mut checked)) => {
            let checkbox = egui::Checkbox::new(&mut checked, spec.id.label());
            if ui.add_enabled(enabled, checkbox).changed() {
                actions.push(UiAction::SetControl(spec.id, ControlValue::Toggle(checked)));
            }
            false
        }
        _ => false,
    }
}
