use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard shortcuts handled outside the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Screenshot,
}

pub fn key_action(key: PhysicalKey) -> Option<KeyAction> {
    match key {
        PhysicalKey::Code(KeyCode::Escape) => Some(KeyAction::Quit),
        PhysicalKey::Code(KeyCode::F12 | KeyCode::KeyP) => Some(KeyAction::Screenshot),
        _ => None,
    }
}
