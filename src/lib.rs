//! Interactive moon viewer: spherical light and camera controls over a
//! displaced, normal-mapped sphere, with screenshots named after the camera
//! state they were taken from.

pub mod app;
pub mod assets;
pub mod config;
pub mod controls;
pub mod encoding;
pub mod geometry;
pub mod render;
pub mod scene;
pub mod tools;
pub mod ui;
pub mod viewer;
