//! Incremental world-mesh pipeline for a block-world client.
#![forbid(unsafe_code)]

pub mod camera;
pub mod config;
pub mod demo;
pub mod error;
pub mod gpu;
pub mod renderer;
pub mod visibility;

pub use camera::Camera;
pub use config::{ConfigError, DemoConfig, LodeConfig, RendererConfig};
pub use error::LodeError;
pub use gpu::{GpuError, HeadlessBackend, MeshBackend, MeshHandle};
pub use renderer::{DrawBatch, FrameDriver, RendererStats, ViewState, WorldRenderer};
pub use visibility::VisibilityTest;
