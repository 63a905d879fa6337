//! Block types and the block registry consumed by the mesher.
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;
pub mod types;

pub use registry::{BlockRegistry, BlockType, RegistryError};
pub use types::{BlockId, BlockState, RenderPhase, Shape, TintSource};
