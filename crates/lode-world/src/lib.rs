//! Client-side world model: coordinates, sections, chunk columns and the
//! mutation event feed consumed by the renderer.
#![forbid(unsafe_code)]

pub mod chunk;
pub mod coords;
pub mod direction;
pub mod events;
pub mod section;
pub mod sync;
pub mod world;

pub use chunk::{BiomeTint, Chunk};
pub use coords::{
    BlockPosition, ChunkPosition, SECTION_HEIGHT, SECTION_MAX, SECTION_VOLUME, SECTION_WIDTH,
    SectionPosition,
};
pub use direction::Direction;
pub use events::{EventBus, WorldEvent, affected_sections};
pub use section::Section;
pub use world::{ChunkNeighbors, World, WorldView};
