use serde::Deserialize;

use crate::types::{RenderPhase, TintSource};

// Top-level blocks config file
#[derive(Deserialize, Debug, Clone, Default)]
pub struct BlocksConfig {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BlockDef {
    pub name: String,
    // Explicit id; defaults to the next free slot in file order
    #[serde(default)]
    pub id: Option<u16>,
    // "cube" | "cross" | "none"; defaults to "cube"
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub phase: Option<RenderPhase>,
    // Whether a full face of this block hides the touching face of a neighbor.
    // Defaults to true for opaque cubes, false otherwise.
    #[serde(default)]
    pub occludes: Option<bool>,
    // Hide faces between two blocks of this same type (glass, water)
    #[serde(default)]
    pub cull_same: Option<bool>,
    #[serde(default)]
    pub tint: Option<TintSource>,
    #[serde(default)]
    pub color: Option<[u8; 3]>,
    // Number of model variants picked per position
    #[serde(default)]
    pub variants: Option<u8>,
}

impl BlockDef {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            shape: None,
            phase: None,
            occludes: None,
            cull_same: None,
            tint: None,
            color: None,
            variants: None,
        }
    }
}
