use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::{BlockDef, BlocksConfig};
use crate::types::{BlockId, BlockState, RenderPhase, Shape, TintSource};

const BUILTIN_BLOCKS: &str = include_str!("../assets/blocks.toml");

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read block config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse block config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("block `{block}` has unknown shape `{shape}`")]
    UnknownShape { block: String, shape: String },
    #[error("block id {id} is claimed by both `{first}` and `{second}`")]
    DuplicateId {
        id: BlockId,
        first: String,
        second: String,
    },
    #[error("block name `{name}` is used by ids {first} and {second}")]
    DuplicateName {
        name: String,
        first: BlockId,
        second: BlockId,
    },
    #[error("block id 0 must be `air`, found `{0}`")]
    AirSlot(String),
}

#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub shape: Shape,
    pub phase: RenderPhase,
    pub occludes: bool,
    pub cull_same: bool,
    pub tint: TintSource,
    pub color: [u8; 3],
    pub variants: u8,
}

impl BlockType {
    fn placeholder(id: BlockId) -> Self {
        BlockType {
            id,
            name: String::new(),
            shape: Shape::None,
            phase: RenderPhase::Opaque,
            occludes: false,
            cull_same: false,
            tint: TintSource::None,
            color: [255, 255, 255],
            variants: 1,
        }
    }

    #[inline]
    pub fn is_rendered(&self) -> bool {
        self.shape != Shape::None
    }
}

#[derive(Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockType>,
    pub by_name: HashMap<String, BlockId>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Registry holding only `air` at id 0.
    pub fn new() -> Self {
        let mut air = BlockType::placeholder(0);
        air.name = "air".to_string();
        Self {
            by_name: HashMap::from([(air.name.clone(), 0)]),
            blocks: vec![air],
        }
    }

    /// The small block set shipped with the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml_str(BUILTIN_BLOCKS)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RegistryError> {
        let cfg: BlocksConfig = toml::from_str(text)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, RegistryError> {
        let mut reg = BlockRegistry::new();
        let mut claimed: HashMap<BlockId, String> = HashMap::new();
        let mut names: HashMap<String, BlockId> = HashMap::new();
        let mut next_id: BlockId = 1;
        for def in cfg.blocks {
            let id = match def.id {
                Some(id) => id,
                None if def.name == "air" => 0,
                None => next_id,
            };
            if id == 0 && def.name != "air" {
                return Err(RegistryError::AirSlot(def.name));
            }
            if let Some(first) = claimed.insert(id, def.name.clone()) {
                return Err(RegistryError::DuplicateId {
                    id,
                    first,
                    second: def.name,
                });
            }
            if let Some(first) = names.insert(def.name.clone(), id) {
                return Err(RegistryError::DuplicateName {
                    name: def.name,
                    first,
                    second: id,
                });
            }
            next_id = next_id.max(id.saturating_add(1));
            let ty = compile_block(id, def)?;
            if reg.blocks.len() <= id as usize {
                reg.blocks
                    .resize_with(id as usize + 1, || BlockType::placeholder(0));
                for (i, slot) in reg.blocks.iter_mut().enumerate() {
                    slot.id = i as BlockId;
                }
            }
            reg.blocks[id as usize] = ty;
        }
        reg.by_name = reg
            .blocks
            .iter()
            .filter(|t| !t.name.is_empty())
            .map(|t| (t.name.clone(), t.id))
            .collect();
        Ok(reg)
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize)
    }

    #[inline]
    pub fn get_state(&self, state: BlockState) -> Option<&BlockType> {
        self.get(state.id)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn state_by_name(&self, name: &str) -> Option<BlockState> {
        self.id_by_name(name).map(BlockState::of)
    }

    /// True if the state produces geometry; unknown ids are treated as invisible.
    #[inline]
    pub fn is_rendered(&self, state: BlockState) -> bool {
        self.get_state(state).is_some_and(BlockType::is_rendered)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn compile_shape(name: &str, shape: Option<&str>) -> Result<Shape, RegistryError> {
    match shape.unwrap_or(if name == "air" { "none" } else { "cube" }) {
        "cube" => Ok(Shape::Cube),
        "cross" => Ok(Shape::Cross),
        "none" => Ok(Shape::None),
        other => Err(RegistryError::UnknownShape {
            block: name.to_string(),
            shape: other.to_string(),
        }),
    }
}

fn compile_block(id: BlockId, def: BlockDef) -> Result<BlockType, RegistryError> {
    let shape = compile_shape(&def.name, def.shape.as_deref())?;
    let phase = def.phase.unwrap_or(match shape {
        Shape::Cross => RenderPhase::Transparent,
        _ => RenderPhase::Opaque,
    });
    let occludes = def
        .occludes
        .unwrap_or(shape == Shape::Cube && phase == RenderPhase::Opaque);
    Ok(BlockType {
        id,
        name: def.name,
        shape,
        phase,
        occludes,
        cull_same: def.cull_same.unwrap_or(false),
        tint: def.tint.unwrap_or_default(),
        color: def.color.unwrap_or([255, 255, 255]),
        variants: def.variants.unwrap_or(1).max(1),
    })
}
