use serde::Deserialize;

pub type BlockId = u16;

/// A block id plus its packed property state, as delivered by the world model.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockState {
    pub id: BlockId,
    pub state: u16,
}

impl BlockState {
    pub const AIR: BlockState = BlockState { id: 0, state: 0 };

    #[inline]
    pub const fn new(id: BlockId, state: u16) -> Self {
        Self { id, state }
    }

    #[inline]
    pub const fn of(id: BlockId) -> Self {
        Self { id, state: 0 }
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.id == 0
    }
}

/// Geometry a block type emits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Nothing is emitted (air, barriers).
    None,
    /// Full unit cube with six independently culled faces.
    Cube,
    /// Two crossed diagonal quads (plants).
    Cross,
}

/// Draw phase a block's geometry is batched into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPhase {
    Opaque,
    Translucent,
    Transparent,
}

impl RenderPhase {
    pub const ALL: [RenderPhase; 3] = [
        RenderPhase::Opaque,
        RenderPhase::Translucent,
        RenderPhase::Transparent,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            RenderPhase::Opaque => "opaque",
            RenderPhase::Translucent => "translucent",
            RenderPhase::Transparent => "transparent",
        }
    }
}

/// Which per-column biome colour multiplies a block's vertex colour.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TintSource {
    #[default]
    None,
    Grass,
    Foliage,
    Water,
}
