use lode_blocks::BlockState;

use crate::coords::{SECTION_HEIGHT, SECTION_VOLUME, SECTION_WIDTH};

const W: usize = SECTION_WIDTH as usize;
const H: usize = SECTION_HEIGHT as usize;

/// Block-state grid of one 16x16x16 section.
#[derive(Clone, Debug)]
pub struct Section {
    blocks: Vec<BlockState>,
    non_air: u16,
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}

impl Section {
    pub fn new() -> Self {
        Self {
            blocks: vec![BlockState::AIR; SECTION_VOLUME],
            non_air: 0,
        }
    }

    /// Builds a section from `y`-major storage; short input is padded with air.
    pub fn from_blocks(mut blocks: Vec<BlockState>) -> Self {
        blocks.resize(SECTION_VOLUME, BlockState::AIR);
        let non_air = blocks.iter().filter(|b| !b.is_air()).count() as u16;
        Self { blocks, non_air }
    }

    pub fn filled(state: BlockState) -> Self {
        Self::from_blocks(vec![state; SECTION_VOLUME])
    }

    #[inline]
    pub fn idx(x: usize, y: usize, z: usize) -> usize {
        (y * W + z) * W + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockState {
        self.blocks[Self::idx(x, y, z)]
    }

    /// Writes a cell and returns the previous state.
    pub fn set(&mut self, x: usize, y: usize, z: usize, state: BlockState) -> BlockState {
        let i = Self::idx(x, y, z);
        let prev = std::mem::replace(&mut self.blocks[i], state);
        match (prev.is_air(), state.is_air()) {
            (true, false) => self.non_air += 1,
            (false, true) => self.non_air -= 1,
            _ => {}
        }
        prev
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.non_air == 0
    }

    #[inline]
    pub fn non_air_count(&self) -> usize {
        self.non_air as usize
    }

    pub fn blocks(&self) -> &[BlockState] {
        &self.blocks
    }

    /// Local `[min, max)` box around all non-air cells, or `None` if empty.
    pub fn bounds(&self) -> Option<([i32; 3], [i32; 3])> {
        if self.is_empty() {
            return None;
        }
        let mut min = [i32::MAX; 3];
        let mut max = [i32::MIN; 3];
        for y in 0..H {
            for z in 0..W {
                for x in 0..W {
                    if self.get(x, y, z).is_air() {
                        continue;
                    }
                    let p = [x as i32, y as i32, z as i32];
                    for a in 0..3 {
                        min[a] = min[a].min(p[a]);
                        max[a] = max[a].max(p[a] + 1);
                    }
                }
            }
        }
        Some((min, max))
    }
}
