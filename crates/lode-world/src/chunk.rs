use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use lode_blocks::{BlockState, TintSource};

use crate::coords::{ChunkPosition, SECTION_HEIGHT, SECTION_WIDTH};
use crate::section::Section;
use crate::sync;

/// Per-column biome colors used for tinted blocks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BiomeTint {
    pub grass: [u8; 3],
    pub foliage: [u8; 3],
    pub water: [u8; 3],
}

impl Default for BiomeTint {
    fn default() -> Self {
        Self {
            grass: [145, 189, 89],
            foliage: [119, 171, 47],
            water: [63, 118, 228],
        }
    }
}

impl BiomeTint {
    #[inline]
    pub fn color(&self, source: TintSource) -> Option<[u8; 3]> {
        match source {
            TintSource::None => None,
            TintSource::Grass => Some(self.grass),
            TintSource::Foliage => Some(self.foliage),
            TintSource::Water => Some(self.water),
        }
    }
}

const COLUMNS: usize = (SECTION_WIDTH * SECTION_WIDTH) as usize;

/// A vertical column of sections.
///
/// Sections are individually locked so the mesher can read one while the
/// network side writes another. `fully_loaded` flips once the column and its
/// lighting have arrived; until then the renderer leaves it alone.
#[derive(Debug)]
pub struct Chunk {
    position: ChunkPosition,
    heights: Range<i32>,
    sections: RwLock<BTreeMap<i32, Arc<RwLock<Section>>>>,
    fully_loaded: AtomicBool,
    tints: RwLock<Vec<BiomeTint>>,
}

impl Chunk {
    /// Empty column spanning section heights `heights` (end exclusive).
    pub fn new(position: ChunkPosition, heights: Range<i32>) -> Self {
        Self {
            position,
            heights,
            sections: RwLock::new(BTreeMap::new()),
            fully_loaded: AtomicBool::new(false),
            tints: RwLock::new(vec![BiomeTint::default(); COLUMNS]),
        }
    }

    #[inline]
    pub fn position(&self) -> ChunkPosition {
        self.position
    }

    #[inline]
    pub fn heights(&self) -> Range<i32> {
        self.heights.clone()
    }

    #[inline]
    pub fn lowest_section(&self) -> i32 {
        self.heights.start
    }

    #[inline]
    pub fn is_fully_loaded(&self) -> bool {
        self.fully_loaded.load(Ordering::Acquire)
    }

    pub fn set_fully_loaded(&self, loaded: bool) {
        self.fully_loaded.store(loaded, Ordering::Release);
    }

    pub fn section(&self, height: i32) -> Option<Arc<RwLock<Section>>> {
        sync::read(&self.sections).get(&height).cloned()
    }

    /// Installs a section, replacing any previous one. Out-of-range heights are ignored.
    pub fn put_section(&self, height: i32, section: Section) -> bool {
        if !self.heights.contains(&height) {
            return false;
        }
        sync::write(&self.sections).insert(height, Arc::new(RwLock::new(section)));
        true
    }

    /// Heights that currently hold at least one non-air block.
    pub fn non_empty_heights(&self) -> Vec<i32> {
        sync::read(&self.sections)
            .iter()
            .filter(|(_, s)| !sync::read(s).is_empty())
            .map(|(h, _)| *h)
            .collect()
    }

    /// Block at column-local `x`/`z` and world `y`; missing sections read as air.
    pub fn block(&self, x: usize, y: i32, z: usize) -> BlockState {
        let height = y.div_euclid(SECTION_HEIGHT);
        match self.section(height) {
            Some(s) => sync::read(&s).get(x, y.rem_euclid(SECTION_HEIGHT) as usize, z),
            None => BlockState::AIR,
        }
    }

    /// Writes a block, creating the section on demand. Returns the previous
    /// state, or `None` if `y` lies outside the column.
    pub fn set_block(&self, x: usize, y: i32, z: usize, state: BlockState) -> Option<BlockState> {
        let height = y.div_euclid(SECTION_HEIGHT);
        if !self.heights.contains(&height) {
            return None;
        }
        let section = {
            let mut sections = sync::write(&self.sections);
            sections
                .entry(height)
                .or_insert_with(|| Arc::new(RwLock::new(Section::new())))
                .clone()
        };
        let prev = sync::write(&section).set(x, y.rem_euclid(SECTION_HEIGHT) as usize, z, state);
        Some(prev)
    }

    #[inline]
    pub fn tint(&self, x: usize, z: usize) -> BiomeTint {
        sync::read(&self.tints)[z * SECTION_WIDTH as usize + x]
    }

    pub fn set_tint(&self, x: usize, z: usize, tint: BiomeTint) {
        sync::write(&self.tints)[z * SECTION_WIDTH as usize + x] = tint;
    }

    pub fn fill_tint(&self, tint: BiomeTint) {
        sync::write(&self.tints).fill(tint);
    }
}
