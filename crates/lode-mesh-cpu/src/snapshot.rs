use std::sync::{Arc, RwLock, RwLockReadGuard};

use lode_blocks::BlockState;
use lode_world::sync;
use lode_world::{Chunk, ChunkPosition, Direction, Section, SectionPosition, WorldView};

/// Why a section could not be captured for meshing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SnapshotMissing {
    Chunk,
    Section,
    /// One of the four horizontal neighbor columns is absent or still loading.
    Neighbors,
}

/// Everything the mesher reads for one section: the section, its six face
/// neighbors and the surrounding 3x3 columns for tint sampling.
#[derive(Clone, Debug)]
pub struct SectionSnapshot {
    pub position: SectionPosition,
    section: Arc<RwLock<Section>>,
    neighbors: [Option<Arc<RwLock<Section>>>; 6],
    columns: [Option<Arc<Chunk>>; 9],
}

impl SectionSnapshot {
    /// Captures handles only; nothing is locked until `read`.
    pub fn capture(world: &dyn WorldView, position: SectionPosition) -> Result<Self, SnapshotMissing> {
        let chunk = world.chunk(position.chunk).ok_or(SnapshotMissing::Chunk)?;
        let section = chunk.section(position.height).ok_or(SnapshotMissing::Section)?;
        if !world.neighbor_columns(position.chunk).fully_loaded() {
            return Err(SnapshotMissing::Neighbors);
        }
        let neighbors = Direction::ALL.map(|dir| {
            let n = position.neighbor(dir);
            if dir.is_horizontal() {
                world.section_at(n.chunk, n.height)
            } else {
                chunk.section(n.height)
            }
        });
        let columns = std::array::from_fn(|i| {
            let (dx, dz) = (i as i32 % 3 - 1, i as i32 / 3 - 1);
            if dx == 0 && dz == 0 {
                Some(chunk.clone())
            } else {
                world.chunk(position.chunk.offset(dx, dz))
            }
        });
        Ok(Self {
            position,
            section,
            neighbors,
            columns,
        })
    }

    /// Snapshot of a lone section with no neighbors. Test and bench helper.
    pub fn isolated(position: SectionPosition, section: Section) -> Self {
        Self {
            position,
            section: Arc::new(RwLock::new(section)),
            neighbors: Default::default(),
            columns: Default::default(),
        }
    }

    /// Column at offset `(dx, dz)` in `-1..=1` from the section's own column.
    pub fn column(&self, dx: i32, dz: i32) -> Option<&Arc<Chunk>> {
        if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dz) {
            return None;
        }
        self.columns[((dz + 1) * 3 + dx + 1) as usize].as_ref()
    }

    pub fn chunk_position(&self) -> ChunkPosition {
        self.position.chunk
    }

    /// Read-locks the section and its neighbors for the duration of `f`.
    pub fn read<R>(&self, f: impl FnOnce(&SectionView<'_>) -> R) -> R {
        let center = sync::read(&self.section);
        let guards: [Option<RwLockReadGuard<'_, Section>>; 6] =
            std::array::from_fn(|i| self.neighbors[i].as_deref().map(sync::read));
        let view = SectionView {
            center: &center,
            neighbors: std::array::from_fn(|i| guards[i].as_deref()),
        };
        f(&view)
    }
}

/// Locked view used while meshing.
pub struct SectionView<'a> {
    pub center: &'a Section,
    pub neighbors: [Option<&'a Section>; 6],
}

impl SectionView<'_> {
    /// Block at local coordinates, where one axis may step one cell outside
    /// the section. `None` means the neighbor section is not present.
    pub fn block(&self, x: i32, y: i32, z: i32) -> Option<BlockState> {
        let inside = |v: i32| (0..16).contains(&v);
        if inside(x) && inside(y) && inside(z) {
            return Some(self.center.get(x as usize, y as usize, z as usize));
        }
        let dir = match (x, y, z) {
            (_, -1, _) => Direction::Down,
            (_, 16, _) => Direction::Up,
            (_, _, -1) => Direction::North,
            (_, _, 16) => Direction::South,
            (-1, _, _) => Direction::West,
            (16, _, _) => Direction::East,
            _ => return None,
        };
        let n = self.neighbors[dir.index()]?;
        Some(n.get(
            x.rem_euclid(16) as usize,
            y.rem_euclid(16) as usize,
            z.rem_euclid(16) as usize,
        ))
    }

    /// The six face-adjacent states of a cell, in `Direction::ALL` order.
    pub fn adjacent(&self, x: i32, y: i32, z: i32) -> [Option<BlockState>; 6] {
        Direction::ALL.map(|d| {
            let (dx, dy, dz) = d.delta();
            self.block(x + dx, y + dy, z + dz)
        })
    }
}
