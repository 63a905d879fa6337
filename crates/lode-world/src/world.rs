use std::ops::Range;
use std::sync::{Arc, RwLock};

use crossbeam_channel::Receiver;
use hashbrown::HashMap;
use lode_blocks::BlockState;

use crate::chunk::Chunk;
use crate::coords::{BlockPosition, ChunkPosition, SectionPosition};
use crate::direction::Direction;
use crate::events::{EventBus, WorldEvent};
use crate::section::Section;
use crate::sync;

/// Read access to loaded columns. Implemented by the client world and by
/// test fixtures; shared between the render thread and mesh workers.
pub trait WorldView: Send + Sync {
    fn chunk(&self, pos: ChunkPosition) -> Option<Arc<Chunk>>;

    fn section_at(&self, pos: ChunkPosition, height: i32) -> Option<Arc<RwLock<Section>>> {
        self.chunk(pos)?.section(height)
    }

    fn neighbor_columns(&self, pos: ChunkPosition) -> ChunkNeighbors {
        ChunkNeighbors {
            chunks: Direction::HORIZONTAL.map(|d| self.chunk(pos.neighbor(d))),
        }
    }

    /// True if the column is present and fully loaded.
    fn is_fully_loaded(&self, pos: ChunkPosition) -> bool {
        self.chunk(pos).is_some_and(|c| c.is_fully_loaded())
    }
}

/// The four horizontal neighbor columns, indexed by `Direction::horizontal_index`.
#[derive(Clone, Debug, Default)]
pub struct ChunkNeighbors {
    pub chunks: [Option<Arc<Chunk>>; 4],
}

impl ChunkNeighbors {
    pub fn get(&self, dir: Direction) -> Option<&Arc<Chunk>> {
        dir.horizontal_index()
            .and_then(|i| self.chunks[i].as_ref())
    }

    /// All four present and fully loaded.
    pub fn fully_loaded(&self) -> bool {
        self.chunks
            .iter()
            .all(|c| c.as_ref().is_some_and(|c| c.is_fully_loaded()))
    }
}

/// In-memory client world: loaded columns plus an event feed.
#[derive(Debug)]
pub struct World {
    chunks: RwLock<HashMap<ChunkPosition, Arc<Chunk>>>,
    heights: Range<i32>,
    events: EventBus,
}

impl World {
    /// `heights` is the section range every column spans (end exclusive).
    pub fn new(heights: Range<i32>) -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            heights,
            events: EventBus::new(),
        }
    }

    #[inline]
    pub fn heights(&self) -> Range<i32> {
        self.heights.clone()
    }

    pub fn subscribe(&self) -> Receiver<WorldEvent> {
        self.events.subscribe()
    }

    /// Ends every event feed. Later mutations are not announced to existing
    /// subscribers.
    pub fn close_events(&self) {
        self.events.close();
    }

    /// Empty column with this world's height range, not yet inserted.
    pub fn new_chunk(&self, pos: ChunkPosition) -> Chunk {
        Chunk::new(pos, self.heights.clone())
    }

    /// Inserts a column. It becomes visible to the renderer once it is
    /// marked fully loaded, either already or later via `mark_fully_loaded`.
    pub fn insert_chunk(&self, chunk: Chunk) -> Arc<Chunk> {
        let pos = chunk.position();
        let loaded = chunk.is_fully_loaded();
        let chunk = Arc::new(chunk);
        sync::write(&self.chunks).insert(pos, chunk.clone());
        if loaded {
            self.events.publish(WorldEvent::ColumnLoaded(pos));
        }
        chunk
    }

    pub fn mark_fully_loaded(&self, pos: ChunkPosition) -> bool {
        let Some(chunk) = self.chunk(pos) else {
            return false;
        };
        if !chunk.is_fully_loaded() {
            chunk.set_fully_loaded(true);
            self.events.publish(WorldEvent::ColumnLoaded(pos));
        }
        true
    }

    pub fn remove_chunk(&self, pos: ChunkPosition) -> Option<Arc<Chunk>> {
        let removed = sync::write(&self.chunks).remove(&pos);
        if removed.is_some() {
            self.events.publish(WorldEvent::ColumnUnloaded(pos));
        }
        removed
    }

    /// Replaces a whole section. Returns false if the column is missing or
    /// the height is out of range.
    pub fn put_section(&self, pos: SectionPosition, section: Section) -> bool {
        let Some(chunk) = self.chunk(pos.chunk) else {
            return false;
        };
        if !chunk.put_section(pos.height, section) {
            return false;
        }
        self.events.publish(WorldEvent::SectionChanged(pos));
        true
    }

    /// Writes one block and notifies subscribers if the state changed.
    pub fn set_block(&self, pos: BlockPosition, state: BlockState) -> Option<BlockState> {
        let chunk = self.chunk(pos.chunk_position())?;
        let (x, _, z) = pos.in_section();
        let prev = chunk.set_block(x, pos.y, z, state)?;
        if prev != state {
            self.events.publish(WorldEvent::BlockChanged(pos));
        }
        Some(prev)
    }

    pub fn block(&self, pos: BlockPosition) -> Option<BlockState> {
        let chunk = self.chunk(pos.chunk_position())?;
        let (x, _, z) = pos.in_section();
        Some(chunk.block(x, pos.y, z))
    }

    /// Drops every column.
    pub fn clear(&self) {
        sync::write(&self.chunks).clear();
        self.events.publish(WorldEvent::Reset);
    }

    pub fn chunk_positions(&self) -> Vec<ChunkPosition> {
        sync::read(&self.chunks).keys().copied().collect()
    }
}

impl WorldView for World {
    fn chunk(&self, pos: ChunkPosition) -> Option<Arc<Chunk>> {
        sync::read(&self.chunks).get(&pos).cloned()
    }
}

impl<W: WorldView + ?Sized> WorldView for Arc<W> {
    fn chunk(&self, pos: ChunkPosition) -> Option<Arc<Chunk>> {
        (**self).chunk(pos)
    }
}
