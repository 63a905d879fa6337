use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Mutex;

use crate::coords::{BlockPosition, SECTION_MAX, SectionPosition};
use crate::direction::Direction;
use crate::sync;

/// World mutations the renderer reacts to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// A column finished loading (blocks and light).
    ColumnLoaded(crate::ChunkPosition),
    ColumnUnloaded(crate::ChunkPosition),
    /// A whole section was replaced.
    SectionChanged(SectionPosition),
    BlockChanged(BlockPosition),
    /// The world was cleared, e.g. on dimension change or disconnect.
    Reset,
}

/// Sections whose mesh depends on `pos`: its own plus any neighbor across a
/// section boundary the block touches.
pub fn affected_sections(pos: BlockPosition) -> Vec<SectionPosition> {
    let own = pos.section_position();
    let (x, y, z) = pos.in_section();
    let mut out = Vec::with_capacity(4);
    out.push(own);
    let max = SECTION_MAX as usize;
    let borders = [
        (y == 0, Direction::Down),
        (y == max, Direction::Up),
        (z == 0, Direction::North),
        (z == max, Direction::South),
        (x == 0, Direction::West),
        (x == max, Direction::East),
    ];
    for (touching, dir) in borders {
        if touching {
            out.push(own.neighbor(dir));
        }
    }
    out
}

/// Fan-out of world events to any number of subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<WorldEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<WorldEvent> {
        let (tx, rx) = unbounded();
        sync::lock(&self.subscribers).push(tx);
        rx
    }

    /// Sends to every live subscriber and drops the disconnected ones.
    pub fn publish(&self, event: WorldEvent) {
        let mut subs = sync::lock(&self.subscribers);
        subs.retain(|tx| tx.send(event).is_ok());
        log::trace!(target: "events", "{:?} -> {} subscribers", event, subs.len());
    }

    /// Disconnects every subscriber; their receivers drain and then end.
    pub fn close(&self) {
        sync::lock(&self.subscribers).clear();
    }

    pub fn subscriber_count(&self) -> usize {
        sync::lock(&self.subscribers).len()
    }
}
