use std::collections::VecDeque;
use std::sync::{RwLock, RwLockWriteGuard};

use hashbrown::{HashMap, HashSet};
use lode_blocks::RenderPhase;
use lode_geom::Vec3;
use lode_mesh_cpu::SectionMeshes;
use lode_runtime::CancelToken;
use lode_world::sync;
use lode_world::{ChunkPosition, SectionPosition, WorldView};

use super::WorldRenderer;
use crate::gpu::MeshHandle;

/// A section waiting to be built.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct QueueItem {
    pub position: SectionPosition,
    pub center: Vec3,
}

impl QueueItem {
    pub fn new(position: SectionPosition) -> Self {
        Self {
            position,
            center: position.center(),
        }
    }
}

/// A built section waiting for upload.
#[derive(Debug)]
pub(crate) struct ReadyItem {
    pub position: SectionPosition,
    pub meshes: SectionMeshes,
}

/// GPU-resident meshes of one section.
#[derive(Clone, Debug)]
pub(crate) struct LoadedSection {
    pub position: SectionPosition,
    pub handles: [Option<MeshHandle>; 3],
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub center: Vec3,
}

impl LoadedSection {
    pub fn handle(&self, phase: RenderPhase) -> Option<MeshHandle> {
        self.handles[phase.index()]
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RunningTask {
    pub position: SectionPosition,
    pub token: CancelToken,
}

/// All pipeline queues, each behind its own lock. Composite operations take
/// them in field order through [`Queues::lock_all`].
#[derive(Default)]
pub(crate) struct Queues {
    pub pending: RwLock<Vec<QueueItem>>,
    pub culled: RwLock<HashMap<ChunkPosition, HashSet<i32>>>,
    pub ready: RwLock<VecDeque<ReadyItem>>,
    pub to_unload: RwLock<Vec<LoadedSection>>,
    pub loaded: RwLock<HashMap<ChunkPosition, HashMap<i32, LoadedSection>>>,
    pub running: RwLock<HashMap<u64, RunningTask>>,
}

/// Every queue locked at once. Fields are declared in reverse lock order so
/// they are released last-acquired first.
pub(crate) struct AllQueues<'a> {
    pub running: RwLockWriteGuard<'a, HashMap<u64, RunningTask>>,
    pub loaded: RwLockWriteGuard<'a, HashMap<ChunkPosition, HashMap<i32, LoadedSection>>>,
    pub to_unload: RwLockWriteGuard<'a, Vec<LoadedSection>>,
    pub ready: RwLockWriteGuard<'a, VecDeque<ReadyItem>>,
    pub culled: RwLockWriteGuard<'a, HashMap<ChunkPosition, HashSet<i32>>>,
    pub pending: RwLockWriteGuard<'a, Vec<QueueItem>>,
}

impl Queues {
    pub fn lock_all(&self) -> AllQueues<'_> {
        let pending = sync::write(&self.pending);
        let culled = sync::write(&self.culled);
        let ready = sync::write(&self.ready);
        let to_unload = sync::write(&self.to_unload);
        let loaded = sync::write(&self.loaded);
        let running = sync::write(&self.running);
        AllQueues {
            running,
            loaded,
            to_unload,
            ready,
            culled,
            pending,
        }
    }
}

impl AllQueues<'_> {
    /// Drops every queued, ready and in-flight entry for `pos`. Loaded meshes
    /// are left alone.
    fn forget(&mut self, pos: SectionPosition) {
        self.pending.retain(|i| i.position != pos);
        if let Some(heights) = self.culled.get_mut(&pos.chunk) {
            heights.remove(&pos.height);
            if heights.is_empty() {
                self.culled.remove(&pos.chunk);
            }
        }
        self.ready.retain(|r| r.position != pos);
        self.running.retain(|_, t| {
            if t.position == pos {
                t.token.cancel();
                false
            } else {
                true
            }
        });
    }

    fn retire_loaded(&mut self, pos: SectionPosition) -> bool {
        let Some(column) = self.loaded.get_mut(&pos.chunk) else {
            return false;
        };
        let removed = column.remove(&pos.height);
        if column.is_empty() {
            self.loaded.remove(&pos.chunk);
        }
        match removed {
            Some(ls) => {
                self.to_unload.push(ls);
                true
            }
            None => false,
        }
    }
}

impl WorldRenderer {
    /// Queues one section for (re)building. Sections in view go to the
    /// pending queue, the rest are parked in the culled set.
    pub fn enqueue_section(&self, pos: SectionPosition, ignore_frustum: bool) {
        if self.queue_section(pos, ignore_frustum) {
            self.sort_pending();
            self.schedule_next();
        }
    }

    /// Queues every section of a column. The column must be fully loaded.
    pub fn enqueue_column(&self, column: ChunkPosition) {
        let Some(chunk) = self.shared.world.chunk(column) else {
            log::debug!(target: "queue", "enqueue_column {:?}: not loaded", column);
            return;
        };
        if !chunk.is_fully_loaded() {
            log::debug!(target: "queue", "enqueue_column {:?}: still loading", column);
            return;
        }
        let mut queued = 0;
        for height in chunk.heights() {
            if chunk.section(height).is_none() && !self.has_loaded(SectionPosition::new(column, height)) {
                continue;
            }
            if self.queue_section(SectionPosition::new(column, height), false) {
                queued += 1;
            }
        }
        log::debug!(target: "queue", "enqueue_column {:?}: {} sections pending", column, queued);
        if queued > 0 {
            self.sort_pending();
            self.schedule_next();
        }
    }

    /// Returns true if the section went into the pending queue.
    pub(crate) fn queue_section(&self, pos: SectionPosition, ignore_frustum: bool) -> bool {
        let Some(chunk) = self.shared.world.chunk(pos.chunk) else {
            log::trace!(target: "queue", "skip {:?}: column missing", pos);
            return false;
        };
        if !chunk.is_fully_loaded() {
            log::trace!(target: "queue", "skip {:?}: column still loading", pos);
            return false;
        }
        let bounds = chunk.section(pos.height).and_then(|s| sync::read(&s).bounds());
        let Some((min, max)) = bounds else {
            self.discard_section(pos);
            return false;
        };

        let vis = self.visibility();
        let visible = ignore_frustum || vis.is_visible(pos.chunk, pos.height, min, max);

        let mut q = self.shared.queues.lock_all();
        q.forget(pos);
        if visible {
            let item = QueueItem::new(pos);
            if vis.is_camera_column(pos.chunk) {
                q.pending.insert(0, item);
            } else {
                q.pending.push(item);
            }
        } else {
            q.culled.entry(pos.chunk).or_default().insert(pos.height);
        }
        visible
    }

    /// Drops a section that no longer has anything to render: it leaves every
    /// queue and its loaded mesh is retired.
    pub fn discard_section(&self, pos: SectionPosition) {
        let mut q = self.shared.queues.lock_all();
        q.forget(pos);
        if q.retire_loaded(pos) {
            log::debug!(target: "queue", "retired mesh of emptied section {:?}", pos);
        }
    }

    /// Forgets a column: queued work is dropped, in-flight builds are
    /// cancelled and resident meshes move to the unload queue.
    pub fn unload_column(&self, column: ChunkPosition) {
        let mut q = self.shared.queues.lock_all();
        q.pending.retain(|i| i.position.chunk != column);
        q.culled.remove(&column);
        q.ready.retain(|r| r.position.chunk != column);
        q.running.retain(|_, t| {
            if t.position.chunk == column {
                t.token.cancel();
                false
            } else {
                true
            }
        });
        if let Some(sections) = q.loaded.remove(&column) {
            log::debug!(target: "queue", "unload {:?}: {} meshes", column, sections.len());
            q.to_unload.extend(sections.into_values());
        }
    }

    /// Forgets everything, e.g. on respawn or disconnect.
    pub fn unload_all(&self) {
        let mut q = self.shared.queues.lock_all();
        q.pending.clear();
        q.culled.clear();
        q.ready.clear();
        for (_, task) in q.running.drain() {
            task.token.cancel();
        }
        let loaded = std::mem::take(&mut *q.loaded);
        for (_, sections) in loaded {
            q.to_unload.extend(sections.into_values());
        }
        self.shared.request_clear_visible();
        log::info!(target: "queue", "unloaded world, {} meshes to release", q.to_unload.len());
    }

    /// Moves a stale loaded mesh to the unload queue when a rebuild comes
    /// back empty. The token is checked under the loaded lock: a re-enqueue
    /// cancels under that same lock, so a superseded build never retires
    /// the mesh of its successor.
    pub(crate) fn retire_loaded(&self, pos: SectionPosition, token: &CancelToken) -> bool {
        let mut to_unload = sync::write(&self.shared.queues.to_unload);
        let mut loaded = sync::write(&self.shared.queues.loaded);
        if token.is_cancelled() {
            return false;
        }
        let Some(column) = loaded.get_mut(&pos.chunk) else {
            return false;
        };
        let removed = column.remove(&pos.height);
        if column.is_empty() {
            loaded.remove(&pos.chunk);
        }
        match removed {
            Some(ls) => {
                to_unload.push(ls);
                true
            }
            None => false,
        }
    }

    fn has_loaded(&self, pos: SectionPosition) -> bool {
        sync::read(&self.shared.queues.loaded)
            .get(&pos.chunk)
            .is_some_and(|c| c.contains_key(&pos.height))
    }

    /// Camera column first, then nearest first.
    pub(crate) fn sort_pending(&self) {
        let view = self.view();
        let camera_chunk = view.visibility.camera_chunk;
        let camera = view.camera_position;
        let mut pending = sync::write(&self.shared.queues.pending);
        pending.sort_by(|a, b| {
            let ka = a.position.chunk != camera_chunk;
            let kb = b.position.chunk != camera_chunk;
            ka.cmp(&kb).then_with(|| {
                a.center
                    .distance_sq(camera)
                    .total_cmp(&b.center.distance_sq(camera))
            })
        });
    }
}
