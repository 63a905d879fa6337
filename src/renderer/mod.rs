//! Incremental world-mesh pipeline: queues, build scheduling and the
//! per-frame upload driver.

mod events;
mod frame;
mod queues;
mod scheduler;
mod stats;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use lode_blocks::BlockRegistry;
use lode_geom::{Frustum, Vec3};
use lode_runtime::TaskPool;
use lode_world::sync;
use lode_world::{ChunkPosition, SectionPosition, WorldView};

use crate::config::RendererConfig;
use crate::visibility::VisibilityTest;

pub use frame::{DrawBatch, FrameDriver};
pub use stats::RendererStats;

use queues::Queues;

/// Camera-derived state shared with enqueue paths and workers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewState {
    pub camera_position: Vec3,
    pub visibility: VisibilityTest,
}

pub(crate) struct Shared {
    world: Arc<dyn WorldView>,
    registry: Arc<BlockRegistry>,
    pool: Arc<dyn TaskPool>,
    config: RendererConfig,
    max_preparing: usize,
    view: RwLock<ViewState>,
    queues: Queues,
    clear_visible: AtomicBool,
    next_task_id: AtomicU64,
}

impl Shared {
    fn request_clear_visible(&self) {
        self.clear_visible.store(true, Ordering::Release);
    }
}

/// Cheap-to-clone handle to the mesh pipeline. Event threads, workers and
/// the frame driver all hold one.
#[derive(Clone)]
pub struct WorldRenderer {
    shared: Arc<Shared>,
}

impl WorldRenderer {
    pub fn new(
        world: Arc<dyn WorldView>,
        registry: Arc<BlockRegistry>,
        pool: Arc<dyn TaskPool>,
        config: RendererConfig,
    ) -> Self {
        let max_preparing = config.preparing_cap(pool.worker_count());
        let view = ViewState {
            camera_position: Vec3::ZERO,
            visibility: VisibilityTest::new(
                ChunkPosition::default(),
                config.view_distance,
                Frustum::unbounded(),
            ),
        };
        log::info!(
            target: "scheduler",
            "mesh pipeline: view distance {}, {} concurrent builds",
            config.view_distance,
            max_preparing
        );
        Self {
            shared: Arc::new(Shared {
                world,
                registry,
                pool,
                config,
                max_preparing,
                view: RwLock::new(view),
                queues: Queues::default(),
                clear_visible: AtomicBool::new(false),
                next_task_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.shared.config
    }

    pub fn max_preparing(&self) -> usize {
        self.shared.max_preparing
    }

    pub fn view(&self) -> ViewState {
        *sync::read(&self.shared.view)
    }

    pub fn visibility(&self) -> VisibilityTest {
        self.view().visibility
    }

    /// Publishes a new camera snapshot.
    pub(crate) fn set_view(&self, view: ViewState) {
        *sync::write(&self.shared.view) = view;
    }

    pub(crate) fn take_clear_visible(&self) -> bool {
        self.shared.clear_visible.swap(false, Ordering::AcqRel)
    }

    /// Pending positions in queue order.
    pub fn pending_positions(&self) -> Vec<SectionPosition> {
        sync::read(&self.shared.queues.pending)
            .iter()
            .map(|i| i.position)
            .collect()
    }

    pub fn culled_positions(&self) -> Vec<SectionPosition> {
        let culled = sync::read(&self.shared.queues.culled);
        let mut out: Vec<_> = culled
            .iter()
            .flat_map(|(c, hs)| hs.iter().map(|h| SectionPosition::new(*c, *h)))
            .collect();
        out.sort();
        out
    }

    /// Built meshes waiting for upload, in upload order.
    pub fn ready_positions(&self) -> Vec<SectionPosition> {
        sync::read(&self.shared.queues.ready)
            .iter()
            .map(|r| r.position)
            .collect()
    }

    pub fn loaded_positions(&self) -> Vec<SectionPosition> {
        let loaded = sync::read(&self.shared.queues.loaded);
        let mut out: Vec<_> = loaded
            .iter()
            .flat_map(|(c, hs)| hs.keys().map(|h| SectionPosition::new(*c, *h)))
            .collect();
        out.sort();
        out
    }

    pub fn to_unload_len(&self) -> usize {
        sync::read(&self.shared.queues.to_unload).len()
    }

    pub fn running_count(&self) -> usize {
        sync::read(&self.shared.queues.running).len()
    }

    /// Positions of in-flight builds.
    pub fn running_positions(&self) -> Vec<SectionPosition> {
        sync::read(&self.shared.queues.running)
            .values()
            .map(|t| t.position)
            .collect()
    }
}
