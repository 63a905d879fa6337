use std::time::{Duration, Instant};

use lode_blocks::RenderPhase;
use lode_geom::{Frustum, Vec3};
use lode_world::sync;
use lode_world::SectionPosition;

use super::queues::{LoadedSection, ReadyItem};
use super::stats::RendererStats;
use super::{ViewState, WorldRenderer};
use crate::camera::Camera;
use crate::gpu::{MeshBackend, MeshHandle};
use crate::visibility::VisibilityTest;

/// One uploaded batch in a draw list.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawBatch {
    pub position: SectionPosition,
    pub center: Vec3,
    pub handle: MeshHandle,
}

/// Per-frame side of the pipeline. Owns the GPU backend and the visible
/// draw lists; lives on the render thread only.
pub struct FrameDriver<B: MeshBackend> {
    renderer: WorldRenderer,
    backend: B,
    visible: [Vec<DrawBatch>; 3],
    last_camera: Option<(Vec3, Frustum)>,
}

impl<B: MeshBackend> FrameDriver<B> {
    pub fn new(renderer: WorldRenderer, backend: B) -> Self {
        Self {
            renderer,
            backend,
            visible: Default::default(),
            last_camera: None,
        }
    }

    pub fn renderer(&self) -> &WorldRenderer {
        &self.renderer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Sorted draw list of a phase.
    pub fn visible(&self, phase: RenderPhase) -> &[DrawBatch] {
        &self.visible[phase.index()]
    }

    /// Runs the per-frame pipeline work: releases, uploads and, if the
    /// camera changed, visibility re-evaluation.
    pub fn prepare_frame(&mut self, camera: &Camera) {
        if self.renderer.take_clear_visible() {
            for list in &mut self.visible {
                list.clear();
            }
        }
        let budget = self.renderer.config().frame_budget(camera.is_moving());
        self.unload_meshes(budget);
        self.load_meshes(budget);

        let frustum = camera.frustum();
        let changed = self
            .last_camera
            .is_none_or(|(p, f)| p != camera.position || f != frustum);
        if changed {
            self.last_camera = Some((camera.position, frustum));
            self.on_camera_change(camera, frustum);
        }
    }

    /// Issues the draw calls of one phase in sorted order.
    pub fn draw(&mut self, phase: RenderPhase) {
        self.backend.setup_phase(phase);
        for batch in &self.visible[phase.index()] {
            self.backend.draw(batch.handle);
        }
    }

    pub fn draw_all(&mut self) {
        for phase in RenderPhase::ALL {
            self.draw(phase);
        }
    }

    pub fn stats(&self) -> RendererStats {
        let r = &self.renderer;
        RendererStats {
            visible_opaque: self.visible[RenderPhase::Opaque.index()].len(),
            visible_translucent: self.visible[RenderPhase::Translucent.index()].len(),
            visible_transparent: self.visible[RenderPhase::Transparent.index()].len(),
            loaded: r.loaded_positions().len(),
            culled: r.culled_positions().len(),
            pending_upload: sync::read(&r.shared.queues.ready).len(),
            pending_build: sync::read(&r.shared.queues.pending).len(),
            preparing: r.running_count(),
        }
    }

    /// Drops everything and releases every GPU handle now, ignoring budgets.
    pub fn release_all(&mut self) {
        self.renderer.unload_all();
        self.renderer.take_clear_visible();
        for list in &mut self.visible {
            list.clear();
        }
        self.unload_meshes(Duration::MAX);
    }

    /// Releases queued meshes until the budget runs out, at least one per
    /// frame.
    fn unload_meshes(&mut self, budget: Duration) {
        let mut to_unload = sync::write(&self.renderer.shared.queues.to_unload);
        if to_unload.is_empty() {
            return;
        }
        let start = Instant::now();
        let mut released = 0usize;
        while !to_unload.is_empty() && (released == 0 || start.elapsed() < budget) {
            let ls = to_unload.remove(0);
            remove_from_lists(&mut self.visible, &ls);
            release_handles(&mut self.backend, &ls);
            released += 1;
        }
        log::trace!(target: "frame", "released {} sections, {} left", released, to_unload.len());
    }

    /// Uploads ready meshes until the budget runs out, at least one per frame.
    fn load_meshes(&mut self, budget: Duration) {
        let renderer = self.renderer.clone();
        let vis = renderer.visibility();
        let mut uploaded = 0usize;
        {
            let mut ready = sync::write(&renderer.shared.queues.ready);
            if ready.is_empty() {
                return;
            }
            let start = Instant::now();
            let mut taken = 0usize;
            while taken == 0 || start.elapsed() < budget {
                let Some(item) = ready.pop_front() else {
                    break;
                };
                taken += 1;
                let Some(ls) = self.upload(item) else {
                    continue;
                };
                if vis.is_visible(ls.position.chunk, ls.position.height, ls.min, ls.max) {
                    push_to_lists(&mut self.visible, &ls);
                }
                let mut loaded = sync::write(&renderer.shared.queues.loaded);
                let previous = loaded
                    .entry(ls.position.chunk)
                    .or_default()
                    .insert(ls.position.height, ls);
                drop(loaded);
                if let Some(old) = previous {
                    remove_from_lists(&mut self.visible, &old);
                    release_handles(&mut self.backend, &old);
                }
                uploaded += 1;
            }
        }
        log::trace!(target: "frame", "uploaded {} sections", uploaded);
        renderer.schedule_next();
    }

    /// Uploads every non-empty phase. On failure the partial upload is
    /// released and the item dropped.
    fn upload(&mut self, item: ReadyItem) -> Option<LoadedSection> {
        let ReadyItem { position, meshes } = item;
        let mut handles = [None; 3];
        for phase in RenderPhase::ALL {
            let batch = meshes.batch(phase);
            if batch.is_empty() {
                continue;
            }
            match self.backend.upload(phase, batch) {
                Ok(h) => handles[phase.index()] = Some(h),
                Err(e) => {
                    log::error!(target: "frame", "upload of {:?} {} failed: {}", position, phase.name(), e);
                    for h in handles.into_iter().flatten() {
                        self.backend.release(h);
                    }
                    return None;
                }
            }
        }
        if handles.iter().all(Option::is_none) {
            log::error!(target: "frame", "ready item {:?} carried no geometry", position);
            return None;
        }
        Some(LoadedSection {
            position,
            handles,
            min: meshes.min,
            max: meshes.max,
            center: meshes.center,
        })
    }

    fn on_camera_change(&mut self, camera: &Camera, frustum: Frustum) {
        let renderer = self.renderer.clone();
        let view_distance = renderer.config().view_distance;
        let vis = VisibilityTest::new(camera.chunk(), view_distance, frustum);
        renderer.set_view(ViewState {
            camera_position: camera.position,
            visibility: vis,
        });

        let mut lists: [Vec<DrawBatch>; 3] = Default::default();
        {
            let loaded = sync::read(&renderer.shared.queues.loaded);
            for ls in loaded.values().flat_map(|c| c.values()) {
                if vis.is_visible(ls.position.chunk, ls.position.height, ls.min, ls.max) {
                    push_to_lists(&mut lists, ls);
                }
            }
        }

        let newly_visible: Vec<SectionPosition> = {
            let culled = sync::read(&renderer.shared.queues.culled);
            culled
                .iter()
                .flat_map(|(c, hs)| hs.iter().map(|h| SectionPosition::new(*c, *h)))
                .filter(|p| vis.is_section_visible(*p))
                .collect()
        };
        let mut queued = 0;
        for pos in &newly_visible {
            if renderer.queue_section(*pos, true) {
                queued += 1;
            }
        }
        if queued > 0 {
            log::debug!(target: "frame", "{} culled sections came into view", queued);
        }
        renderer.sort_pending();
        renderer.schedule_next();

        sort_lists(&mut lists, camera.position);
        self.visible = lists;
    }
}

fn push_to_lists(lists: &mut [Vec<DrawBatch>; 3], ls: &LoadedSection) {
    for phase in RenderPhase::ALL {
        if let Some(handle) = ls.handle(phase) {
            lists[phase.index()].push(DrawBatch {
                position: ls.position,
                center: ls.center,
                handle,
            });
        }
    }
}

fn remove_from_lists(lists: &mut [Vec<DrawBatch>; 3], ls: &LoadedSection) {
    for phase in RenderPhase::ALL {
        if let Some(handle) = ls.handle(phase) {
            lists[phase.index()].retain(|b| b.handle != handle);
        }
    }
}

fn release_handles<B: MeshBackend>(backend: &mut B, ls: &LoadedSection) {
    for h in ls.handles.iter().flatten() {
        backend.release(*h);
    }
}

/// Opaque and transparent front to back, translucent back to front.
fn sort_lists(lists: &mut [Vec<DrawBatch>; 3], camera: Vec3) {
    let dist = |b: &DrawBatch| b.center.distance_sq(camera);
    lists[RenderPhase::Opaque.index()].sort_by(|a, b| dist(a).total_cmp(&dist(b)));
    lists[RenderPhase::Transparent.index()].sort_by(|a, b| dist(a).total_cmp(&dist(b)));
    lists[RenderPhase::Translucent.index()].sort_by(|a, b| dist(b).total_cmp(&dist(a)));
}
