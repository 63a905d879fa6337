use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use lode::{Camera, FrameDriver, HeadlessBackend, RendererConfig, WorldRenderer};
use lode_blocks::{BlockRegistry, BlockState, RenderPhase};
use lode_geom::Vec3;
use lode_runtime::ManualPool;
use lode_world::{
    BlockPosition, ChunkPosition, Section, SectionPosition, World, WorldEvent, WorldView,
};
use proptest::prelude::*;

struct Harness {
    world: Arc<World>,
    reg: Arc<BlockRegistry>,
    pool: Arc<ManualPool>,
    renderer: WorldRenderer,
    driver: FrameDriver<HeadlessBackend>,
    rx: Receiver<WorldEvent>,
}

fn sp(x: i32, z: i32, h: i32) -> SectionPosition {
    SectionPosition::new(ChunkPosition::new(x, z), h)
}

/// Stone block with water on top, in the middle of the section.
fn sample_section(reg: &BlockRegistry) -> Section {
    let mut s = Section::new();
    s.set(8, 8, 8, reg.state_by_name("stone").unwrap());
    s.set(8, 9, 8, reg.state_by_name("water").unwrap());
    s
}

impl Harness {
    fn empty(config: RendererConfig) -> Self {
        let reg = Arc::new(BlockRegistry::builtin().unwrap());
        let world = Arc::new(World::new(0..2));
        let pool = Arc::new(ManualPool::new(2));
        let renderer = WorldRenderer::new(world.clone(), reg.clone(), pool.clone(), config);
        let driver = FrameDriver::new(renderer.clone(), HeadlessBackend::new());
        let rx = world.subscribe();
        Self {
            world,
            reg,
            pool,
            renderer,
            driver,
            rx,
        }
    }

    /// 5x5 fully loaded columns; the inner 3x3 carry a sample section at
    /// height 0. Setup events are discarded.
    fn grid(config: RendererConfig) -> Self {
        let h = Self::empty(config);
        for x in -2..=2 {
            for z in -2..=2 {
                h.column(x, z, x.abs() <= 1 && z.abs() <= 1);
            }
        }
        while h.rx.try_recv().is_ok() {}
        h
    }

    fn column(&self, x: i32, z: i32, with_section: bool) {
        let c = self.world.new_chunk(ChunkPosition::new(x, z));
        if with_section {
            c.put_section(0, sample_section(&self.reg));
        }
        c.set_fully_loaded(true);
        self.world.insert_chunk(c);
    }

    fn state(&self, name: &str) -> BlockState {
        self.reg.state_by_name(name).unwrap()
    }

    /// Builds everything queued, then runs one frame.
    fn settle(&mut self, camera: &Camera) {
        self.pool.run_all();
        self.driver.prepare_frame(camera);
    }
}

fn camera_east() -> Camera {
    Camera::new(Vec3::new(4.0, 8.5, 8.5))
}

fn camera_west() -> Camera {
    let mut c = camera_east();
    c.yaw_deg = 180.0;
    c
}

fn one_at_a_time() -> RendererConfig {
    RendererConfig {
        max_preparing_tasks: Some(1),
        ..RendererConfig::default()
    }
}

#[test]
fn section_round_trips_into_draw_lists() {
    let mut h = Harness::grid(RendererConfig::default());
    h.renderer.enqueue_column(ChunkPosition::new(0, 0));
    h.settle(&camera_east());

    assert_eq!(h.renderer.loaded_positions(), vec![sp(0, 0, 0)]);
    assert_eq!(h.driver.visible(RenderPhase::Opaque).len(), 1);
    assert_eq!(h.driver.visible(RenderPhase::Translucent).len(), 1);
    assert!(h.driver.visible(RenderPhase::Transparent).is_empty());
    assert_eq!(h.driver.backend().resident_count(), 2);

    h.driver.draw_all();
    let drawn = h.driver.backend_mut().take_drawn();
    assert_eq!(drawn.len(), 2);
    assert_eq!(drawn[0].0, RenderPhase::Opaque);
    assert_eq!(h.driver.backend().stale_draws, 0);
    assert!(h.driver.stats().is_idle());
}

#[test]
fn enqueue_twice_supersedes_the_first_build() {
    let mut h = Harness::grid(one_at_a_time());
    let p = sp(0, 0, 0);
    h.renderer.enqueue_section(p, false);
    h.renderer.enqueue_section(p, false);
    assert_eq!(h.renderer.running_positions(), vec![p]);
    assert!(h.renderer.pending_positions().is_empty());

    assert_eq!(h.pool.run_all(), 2);
    assert_eq!(h.renderer.ready_positions(), vec![p]);
    assert_eq!(h.renderer.running_count(), 0);

    h.driver.prepare_frame(&camera_east());
    assert_eq!(h.driver.backend().uploads, 2);
}

#[test]
fn camera_column_jumps_the_queue() {
    let h = Harness::grid(one_at_a_time());
    let first = sp(1, 1, 0);
    let other = sp(1, 0, 0);
    let own = sp(0, 0, 0);
    h.renderer.enqueue_section(first, false);
    h.renderer.enqueue_section(other, false);
    h.renderer.enqueue_section(own, false);
    assert_eq!(h.renderer.running_positions(), vec![first]);
    assert_eq!(h.renderer.pending_positions(), vec![own, other]);

    assert!(h.pool.run_next());
    // camera column goes to the high lane
    assert_eq!(h.pool.pending(), (1, 0));
    h.pool.run_all();
    assert_eq!(h.renderer.ready_positions(), vec![own, first, other]);
}

#[test]
fn culled_sections_are_queued_once_they_come_into_view() {
    let mut h = Harness::grid(RendererConfig::default());
    h.driver.prepare_frame(&camera_east());

    let behind = sp(-1, 0, 0);
    h.renderer.enqueue_column(ChunkPosition::new(-1, 0));
    assert_eq!(h.renderer.culled_positions(), vec![behind]);
    assert!(h.renderer.pending_positions().is_empty());
    assert_eq!(h.renderer.running_count(), 0);

    h.driver.prepare_frame(&camera_west());
    assert!(h.renderer.culled_positions().is_empty());
    assert_eq!(h.renderer.running_positions(), vec![behind]);

    h.settle(&camera_west());
    assert_eq!(h.renderer.loaded_positions(), vec![behind]);
    assert_eq!(h.driver.visible(RenderPhase::Opaque).len(), 1);
}

#[test]
fn loaded_meshes_leave_the_draw_lists_when_out_of_view() {
    let mut h = Harness::grid(RendererConfig::default());
    h.renderer.enqueue_column(ChunkPosition::new(1, 0));
    h.settle(&camera_east());
    assert_eq!(h.driver.visible(RenderPhase::Opaque).len(), 1);

    let mut cam = camera_west();
    cam.position = Vec3::new(20.0, 8.5, 8.5);
    h.driver.prepare_frame(&cam);
    assert!(h.driver.visible(RenderPhase::Opaque).is_empty());
    // still resident, just not drawn
    assert_eq!(h.renderer.loaded_positions(), vec![sp(1, 0, 0)]);
    assert_eq!(h.driver.backend().resident_count(), 2);
}

#[test]
fn ready_queue_backpressure_pauses_scheduling() {
    let mut h = Harness::grid(RendererConfig {
        max_preparing_tasks: Some(1),
        max_meshes_to_load: 2,
        ..RendererConfig::default()
    });
    for (x, z) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
        h.renderer.enqueue_section(sp(x, z, 0), false);
    }
    h.pool.run_all();
    assert_eq!(h.renderer.ready_positions().len(), 2);
    assert_eq!(h.renderer.pending_positions().len(), 3);
    assert_eq!(h.renderer.running_count(), 0);

    h.driver.prepare_frame(&camera_east());
    assert!(h.renderer.ready_positions().is_empty());
    h.pool.run_all();
    assert_eq!(h.renderer.ready_positions().len(), 2);
    assert_eq!(h.renderer.pending_positions().len(), 1);

    h.settle(&camera_east());
    h.settle(&camera_east());
    assert_eq!(h.renderer.loaded_positions().len(), 5);
}

#[test]
fn every_frame_uploads_and_releases_at_least_one_mesh() {
    let mut h = Harness::grid(RendererConfig {
        upload_budget_moving_ms: 0,
        upload_budget_still_ms: 0,
        ..RendererConfig::default()
    });
    h.renderer.enqueue_column(ChunkPosition::new(0, 0));
    h.renderer.enqueue_column(ChunkPosition::new(1, 0));
    h.pool.run_all();
    assert_eq!(h.renderer.ready_positions().len(), 2);

    h.driver.prepare_frame(&camera_east());
    assert_eq!(h.renderer.ready_positions().len(), 1);
    h.driver.prepare_frame(&camera_east());
    assert_eq!(h.renderer.loaded_positions(), vec![sp(0, 0, 0), sp(1, 0, 0)]);

    h.renderer.unload_all();
    h.driver.prepare_frame(&camera_east());
    assert_eq!(h.renderer.to_unload_len(), 1);
    h.driver.prepare_frame(&camera_east());
    assert_eq!(h.renderer.to_unload_len(), 0);
    assert_eq!(h.driver.backend().resident_count(), 0);
}

#[test]
fn unloading_a_column_releases_its_meshes_once() {
    let mut h = Harness::grid(RendererConfig::default());
    h.renderer.enqueue_column(ChunkPosition::new(0, 0));
    h.renderer.enqueue_column(ChunkPosition::new(1, 0));
    h.settle(&camera_east());
    assert_eq!(h.driver.backend().resident_count(), 4);

    h.renderer.unload_column(ChunkPosition::new(0, 0));
    h.renderer.unload_column(ChunkPosition::new(0, 0));
    assert_eq!(h.renderer.to_unload_len(), 1);
    h.driver.prepare_frame(&camera_east());

    let gpu = h.driver.backend();
    assert_eq!(gpu.releases, 2);
    assert_eq!(gpu.stale_releases, 0);
    assert_eq!(gpu.resident_count(), 2);
    assert_eq!(h.renderer.loaded_positions(), vec![sp(1, 0, 0)]);
    assert!(
        h.driver
            .visible(RenderPhase::Opaque)
            .iter()
            .all(|b| b.position.chunk != ChunkPosition::new(0, 0))
    );
}

#[test]
fn build_upload_remove_restores_draw_lists() {
    let mut h = Harness::grid(RendererConfig::default());
    h.renderer.enqueue_column(ChunkPosition::new(1, 0));
    h.renderer.enqueue_column(ChunkPosition::new(1, 1));
    h.settle(&camera_east());
    h.settle(&camera_east());
    let before: Vec<Vec<_>> = RenderPhase::ALL
        .iter()
        .map(|p| h.driver.visible(*p).to_vec())
        .collect();
    assert!(!before[0].is_empty());

    h.renderer.enqueue_column(ChunkPosition::new(0, 0));
    h.settle(&camera_east());
    assert!(
        h.driver
            .visible(RenderPhase::Opaque)
            .iter()
            .any(|b| b.position == sp(0, 0, 0))
    );

    h.renderer.unload_column(ChunkPosition::new(0, 0));
    h.driver.prepare_frame(&camera_east());
    let after: Vec<Vec<_>> = RenderPhase::ALL
        .iter()
        .map(|p| h.driver.visible(*p).to_vec())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn unload_cancels_queued_builds() {
    let mut h = Harness::grid(RendererConfig::default());
    h.renderer.enqueue_column(ChunkPosition::new(0, 0));
    assert_eq!(h.renderer.running_count(), 1);

    h.renderer.unload_column(ChunkPosition::new(0, 0));
    assert_eq!(h.renderer.running_count(), 0);
    assert_eq!(h.pool.run_all(), 1);
    assert!(h.renderer.ready_positions().is_empty());

    h.driver.prepare_frame(&camera_east());
    assert_eq!(h.driver.backend().uploads, 0);
}

#[test]
fn unload_all_empties_everything() {
    let mut h = Harness::grid(RendererConfig::default());
    for (x, z) in [(0, 0), (1, 0), (1, 1)] {
        h.renderer.enqueue_column(ChunkPosition::new(x, z));
    }
    h.settle(&camera_east());
    h.renderer.enqueue_column(ChunkPosition::new(0, 1));
    assert!(h.driver.stats().visible_total() > 0);

    h.renderer.unload_all();
    h.driver.prepare_frame(&camera_east());
    assert_eq!(h.driver.stats().visible_total(), 0);
    assert!(h.renderer.loaded_positions().is_empty());
    assert!(h.renderer.pending_positions().is_empty());
    assert_eq!(h.renderer.running_count(), 0);
    assert_eq!(h.driver.backend().resident_count(), 0);
    assert_eq!(h.driver.backend().stale_releases, 0);

    h.pool.run_all();
    assert!(h.renderer.ready_positions().is_empty());
}

#[test]
fn emptied_section_retires_its_mesh() {
    let mut h = Harness::grid(RendererConfig::default());
    h.renderer.enqueue_column(ChunkPosition::new(0, 0));
    h.settle(&camera_east());
    assert_eq!(h.driver.backend().resident_count(), 2);

    h.world.set_block(BlockPosition::new(8, 8, 8), BlockState::AIR);
    h.world.set_block(BlockPosition::new(8, 9, 8), BlockState::AIR);
    assert_eq!(h.renderer.drain_events(&h.rx), 2);
    h.settle(&camera_east());

    assert!(h.renderer.loaded_positions().is_empty());
    assert_eq!(h.driver.backend().resident_count(), 0);
    assert_eq!(h.driver.stats().visible_total(), 0);
}

#[test]
fn invisible_blocks_never_upload_and_retire_stale_meshes() {
    let mut h = Harness::grid(RendererConfig::default());
    let p = sp(0, 0, 0);
    h.renderer.enqueue_section(p, false);
    h.settle(&camera_east());
    let uploads = h.driver.backend().uploads;

    let barrier = h.state("barrier");
    let column = h.world.chunk(p.chunk).unwrap();
    column.put_section(0, Section::filled(barrier));
    h.renderer.enqueue_section(p, false);
    h.settle(&camera_east());

    assert_eq!(h.driver.backend().uploads, uploads);
    assert!(h.renderer.loaded_positions().is_empty());
    assert_eq!(h.driver.backend().resident_count(), 0);
}

#[test]
fn draw_lists_are_sorted_by_distance() {
    let mut h = Harness::grid(RendererConfig::default());
    for x in -1..=1 {
        for z in -1..=1 {
            h.renderer.enqueue_column(ChunkPosition::new(x, z));
        }
    }
    let cam = Camera::new(Vec3::new(-40.0, 8.5, 8.5));
    h.settle(&cam);
    h.pool.run_all();
    h.driver.prepare_frame(&cam);
    // force a list rebuild
    let mut cam2 = cam;
    cam2.position.y += 0.01;
    h.driver.prepare_frame(&cam2);

    let dist = |b: &lode::DrawBatch| b.center.distance_sq(cam2.position);
    let opaque = h.driver.visible(RenderPhase::Opaque);
    let translucent = h.driver.visible(RenderPhase::Translucent);
    assert!(opaque.len() >= 3);
    assert!(opaque.windows(2).all(|w| dist(&w[0]) <= dist(&w[1])));
    assert!(translucent.windows(2).all(|w| dist(&w[0]) >= dist(&w[1])));
}

#[test]
fn column_events_wait_for_neighbors() {
    let h = Harness::empty(RendererConfig::default());
    for x in -1..=1 {
        for z in -1..=1 {
            h.column(x, z, true);
        }
    }
    assert_eq!(h.renderer.drain_events(&h.rx), 9);
    let queued = |h: &Harness| {
        let mut v = h.renderer.running_positions();
        v.extend(h.renderer.pending_positions());
        v.sort();
        v
    };
    assert_eq!(queued(&h), vec![sp(0, 0, 0)]);

    h.column(2, 0, false);
    h.renderer.drain_events(&h.rx);
    assert_eq!(queued(&h), vec![sp(0, 0, 0), sp(1, 0, 0)]);
}

#[test]
fn border_edit_requeues_the_neighbor() {
    let mut h = Harness::grid(RendererConfig::default());
    h.world
        .set_block(BlockPosition::new(15, 3, 8), h.state("stone"));
    h.renderer.drain_events(&h.rx);
    let mut queued = h.renderer.running_positions();
    queued.extend(h.renderer.pending_positions());
    queued.sort();
    assert_eq!(queued, vec![sp(0, 0, 0), sp(1, 0, 0)]);
    h.settle(&camera_east());
    h.settle(&camera_east());
    assert_eq!(h.renderer.loaded_positions(), vec![sp(0, 0, 0), sp(1, 0, 0)]);
}

#[test]
fn release_all_frees_every_handle() {
    let mut h = Harness::grid(RendererConfig::default());
    for x in -1..=1 {
        h.renderer.enqueue_column(ChunkPosition::new(x, 0));
    }
    h.settle(&camera_east());
    h.settle(&camera_east());
    assert!(h.driver.backend().resident_count() > 0);

    h.driver.release_all();
    let gpu = h.driver.backend();
    assert_eq!(gpu.resident_count(), 0);
    assert_eq!(gpu.releases, gpu.uploads);
    assert_eq!(gpu.stale_releases, 0);
}

#[derive(Clone, Debug)]
enum Op {
    Enqueue(i32, i32, bool),
    Unload(i32, i32),
    Run,
    Frame(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-1i32..=1, -1i32..=1, any::<bool>()).prop_map(|(x, z, f)| Op::Enqueue(x, z, f)),
        (-1i32..=1, -1i32..=1).prop_map(|(x, z)| Op::Unload(x, z)),
        Just(Op::Run),
        any::<bool>().prop_map(Op::Frame),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Queue membership stays consistent under any interleaving
    #[test]
    fn queues_stay_consistent(ops in proptest::collection::vec(op(), 1..40)) {
        let mut h = Harness::grid(RendererConfig { max_preparing_tasks: Some(2), ..RendererConfig::default() });
        for op in ops {
            match op {
                Op::Enqueue(x, z, ignore) => h.renderer.enqueue_section(sp(x, z, 0), ignore),
                Op::Unload(x, z) => h.renderer.unload_column(ChunkPosition::new(x, z)),
                Op::Run => { h.pool.run_next(); }
                Op::Frame(west) => {
                    let cam = if west { camera_west() } else { camera_east() };
                    h.driver.prepare_frame(&cam);
                }
            }
            let pending = h.renderer.pending_positions();
            let unique: HashSet<_> = pending.iter().copied().collect();
            prop_assert_eq!(unique.len(), pending.len());
            let culled: HashSet<_> = h.renderer.culled_positions().into_iter().collect();
            prop_assert!(unique.is_disjoint(&culled));
            let running = h.renderer.running_positions();
            let running_set: HashSet<_> = running.iter().copied().collect();
            prop_assert_eq!(running_set.len(), running.len());
            prop_assert!(running_set.is_disjoint(&unique));
        }

        h.settle(&camera_east());
        h.settle(&camera_east());
        h.driver.draw_all();
        let gpu = h.driver.backend();
        prop_assert_eq!(gpu.stale_releases, 0);
        prop_assert_eq!(gpu.stale_draws, 0);
        prop_assert!(gpu.resident_count() >= h.renderer.loaded_positions().len());

        h.driver.release_all();
        prop_assert_eq!(h.driver.backend().resident_count(), 0);
    }
}
