//! Headless end-to-end run: a noise world streams in on a background thread
//! while a moving camera drives the mesh pipeline.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fastnoise_lite::{FastNoiseLite, NoiseType};
use lode_blocks::{BlockRegistry, BlockState};
use lode_geom::Vec3;
use lode_runtime::TaskPool;
use lode_world::{BiomeTint, BlockPosition, Chunk, ChunkPosition, Section, World};

use crate::camera::Camera;
use crate::config::LodeConfig;
use crate::error::LodeError;
use crate::gpu::HeadlessBackend;
use crate::renderer::{FrameDriver, RendererStats, WorldRenderer};

const SECTIONS: i32 = 8;
const SEA_LEVEL: i32 = 48;
const SETTLE_FRAMES: u32 = 2000;

/// Block states the generator places.
#[derive(Copy, Clone, Debug)]
struct Palette {
    stone: BlockState,
    dirt: BlockState,
    grass: BlockState,
    sand: BlockState,
    water: BlockState,
    tall_grass: BlockState,
    glass: BlockState,
}

impl Palette {
    fn new(reg: &BlockRegistry) -> Result<Self, LodeError> {
        let get = |name: &'static str| reg.state_by_name(name).ok_or(LodeError::MissingBlock(name));
        Ok(Self {
            stone: get("stone")?,
            dirt: get("dirt")?,
            grass: get("grass_block")?,
            sand: get("sand")?,
            water: get("water")?,
            tall_grass: get("tall_grass")?,
            glass: get("glass")?,
        })
    }
}

/// Heightmap terrain with water below sea level and biome tints.
pub struct Terrain {
    height: FastNoiseLite,
    climate: FastNoiseLite,
    palette: Palette,
}

impl Terrain {
    pub fn new(seed: i32, reg: &BlockRegistry) -> Result<Self, LodeError> {
        let mut height = FastNoiseLite::with_seed(seed);
        height.set_noise_type(Some(NoiseType::OpenSimplex2));
        height.set_frequency(Some(0.02));
        let mut climate = FastNoiseLite::with_seed(seed.wrapping_add(1));
        climate.set_noise_type(Some(NoiseType::OpenSimplex2));
        climate.set_frequency(Some(0.005));
        Ok(Self {
            height,
            climate,
            palette: Palette::new(reg)?,
        })
    }

    fn surface(&self, wx: i32, wz: i32) -> i32 {
        let h = self.height.get_noise_2d(wx as f32, wz as f32);
        // [-1, 1] -> [32, 72]
        (52.0 + h * 20.0) as i32
    }

    /// Fills a column. The result is not marked fully loaded.
    pub fn generate(&self, world: &World, pos: ChunkPosition) -> Chunk {
        let chunk = world.new_chunk(pos);
        let p = self.palette;
        let mut sections: Vec<Section> = chunk.heights().map(|_| Section::new()).collect();
        let lowest = chunk.lowest_section();
        for z in 0..16usize {
            for x in 0..16usize {
                let wx = pos.x * 16 + x as i32;
                let wz = pos.z * 16 + z as i32;
                let top = self.surface(wx, wz);
                let mut put = |y: i32, state: BlockState| {
                    let idx = (y.div_euclid(16) - lowest) as usize;
                    if let Some(s) = sections.get_mut(idx) {
                        s.set(x, y.rem_euclid(16) as usize, z, state);
                    }
                };
                for y in 0..=top {
                    let state = if y < top - 3 {
                        p.stone
                    } else if top <= SEA_LEVEL + 1 {
                        p.sand
                    } else if y < top {
                        p.dirt
                    } else {
                        p.grass
                    };
                    put(y, state);
                }
                for y in top + 1..=SEA_LEVEL {
                    put(y, p.water);
                }
                if top > SEA_LEVEL + 1 && (wx * 31 + wz * 17).rem_euclid(11) == 0 {
                    put(top + 1, p.tall_grass);
                }

                let c = self.climate.get_noise_2d(wx as f32, wz as f32);
                let shift = (c * 40.0) as i32;
                let tint = BiomeTint {
                    grass: [
                        (145 + shift).clamp(0, 255) as u8,
                        189,
                        (89 - shift).clamp(0, 255) as u8,
                    ],
                    ..BiomeTint::default()
                };
                chunk.set_tint(x, z, tint);
            }
        }
        for (i, section) in sections.into_iter().enumerate() {
            if !section.is_empty() {
                chunk.put_section(lowest + i as i32, section);
            }
        }
        chunk
    }
}

/// Columns within `radius` of the origin, nearest first.
pub fn columns_around(radius: i32) -> Vec<ChunkPosition> {
    let origin = ChunkPosition::default();
    let mut out: Vec<ChunkPosition> = (-radius..=radius)
        .flat_map(|x| (-radius..=radius).map(move |z| ChunkPosition::new(x, z)))
        .collect();
    out.sort_by_key(|c| (c.distance(origin), c.x, c.z));
    out
}

/// Simulates the network thread: every column arrives in two steps, the
/// data first and the "fully loaded" mark after a delay.
pub fn spawn_streamer(
    world: Arc<World>,
    terrain: Terrain,
    columns: Vec<ChunkPosition>,
    interval: Duration,
) -> std::io::Result<JoinHandle<usize>> {
    thread::Builder::new()
        .name("lode-stream".to_string())
        .spawn(move || {
            let mut arrived = 0;
            for pos in columns {
                world.insert_chunk(terrain.generate(&world, pos));
                thread::sleep(interval);
                world.mark_fully_loaded(pos);
                arrived += 1;
            }
            log::info!(target: "demo", "streamed {} columns", arrived);
            arrived
        })
}

/// Outcome of a demo run.
#[derive(Clone, Debug, Default)]
pub struct DemoSummary {
    pub frames: u32,
    pub columns: usize,
    pub edits: u32,
    pub draws: usize,
    pub uploads: u64,
    pub releases: u64,
    pub stale_releases: u64,
    pub resident_after_release: usize,
    pub peak: RendererStats,
    pub elapsed: Duration,
}

impl fmt::Display for DemoSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames in {:.2?}: {} columns, {} edits, {} draws, {} uploads, {} releases \
             ({} stale), {} meshes left resident, peak {}",
            self.frames,
            self.elapsed,
            self.columns,
            self.edits,
            self.draws,
            self.uploads,
            self.releases,
            self.stale_releases,
            self.resident_after_release,
            self.peak
        )
    }
}

/// Streams a world in, flies the camera over it, applies random edits and
/// finally tears everything down.
pub fn run(cfg: &LodeConfig, pool: Arc<dyn TaskPool>) -> Result<DemoSummary, LodeError> {
    let start = Instant::now();
    let demo = &cfg.demo;
    let registry = Arc::new(BlockRegistry::builtin()?);
    let world = Arc::new(World::new(0..SECTIONS));
    let renderer = WorldRenderer::new(world.clone(), registry.clone(), pool, cfg.renderer.clone());

    let events = renderer.spawn_event_loop(world.subscribe())?;
    let terrain = Terrain::new(demo.seed, &registry)?;
    let palette = terrain.palette;
    let columns = columns_around(demo.radius);
    let streamer = spawn_streamer(
        world.clone(),
        terrain,
        columns,
        Duration::from_millis(demo.column_interval_ms),
    )?;

    let mut driver = FrameDriver::new(renderer.clone(), HeadlessBackend::new());
    let mut camera = Camera::new(Vec3::new(8.0, 90.0, 8.0));
    camera.look_at(Vec3::new(40.0, 60.0, 24.0));
    let mut rng = fastrand::Rng::with_seed(demo.seed as u64);
    let mut summary = DemoSummary::default();
    let span = demo.radius.max(1) * 16;

    for frame in 1..=demo.frames {
        let t = frame as f32 * 0.01;
        camera.yaw_deg += 0.3;
        camera.translate(Vec3::new(t.cos(), 0.0, t.sin()) * demo.camera_speed);

        if streamer.is_finished() {
            for _ in 0..demo.edits_per_frame {
                let pos = BlockPosition::new(
                    rng.i32(-span..span),
                    rng.i32(SEA_LEVEL - 8..SEA_LEVEL + 24),
                    rng.i32(-span..span),
                );
                let state = match rng.u8(0..3) {
                    0 => BlockState::AIR,
                    1 => palette.stone,
                    _ => palette.glass,
                };
                if world.set_block(pos, state).is_some() {
                    summary.edits += 1;
                }
            }
        }

        driver.prepare_frame(&camera);
        driver.draw_all();
        summary.draws += driver.backend_mut().take_drawn().len();

        let stats = driver.stats();
        if stats.loaded > summary.peak.loaded {
            summary.peak = stats;
        }
        if demo.stats_every > 0 && frame % demo.stats_every == 0 {
            log::info!(target: "demo", "frame {}: {}", frame, stats);
        }
        summary.frames = frame;
    }

    summary.columns = streamer
        .join()
        .map_err(|_| LodeError::ThreadPanicked("stream"))?;

    camera.stop();
    for _ in 0..SETTLE_FRAMES {
        driver.prepare_frame(&camera);
        let stats = driver.stats();
        if stats.is_idle() && renderer.to_unload_len() == 0 {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    log::info!(target: "demo", "settled: {}", driver.stats());

    let edge: Vec<ChunkPosition> = world
        .chunk_positions()
        .into_iter()
        .filter(|c| c.distance(ChunkPosition::default()) == demo.radius)
        .collect();
    for pos in edge {
        world.remove_chunk(pos);
    }

    world.close_events();
    events
        .join()
        .map_err(|_| LodeError::ThreadPanicked("event"))?;

    driver.release_all();
    let gpu = driver.backend();
    summary.uploads = gpu.uploads;
    summary.releases = gpu.releases;
    summary.stale_releases = gpu.stale_releases;
    summary.resident_after_release = gpu.resident_count();
    summary.elapsed = start.elapsed();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_nearest_first() {
        let cols = columns_around(2);
        assert_eq!(cols.len(), 25);
        assert_eq!(cols[0], ChunkPosition::new(0, 0));
        let origin = ChunkPosition::default();
        assert!(cols.windows(2).all(|w| w[0].distance(origin) <= w[1].distance(origin)));
    }

    #[test]
    fn generated_column_has_ground_and_tints() {
        let reg = BlockRegistry::builtin().unwrap();
        let world = World::new(0..SECTIONS);
        let terrain = Terrain::new(7, &reg).unwrap();
        let chunk = terrain.generate(&world, ChunkPosition::new(3, -2));
        assert!(!chunk.is_fully_loaded());
        assert!(chunk.section(0).is_some());
        assert_eq!(chunk.block(0, 0, 0), reg.state_by_name("stone").unwrap());
        assert!(chunk.section(SECTIONS - 1).is_none());
        assert_ne!(chunk.tint(0, 0).grass, [0, 0, 0]);
    }
}
