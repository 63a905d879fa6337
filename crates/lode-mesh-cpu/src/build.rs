use fastrand::Rng;
use lode_blocks::{BlockRegistry, BlockState, BlockType, RenderPhase, Shape};
use lode_geom::Vec3;
use lode_runtime::CancelToken;
use lode_world::{Direction, SectionPosition};

use crate::mesh_build::MeshBuild;
use crate::seed::pick_variant;
use crate::snapshot::{SectionSnapshot, SectionView};
use crate::tint::TintSampler;

const TRANSLUCENT_ALPHA: u8 = 200;

/// Built CPU geometry for one section, split by render phase.
#[derive(Clone, Debug)]
pub struct SectionMeshes {
    pub position: SectionPosition,
    pub opaque: MeshBuild,
    pub translucent: MeshBuild,
    pub transparent: MeshBuild,
    /// Section-local bounds of rendered blocks, max exclusive.
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub block_count: usize,
    pub center: Vec3,
}

impl SectionMeshes {
    fn new(position: SectionPosition) -> Self {
        Self {
            position,
            opaque: MeshBuild::default(),
            translucent: MeshBuild::default(),
            transparent: MeshBuild::default(),
            min: [i32::MAX; 3],
            max: [i32::MIN; 3],
            block_count: 0,
            center: position.center(),
        }
    }

    pub fn batch(&self, phase: RenderPhase) -> &MeshBuild {
        match phase {
            RenderPhase::Opaque => &self.opaque,
            RenderPhase::Translucent => &self.translucent,
            RenderPhase::Transparent => &self.transparent,
        }
    }

    fn batch_mut(&mut self, phase: RenderPhase) -> &mut MeshBuild {
        match phase {
            RenderPhase::Opaque => &mut self.opaque,
            RenderPhase::Translucent => &mut self.translucent,
            RenderPhase::Transparent => &mut self.transparent,
        }
    }

    pub fn is_empty(&self) -> bool {
        RenderPhase::ALL.iter().all(|p| self.batch(*p).is_empty())
    }

    fn add_block(&mut self, x: i32, y: i32, z: i32) {
        let p = [x, y, z];
        for a in 0..3 {
            self.min[a] = self.min[a].min(p[a]);
            self.max[a] = self.max[a].max(p[a] + 1);
        }
        self.block_count += 1;
    }
}

#[derive(Debug)]
pub enum BuildOutcome {
    Built(SectionMeshes),
    /// Nothing renderable in the section.
    Empty,
    Cancelled,
}

/// Meshes one section. The section and its neighbors stay read-locked for
/// the whole build; `cancel` is polled once per Y layer.
pub fn build_section(snapshot: &SectionSnapshot, reg: &BlockRegistry, cancel: &CancelToken) -> BuildOutcome {
    snapshot.read(|view| build_locked(snapshot, view, reg, cancel))
}

fn build_locked(
    snapshot: &SectionSnapshot,
    view: &SectionView<'_>,
    reg: &BlockRegistry,
    cancel: &CancelToken,
) -> BuildOutcome {
    let position = snapshot.position;
    if view.center.is_empty() {
        return BuildOutcome::Empty;
    }
    let origin = position.origin();
    let mut out = SectionMeshes::new(position);
    let mut tints = TintSampler::new(snapshot);
    let mut rng = Rng::with_seed(0);

    for y in 0..16i32 {
        if cancel.is_cancelled() {
            log::trace!(target: "mesh", "build {:?} cancelled at y={}", position, y);
            return BuildOutcome::Cancelled;
        }
        for z in 0..16i32 {
            for x in 0..16i32 {
                let state = view.center.get(x as usize, y as usize, z as usize);
                let Some(ty) = reg.get_state(state).filter(|t| t.is_rendered()) else {
                    continue;
                };
                let variant = pick_variant(
                    &mut rng,
                    origin.x + x,
                    origin.y + y,
                    origin.z + z,
                    ty.variants,
                );
                let tint = tints.sample(ty.tint, x as usize, z as usize);
                let rgba = shade(ty, tint);
                let local = Vec3::new(x as f32, y as f32, z as f32);
                let rendered = match ty.shape {
                    Shape::Cube => {
                        let adjacent = view.adjacent(x, y, z);
                        let mb = out.batch_mut(ty.phase);
                        let mut any = false;
                        for dir in Direction::ALL {
                            if is_occluded(reg, ty, state, adjacent[dir.index()]) {
                                continue;
                            }
                            mb.add_face_rect(dir, local, variant, rgba);
                            any = true;
                        }
                        any
                    }
                    Shape::Cross => {
                        emit_cross(out.batch_mut(ty.phase), local, variant, rgba);
                        true
                    }
                    Shape::None => false,
                };
                if rendered {
                    out.add_block(x, y, z);
                }
            }
        }
    }

    if out.is_empty() {
        BuildOutcome::Empty
    } else {
        BuildOutcome::Built(out)
    }
}

/// A face is hidden by an occluding full cube, or by the same block type when
/// that type culls against itself. Unknown neighbors never hide a face.
#[inline]
fn is_occluded(reg: &BlockRegistry, ty: &BlockType, state: BlockState, neighbor: Option<BlockState>) -> bool {
    let Some(n) = neighbor else {
        return false;
    };
    if n.is_air() {
        return false;
    }
    if ty.cull_same && n.id == state.id {
        return true;
    }
    reg.get_state(n)
        .is_some_and(|nt| nt.shape == Shape::Cube && nt.occludes)
}

fn shade(ty: &BlockType, tint: [u8; 3]) -> [u8; 4] {
    let mix = |i: usize| ((u16::from(ty.color[i]) * u16::from(tint[i])) / 255) as u8;
    let alpha = match ty.phase {
        RenderPhase::Translucent => TRANSLUCENT_ALPHA,
        _ => 255,
    };
    [mix(0), mix(1), mix(2), alpha]
}

fn emit_cross(mb: &mut MeshBuild, o: Vec3, variant: u8, rgba: [u8; 4]) {
    let v = |x: f32, y: f32, z: f32| Vec3::new(o.x + x, o.y + y, o.z + z);
    mb.add_cross_plane(v(0., 0., 0.), v(1., 0., 1.), v(1., 1., 1.), v(0., 1., 0.), variant, rgba);
    mb.add_cross_plane(v(0., 0., 1.), v(1., 0., 0.), v(1., 1., 0.), v(0., 1., 1.), variant, rgba);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_world::{ChunkPosition, Section};

    fn reg() -> BlockRegistry {
        BlockRegistry::builtin().unwrap()
    }

    fn pos() -> SectionPosition {
        SectionPosition::new(ChunkPosition::new(0, 0), 4)
    }

    fn one_block(name: &str) -> SectionSnapshot {
        let r = reg();
        let mut s = Section::new();
        s.set(3, 4, 5, r.state_by_name(name).unwrap());
        SectionSnapshot::isolated(pos(), s)
    }

    #[test]
    fn single_cube_emits_six_faces() {
        let r = reg();
        let BuildOutcome::Built(m) = build_section(&one_block("stone"), &r, &CancelToken::new()) else {
            panic!("expected mesh");
        };
        assert_eq!(m.opaque.quad_count(), 6);
        assert!(m.translucent.is_empty() && m.transparent.is_empty());
        assert_eq!(m.block_count, 1);
        assert_eq!((m.min, m.max), ([3, 4, 5], [4, 5, 6]));
        assert_eq!(m.center, pos().center());
    }

    #[test]
    fn cross_goes_to_transparent_batch() {
        let r = reg();
        let BuildOutcome::Built(m) = build_section(&one_block("tall_grass"), &r, &CancelToken::new()) else {
            panic!("expected mesh");
        };
        assert_eq!(m.transparent.quad_count(), 4);
        assert!(m.opaque.is_empty());
    }

    #[test]
    fn invisible_blocks_build_empty() {
        let r = reg();
        let out = build_section(&one_block("barrier"), &r, &CancelToken::new());
        assert!(matches!(out, BuildOutcome::Empty));
        let out = build_section(&SectionSnapshot::isolated(pos(), Section::new()), &r, &CancelToken::new());
        assert!(matches!(out, BuildOutcome::Empty));
    }

    #[test]
    fn inner_faces_between_solid_blocks_are_culled() {
        let r = reg();
        let stone = r.state_by_name("stone").unwrap();
        let mut s = Section::new();
        s.set(0, 0, 0, stone);
        s.set(1, 0, 0, stone);
        let snap = SectionSnapshot::isolated(pos(), s);
        let BuildOutcome::Built(m) = build_section(&snap, &r, &CancelToken::new()) else {
            panic!("expected mesh");
        };
        assert_eq!(m.opaque.quad_count(), 10);
    }

    #[test]
    fn cull_same_merges_glass_but_not_against_stone() {
        let r = reg();
        let glass = r.state_by_name("glass").unwrap();
        let stone = r.state_by_name("stone").unwrap();
        let mut s = Section::new();
        s.set(0, 0, 0, glass);
        s.set(1, 0, 0, glass);
        s.set(2, 0, 0, stone);
        let snap = SectionSnapshot::isolated(pos(), s);
        let BuildOutcome::Built(m) = build_section(&snap, &r, &CancelToken::new()) else {
            panic!("expected mesh");
        };
        // Glass pair: 10 faces, minus the one against stone
        assert_eq!(m.transparent.quad_count(), 9);
        // Stone keeps its face toward the non-occluding glass
        assert_eq!(m.opaque.quad_count(), 6);
    }

    #[test]
    fn cancelled_before_start() {
        let r = reg();
        let token = CancelToken::new();
        token.cancel();
        let out = build_section(&one_block("stone"), &r, &token);
        assert!(matches!(out, BuildOutcome::Cancelled));
    }
}
