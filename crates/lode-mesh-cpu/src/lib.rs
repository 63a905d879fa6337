//! CPU section mesher: turns a locked section snapshot into per-phase vertex batches.
#![forbid(unsafe_code)]

mod build;
mod face;
mod mesh_build;
mod seed;
mod snapshot;
mod tint;

pub use build::{BuildOutcome, SectionMeshes, build_section};
pub use face::face_normal;
pub use mesh_build::MeshBuild;
pub use seed::{pick_variant, position_hash};
pub use snapshot::{SectionSnapshot, SectionView, SnapshotMissing};
pub use tint::TintSampler;
