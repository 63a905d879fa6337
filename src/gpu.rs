//! Seam between the frame driver and whatever owns GPU buffers.

use hashbrown::HashMap;
use lode_blocks::RenderPhase;
use lode_mesh_cpu::MeshBuild;
use thiserror::Error;

/// Opaque id of an uploaded vertex batch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("out of mesh memory: need {requested} bytes, {available} free")]
    OutOfMemory { requested: usize, available: usize },
    #[error("refusing to upload an empty batch")]
    EmptyBatch,
}

/// GPU-side mesh storage. Only the frame thread calls into it.
pub trait MeshBackend {
    fn upload(&mut self, phase: RenderPhase, mesh: &MeshBuild) -> Result<MeshHandle, GpuError>;

    fn release(&mut self, handle: MeshHandle);

    /// Binds the shader and state for a phase before its batches are drawn.
    fn setup_phase(&mut self, _phase: RenderPhase) {}

    fn draw(&mut self, handle: MeshHandle);
}

#[derive(Clone, Debug)]
struct Resident {
    phase: RenderPhase,
    bytes: usize,
}

/// Backend that keeps CPU-side accounting only. Used by the demo and tests.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    resident: HashMap<MeshHandle, Resident>,
    bytes: usize,
    capacity: Option<usize>,
    current_phase: Option<RenderPhase>,
    drawn: Vec<(RenderPhase, MeshHandle)>,
    pub uploads: u64,
    pub releases: u64,
    /// Releases of handles that were not resident.
    pub stale_releases: u64,
    /// Draws of handles that were not resident.
    pub stale_draws: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that fails uploads once `bytes` are resident.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            capacity: Some(bytes),
            ..Self::default()
        }
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    pub fn resident_bytes(&self) -> usize {
        self.bytes
    }

    /// Draw calls recorded since the last call.
    pub fn take_drawn(&mut self) -> Vec<(RenderPhase, MeshHandle)> {
        std::mem::take(&mut self.drawn)
    }
}

impl MeshBackend for HeadlessBackend {
    fn upload(&mut self, phase: RenderPhase, mesh: &MeshBuild) -> Result<MeshHandle, GpuError> {
        if mesh.is_empty() {
            return Err(GpuError::EmptyBatch);
        }
        let bytes = mesh.byte_len();
        if let Some(cap) = self.capacity {
            let available = cap.saturating_sub(self.bytes);
            if bytes > available {
                return Err(GpuError::OutOfMemory {
                    requested: bytes,
                    available,
                });
            }
        }
        self.next_id += 1;
        let handle = MeshHandle(self.next_id);
        self.resident.insert(handle, Resident { phase, bytes });
        self.bytes += bytes;
        self.uploads += 1;
        Ok(handle)
    }

    fn release(&mut self, handle: MeshHandle) {
        match self.resident.remove(&handle) {
            Some(r) => {
                self.bytes -= r.bytes;
                self.releases += 1;
            }
            None => {
                self.stale_releases += 1;
                log::error!(target: "gpu", "release of non-resident mesh {:?}", handle);
            }
        }
    }

    fn setup_phase(&mut self, phase: RenderPhase) {
        self.current_phase = Some(phase);
    }

    fn draw(&mut self, handle: MeshHandle) {
        let phase = match self.resident.get(&handle) {
            Some(r) => r.phase,
            None => {
                self.stale_draws += 1;
                return;
            }
        };
        if self.current_phase != Some(phase) {
            log::warn!(target: "gpu", "{:?} drawn outside its phase", handle);
        }
        self.drawn.push((phase, handle));
    }
}
