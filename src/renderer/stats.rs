use std::fmt;

/// Snapshot of pipeline counters, one per queue plus visible batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub visible_opaque: usize,
    pub visible_translucent: usize,
    pub visible_transparent: usize,
    pub loaded: usize,
    pub culled: usize,
    /// Built meshes waiting for upload.
    pub pending_upload: usize,
    /// Sections waiting to be built.
    pub pending_build: usize,
    pub preparing: usize,
}

impl RendererStats {
    pub fn visible_total(&self) -> usize {
        self.visible_opaque + self.visible_translucent + self.visible_transparent
    }

    /// True once nothing is queued, building or waiting for upload.
    pub fn is_idle(&self) -> bool {
        self.pending_upload == 0 && self.pending_build == 0 && self.preparing == 0
    }
}

/// One-line debug HUD, e.g. `C: v=12/3/1 l=40 c=7 r=0 q=2 p=3`.
impl fmt::Display for RendererStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C: v={}/{}/{} l={} c={} r={} q={} p={}",
            self.visible_opaque,
            self.visible_translucent,
            self.visible_transparent,
            self.loaded,
            self.culled,
            self.pending_upload,
            self.pending_build,
            self.preparing
        )
    }
}
