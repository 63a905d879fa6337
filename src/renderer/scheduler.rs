use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::Ordering;

use lode_mesh_cpu::{BuildOutcome, SectionMeshes, SectionSnapshot, build_section};
use lode_runtime::{CancelToken, Priority};
use lode_world::sync;

use super::WorldRenderer;
use super::queues::{QueueItem, ReadyItem, RunningTask};

impl WorldRenderer {
    /// Hands pending sections to the worker pool until the concurrency cap is
    /// reached. Paused while too many built meshes wait for upload.
    pub fn schedule_next(&self) {
        let shared = &self.shared;
        if sync::read(&shared.queues.ready).len() >= shared.config.max_meshes_to_load {
            return;
        }
        let running = sync::read(&shared.queues.running).len();
        let pending_empty = sync::read(&shared.queues.pending).is_empty();
        if pending_empty || running >= shared.max_preparing {
            return;
        }

        let batch: Vec<(u64, QueueItem, CancelToken)> = {
            let mut pending = sync::write(&shared.queues.pending);
            let mut running = sync::write(&shared.queues.running);
            let free = shared.max_preparing.saturating_sub(running.len());
            let n = free.min(pending.len());
            pending
                .drain(..n)
                .map(|item| {
                    let id = shared.next_task_id.fetch_add(1, Ordering::Relaxed);
                    let token = CancelToken::new();
                    running.insert(
                        id,
                        RunningTask {
                            position: item.position,
                            token: token.clone(),
                        },
                    );
                    (id, item, token)
                })
                .collect()
        };

        let camera_chunk = self.visibility().camera_chunk;
        for (id, item, token) in batch {
            let priority = if item.position.chunk == camera_chunk {
                Priority::High
            } else {
                Priority::Low
            };
            log::trace!(target: "scheduler", "submit {:?} ({:?})", item.position, priority);
            let this = self.clone();
            shared
                .pool
                .submit(Box::new(move || this.run_task(id, item, token)), priority);
        }
    }

    fn run_task(&self, id: u64, item: QueueItem, token: CancelToken) {
        match catch_unwind(AssertUnwindSafe(|| self.prepare(&item, &token))) {
            Ok(Some(meshes)) => self.publish(item, meshes, &token),
            Ok(None) => {}
            Err(_) => {
                log::error!(target: "scheduler", "mesh build for {:?} panicked", item.position);
            }
        }
        sync::write(&self.shared.queues.running).remove(&id);
        self.schedule_next();
    }

    fn prepare(&self, item: &QueueItem, token: &CancelToken) -> Option<SectionMeshes> {
        if token.is_cancelled() {
            log::trace!(target: "scheduler", "{:?} cancelled before start", item.position);
            return None;
        }
        let snapshot = match SectionSnapshot::capture(self.shared.world.as_ref(), item.position) {
            Ok(s) => s,
            Err(missing) => {
                log::debug!(target: "scheduler", "skip {:?}: {:?} missing", item.position, missing);
                return None;
            }
        };
        match build_section(&snapshot, &self.shared.registry, token) {
            BuildOutcome::Built(meshes) => Some(meshes),
            BuildOutcome::Empty => {
                if self.retire_loaded(item.position, token) {
                    log::debug!(target: "scheduler", "{:?} rebuilt empty, mesh retired", item.position);
                }
                None
            }
            BuildOutcome::Cancelled => None,
        }
    }

    /// Adds a finished build to the upload queue. The token is re-checked
    /// under the queue lock so a concurrent unload never sees a late publish.
    fn publish(&self, item: QueueItem, meshes: SectionMeshes, token: &CancelToken) {
        let front = self.visibility().is_camera_column(item.position.chunk);
        let mut ready = sync::write(&self.shared.queues.ready);
        if token.is_cancelled() {
            log::trace!(target: "scheduler", "{:?} cancelled after build", item.position);
            return;
        }
        ready.retain(|r| r.position != item.position);
        let ready_item = ReadyItem {
            position: item.position,
            meshes,
        };
        if front {
            ready.push_front(ready_item);
        } else {
            ready.push_back(ready_item);
        }
    }
}
