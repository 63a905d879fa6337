use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, TryRecvError};
use lode_world::{ChunkPosition, Direction, WorldEvent, WorldView, affected_sections};

use super::WorldRenderer;

impl WorldRenderer {
    /// Reacts to one world mutation.
    pub fn handle_event(&self, event: WorldEvent) {
        log::trace!(target: "events", "{:?}", event);
        match event {
            WorldEvent::ColumnLoaded(pos) => self.on_column_loaded(pos),
            WorldEvent::ColumnUnloaded(pos) => self.unload_column(pos),
            WorldEvent::SectionChanged(pos) => {
                self.enqueue_section(pos, false);
                for dir in Direction::ALL {
                    self.enqueue_section(pos.neighbor(dir), false);
                }
            }
            WorldEvent::BlockChanged(pos) => {
                for section in affected_sections(pos) {
                    self.enqueue_section(section, false);
                }
            }
            WorldEvent::Reset => self.unload_all(),
        }
    }

    /// A column only meshes once it and its four neighbors are in, so a new
    /// arrival may also unlock the columns around it.
    fn on_column_loaded(&self, pos: ChunkPosition) {
        if self.column_ready(pos) {
            self.enqueue_column(pos);
        }
        for dir in Direction::HORIZONTAL {
            let n = pos.neighbor(dir);
            if self.column_ready(n) {
                self.enqueue_column(n);
            }
        }
    }

    fn column_ready(&self, pos: ChunkPosition) -> bool {
        let world = &self.shared.world;
        world.is_fully_loaded(pos) && world.neighbor_columns(pos).fully_loaded()
    }

    /// Handles every event already queued on `rx` without blocking.
    pub fn drain_events(&self, rx: &Receiver<WorldEvent>) -> usize {
        let mut n = 0;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    n += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return n,
            }
        }
    }

    /// Runs [`Self::handle_event`] on a dedicated thread until the world drops
    /// its side of the channel.
    pub fn spawn_event_loop(&self, rx: Receiver<WorldEvent>) -> io::Result<JoinHandle<()>> {
        let this = self.clone();
        thread::Builder::new()
            .name("lode-events".to_string())
            .spawn(move || {
                for event in rx.iter() {
                    this.handle_event(event);
                }
                log::debug!(target: "events", "event feed closed");
            })
    }
}
