use lode_blocks::RegistryError;
use lode_runtime::RuntimeError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum LodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("block registry: {0}")]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("block `{0}` is not in the registry")]
    MissingBlock(&'static str),
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
