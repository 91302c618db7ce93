//! Repository layer
//!
//! Repositories own the mapping between domain values and store keys.
//! They hold no business rules; those live in the lifecycle module and are
//! orchestrated by the service layer.

mod pipeline;
mod stage;

pub use pipeline::PipelineRepository;
pub use stage::StageItemRepository;

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Repository error type
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Pipeline not found: {0}")]
    NotFound(Uuid),

    #[error("Pipeline {id} was modified elsewhere (expected revision {expected}, found {found})")]
    Conflict { id: Uuid, expected: u64, found: u64 },

    #[error("Parent pipeline not found: {0}")]
    UnknownParent(Uuid),

    #[error("Cannot place pipeline {id} under {parent}: it would become its own ancestor")]
    WouldCycle { id: Uuid, parent: Uuid },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
