use thiserror::Error;

use crate::chunking::ChunkError;
use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}
