//! Novel Context - Errors

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NovelError {
    #[error("Volume not found: {0}")]
    VolumeNotFound(String),

    #[error("Chapter not found: {0}")]
    ChapterNotFound(String),

    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: &'static str, id: String },

    #[error("must keep at least one work")]
    LastNovel,
}
