//! Error types shared by the whole crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::mesh::FaceElement;

/// Errors that can occur while loading assets or rendering a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A matrix needed for this frame has no inverse; the frame is abandoned.
    #[error("{which} matrix is singular")]
    SingularMatrix { which: &'static str },

    /// A normal must be synthesized for an element no face references.
    #[error("face element {element:?} has no adjacent faces")]
    OrphanElement { element: FaceElement },

    #[error("no prepared normal for face element {element:?}")]
    MissingNormal { element: FaceElement },

    /// The frame pipeline was shut down.
    #[error("frame pipeline is closed")]
    PipelineClosed,

    #[error("failed to load mesh {path}: {source}")]
    MeshLoad {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to load texture {path}: {source}")]
    TextureLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("failed to start render threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid texture: {0}")]
    InvalidTexture(String),

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
