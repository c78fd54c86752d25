//! Error types for catalog loading, configuration and GPU setup.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog fetch failed: {0}")]
    Fetch(String),

    #[error("expected a JSON array of rows or an object with a `data` array")]
    UnexpectedShape,

    #[error("catalog contains no usable rows")]
    Empty,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot create GL object: {0}")]
    Gl(String),

    #[error("failed to compile shader: {0}")]
    Shader(String),

    #[error("failed to link program: {0}")]
    Link(String),
}
