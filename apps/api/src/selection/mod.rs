// Region selection over a rendered PDF page: gesture tracking, capture, the action menu,
// and per-owner persistence of captured images.

pub mod capture;
pub mod geometry;
pub mod handlers;
pub mod menu;
pub mod store;
pub mod tracker;

use thiserror::Error;

/// Name of the notification emitted after every successful capture.
pub const SELECTION_EVENT: &str = "pdf-selection-created";

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Rasterization failed: {0}")]
    Raster(String),

    #[error("Redis error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
