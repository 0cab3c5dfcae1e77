// src/input.rs
//! Loads clipping records exported by the clippings-file parser.
//!
//! The export is a JSON array of `Clipping` objects in original file order.

use crate::error::AppError;
use crate::model::Clipping;
use std::fs;
use std::path::Path;

/// Reads every clipping from a JSON export, preserving its order.
pub fn load_clippings(path: &Path) -> Result<Vec<Clipping>, AppError> {
    let raw = fs::read_to_string(path)?;
    let clippings: Vec<Clipping> =
        serde_json::from_str(&raw).map_err(|source| AppError::JsonParseError {
            path: path.to_path_buf(),
            source,
        })?;
    log::debug!("Loaded {} clippings from {}", clippings.len(), path.display());
    Ok(clippings)
}
