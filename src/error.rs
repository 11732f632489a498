use std::{io, path::PathBuf};
use thiserror::Error;

/// Failures while loading the geography file. All of them abort startup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read geography file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed geography JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot convert GeoJSON geometry: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("topology has no object named `{0}`")]
    MissingObject(String),
    #[error("arc index {0} out of range")]
    ArcIndex(i64),
    #[error("unsupported geography document: {0}")]
    Unsupported(String),
    #[error("geography file contains no usable countries")]
    NoCountries,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("a test needs at least 2 selected countries, got {selected}")]
    NotEnoughCountries { selected: usize },
    #[error("no countries selected")]
    EmptySelection,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("fit fraction must lie in (0, 1], got {0}")]
    FitFraction(f64),
}
