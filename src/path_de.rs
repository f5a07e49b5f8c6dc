use serde::de::DeserializeOwned;
use thiserror::Error;

/// A deserialization error with the JSON path it happened at.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {source}")]
pub struct LocatedError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

impl LocatedError {
    fn new(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        Self { path, source: err.into_inner() }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, LocatedError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(LocatedError::new)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LocatedError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(LocatedError::new)
}
