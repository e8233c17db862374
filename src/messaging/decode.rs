use crate::types::constants::BINARY_FRAME_SENTINEL;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure to turn a delivered frame into a consumer type
#[derive(Error, Debug)]
pub enum ParseError {
    /// The hub sent a non-text frame
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses text delivered through `on_message` into a consumer-owned type.
///
/// The connection never calls this; it is the boundary where each consumer
/// applies its own schema.
///
/// ```
/// use sensorhub_realtime_rs::decode_frame;
///
/// #[derive(serde::Deserialize)]
/// struct Reading {
///     hz: f64,
/// }
///
/// let reading: Reading = decode_frame(r#"{"hz":4.2}"#).unwrap();
/// assert_eq!(reading.hz, 4.2);
/// ```
pub fn decode_frame<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    if text == BINARY_FRAME_SENTINEL {
        return Err(ParseError::UnsupportedPayload(text.to_string()));
    }
    Ok(serde_json::from_str(text)?)
}
