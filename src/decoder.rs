//! Event decoder for raw stream records

use crate::error::DecodeError;
use crate::types::record::RawRecord;
use crate::types::trip::TripEvent;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

/// Decode one raw record into a trip event.
///
/// Returns `Ok(None)` for a record that carries no payload; such records are
/// skipped, not failed.
pub fn decode_record(record: &RawRecord) -> Result<Option<TripEvent>, DecodeError> {
    let Some(data) = record.data() else {
        return Ok(None);
    };

    let bytes = STANDARD.decode(data)?;
    let text = String::from_utf8(bytes)?;
    let map: Map<String, Value> = serde_json::from_str(&text)?;

    Ok(Some(TripEvent::from_json_map(map)?))
}
