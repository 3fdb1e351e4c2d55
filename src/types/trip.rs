//! Trip event data structures

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Wire names of the typed fields, used to keep explicit `null`s.
const KNOWN_FIELDS: [&str; 10] = [
    "tpep_pickup_datetime",
    "tpep_dropoff_datetime",
    "passenger_count",
    "trip_distance",
    "PULocationID",
    "DOLocationID",
    "fare_amount",
    "tip_amount",
    "total_amount",
    "payment_type",
];

/// A single taxi trip as published on the ingestion stream.
///
/// Every field is optional on the wire. Keys this struct does not know about
/// are kept in `extra` so the enriched output carries the event through
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripEvent {
    /// Pickup time (opaque, not parsed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpep_pickup_datetime: Option<String>,

    /// Dropoff time (opaque, not parsed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpep_dropoff_datetime: Option<String>,

    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub passenger_count: Option<u32>,

    /// Trip distance in miles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_distance: Option<f64>,

    /// Pickup taxi zone
    #[serde(
        rename = "PULocationID",
        default,
        deserialize_with = "integral",
        skip_serializing_if = "Option::is_none"
    )]
    pub pickup_zone: Option<i64>,

    /// Dropoff taxi zone
    #[serde(
        rename = "DOLocationID",
        default,
        deserialize_with = "integral",
        skip_serializing_if = "Option::is_none"
    )]
    pub dropoff_zone: Option<i64>,

    /// Fare reported by the meter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fare_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,

    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<i32>,

    /// Unrecognised keys, passed through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TripEvent {
    /// Create a trip with the fields the fare model consumes.
    pub fn new(
        trip_distance: f64,
        passenger_count: u32,
        pickup_zone: i64,
        dropoff_zone: i64,
        fare_amount: f64,
    ) -> Self {
        Self {
            trip_distance: Some(trip_distance),
            passenger_count: Some(passenger_count),
            pickup_zone: Some(pickup_zone),
            dropoff_zone: Some(dropoff_zone),
            fare_amount: Some(fare_amount),
            ..Default::default()
        }
    }

    /// Build a trip from a decoded JSON object.
    ///
    /// Typed fields sent as an explicit `null` are kept in `extra` so they
    /// are written back as `null` rather than dropped.
    pub fn from_json_map(map: Map<String, Value>) -> serde_json::Result<Self> {
        let nulls: Vec<&'static str> = KNOWN_FIELDS
            .into_iter()
            .filter(|key| matches!(map.get(*key), Some(Value::Null)))
            .collect();

        let mut trip: TripEvent = serde_json::from_value(Value::Object(map))?;
        for key in nulls {
            trip.extra.insert(key.to_string(), Value::Null);
        }
        Ok(trip)
    }

    /// Reported fare, with a missing amount read as zero.
    pub fn reported_fare(&self) -> f64 {
        self.fare_amount.unwrap_or(0.0)
    }
}

/// Accept integers sent either as JSON integers or as whole floats (`2.0`).
fn integral<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let whole = match (number.as_i64(), number.as_f64()) {
        (Some(i), _) => i,
        (None, Some(f)) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            f as i64
        }
        _ => return Err(D::Error::custom(format!("expected an integer, got {number}"))),
    };

    T::try_from(whole)
        .map(Some)
        .map_err(|_| D::Error::custom(format!("integer {whole} out of range")))
}
