//! Type definitions for the enrichment pipeline

pub mod enriched;
pub mod record;
pub mod trip;

pub use enriched::{EnrichedEvent, InvocationResult};
pub use record::{RawRecord, RecordBatch, RecordPayload};
pub use trip::TripEvent;
