//! Data line parsing
//!
//! Only the device timestamp is extracted; the CSI payload columns are carried
//! on the wire but never interpreted here.

use crate::core::types::{DEVICE_TIMESTAMP_FIELD, Record};
use crate::error::ParseError;
use crate::pipeline::fields::tokenize;
use crate::pipeline::schema::SchemaState;

/// Default sanity floor for device timestamps (µs since the Unix epoch)
pub const DEFAULT_TIMESTAMP_FLOOR_US: i64 = 1_000_000_000;

/// Extracts [`Record`]s from data lines
#[derive(Debug, Clone, Copy)]
pub struct RecordParser {
    timestamp_floor_us: i64,
}

impl RecordParser {
    pub fn new(timestamp_floor_us: i64) -> Self {
        Self { timestamp_floor_us }
    }

    /// Parse a data line against a resolved schema
    ///
    /// The caller guarantees `schema.is_record(line)`.
    pub fn parse(&self, line: &str, schema: &SchemaState) -> Result<Record, ParseError> {
        let index = schema
            .column(DEVICE_TIMESTAMP_FIELD)
            .ok_or(ParseError::FieldMissing {
                field: DEVICE_TIMESTAMP_FIELD,
                index: 0,
                found: 0,
            })?;

        let fields = tokenize(line).map_err(|e| ParseError::Malformed(e.to_string()))?;
        let token = fields.get(index).ok_or(ParseError::FieldMissing {
            field: DEVICE_TIMESTAMP_FIELD,
            index,
            found: fields.len(),
        })?;

        let token = token.trim();
        let value: i64 = token
            .parse()
            .map_err(|_| ParseError::NotAnInteger(token.to_string()))?;

        if value < self.timestamp_floor_us {
            return Err(ParseError::SuspiciousTimestamp {
                value,
                floor: self.timestamp_floor_us,
            });
        }

        Ok(Record {
            device_timestamp_us: value,
        })
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_FLOOR_US)
    }
}
