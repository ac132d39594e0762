//! Header detection and firmware classification
//!
//! The device prints one header line (`type,...`) naming its columns. The
//! detector maps names to positions, insists on the device timestamp column, and
//! looks the exact header text up in a [`SignatureRegistry`] to learn the
//! firmware label and the prefix carried by every data line.

use crate::core::types::{DEVICE_TIMESTAMP_FIELD, HEADER_PREFIX};
use crate::error::{Error, Result, SchemaError};
use crate::pipeline::fields::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label reported while no signature has matched
pub const UNKNOWN_FIRMWARE: &str = "Unknown Firmware";

/// Record marker of the ESP32 CSI firmware
pub const CSI_DATA_MARKER: &str = "CSI_DATA";

/// Header printed by the epoch-stamping ESP32 CSI receiver firmware
pub const ESP32_CSI_HEADER: &str = "type,seq,mac,rssi,rate,sig_mode,mcs,bandwidth,smoothing,\
not_sounding,aggregation,stbc,fec_coding,sgi,noise_floor,ampdu_cnt,channel,\
secondary_channel,local_timestamp,ant,sig_len,rx_state,esp_epoch_us,len,first_word,data";

/// Known header line and what it implies
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FirmwareSignature {
    /// Human-readable firmware name
    pub label: String,
    /// Prefix of every data line emitted by this firmware
    pub marker: String,
    /// Exact header line text
    pub header: String,
}

impl FirmwareSignature {
    pub fn esp32_csi() -> Self {
        Self {
            label: "ESP32 CSI Receiver".to_string(),
            marker: CSI_DATA_MARKER.to_string(),
            header: ESP32_CSI_HEADER.to_string(),
        }
    }
}

/// Exact header text -> firmware signature
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    by_header: HashMap<String, FirmwareSignature>,
}

impl SignatureRegistry {
    /// Empty registry; nothing will ever resolve
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in firmware signatures
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let esp = FirmwareSignature::esp32_csi();
        registry.by_header.insert(esp.header.clone(), esp);
        registry
    }

    /// Add or replace a signature
    ///
    /// A signature with an empty marker or header could never identify data
    /// lines, so it is rejected.
    pub fn register(&mut self, signature: FirmwareSignature) -> Result<()> {
        if signature.marker.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "firmware '{}' has an empty record marker",
                signature.label
            )));
        }
        if signature.header.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "firmware '{}' has an empty header",
                signature.label
            )));
        }
        let header = signature.header.trim().to_string();
        if let Some(previous) = self.by_header.insert(header, signature) {
            log::debug!("Replaced firmware signature '{}'", previous.label);
        }
        Ok(())
    }

    pub fn lookup(&self, header: &str) -> Option<&FirmwareSignature> {
        self.by_header.get(header)
    }

    pub fn len(&self) -> usize {
        self.by_header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_header.is_empty()
    }
}

/// What the session knows about the device's line format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaState {
    pub column_index: HashMap<String, usize>,
    pub record_marker: Option<String>,
    pub firmware_label: String,
    pub resolved: bool,
}

impl SchemaState {
    /// Initial state before any header has been seen
    pub fn unresolved() -> Self {
        Self {
            column_index: HashMap::new(),
            record_marker: None,
            firmware_label: UNKNOWN_FIRMWARE.to_string(),
            resolved: false,
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    /// True when `line` is a data record for the resolved firmware
    pub fn is_record(&self, line: &str) -> bool {
        match (&self.record_marker, self.resolved) {
            (Some(marker), true) => line.starts_with(marker.as_str()),
            _ => false,
        }
    }
}

impl Default for SchemaState {
    fn default() -> Self {
        Self::unresolved()
    }
}

/// Turns header candidates into [`SchemaState`]s
#[derive(Debug, Clone)]
pub struct SchemaDetector {
    registry: SignatureRegistry,
}

impl SchemaDetector {
    pub fn new(registry: SignatureRegistry) -> Self {
        Self { registry }
    }

    /// Header candidacy test: the line begins with `type,`
    pub fn is_candidate(line: &str) -> bool {
        line.starts_with(HEADER_PREFIX)
    }

    /// Inspect a header line
    ///
    /// Returns a resolved schema when the line matches a known signature, an
    /// unresolved one (with the column map filled in) otherwise. A header that
    /// lacks the device timestamp column is an error regardless of signature.
    pub fn detect(&self, line: &str) -> std::result::Result<SchemaState, SchemaError> {
        let fields = match tokenize(line) {
            Ok(fields) => fields,
            Err(e) => {
                log::warn!("Could not tokenize header candidate: {}", e);
                return Ok(SchemaState::unresolved());
            }
        };

        // Later duplicates overwrite earlier ones
        let column_index: HashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        if !column_index.contains_key(DEVICE_TIMESTAMP_FIELD) {
            return Err(SchemaError::MissingRequiredField(DEVICE_TIMESTAMP_FIELD));
        }

        let Some(signature) = self.registry.lookup(line) else {
            log::debug!(
                "Header with {} columns matches no known firmware",
                column_index.len()
            );
            return Ok(SchemaState {
                column_index,
                ..SchemaState::unresolved()
            });
        };

        Ok(SchemaState {
            column_index,
            record_marker: Some(signature.marker.clone()),
            firmware_label: signature.label.clone(),
            resolved: true,
        })
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new(SignatureRegistry::with_defaults())
    }
}
