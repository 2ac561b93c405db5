//! Device-class value mapping.
//!
//! Home Assistant reports every sensor state as text. The declared
//! device class decides how that text becomes a typed twin value. Only
//! classes present in the coercion table are converted; every other class
//! (or no class at all) passes the raw text through unchanged.

use std::collections::HashMap;

use twinbridge_core::ScalarValue;

use crate::error::{IngestError, Result};

/// How a raw state string is converted for a device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Parse as a finite floating-point number
    Float,
    /// `true` iff the state is exactly `"on"`
    OnOff,
}

impl Coercion {
    fn apply(&self, device_class: &str, raw: &str) -> Result<ScalarValue> {
        match self {
            Coercion::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ScalarValue::Float)
                .ok_or_else(|| IngestError::ValueCoercion {
                    device_class: device_class.to_string(),
                    raw: raw.to_string(),
                }),
            Coercion::OnOff => Ok(ScalarValue::Bool(raw == "on")),
        }
    }
}

/// Coercion table keyed by device class.
#[derive(Debug, Clone)]
pub struct DeviceClassMapper {
    table: HashMap<String, Coercion>,
}

impl DeviceClassMapper {
    /// A mapper with no coercions; every state passes through as text.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Add or replace the coercion for a device class.
    pub fn with_class(mut self, device_class: impl Into<String>, coercion: Coercion) -> Self {
        self.table.insert(device_class.into(), coercion);
        self
    }

    pub fn coercion_for(&self, device_class: &str) -> Option<Coercion> {
        self.table.get(device_class).copied()
    }

    /// Map a raw state to a typed value.
    pub fn map(&self, device_class: Option<&str>, raw_state: &str) -> Result<ScalarValue> {
        match device_class.and_then(|class| self.table.get(class).map(|c| (class, c))) {
            Some((class, coercion)) => coercion.apply(class, raw_state),
            None => Ok(ScalarValue::String(raw_state.to_string())),
        }
    }
}

impl Default for DeviceClassMapper {
    fn default() -> Self {
        Self::empty()
            .with_class("temperature", Coercion::Float)
            .with_class("illuminance", Coercion::Float)
            .with_class("motion", Coercion::OnOff)
    }
}
