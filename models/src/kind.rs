// models/src/kind.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RecordError;

/// Discriminates the three child tables owned by a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Visit,
    Treatment,
    Diagnostic,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Visit, RecordKind::Treatment, RecordKind::Diagnostic];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Visit => "visit",
            RecordKind::Treatment => "treatment",
            RecordKind::Diagnostic => "diagnostic",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visit" => Ok(RecordKind::Visit),
            "treatment" => Ok(RecordKind::Treatment),
            "diagnostic" => Ok(RecordKind::Diagnostic),
            other => Err(RecordError::invalid(format!("Invalid record type: '{}'", other))),
        }
    }
}
