// models/src/record.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RecordError, RecordResult};
use crate::kind::RecordKind;
use crate::patient::Patient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub date: String,
    pub reason: String,
    pub doctor_name: String,
    pub hospital: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentRecord {
    pub date: String,
    pub treatment: String,
    pub outcome: String,
    pub hospital: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRecord {
    pub date: String,
    pub diagnosis: String,
    pub specialist: String,
    pub hospital: String,
}

impl VisitRecord {
    /// Column values in table order: date, reason, doctor name, hospital.
    pub fn values(&self) -> [&str; 4] {
        [self.date.as_str(), self.reason.as_str(), self.doctor_name.as_str(), self.hospital.as_str()]
    }
}

impl TreatmentRecord {
    pub fn values(&self) -> [&str; 4] {
        [self.date.as_str(), self.treatment.as_str(), self.outcome.as_str(), self.hospital.as_str()]
    }
}

impl DiagnosticRecord {
    pub fn values(&self) -> [&str; 4] {
        [self.date.as_str(), self.diagnosis.as_str(), self.specialist.as_str(), self.hospital.as_str()]
    }
}

/// A patient together with every visit, treatment and diagnostic it owns.
///
/// Records are never stored as such: insertion decomposes them into one row per
/// table and search rebuilds them from the joined result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub patient: Patient,
    #[serde(default)]
    pub visit_records: Vec<VisitRecord>,
    #[serde(default)]
    pub treatment_records: Vec<TreatmentRecord>,
    #[serde(default)]
    pub diagnostic_records: Vec<DiagnosticRecord>,
}

impl Record {
    pub fn new(patient: Patient) -> Self {
        Record {
            patient,
            visit_records: Vec::new(),
            treatment_records: Vec::new(),
            diagnostic_records: Vec::new(),
        }
    }

    /// Checks the record can be stored without being lost on read.
    ///
    /// A child with an empty date would be indistinguishable from a LEFT JOIN
    /// miss and silently dropped by aggregation, so it is rejected up front.
    pub fn validate(&self) -> RecordResult<()> {
        if self.patient.id.is_empty() {
            return Err(RecordError::invalid("patient id must not be empty"));
        }
        let dates = self
            .visit_records
            .iter()
            .map(|v| (RecordKind::Visit, v.date.as_str()))
            .chain(self.treatment_records.iter().map(|t| (RecordKind::Treatment, t.date.as_str())))
            .chain(self.diagnostic_records.iter().map(|d| (RecordKind::Diagnostic, d.date.as_str())));
        for (kind, date) in dates {
            if date.is_empty() {
                return Err(RecordError::invalid(format!("{} record date must not be empty", kind)));
            }
        }
        Ok(())
    }

    pub fn child_count(&self) -> usize {
        self.visit_records.len() + self.treatment_records.len() + self.diagnostic_records.len()
    }
}

/// Replacement values for one child row, selected by its kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordUpdate {
    Visit(VisitRecord),
    Treatment(TreatmentRecord),
    Diagnostic(DiagnosticRecord),
}

impl RecordUpdate {
    /// Decodes an untyped payload into the record shape for `kind`.
    pub fn from_payload(kind: RecordKind, payload: Value) -> RecordResult<Self> {
        let update = match kind {
            RecordKind::Visit => RecordUpdate::Visit(decode_payload(kind, payload)?),
            RecordKind::Treatment => RecordUpdate::Treatment(decode_payload(kind, payload)?),
            RecordKind::Diagnostic => RecordUpdate::Diagnostic(decode_payload(kind, payload)?),
        };
        Ok(update)
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            RecordUpdate::Visit(_) => RecordKind::Visit,
            RecordUpdate::Treatment(_) => RecordKind::Treatment,
            RecordUpdate::Diagnostic(_) => RecordKind::Diagnostic,
        }
    }

    /// The date identifying the row to overwrite.
    pub fn date(&self) -> &str {
        match self {
            RecordUpdate::Visit(v) => &v.date,
            RecordUpdate::Treatment(t) => &t.date,
            RecordUpdate::Diagnostic(d) => &d.date,
        }
    }

    pub fn values(&self) -> [&str; 4] {
        match self {
            RecordUpdate::Visit(v) => v.values(),
            RecordUpdate::Treatment(t) => t.values(),
            RecordUpdate::Diagnostic(d) => d.values(),
        }
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(kind: RecordKind, payload: Value) -> RecordResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| RecordError::invalid(format!("invalid {} record: {}", kind, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ann() -> Patient {
        Patient { id: "p1".to_string(), name: "Ann".to_string(), age: 30 }
    }

    #[test]
    fn should_use_wire_field_names() {
        let mut record = Record::new(ann());
        record.visit_records.push(VisitRecord {
            date: "2024-01-01".to_string(),
            reason: "checkup".to_string(),
            doctor_name: "Dr. X".to_string(),
            hospital: "General".to_string(),
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["patient"]["id"], "p1");
        assert_eq!(value["visitRecords"][0]["doctorName"], "Dr. X");
        assert_eq!(value["treatmentRecords"], json!([]));
        assert_eq!(value["diagnosticRecords"], json!([]));
    }

    #[test]
    fn should_default_missing_child_sequences() {
        let record: Record = serde_json::from_value(json!({
            "patient": {"id": "p1", "name": "Ann", "age": 30}
        }))
        .unwrap();
        assert_eq!(record, Record::new(ann()));
        assert_eq!(record.child_count(), 0);
    }

    #[test]
    fn should_reject_negative_age() {
        let record = serde_json::from_value::<Record>(json!({
            "patient": {"id": "p1", "name": "Ann", "age": -1}
        }));
        assert!(record.is_err());
    }

    #[test]
    fn should_reject_empty_child_date() {
        let mut record = Record::new(ann());
        record.diagnostic_records.push(DiagnosticRecord {
            date: String::new(),
            diagnosis: "flu".to_string(),
            specialist: "Dr. Y".to_string(),
            hospital: "General".to_string(),
        });
        let err = record.validate().unwrap_err();
        assert!(matches!(err, RecordError::InvalidArgument(ref msg) if msg.starts_with("diagnostic")));
    }

    #[test]
    fn should_reject_empty_patient_id() {
        let mut patient = ann();
        patient.id.clear();
        assert!(Record::new(patient).validate().is_err());
    }

    #[test]
    fn should_decode_typed_update_payload() {
        let update = RecordUpdate::from_payload(
            RecordKind::Treatment,
            json!({"date": "2024-02-01", "treatment": "rest", "outcome": "ok", "hospital": "General"}),
        )
        .unwrap();
        assert_eq!(update.kind(), RecordKind::Treatment);
        assert_eq!(update.date(), "2024-02-01");
        assert_eq!(update.values(), ["2024-02-01", "rest", "ok", "General"]);
    }

    #[test]
    fn should_reject_update_with_missing_field() {
        let update = RecordUpdate::from_payload(
            RecordKind::Visit,
            json!({"date": "2024-02-01", "reason": "checkup", "hospital": "General"}),
        );
        assert!(matches!(update, Err(RecordError::InvalidArgument(_))));
    }

    #[test]
    fn should_reject_update_with_mistyped_field() {
        let update = RecordUpdate::from_payload(
            RecordKind::Diagnostic,
            json!({"date": 20240201, "diagnosis": "flu", "specialist": "Dr. Y", "hospital": "General"}),
        );
        assert!(matches!(update, Err(RecordError::InvalidArgument(_))));
    }

    #[test]
    fn should_name_kind_in_payload_error() {
        let err = RecordUpdate::from_payload(RecordKind::Treatment, json!("not an object")).unwrap_err();
        assert!(matches!(err, RecordError::InvalidArgument(ref msg) if msg.starts_with("invalid treatment record")));
    }
}
