// lib/src/aggregate.rs

use std::collections::{HashMap, HashSet};

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use medrec_models::{
    DiagnosticRecord, Patient, Record, RecordKind, RecordResult, TreatmentRecord, VisitRecord,
};

/// One row of the patient/child join.
///
/// A child whose date is empty was not matched by its LEFT JOIN for this row.
/// The `*_key` fields carry the child's primary key when the row came from the
/// store, and are used to drop the duplicates the join's cross product produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub patient: Patient,
    pub visit_key: Option<i64>,
    pub visit: VisitRecord,
    pub treatment_key: Option<i64>,
    pub treatment: TreatmentRecord,
    pub diagnostic_key: Option<i64>,
    pub diagnostic: DiagnosticRecord,
}

impl<'r> FromRow<'r, SqliteRow> for JoinedRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(JoinedRow {
            patient: decode_patient(row)?,
            visit_key: row.try_get("visit_key")?,
            visit: VisitRecord {
                date: text(row, "visit_date")?,
                reason: text(row, "visit_reason")?,
                doctor_name: text(row, "visit_doctor_name")?,
                hospital: text(row, "visit_hospital")?,
            },
            treatment_key: row.try_get("treatment_key")?,
            treatment: TreatmentRecord {
                date: text(row, "treatment_date")?,
                treatment: text(row, "treatment_name")?,
                outcome: text(row, "treatment_outcome")?,
                hospital: text(row, "treatment_hospital")?,
            },
            diagnostic_key: row.try_get("diagnostic_key")?,
            diagnostic: DiagnosticRecord {
                date: text(row, "diagnostic_date")?,
                diagnosis: text(row, "diagnostic_diagnosis")?,
                specialist: text(row, "diagnostic_specialist")?,
                hospital: text(row, "diagnostic_hospital")?,
            },
        })
    }
}

/// Decodes the `patient_id`, `patient_name` and `patient_age` columns.
pub(crate) fn decode_patient(row: &SqliteRow) -> Result<Patient, sqlx::Error> {
    let age: i64 = row.try_get("patient_age")?;
    let age = u32::try_from(age).map_err(|e| sqlx::Error::ColumnDecode {
        index: "patient_age".to_string(),
        source: Box::new(e),
    })?;
    Ok(Patient {
        id: row.try_get("patient_id")?,
        name: row.try_get("patient_name")?,
        age,
    })
}

// NULL from an unmatched LEFT JOIN becomes the empty string.
fn text(row: &SqliteRow, column: &str) -> Result<String, sqlx::Error> {
    Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
}

struct PendingRecord {
    record: Record,
    seen: HashSet<(RecordKind, i64)>,
}

impl PendingRecord {
    // Keyless children are always kept; keyed ones only on first sight.
    fn first_sight(&mut self, kind: RecordKind, key: Option<i64>) -> bool {
        match key {
            Some(key) => self.seen.insert((kind, key)),
            None => true,
        }
    }
}

/// Folds joined rows into one [`Record`] per patient id.
///
/// Records come out in the order their patient first appeared; child sequences
/// keep row arrival order.
#[derive(Default)]
pub struct RecordAggregator {
    pending: Vec<PendingRecord>,
    index: HashMap<String, usize>,
}

impl RecordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: JoinedRow) {
        let JoinedRow {
            patient,
            visit_key,
            visit,
            treatment_key,
            treatment,
            diagnostic_key,
            diagnostic,
        } = row;

        let slot = match self.index.get(&patient.id) {
            Some(&slot) => slot,
            None => {
                let slot = self.pending.len();
                self.index.insert(patient.id.clone(), slot);
                self.pending.push(PendingRecord { record: Record::new(patient), seen: HashSet::new() });
                slot
            }
        };
        let entry = &mut self.pending[slot];

        if !visit.date.is_empty() && entry.first_sight(RecordKind::Visit, visit_key) {
            entry.record.visit_records.push(visit);
        }
        if !treatment.date.is_empty() && entry.first_sight(RecordKind::Treatment, treatment_key) {
            entry.record.treatment_records.push(treatment);
        }
        if !diagnostic.date.is_empty() && entry.first_sight(RecordKind::Diagnostic, diagnostic_key) {
            entry.record.diagnostic_records.push(diagnostic);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn finish(self) -> Vec<Record> {
        self.pending.into_iter().map(|p| p.record).collect()
    }
}

/// Aggregates a fallible row sequence. The first error discards everything gathered so far.
pub fn aggregate_rows<I>(rows: I) -> RecordResult<Vec<Record>>
where
    I: IntoIterator<Item = RecordResult<JoinedRow>>,
{
    let mut aggregator = RecordAggregator::new();
    for row in rows {
        aggregator.push(row?);
    }
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrec_models::RecordError;

    fn patient(id: &str) -> Patient {
        Patient { id: id.to_string(), name: format!("name-{}", id), age: 40 }
    }

    fn visit(date: &str) -> VisitRecord {
        VisitRecord {
            date: date.to_string(),
            reason: "checkup".to_string(),
            doctor_name: "Dr. X".to_string(),
            hospital: "General".to_string(),
        }
    }

    fn treatment(date: &str) -> TreatmentRecord {
        TreatmentRecord {
            date: date.to_string(),
            treatment: "rest".to_string(),
            outcome: "recovered".to_string(),
            hospital: "General".to_string(),
        }
    }

    fn diagnostic(date: &str) -> DiagnosticRecord {
        DiagnosticRecord {
            date: date.to_string(),
            diagnosis: "flu".to_string(),
            specialist: "Dr. Y".to_string(),
            hospital: "St. Mary".to_string(),
        }
    }

    fn row(
        id: &str,
        v: Option<(i64, &str)>,
        t: Option<(i64, &str)>,
        d: Option<(i64, &str)>,
    ) -> JoinedRow {
        JoinedRow {
            patient: patient(id),
            visit_key: v.map(|(k, _)| k),
            visit: visit(v.map(|(_, date)| date).unwrap_or("")),
            treatment_key: t.map(|(k, _)| k),
            treatment: treatment(t.map(|(_, date)| date).unwrap_or("")),
            diagnostic_key: d.map(|(k, _)| k),
            diagnostic: diagnostic(d.map(|(_, date)| date).unwrap_or("")),
        }
    }

    #[test]
    fn test_one_record_per_patient() {
        let rows = vec![
            row("p1", Some((1, "2024-01-01")), None, None),
            row("p2", None, Some((1, "2024-01-02")), None),
            row("p1", Some((2, "2024-01-03")), None, None),
        ];
        let records = aggregate_rows(rows.into_iter().map(Ok)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].patient.id, "p1");
        assert_eq!(records[0].visit_records.len(), 2);
        assert_eq!(records[1].patient.id, "p2");
        assert_eq!(records[1].treatment_records.len(), 1);
    }

    #[test]
    fn test_cross_product_rows_are_deduplicated_by_key() {
        // 2 visits x 2 treatments x 1 diagnostic, as the three-way join returns them.
        let mut aggregator = RecordAggregator::new();
        for (vk, vd) in [(1, "2024-01-01"), (2, "2024-02-01")] {
            for (tk, td) in [(7, "2024-01-05"), (8, "2024-02-05")] {
                aggregator.push(row("p1", Some((vk, vd)), Some((tk, td)), Some((3, "2024-03-01"))));
            }
        }
        let records = aggregator.finish();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        let visit_dates: Vec<_> = record.visit_records.iter().map(|v| v.date.as_str()).collect();
        let treatment_dates: Vec<_> = record.treatment_records.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(visit_dates, ["2024-01-01", "2024-02-01"]);
        assert_eq!(treatment_dates, ["2024-01-05", "2024-02-05"]);
        assert_eq!(record.diagnostic_records, vec![diagnostic("2024-03-01")]);
    }

    #[test]
    fn test_empty_dates_are_dropped() {
        let mut r = row("p1", Some((1, "")), None, Some((4, "2024-04-01")));
        r.treatment_key = Some(9);
        let records = aggregate_rows(vec![Ok(r)]).unwrap();
        assert!(records[0].visit_records.is_empty());
        assert!(records[0].treatment_records.is_empty());
        assert_eq!(records[0].diagnostic_records.len(), 1);
    }

    #[test]
    fn test_childless_patient_is_kept() {
        let records = aggregate_rows(vec![Ok(row("p9", None, None, None))]).unwrap();
        assert_eq!(records, vec![Record::new(patient("p9"))]);
    }

    #[test]
    fn test_keyless_rows_are_not_deduplicated() {
        let mut r = row("p1", None, None, None);
        r.visit = visit("2024-05-05");
        let records = aggregate_rows(vec![Ok(r.clone()), Ok(r)]).unwrap();
        assert_eq!(records[0].visit_records.len(), 2);
    }

    #[test]
    fn test_same_key_in_different_kinds_is_independent() {
        let records =
            aggregate_rows(vec![Ok(row("p1", Some((1, "2024-01-01")), Some((1, "2024-01-02")), Some((1, "2024-01-03"))))])
                .unwrap();
        assert_eq!(records[0].child_count(), 3);
    }

    #[test]
    fn test_decoding_failure_discards_partial_results() {
        let rows = vec![
            Ok(row("p1", Some((1, "2024-01-01")), None, None)),
            Err(RecordError::MalformedResult("bad age".to_string())),
            Ok(row("p2", None, None, None)),
        ];
        let result = aggregate_rows(rows);
        assert!(matches!(result, Err(RecordError::MalformedResult(_))));
    }

    #[test]
    fn test_no_rows_yields_no_records() {
        let aggregator = RecordAggregator::new();
        assert!(aggregator.is_empty());
        assert!(aggregate_rows(Vec::<RecordResult<JoinedRow>>::new()).unwrap().is_empty());
    }
}
