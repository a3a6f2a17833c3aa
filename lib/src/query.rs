// lib/src/query.rs

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use medrec_models::{RecordError, RecordResult};

/// Patients joined to every child table. Child keys are selected so repeated
/// rows from the join's cross product can be told apart.
const SEARCH_SELECT: &str = "SELECT
    p.id AS patient_id, p.name AS patient_name, p.age AS patient_age,
    v.id AS visit_key, v.date AS visit_date, v.reason AS visit_reason,
    v.doctor_name AS visit_doctor_name, v.hospital AS visit_hospital,
    t.id AS treatment_key, t.date AS treatment_date, t.treatment AS treatment_name,
    t.outcome AS treatment_outcome, t.hospital AS treatment_hospital,
    d.id AS diagnostic_key, d.date AS diagnostic_date, d.diagnosis AS diagnostic_diagnosis,
    d.specialist AS diagnostic_specialist, d.hospital AS diagnostic_hospital
FROM Patients p
LEFT JOIN Visits v ON p.id = v.patient_id
LEFT JOIN Treatments t ON p.id = t.patient_id
LEFT JOIN Diagnostics d ON p.id = d.patient_id";

const PATIENT_PREDICATE: &str = "p.id = ?";
const HOSPITAL_PREDICATE: &str = "(v.hospital = ? OR t.hospital = ? OR d.hospital = ?)";
const SEARCH_ORDER: &str = "ORDER BY p.id, v.id, t.id, d.id";

/// Optional search filters. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub patient_id: Option<String>,
    pub hospital: Option<String>,
}

impl SearchFilter {
    pub fn new(patient_id: Option<String>, hospital: Option<String>) -> Self {
        SearchFilter {
            patient_id: patient_id.filter(|s| !s.is_empty()),
            hospital: hospital.filter(|s| !s.is_empty()),
        }
    }

    pub fn by_patient(patient_id: impl Into<String>) -> Self {
        Self::new(Some(patient_id.into()), None)
    }

    pub fn by_hospital(hospital: impl Into<String>) -> Self {
        Self::new(None, Some(hospital.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.patient_id.is_none() && self.hospital.is_none()
    }
}

/// A parameterized search statement. Filter values only ever travel as bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    sql: String,
    params: Vec<String>,
}

impl SearchQuery {
    pub fn build(filter: &SearchFilter) -> RecordResult<Self> {
        if filter.is_empty() {
            return Err(RecordError::invalid("Please provide either a patientId or hospital parameter"));
        }

        let mut conditions: Vec<&str> = Vec::with_capacity(2);
        let mut params: Vec<String> = Vec::with_capacity(4);

        if let Some(patient_id) = &filter.patient_id {
            conditions.push(PATIENT_PREDICATE);
            params.push(patient_id.clone());
        }
        if let Some(hospital) = &filter.hospital {
            conditions.push(HOSPITAL_PREDICATE);
            params.extend(std::iter::repeat(hospital.clone()).take(3));
        }

        let sql = format!("{}\nWHERE {}\n{}", SEARCH_SELECT, conditions.join(" AND "), SEARCH_ORDER);
        Ok(SearchQuery { sql, params })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Prepares the statement with every parameter bound, ready to execute.
    pub fn to_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, param| query.bind(param.as_str()))
    }
}
