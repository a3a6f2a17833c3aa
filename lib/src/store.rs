// lib/src/store.rs

use futures::TryStreamExt;
use sqlx::{FromRow, Sqlite, Transaction};
use tracing::{debug, info, warn};

use medrec_models::{Patient, PatientUpdate, Record, RecordError, RecordKind, RecordResult, RecordUpdate};

use crate::aggregate::{decode_patient, JoinedRow, RecordAggregator};
use crate::database::Database;
use crate::query::{SearchFilter, SearchQuery};

const SELECT_PATIENT: &str =
    "SELECT id AS patient_id, name AS patient_name, age AS patient_age FROM Patients WHERE id = ?";
const UPDATE_PATIENT: &str = "UPDATE Patients SET name = ?, age = ? WHERE id = ?";
const INSERT_PATIENT: &str = "INSERT INTO Patients (id, name, age) VALUES (?, ?, ?)";

fn insert_child_sql(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Visit => {
            "INSERT INTO Visits (patient_id, date, reason, doctor_name, hospital) VALUES (?, ?, ?, ?, ?)"
        }
        RecordKind::Treatment => {
            "INSERT INTO Treatments (patient_id, date, treatment, outcome, hospital) VALUES (?, ?, ?, ?, ?)"
        }
        RecordKind::Diagnostic => {
            "INSERT INTO Diagnostics (patient_id, date, diagnosis, specialist, hospital) VALUES (?, ?, ?, ?, ?)"
        }
    }
}

fn update_child_sql(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Visit => {
            "UPDATE Visits SET date = ?, reason = ?, doctor_name = ?, hospital = ? WHERE patient_id = ? AND date = ?"
        }
        RecordKind::Treatment => {
            "UPDATE Treatments SET date = ?, treatment = ?, outcome = ?, hospital = ? WHERE patient_id = ? AND date = ?"
        }
        RecordKind::Diagnostic => {
            "UPDATE Diagnostics SET date = ?, diagnosis = ?, specialist = ?, hospital = ? WHERE patient_id = ? AND date = ?"
        }
    }
}

/// Record-level operations over the store. Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    pub fn new(db: Database) -> Self {
        RecordStore { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn get_patient(&self, id: &str) -> RecordResult<Patient> {
        let row = sqlx::query(SELECT_PATIENT)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| RecordError::not_found(format!("patient '{}' not found", id)))?;
        decode_patient(&row).map_err(malformed)
    }

    /// Overwrites name and age. Returns the number of rows changed, which is zero for an unknown id.
    pub async fn update_patient(&self, id: &str, update: &PatientUpdate) -> RecordResult<u64> {
        let result = sqlx::query(UPDATE_PATIENT)
            .bind(update.name.as_str())
            .bind(i64::from(update.age))
            .bind(id)
            .execute(self.db.pool())
            .await?;
        let changed = result.rows_affected();
        if changed == 0 {
            warn!("Patient update for '{}' matched no rows", id);
        } else {
            info!("Updated patient '{}'", id);
        }
        Ok(changed)
    }

    /// Stores the patient and all of its children in one transaction.
    ///
    /// Children are written in input order. If any statement fails, the
    /// transaction is rolled back before the error is returned.
    pub async fn insert_record(&self, record: &Record) -> RecordResult<()> {
        record.validate()?;

        let mut tx = self.db.pool().begin().await?;
        match insert_record_rows(&mut tx, record).await {
            Ok(()) => {
                tx.commit().await?;
                info!(
                    "Inserted record for patient '{}' ({} visits, {} treatments, {} diagnostics)",
                    record.patient.id,
                    record.visit_records.len(),
                    record.treatment_records.len(),
                    record.diagnostic_records.len()
                );
                Ok(())
            }
            Err(e) => {
                rollback(tx).await;
                Err(e)
            }
        }
    }

    /// Overwrites the child row of `update.kind()` matching `(patient_id, update.date())`.
    ///
    /// Returns the number of rows changed. Zero is not an error.
    pub async fn update_child_record(&self, patient_id: &str, update: &RecordUpdate) -> RecordResult<u64> {
        let mut tx = self.db.pool().begin().await?;
        match update_child_row(&mut tx, patient_id, update).await {
            Ok(changed) => {
                tx.commit().await?;
                if changed == 0 {
                    warn!(
                        "No {} record dated '{}' for patient '{}'; nothing updated",
                        update.kind(),
                        update.date(),
                        patient_id
                    );
                } else {
                    info!("Updated {} {} record(s) for patient '{}'", changed, update.kind(), patient_id);
                }
                Ok(changed)
            }
            Err(e) => {
                rollback(tx).await;
                Err(e)
            }
        }
    }

    /// Runs the joined search and folds the rows into one record per patient.
    ///
    /// Fails with `InvalidArgument` without filters, `NotFound` when nothing
    /// matched, and `MalformedResult` if any row cannot be decoded.
    pub async fn search_records(&self, filter: &SearchFilter) -> RecordResult<Vec<Record>> {
        let search = SearchQuery::build(filter)?;
        debug!("Searching records: {:?}", filter);

        let mut aggregator = RecordAggregator::new();
        let mut rows = search.to_query().fetch(self.db.pool());
        while let Some(row) = rows.try_next().await? {
            aggregator.push(JoinedRow::from_row(&row).map_err(malformed)?);
        }

        if aggregator.is_empty() {
            return Err(RecordError::not_found("no records found"));
        }
        debug!("Search matched {} patient(s)", aggregator.len());
        Ok(aggregator.finish())
    }
}

async fn insert_record_rows(tx: &mut Transaction<'_, Sqlite>, record: &Record) -> RecordResult<()> {
    let patient_id = record.patient.id.as_str();
    sqlx::query(INSERT_PATIENT)
        .bind(patient_id)
        .bind(record.patient.name.as_str())
        .bind(i64::from(record.patient.age))
        .execute(&mut **tx)
        .await
        .map_err(|e| store_failure("Failed to insert new patient", e))?;

    for visit in &record.visit_records {
        insert_child_row(tx, patient_id, RecordKind::Visit, visit.values()).await?;
    }
    for treatment in &record.treatment_records {
        insert_child_row(tx, patient_id, RecordKind::Treatment, treatment.values()).await?;
    }
    for diagnostic in &record.diagnostic_records {
        insert_child_row(tx, patient_id, RecordKind::Diagnostic, diagnostic.values()).await?;
    }
    Ok(())
}

async fn insert_child_row(
    tx: &mut Transaction<'_, Sqlite>,
    patient_id: &str,
    kind: RecordKind,
    [date, first, second, hospital]: [&str; 4],
) -> RecordResult<()> {
    sqlx::query(insert_child_sql(kind))
        .bind(patient_id)
        .bind(date)
        .bind(first)
        .bind(second)
        .bind(hospital)
        .execute(&mut **tx)
        .await
        .map_err(|e| store_failure(&format!("Failed to insert {} record", kind), e))?;
    Ok(())
}

async fn update_child_row(
    tx: &mut Transaction<'_, Sqlite>,
    patient_id: &str,
    update: &RecordUpdate,
) -> RecordResult<u64> {
    let [date, first, second, hospital] = update.values();
    let result = sqlx::query(update_child_sql(update.kind()))
        .bind(date)
        .bind(first)
        .bind(second)
        .bind(hospital)
        .bind(patient_id)
        .bind(date)
        .execute(&mut **tx)
        .await
        .map_err(|e| store_failure(&format!("Failed to update {} record", update.kind()), e))?;
    Ok(result.rows_affected())
}

async fn rollback(tx: Transaction<'_, Sqlite>) {
    if let Err(e) = tx.rollback().await {
        warn!("Transaction rollback failed: {}", e);
    }
}

fn store_failure(context: &str, err: sqlx::Error) -> RecordError {
    RecordError::StoreFailure(format!("{}: {}", context, err))
}

fn malformed(err: sqlx::Error) -> RecordError {
    RecordError::MalformedResult(format!("Failed to parse database results: {}", err))
}
