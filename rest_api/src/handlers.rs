// rest_api/src/handlers.rs

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use medrec_lib::SearchFilter;
use medrec_models::{Patient, PatientUpdate, Record, RecordKind, RecordUpdate};

use crate::error::RestApiError;
use crate::AppState;

pub const PATIENT_UPDATED: &str = "Patient information updated successfully";
pub const RECORD_UPDATED: &str = "Record updated successfully";

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "patientId")]
    pub patient_id: Option<String>,
    pub hospital: Option<String>,
}

/// Body of `POST /api/addRecord`. `record` stays untyped until `type` says which shape it has.
#[derive(Debug, Deserialize, Serialize)]
pub struct AddRecordRequest {
    #[serde(rename = "patientId")]
    pub patient_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub record: Value,
}

impl AddRecordRequest {
    pub fn into_update(self) -> Result<(String, RecordUpdate), RestApiError> {
        let kind: RecordKind = self.kind.parse()?;
        let update = RecordUpdate::from_payload(kind, self.record)?;
        Ok((self.patient_id, update))
    }
}

// Handler for GET /api/patients/:id
pub async fn get_patient_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, RestApiError> {
    let patient = state.store.get_patient(&id).await?;
    Ok(Json(patient))
}

// Handler for PUT /api/patients/:id
pub async fn update_patient_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PatientUpdate>, JsonRejection>,
) -> Result<&'static str, RestApiError> {
    let Json(update) = payload?;
    state.store.update_patient(&id, &update).await?;
    Ok(PATIENT_UPDATED)
}

// Handler for POST /api/records
pub async fn create_record_handler(
    State(state): State<AppState>,
    payload: Result<Json<Record>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), RestApiError> {
    let Json(record) = payload?;
    state.store.insert_record(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// Handler for GET /api/search
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Record>>, RestApiError> {
    let filter = SearchFilter::new(params.patient_id, params.hospital);
    let records = state.store.search_records(&filter).await?;
    info!("Search returned {} record(s)", records.len());
    Ok(Json(records))
}

// Handler for POST /api/addRecord
pub async fn add_record_handler(
    State(state): State<AppState>,
    payload: Result<Json<AddRecordRequest>, JsonRejection>,
) -> Result<&'static str, RestApiError> {
    let Json(request) = payload?;
    let (patient_id, update) = request.into_update()?;
    state.store.update_child_record(&patient_id, &update).await?;
    Ok(RECORD_UPDATED)
}

// Handler for GET /api/health
pub async fn health_check_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "message": "Medical records API is healthy" })))
}
