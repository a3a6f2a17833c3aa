// lib/src/lib.rs

pub mod aggregate;
pub mod config;
pub mod database;
pub mod query;
pub mod store;

pub use medrec_models::{
    DiagnosticRecord, Patient, PatientUpdate, Record, RecordError, RecordKind, RecordResult,
    RecordUpdate, TreatmentRecord, VisitRecord,
};

pub use crate::aggregate::{aggregate_rows, JoinedRow, RecordAggregator};
pub use crate::config::{load_app_config, AppConfig, DatabaseConfig, ServerConfig};
pub use crate::database::Database;
pub use crate::query::{SearchFilter, SearchQuery};
pub use crate::store::RecordStore;
