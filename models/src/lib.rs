// models/src/lib.rs

pub mod errors;
pub mod kind;
pub mod patient;
pub mod record;

pub use errors::{RecordError, RecordResult};
pub use kind::RecordKind;
pub use patient::{Patient, PatientUpdate};
pub use record::{DiagnosticRecord, Record, RecordUpdate, TreatmentRecord, VisitRecord};
