//! Modelo de dominio de las admisiones de comedores: la admisión y sus dos
//! ejes de estado, documentos, formularios legales, informe técnico e
//! informe complementario, más el repositorio de agregados.
//!
//! Las opciones se modelan como enums que implementan [`Choice`]; el
//! historial usa siempre `display()` para mostrarlas.
mod actor;
mod admission;
mod choice;
mod complementary;
mod convenio;
mod document;
mod domain_repository;
mod domain_stubs;
mod errors;
mod filters;
mod formulary;
mod kitchen;
mod record;
mod technical_report;

pub use actor::{Actor, Role};
pub use admission::{Admission, AdmissionState, AdmissionType, DictamenDetail, LegalIntervention, LegalState,
                    RejectionMotive};
pub use choice::{normalize, Choice};
pub use complementary::{ApprovedOverrides, ComplementaryDecision, ComplementaryReport, ComplementaryState};
pub use convenio::ConvenioType;
pub use document::{AdmissionDocument, DocumentCatalogEntry, DocumentStatus, FileHandle};
pub use domain_repository::{AdmissionRepository, InMemoryAdmissionRepository, SaveResult};
pub use domain_stubs::{DomainStubs, SampleData};
pub use errors::DomainError;
pub use filters::{filter_fields, AdmissionFilter, FilterOperator};
pub use formulary::{no_corresponde_allowed, ArtifactRefs, Expiry, Formulary, FormularyKind, FormularyPayload};
pub use kitchen::KitchenRef;
pub use record::AdmissionRecord;
pub use technical_report::{is_report_field, Day, FormularyState, Meal, MealMatrix, ReportFields, ReportState,
                           ReviewDecision, SaveAction, TechnicalReport, REPORT_FIELDS};
