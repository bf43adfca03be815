//! Agreement assembly: fills the source PDF's form and stamps the signature.
//!
//! - `form` - AcroForm field lookup and writes
//! - `appearance` - appearance streams for text values
//! - `stamp` - signature image placement

pub mod appearance;
pub mod form;
pub mod stamp;

pub use stamp::{SignaturePlacement, StampRect};

use lopdf::Document;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors that end an assembly attempt.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("failed to parse agreement PDF: {0}")]
    Parse(String),
    #[error("failed to serialize agreement PDF: {0}")]
    Serialize(String),
}

/// A single field write that was skipped. Never fatal.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FieldError {
    #[error("field \"{0}\" not found")]
    Missing(String),
    #[error("field \"{name}\" is not a {expected} field (found {found})")]
    WrongType {
        name: String,
        expected: &'static str,
        found: String,
    },
    #[error("failed to write field \"{name}\": {reason}")]
    Write { name: String, reason: String },
}

/// Values the assembler writes into the agreement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgreementFields {
    pub full_name: String,
    pub start_date: String,
    pub expiration_date: String,
    /// PNG data URL; empty means no signature.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SkippedField {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignatureStamp {
    Absent,
    Placed { rect: StampRect },
    Failed { reason: String },
}

/// What happened to each write.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FillReport {
    pub filled: Vec<String>,
    pub skipped: Vec<SkippedField>,
    #[schema(value_type = Object)]
    pub signature: SignatureStamp,
}

impl FillReport {
    fn new() -> Self {
        Self {
            filled: Vec::new(),
            skipped: Vec::new(),
            signature: SignatureStamp::Absent,
        }
    }

    fn record(&mut self, field: &str, result: Result<(), FieldError>) {
        match result {
            Ok(()) => {
                log::info!("Filled \"{}\"", field);
                self.filled.push(field.to_string());
            }
            Err(e) => {
                log::warn!("Could not fill \"{}\": {}", field, e);
                self.skipped.push(SkippedField {
                    field: field.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    pub fn is_filled(&self, field: &str) -> bool {
        self.filled.iter().any(|f| f == field)
    }
}

#[derive(Debug, Clone)]
pub struct AssembledAgreement {
    pub bytes: Vec<u8>,
    pub report: FillReport,
}

enum FieldWrite<'a> {
    Text(&'a str),
    Check,
}

#[derive(Debug, Clone, Default)]
pub struct AgreementAssembler {
    placement: SignaturePlacement,
}

impl AgreementAssembler {
    pub fn new(placement: SignaturePlacement) -> Self {
        Self { placement }
    }

    /// Fill the agreement form and stamp the signature. Only parse and serialize
    /// failures are errors; every other problem is logged and reported.
    pub fn assemble(
        &self,
        source: &[u8],
        fields: &AgreementFields,
    ) -> Result<AssembledAgreement, AssemblyError> {
        log::info!("Generating completed PDF");
        let mut doc = Document::load_mem(source).map_err(|e| AssemblyError::Parse(e.to_string()))?;

        let names: Vec<String> = form::fields(&doc).into_iter().map(|f| f.name).collect();
        log::debug!("PDF has {} form fields: {:?}", names.len(), names);

        let writes = [
            ("Name", FieldWrite::Text(&fields.full_name)),
            ("StartDate", FieldWrite::Text(&fields.start_date)),
            ("EndDate", FieldWrite::Text(&fields.expiration_date)),
            ("SigDate", FieldWrite::Text(&fields.start_date)),
            ("Residential", FieldWrite::Check),
            ("Percentage", FieldWrite::Check),
            ("PercentageValue", FieldWrite::Text("1")),
        ];

        let mut report = FillReport::new();
        for (name, write) in writes {
            let result = match write {
                FieldWrite::Text(value) => form::set_text(&mut doc, name, value),
                FieldWrite::Check => form::set_checked(&mut doc, name),
            };
            report.record(name, result);
        }

        if form::has_acro_form(&doc) {
            if let Err(e) = form::set_need_appearances(&mut doc) {
                log::warn!("Could not set NeedAppearances: {}", e);
            }
        }

        if !fields.signature.trim().is_empty() {
            report.signature = match stamp::stamp_signature(&mut doc, &fields.signature, &self.placement) {
                Ok(rect) => {
                    log::info!(
                        "Placed signature at x:{}, y:{} with dimensions {}x{}",
                        rect.x,
                        rect.y,
                        rect.width,
                        rect.height
                    );
                    SignatureStamp::Placed { rect }
                }
                Err(e) => {
                    log::error!("Error adding signature: {}", e);
                    SignatureStamp::Failed {
                        reason: e.to_string(),
                    }
                }
            };
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| AssemblyError::Serialize(e.to_string()))?;
        log::info!("PDF saved successfully");

        Ok(AssembledAgreement { bytes, report })
    }
}
