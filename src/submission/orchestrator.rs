//! Validate, assemble, relay and lock.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use super::countdown::RedirectSettings;
use super::page::{AgreementPage, EXPIRATION_DATE, FULL_NAME, START_DATE};
use super::relay::{is_accepted_status, RelayAttachment, RelayPayload, RelayTransport, TransportError};
use super::validation::{ReadinessCheck, ValidationErrors, Validator};
use crate::assembler::{AgreementAssembler, AgreementFields, AssemblyError, FillReport};

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

pub const FAILURE_ALERT: &str = "There was a problem with your submission. Please try again.";

/// Where the unfilled agreement comes from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self) -> Result<Vec<u8>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn load(&self) -> Result<Vec<u8>, SourceError> {
        tokio::fs::read(&self.path).await.map_err(|source| SourceError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Bytes in memory.
pub struct StaticSource(pub Arc<Vec<u8>>);

#[async_trait]
impl DocumentSource for StaticSource {
    async fn load(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.0.as_ref().clone())
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to serialize signature: {0}")]
    Signature(String),
}

/// The signed agreement handed back to the user once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub enum SubmissionOutcome {
    Succeeded {
        download: GeneratedDownload,
        report: FillReport,
        status: u16,
    },
    Invalid(ValidationErrors),
    Failed {
        alert: String,
        error: SubmissionError,
    },
    /// Submit is disabled or the page is locked.
    Ignored,
}

/// `BuyerBrokerAgreement_<name>.pdf` with whitespace runs as underscores.
pub fn download_filename(full_name: &str) -> String {
    let name = if full_name.is_empty() { "User" } else { full_name };
    format!("BuyerBrokerAgreement_{}.pdf", WHITESPACE_RUN.replace_all(name, "_"))
}

pub struct SubmissionOrchestrator {
    source: Arc<dyn DocumentSource>,
    assembler: AgreementAssembler,
    relay: Arc<dyn RelayTransport>,
    empty_signature_threshold: usize,
    redirect: RedirectSettings,
}

impl SubmissionOrchestrator {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        assembler: AgreementAssembler,
        relay: Arc<dyn RelayTransport>,
        empty_signature_threshold: usize,
        redirect: RedirectSettings,
    ) -> Self {
        Self {
            source,
            assembler,
            relay,
            empty_signature_threshold,
            redirect,
        }
    }

    pub fn redirect(&self) -> &RedirectSettings {
        &self.redirect
    }

    /// Run one submission attempt against the page.
    pub async fn submit(&self, page: &mut AgreementPage) -> SubmissionOutcome {
        if page.is_locked() || page.submit_control().disabled {
            log::warn!("Ignoring submit: form is locked or already submitting");
            return SubmissionOutcome::Ignored;
        }

        page.begin_validating();
        if let Err(e) = page.sync_signature() {
            log::error!("Error processing form: {}", e);
            page.fail(FAILURE_ALERT);
            return SubmissionOutcome::Failed {
                alert: FAILURE_ALERT.to_string(),
                error: SubmissionError::Signature(e.to_string()),
            };
        }

        let check = ReadinessCheck::for_page(page, self.empty_signature_threshold);
        if let Err(errors) = check.validate() {
            log::info!("Submission blocked: {} item(s) missing", errors.len());
            page.reject(errors.to_alert_message());
            return SubmissionOutcome::Invalid(errors);
        }

        page.begin_submitting();
        match self.deliver(page).await {
            Ok((download, report, status)) => {
                log::info!("Agreement submitted as {}", download.filename);
                page.confirm(self.redirect.start());
                SubmissionOutcome::Succeeded {
                    download,
                    report,
                    status,
                }
            }
            Err(error) => {
                log::error!("Error processing form: {}", error);
                page.fail(FAILURE_ALERT);
                SubmissionOutcome::Failed {
                    alert: FAILURE_ALERT.to_string(),
                    error,
                }
            }
        }
    }

    async fn deliver(
        &self,
        page: &AgreementPage,
    ) -> Result<(GeneratedDownload, FillReport, u16), SubmissionError> {
        let source = self.source.load().await?;
        let fields = AgreementFields {
            full_name: page.value(FULL_NAME).to_string(),
            start_date: page.value(START_DATE).to_string(),
            expiration_date: page.value(EXPIRATION_DATE).to_string(),
            signature: page.signature_data().to_string(),
        };

        let assembler = self.assembler.clone();
        let assembled = tokio::task::spawn_blocking(move || assembler.assemble(&source, &fields))
            .await
            .map_err(|e| AssemblyError::Serialize(e.to_string()))??;

        let filename = download_filename(page.value(FULL_NAME));
        let payload = RelayPayload {
            fields: page.relay_fields(),
            attachment: RelayAttachment::pdf(&filename, assembled.bytes.clone()),
        };

        let status = self.relay.post(payload).await?;
        if !is_accepted_status(status) {
            return Err(TransportError::Rejected(status).into());
        }

        Ok((
            GeneratedDownload {
                filename,
                bytes: assembled.bytes,
            },
            assembled.report,
            status,
        ))
    }
}
