//! Agreement submission.
//!
//! - `page` - the form controls, signature slot and submit state
//! - `validation` - submit-readiness checks
//! - `lock` - the read-only transition
//! - `countdown` - the post-submission redirect
//! - `relay` - the multipart relay boundary
//! - `orchestrator` - one submission attempt, end to end
//! - `multipart_parser` - browser-posted forms
//! - `handlers` - HTTP endpoints

pub mod countdown;
pub mod handlers;
pub mod lock;
pub mod multipart_parser;
pub mod orchestrator;
pub mod page;
pub mod relay;
pub mod validation;

pub use countdown::{RedirectCountdown, RedirectSettings};
pub use orchestrator::{
    DocumentSource, FileSource, GeneratedDownload, StaticSource, SubmissionError,
    SubmissionOrchestrator, SubmissionOutcome,
};
pub use page::{AgreementPage, PageError, PageView, SignatureSlot, SubmissionState};
pub use relay::{HttpRelay, RelayPayload, RelayTransport, TransportError};
pub use validation::{ValidationError, ValidationErrors};
