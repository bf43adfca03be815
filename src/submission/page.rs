//! The agreement page as a server-held view model.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::countdown::{CountdownView, RedirectCountdown};
use crate::data_url::DataUrlError;
use crate::dates::AgreementDates;
use crate::signature::{AcceptFeedback, EventOutcome, LockedSignaturePad, PadEvent, SignaturePad};

pub const FULL_NAME: &str = "fullName";
pub const INITIALS: &str = "initials";
pub const READ: &str = "read";
pub const TERMS: &str = "terms";
pub const START_DATE: &str = "hiddenStartDate";
pub const EXPIRATION_DATE: &str = "hiddenExpirationDate";
pub const SIGNATURE_DATA: &str = "signature-data";
/// Form name of the serialized signature control. Never forwarded to the relay.
pub const SIGNATURE_NAME: &str = "signature";

pub const SUBMIT_LABEL: &str = "Submit Signed Agreement";
pub const SUBMITTING_LABEL: &str = "Submitting...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Text,
    Checkbox,
    Hidden,
    Select,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FormControl {
    pub id: String,
    pub name: Option<String>,
    pub kind: ControlKind,
    pub value: String,
    pub checked: bool,
    pub read_only: bool,
    pub disabled: bool,
    pub dimmed: bool,
}

impl FormControl {
    fn new(id: &str, name: Option<&str>, kind: ControlKind, value: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.map(str::to_string),
            kind,
            value: value.to_string(),
            checked: false,
            read_only: false,
            disabled: false,
            dimmed: false,
        }
    }

    pub fn text(id: &str, value: &str) -> Self {
        Self::new(id, Some(id), ControlKind::Text, value)
    }

    pub fn checkbox(id: &str, checked: bool) -> Self {
        let mut control = Self::new(id, Some(id), ControlKind::Checkbox, "");
        control.checked = checked;
        control
    }

    pub fn hidden(id: &str, name: &str, value: &str) -> Self {
        Self::new(id, Some(name), ControlKind::Hidden, value)
    }

    /// Value as the relay sees it: checkboxes become `"true"` / `"false"`.
    pub fn submitted_value(&self) -> String {
        match self.kind {
            ControlKind::Checkbox => self.checked.to_string(),
            _ => self.value.clone(),
        }
    }

    fn is_editable(&self) -> bool {
        !self.read_only && !self.disabled
    }
}

/// Where the signature canvas lives.
#[derive(Debug, Clone)]
pub enum SignatureSlot {
    /// Drawn through this session.
    Live(SignaturePad),
    /// Frozen after submission.
    Locked(LockedSignaturePad),
    /// Drawn client-side; only the hidden `signature-data` value is known.
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubmitControl {
    pub label: String,
    pub disabled: bool,
    pub visible: bool,
}

impl Default for SubmitControl {
    fn default() -> Self {
        Self {
            label: SUBMIT_LABEL.to_string(),
            disabled: false,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Editing,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PageError {
    #[error("unknown control \"{0}\"")]
    UnknownControl(String),
    #[error("control \"{0}\" is read-only")]
    ReadOnly(String),
    #[error("control \"{id}\" is not a {expected} control")]
    WrongKind { id: String, expected: &'static str },
    #[error("the signature pad is locked")]
    SignatureLocked,
    #[error("the signature pad is drawn client-side")]
    SignatureDetached,
    #[error("failed to serialize signature: {0}")]
    Signature(String),
}

impl From<DataUrlError> for PageError {
    fn from(e: DataUrlError) -> Self {
        PageError::Signature(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct AgreementPage {
    pub(super) controls: Vec<FormControl>,
    pub(super) signature: SignatureSlot,
    pub(super) pad_buttons_disabled: bool,
    pub(super) submit: SubmitControl,
    pub(super) banner: Option<String>,
    pub(super) thank_you_visible: bool,
    pub(super) state: SubmissionState,
    pub(super) alert: Option<String>,
    pub(super) countdown: Option<RedirectCountdown>,
}

impl AgreementPage {
    /// A fresh page with the hidden date controls pre-filled.
    pub fn new(dates: AgreementDates, signature: SignatureSlot) -> Self {
        let controls = vec![
            FormControl::text(FULL_NAME, ""),
            FormControl::text(INITIALS, ""),
            FormControl::checkbox(READ, false),
            FormControl::checkbox(TERMS, false),
            FormControl::hidden(START_DATE, START_DATE, &dates.start_text()),
            FormControl::hidden(EXPIRATION_DATE, EXPIRATION_DATE, &dates.expiration_text()),
            FormControl::hidden(SIGNATURE_DATA, SIGNATURE_NAME, ""),
        ];

        Self {
            controls,
            signature,
            pad_buttons_disabled: false,
            submit: SubmitControl::default(),
            banner: None,
            thank_you_visible: false,
            state: SubmissionState::Editing,
            alert: None,
            countdown: None,
        }
    }

    pub fn with_pad(dates: AgreementDates, width: u32, height: u32) -> Self {
        Self::new(dates, SignatureSlot::Live(SignaturePad::new(width, height)))
    }

    pub fn detached(dates: AgreementDates) -> Self {
        Self::new(dates, SignatureSlot::Detached)
    }

    /// Add a relay-only control, such as a hidden subject line.
    pub fn with_extra_control(mut self, control: FormControl) -> Self {
        match self.controls.iter_mut().find(|c| c.id == control.id) {
            Some(existing) => *existing = control,
            None => self.controls.push(control),
        }
        self
    }

    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }

    pub fn control(&self, id: &str) -> Option<&FormControl> {
        self.controls.iter().find(|c| c.id == id)
    }

    fn editable_control(&mut self, id: &str) -> Result<&mut FormControl, PageError> {
        let control = self
            .controls
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| PageError::UnknownControl(id.to_string()))?;
        if !control.is_editable() {
            return Err(PageError::ReadOnly(id.to_string()));
        }
        Ok(control)
    }

    pub fn value(&self, id: &str) -> &str {
        self.control(id).map(|c| c.value.as_str()).unwrap_or("")
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.control(id).map(|c| c.checked).unwrap_or(false)
    }

    pub fn set_value(&mut self, id: &str, value: &str) -> Result<(), PageError> {
        let control = self.editable_control(id)?;
        if control.kind == ControlKind::Checkbox {
            return Err(PageError::WrongKind {
                id: id.to_string(),
                expected: "value",
            });
        }
        control.value = value.to_string();
        Ok(())
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> Result<(), PageError> {
        let control = self.editable_control(id)?;
        if control.kind != ControlKind::Checkbox {
            return Err(PageError::WrongKind {
                id: id.to_string(),
                expected: "checkbox",
            });
        }
        control.checked = checked;
        Ok(())
    }

    fn set_signature_data(&mut self, value: String) {
        if let Some(control) = self.controls.iter_mut().find(|c| c.id == SIGNATURE_DATA) {
            control.value = value;
        }
    }

    fn live_pad(&mut self) -> Result<&mut SignaturePad, PageError> {
        match &mut self.signature {
            SignatureSlot::Live(pad) => Ok(pad),
            SignatureSlot::Locked(_) => Err(PageError::SignatureLocked),
            SignatureSlot::Detached => Err(PageError::SignatureDetached),
        }
    }

    pub fn signature_slot(&self) -> &SignatureSlot {
        &self.signature
    }

    pub fn signature_event(&mut self, event: PadEvent) -> Result<EventOutcome, PageError> {
        Ok(self.live_pad()?.handle(event))
    }

    pub fn clear_signature(&mut self) -> Result<(), PageError> {
        if self.pad_buttons_disabled {
            return Err(PageError::SignatureLocked);
        }
        self.live_pad()?.clear();
        self.set_signature_data(String::new());
        Ok(())
    }

    pub fn accept_signature(&mut self) -> Result<AcceptFeedback, PageError> {
        if self.pad_buttons_disabled {
            return Err(PageError::SignatureLocked);
        }
        let pad = self.live_pad()?;
        let feedback = pad.accept()?;
        let accepted = pad.accepted().unwrap_or_default().to_string();
        self.set_signature_data(accepted);
        Ok(feedback)
    }

    /// Re-serialize a live pad into the hidden control. Detached pages keep the
    /// value the client sent.
    pub fn sync_signature(&mut self) -> Result<(), PageError> {
        if let SignatureSlot::Live(pad) = &self.signature {
            let value = pad.to_data_url()?;
            self.set_signature_data(value);
        }
        Ok(())
    }

    pub fn signature_data(&self) -> &str {
        self.value(SIGNATURE_DATA)
    }

    pub fn submit_control(&self) -> &SubmitControl {
        &self.submit
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn thank_you_visible(&self) -> bool {
        self.thank_you_visible
    }

    pub fn countdown(&self) -> Option<&RedirectCountdown> {
        self.countdown.as_ref()
    }

    /// `(name, value)` pairs as a browser would post them, minus the raw signature.
    pub fn relay_fields(&self) -> Vec<(String, String)> {
        self.controls
            .iter()
            .filter_map(|c| c.name.as_deref().map(|name| (name, c)))
            .filter(|(name, _)| !name.is_empty() && *name != SIGNATURE_NAME)
            .map(|(name, c)| (name.to_string(), c.submitted_value()))
            .collect()
    }

    pub(super) fn begin_validating(&mut self) {
        self.state = SubmissionState::Validating;
        self.alert = None;
    }

    pub(super) fn reject(&mut self, message: String) {
        self.state = SubmissionState::Editing;
        self.alert = Some(message);
    }

    pub(super) fn begin_submitting(&mut self) {
        self.state = SubmissionState::Submitting;
        self.submit.disabled = true;
        self.submit.label = SUBMITTING_LABEL.to_string();
    }

    /// Failure re-arms the submit control and leaves every value untouched.
    pub(super) fn fail(&mut self, alert: &str) {
        self.state = SubmissionState::Editing;
        self.alert = Some(alert.to_string());
        self.submit.disabled = false;
        self.submit.label = SUBMIT_LABEL.to_string();
    }

    /// Confirmation state: thank-you shown, submit hidden, page locked, countdown running.
    pub fn confirm(&mut self, countdown: RedirectCountdown) {
        self.state = SubmissionState::Succeeded;
        self.lock();
        self.submit.visible = false;
        self.thank_you_visible = true;
        self.countdown = Some(countdown);
    }

    /// The `success=true` path: confirm without submitting again.
    pub fn restore_submitted(&mut self, countdown: RedirectCountdown) {
        if self.state == SubmissionState::Succeeded && self.countdown.is_some() {
            return;
        }
        log::info!("Restoring submitted page");
        self.confirm(countdown);
    }

    pub fn view(&self) -> PageView {
        let signature = match &self.signature {
            SignatureSlot::Live(pad) => SignatureView {
                mode: SignatureMode::Live,
                overlay: None,
                dirty: pad.is_dirty(),
                accepted: pad.accepted().is_some(),
            },
            SignatureSlot::Locked(pad) => SignatureView {
                mode: SignatureMode::Locked,
                overlay: Some(pad.overlay().to_string()),
                dirty: false,
                accepted: pad.accepted().is_some(),
            },
            SignatureSlot::Detached => SignatureView {
                mode: SignatureMode::Detached,
                overlay: self.is_locked().then(|| crate::signature::pad::SUBMITTED_OVERLAY.to_string()),
                dirty: false,
                accepted: !self.signature_data().is_empty(),
            },
        };

        PageView {
            controls: self.controls.clone(),
            signature,
            signature_buttons_disabled: self.pad_buttons_disabled,
            submit: self.submit.clone(),
            banner: self.banner.clone(),
            thank_you_visible: self.thank_you_visible,
            state: self.state,
            alert: self.alert.clone(),
            countdown: self.countdown.as_ref().map(RedirectCountdown::view),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMode {
    Live,
    Locked,
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SignatureView {
    pub mode: SignatureMode,
    pub overlay: Option<String>,
    pub dirty: bool,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PageView {
    pub controls: Vec<FormControl>,
    pub signature: SignatureView,
    pub signature_buttons_disabled: bool,
    pub submit: SubmitControl,
    pub banner: Option<String>,
    pub thank_you_visible: bool,
    pub state: SubmissionState,
    pub alert: Option<String>,
    pub countdown: Option<CountdownView>,
}
